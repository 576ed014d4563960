// Kurtopick - Multi-band kurtosis P-wave picker
// Module declarations

pub mod executor;
pub mod picker;
pub mod scoring;
pub mod waveform;

pub use executor::{
    Executor, ExecutorError, InlineExecutor, TaskExecutor, TaskHandle, ThreadPoolExecutor,
};
pub use picker::{pick_channel, run, run_with, ChannelPicker, Pick, PickerConfig, PickerError};
pub use scoring::{score, Event, MatchConfig, MatchRecord, MatchStatus, ScoreReport, ScoringError};
pub use waveform::{ingest_wav, ChannelId, ChannelTrace, WaveformError};
