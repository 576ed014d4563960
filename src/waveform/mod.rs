// Waveform module
// Channel traces handed to the picker and the WAV ingestion adapter

pub mod ingest;
pub mod trace;

pub use ingest::{ingest_wav, WaveformError};
pub use trace::{offset_duration, ChannelId, ChannelTrace};
