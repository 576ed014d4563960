// Onset picker module
// Filter-bank kurtosis P-wave picker: band decomposition, kurtosis CF,
// adaptive threshold, cumulative-sum refinement and SNR gate

pub mod config;
pub mod driver;
pub mod filter;
pub mod kurtosis;
pub mod snr;
pub mod summary;
pub mod trigger;
pub mod types;
mod window;

pub use config::PickerConfig;
pub use driver::{pick_channel, run, run_with, ChannelOutcome, ChannelPicker, PickerDiagnostics};
pub use filter::{band_count, band_layout, cosine_taper, decompose, Band, BandSignal, SosFilter};
pub use kurtosis::{band_kurtosis, kurtosis};
pub use snr::{snr_at, MIN_SNR};
pub use summary::{aggregate, CharacteristicFunction};
pub use trigger::{refine_onset, trigger_candidates};
pub use types::{EvaluationMode, Pick, PickerError, METHOD_ID, PHASE_HINT};
