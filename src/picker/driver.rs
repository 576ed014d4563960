// Channel picking driver
// Runs the band/kurtosis/trigger/SNR chain per channel and fans it out over an executor

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::{Executor, TaskExecutor};
use crate::picker::config::PickerConfig;
use crate::picker::filter::{decompose, Band};
use crate::picker::kurtosis::band_kurtosis;
use crate::picker::snr::{passes, snr_at};
use crate::picker::summary::{aggregate, CharacteristicFunction};
use crate::picker::trigger::{refine_onset, trigger_candidates};
use crate::picker::types::{Pick, PickerError};
use crate::waveform::ChannelTrace;

/// Intermediate traces of one channel, for inspection and plotting
#[derive(Debug, Clone, Serialize)]
pub struct PickerDiagnostics {
    pub bands: Vec<Band>,

    /// Kurtosis CF of each band, aligned with the trace
    pub band_cf: Vec<Vec<f64>>,

    pub cf: CharacteristicFunction,

    /// Sample indices that passed both trigger conditions
    pub candidates: Vec<usize>,

    /// Refined onset sample of the first candidate
    pub onset: Option<usize>,
}

/// What happened on one channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome {
    /// Nothing crossed the threshold
    NoTrigger,

    /// An onset was found but failed the SNR gate
    Rejected { onset: DateTime<Utc>, snr: f64 },

    Accepted(Pick),
}

impl ChannelOutcome {
    pub fn into_pick(self) -> Option<Pick> {
        match self {
            ChannelOutcome::Accepted(pick) => Some(pick),
            _ => None,
        }
    }
}

/// Filter-bank kurtosis picker for single channels
#[derive(Debug, Clone)]
pub struct ChannelPicker {
    config: PickerConfig,
}

impl ChannelPicker {
    pub fn new(config: PickerConfig) -> Result<Self, PickerError> {
        config.validate()?;
        Ok(ChannelPicker { config })
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Run everything up to onset refinement
    pub fn characteristic_function(
        &self,
        trace: &ChannelTrace,
    ) -> Result<PickerDiagnostics, PickerError> {
        if trace.is_empty() {
            return Err(PickerError::EmptyTrace);
        }

        let delta = trace.delta();
        let len = trace.len();

        let window = self.config.kurtosis_window(delta);
        if len < window {
            return Err(PickerError::InsufficientSamples {
                needed: window,
                available: len,
            });
        }

        let npts_tma = self.config.moving_average_samples(delta);
        if npts_tma == 0 {
            return Err(PickerError::InvalidConfig(format!(
                "t_ma of {} s is shorter than one sample at {} Hz",
                self.config.t_ma, trace.sampling_rate
            )));
        }
        if npts_tma >= len {
            return Err(PickerError::InsufficientSamples {
                needed: npts_tma.saturating_add(1),
                available: len,
            });
        }

        let band_signals = decompose(
            trace,
            self.config.freqmin,
            self.config.corners,
            self.config.taper_percent,
        )?;
        let band_cf = band_kurtosis(&band_signals, window);
        let cf = aggregate(&band_cf, npts_tma, self.config.nsigma);

        let guard = self.config.guard_samples(delta);
        let candidates = trigger_candidates(&cf.summary, &cf.threshold, guard);
        let onset = candidates.first().and_then(|&t0| {
            refine_onset(&cf.summary, t0, self.config.ncum0, self.config.ncum1)
        });

        Ok(PickerDiagnostics {
            bands: band_signals.into_iter().map(|b| b.band).collect(),
            band_cf,
            cf,
            candidates,
            onset,
        })
    }

    /// Pick one channel
    pub fn pick(&self, trace: &ChannelTrace) -> Result<ChannelOutcome, PickerError> {
        let diagnostics = self.characteristic_function(trace)?;

        let onset = match diagnostics.onset {
            Some(onset) => onset,
            None => {
                log::debug!("{}: no trigger", trace.id);
                return Ok(ChannelOutcome::NoTrigger);
            }
        };

        let snr = snr_at(&trace.samples, trace.sampling_rate, onset);
        let time = trace.time_at(onset);

        if passes(snr) {
            log::debug!("{}: pick at {} (SNR {:.2})", trace.id, time.to_rfc3339(), snr);
            Ok(ChannelOutcome::Accepted(Pick::automatic(
                trace.id.clone(),
                time,
                snr,
            )))
        } else {
            log::debug!(
                "{}: onset at {} rejected (SNR {:.2})",
                trace.id,
                time.to_rfc3339(),
                snr
            );
            Ok(ChannelOutcome::Rejected { onset: time, snr })
        }
    }
}

/// Pick a single channel with a one-off picker
pub fn pick_channel(
    trace: &ChannelTrace,
    config: &PickerConfig,
) -> Result<Option<Pick>, PickerError> {
    let picker = ChannelPicker::new(config.clone())?;
    Ok(picker.pick(trace)?.into_pick())
}

/// Pick every channel, serially or on a worker pool depending on
/// `config.parallel_jobs`
///
/// Picks come back in channel order; channels without a pick are left out.
pub fn run(channels: Vec<ChannelTrace>, config: &PickerConfig) -> Result<Vec<Pick>, PickerError> {
    config.validate()?;
    let executor = Executor::for_jobs(config.parallel_jobs)?;
    run_with(channels, config, &executor)
}

/// Pick every channel on the given executor
///
/// A channel that fails is logged and skipped; only an invalid
/// configuration fails the whole batch.
pub fn run_with<E: TaskExecutor>(
    channels: Vec<ChannelTrace>,
    config: &PickerConfig,
    executor: &E,
) -> Result<Vec<Pick>, PickerError> {
    let picker = ChannelPicker::new(config.clone())?;
    let total = channels.len();

    let handles: Vec<_> = channels
        .into_iter()
        .map(|trace| {
            let picker = picker.clone();
            let id = trace.id.clone();
            let handle = executor.submit(move || picker.pick(&trace));
            (id, handle)
        })
        .collect();

    let mut picks = Vec::new();
    let mut failed = 0;
    for (id, handle) in handles {
        match handle.join() {
            Ok(Ok(outcome)) => picks.extend(outcome.into_pick()),
            Ok(Err(e)) => {
                failed += 1;
                log::warn!("{}: picking failed: {}", id, e);
            }
            Err(e) => {
                failed += 1;
                log::warn!("{}: picking task failed: {}", id, e);
            }
        }
    }

    log::info!(
        "Picked {} of {} channels ({} failed)",
        picks.len(),
        total,
        failed
    );

    Ok(picks)
}
