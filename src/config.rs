//! Configuration parameters for onset detection and beat tracking

use serde::{Deserialize, Serialize};

/// Onset detector configuration, shared by all detection strategies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnsetConfig {
    /// Peak picking threshold (default: 0.3)
    /// Values between 0.1 and 0.8 are sensible; raise it if too many
    /// onsets are detected.
    pub peak_threshold: f32,

    /// Threshold that defines a silent frame, in dB SPL (default: -70.0)
    /// A detected peak in a frame below this level is suppressed.
    pub silence_threshold_db: f64,

    /// Minimum inter-onset interval in seconds (default: 0.03)
    /// An onset closer than this to the previously emitted onset is
    /// dropped; the earlier one is kept.
    pub min_inter_onset_interval: f64,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 0.3,
            silence_threshold_db: -70.0,
            min_inter_onset_interval: 0.03,
        }
    }
}

/// Tempo induction configuration
///
/// Inter-onset intervals (IOIs) within `[min_ioi, max_ioi]` are clustered;
/// the resulting tempo hypotheses are folded into `[min_ibi, max_ibi]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InductionConfig {
    /// Maximum difference between IOIs in the same cluster, in seconds (default: 0.025)
    pub cluster_width: f64,

    /// Minimum IOI considered for clustering, in seconds (default: 0.070)
    pub min_ioi: f64,

    /// Maximum IOI considered for clustering, in seconds (default: 2.5)
    pub max_ioi: f64,

    /// Minimum inter-beat interval, in seconds (default: 0.3, i.e. 200 BPM)
    pub min_ibi: f64,

    /// Maximum inter-beat interval, in seconds (default: 1.0, i.e. 60 BPM)
    pub max_ibi: f64,

    /// Maximum number of tempo hypotheses to return (default: 10)
    pub top_n: usize,
}

impl Default for InductionConfig {
    fn default() -> Self {
        Self {
            cluster_width: 0.025,
            min_ioi: 0.070,
            max_ioi: 2.5,
            min_ibi: 0.3,
            max_ibi: 1.0,
            top_n: 10,
        }
    }
}

/// Beat tracking agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum lateness of a beat relative to the prediction, as a
    /// fraction of the beat period (default: 0.3)
    pub post_margin_factor: f64,

    /// Maximum earliness of a beat relative to the prediction, as a
    /// fraction of the beat period (default: 0.15)
    pub pre_margin_factor: f64,

    /// Maximum deviation from the predicted beat time, in seconds, that
    /// does not fork a second agent (default: 0.040)
    pub inner_margin: f64,

    /// Maximum allowed deviation from the initial tempo, as a fraction of
    /// the initial beat period (default: 0.2)
    pub max_change: f64,

    /// Slope of the score penalty for onsets that do not coincide exactly
    /// with predicted beat times (default: 0.5)
    pub conf_factor: f64,

    /// Reactiveness/inertia balance: the beat period is corrected by the
    /// prediction error divided by this factor (default: 50.0)
    pub correction_factor: f64,

    /// Time in seconds after which an agent with no matching onset is
    /// discarded (default: 10.0)
    pub expiry_time: f64,

    /// Beat periods closer than this are considered duplicates, in
    /// seconds (default: 0.02)
    pub duplicate_interval: f64,

    /// Beat phases closer than this are considered duplicates, in
    /// seconds (default: 0.04)
    pub duplicate_phase: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            post_margin_factor: 0.3,
            pre_margin_factor: 0.15,
            inner_margin: 0.040,
            max_change: 0.2,
            conf_factor: 0.5,
            correction_factor: 50.0,
            expiry_time: 10.0,
            duplicate_interval: 0.02,
            duplicate_phase: 0.04,
        }
    }
}

/// Configuration for the offline onset-to-beat pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Analysis frame size in samples (default: 512)
    pub buffer_size: usize,

    /// Overlap between consecutive frames in samples (default: 256)
    pub overlap: usize,

    /// Onset detection parameters
    pub onset: OnsetConfig,

    /// Tempo induction parameters
    pub induction: InductionConfig,

    /// Beat tracking agent parameters
    pub agent: AgentConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 512,
            overlap: 256,
            onset: OnsetConfig::default(),
            induction: InductionConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}
