//! Dynamic wavelet pitch detection
//!
//! # Algorithm
//!
//! The frame is scanned for prominent extrema following zero crossings;
//! the histogram of distances between nearby minima peaks at the
//! waveform period. The frame is then approximated at half resolution
//! by averaging sample pairs, a Haar-style wavelet step, and the search
//! repeated. When two consecutive levels agree on the mode distance the
//! period is confirmed; otherwise the detector gives up after six
//! levels. Runs entirely in the time domain with no transform.
//!
//! # Reference
//!
//! Larson and Maddox, "Real-time time-domain pitch tracking using
//! wavelets", 2005, as realised in Antoine Schmitt's dywapitchtrack
//! library.

use crate::error::AnalysisError;
use crate::pitch::{PitchDetector, PitchResult};

const MAX_LEVELS: u32 = 6;
const MAX_FREQUENCY: f64 = 3000.0;
const DIFFERENCE_LEVELS: usize = 3;
const MAXIMA_THRESHOLD_RATIO: f64 = 0.75;

/// Pitch detector based on distances between extrema across wavelet
/// approximation levels.
///
/// The scheme has no graded confidence measure; an estimate is only
/// produced once two approximation levels agree on the period, so
/// confirmed results carry confidence `1.0`.
pub struct WaveletDetector {
    sample_rate: f32,
    work: Vec<f32>,
    distances: Vec<u32>,
    mins: Vec<usize>,
}

impl WaveletDetector {
    /// Create a detector for `buffer_size`-sample frames at `sample_rate`
    /// Hz.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a non-positive sample
    /// rate or a buffer of fewer than 2 samples.
    pub fn new(sample_rate: f32, buffer_size: usize) -> Result<Self, AnalysisError> {
        if sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if buffer_size < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "buffer must hold at least 2 samples, got {}",
                buffer_size
            )));
        }
        Ok(Self {
            sample_rate,
            work: vec![0.0; buffer_size],
            distances: vec![0; buffer_size],
            mins: vec![0; buffer_size],
        })
    }

    // Prominent extrema of `work[..len]` after zero crossings, spaced at
    // least `delta` apart. Minima are recorded into `mins`; maxima are
    // only counted, the histogram uses minima alone.
    fn find_extrema(
        &mut self,
        len: usize,
        dc: f64,
        amplitude_threshold: f64,
        delta: i64,
    ) -> (usize, usize) {
        let mut nb_mins = 0;
        let mut nb_maxs = 0;
        let mut last_min = i64::MIN / 2;
        let mut last_max = i64::MIN / 2;
        let mut find_min = false;
        let mut find_max = false;
        let mut previous_dv = 0.0f64;
        let mut have_dv = false;

        for i in 2..len {
            let si = self.work[i] as f64 - dc;
            let si1 = self.work[i - 1] as f64 - dc;
            if si1 <= 0.0 && si > 0.0 {
                find_max = true;
            }
            if si1 >= 0.0 && si < 0.0 {
                find_min = true;
            }
            let dv = si - si1;
            if have_dv {
                if find_min
                    && previous_dv < 0.0
                    && dv >= 0.0
                    && si.abs() >= amplitude_threshold
                    && i as i64 > last_min + delta
                {
                    self.mins[nb_mins] = i;
                    nb_mins += 1;
                    last_min = i as i64;
                    find_min = false;
                }
                if find_max
                    && previous_dv > 0.0
                    && dv <= 0.0
                    && si.abs() >= amplitude_threshold
                    && i as i64 > last_max + delta
                {
                    nb_maxs += 1;
                    last_max = i as i64;
                    find_max = false;
                }
            }
            previous_dv = dv;
            have_dv = true;
        }
        (nb_mins, nb_maxs)
    }
}

impl PitchDetector for WaveletDetector {
    fn detect(&mut self, samples: &[f32]) -> PitchResult {
        if samples.len() < 2 {
            return PitchResult::unpitched();
        }
        // A frame larger than the configured size grows the work buffers.
        if self.work.len() < samples.len() {
            self.work.resize(samples.len(), 0.0);
            self.distances.resize(samples.len(), 0);
            self.mins.resize(samples.len(), 0);
        }
        self.work[..samples.len()].copy_from_slice(samples);

        // DC offset and peak amplitude of the whole frame; the extremum
        // threshold stays fixed across approximation levels.
        let mut dc = 0.0f64;
        let mut max_value = 0.0f64;
        let mut min_value = 0.0f64;
        for &s in samples {
            let s = s as f64;
            dc += s;
            max_value = max_value.max(s);
            min_value = min_value.min(s);
        }
        dc /= samples.len() as f64;
        let amplitude_max = (max_value - dc).max(dc - min_value);
        let amplitude_threshold = amplitude_max * MAXIMA_THRESHOLD_RATIO;

        let mut cur_len = samples.len();
        let mut level: u32 = 0;
        let mut mode_distance = -1.0f64;

        loop {
            // Minimum spacing between extrema for the highest trackable
            // frequency at this level's sample spacing.
            let delta =
                (self.sample_rate as f64 / (f64::powi(2.0, level as i32) * MAX_FREQUENCY)) as i64;
            if cur_len < 2 {
                break;
            }

            let (nb_mins, nb_maxs) = self.find_extrema(cur_len, dc, amplitude_threshold, delta);
            if nb_mins == 0 && nb_maxs == 0 {
                break;
            }

            // Histogram of distances between each minimum and its next
            // few successors.
            self.distances.fill(0);
            for i in 0..nb_mins {
                for j in 1..DIFFERENCE_LEVELS {
                    if i + j < nb_mins {
                        let d = self.mins[i + j] - self.mins[i];
                        self.distances[d] += 1;
                    }
                }
            }

            // Mode of the histogram summed over a `delta`-wide window;
            // a tie at exactly double the running best promotes the
            // longer distance.
            let mut best_distance: i64 = -1;
            let mut best_value: i64 = -1;
            for i in 0..cur_len as i64 {
                let mut summed = 0i64;
                for j in -delta..=delta {
                    let k = i + j;
                    if k >= 0 && k < cur_len as i64 {
                        summed += i64::from(self.distances[k as usize]);
                    }
                }
                if summed == best_value {
                    if i == 2 * best_distance {
                        best_distance = i;
                    }
                } else if summed > best_value {
                    best_value = summed;
                    best_distance = i;
                }
            }

            // Weighted average of the histogram around the mode.
            let mut dist_avg = 0.0f64;
            let mut nb_dists = 0.0f64;
            for j in -delta..=delta {
                let k = best_distance + j;
                if k >= 0 && (k as usize) < self.distances.len() {
                    let n = f64::from(self.distances[k as usize]);
                    if n > 0.0 {
                        nb_dists += n;
                        dist_avg += k as f64 * n;
                    }
                }
            }
            if nb_dists == 0.0 {
                break;
            }
            dist_avg /= nb_dists;

            // Two consecutive levels agreeing on the mode distance
            // confirm the period, measured at the previous level's
            // sample spacing.
            if mode_distance > -1.0 {
                let similarity = (dist_avg * 2.0 - mode_distance).abs();
                if similarity <= 2.0 * delta as f64 {
                    let frequency = self.sample_rate as f64
                        / (f64::powi(2.0, level as i32 - 1) * mode_distance);
                    return PitchResult {
                        frequency_hz: frequency as f32,
                        confidence: 1.0,
                        pitched: true,
                    };
                }
            }
            mode_distance = dist_avg;

            level += 1;
            if level >= MAX_LEVELS {
                break;
            }

            // Haar approximation step: halve the working buffer in place.
            for i in 0..cur_len / 2 {
                self.work[i] = (self.work[2 * i] + self.work[2 * i + 1]) / 2.0;
            }
            cur_len /= 2;
        }
        PitchResult::unpitched()
    }
}
