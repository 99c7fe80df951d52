// Time-windowed pitch-class histogram built from sampled masks

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::theory::PitchClassSet;

/// Upper bound for the histogram window
pub const MAX_WINDOW_SECS: u32 = 120;

/// One sampled mask and the time it stands for
#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    mask: PitchClassSet,
    weight_secs: f64,
}

/// Rolling buffer of sampled masks
///
/// Each sample credits the time since the previous sample to every class
/// active in it. Samples older than the window are dropped.
#[derive(Debug, Clone)]
pub struct RollingHistogram {
    samples: VecDeque<Sample>,
    window: Duration,
    last_sample: Option<Instant>,
}

impl RollingHistogram {
    pub fn new(window_secs: u32) -> Self {
        Self {
            samples: VecDeque::new(),
            window: Duration::from_secs(window_secs.clamp(1, MAX_WINDOW_SECS) as u64),
            last_sample: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record `mask` as sampled at `now`.
    pub fn record(&mut self, mask: PitchClassSet, now: Instant) {
        let weight_secs = self
            .last_sample
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_sample = Some(now);

        if !mask.is_empty() && weight_secs > 0.0 {
            self.samples.push_back(Sample {
                at: now,
                mask,
                weight_secs,
            });
        }
        self.trim(now);
    }

    fn trim(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };
        while let Some(front) = self.samples.front() {
            if front.at < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Seconds each pitch class was active within the window
    pub fn histogram(&self) -> [f64; 12] {
        let mut bins = [0.0; 12];
        for sample in &self.samples {
            for pc in sample.mask.iter() {
                bins[pc.index()] += sample.weight_secs;
            }
        }
        bins
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_sample = None;
    }
}
