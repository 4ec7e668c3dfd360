use serde::Deserialize;
use std::collections::VecDeque;

pub const DEFAULT_SPREAD_WINDOW: usize = 50;

/// Which samples the rolling statistics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookbackMode {
    /// The `W-1` samples preceding the two newest; the mean divides by `W`.
    /// Requires `W+1` samples before it is ready.
    #[default]
    Legacy,
    /// The `W` newest samples, the newest included.
    Trailing,
}

impl std::str::FromStr for LookbackMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(LookbackMode::Legacy),
            "trailing" => Ok(LookbackMode::Trailing),
            other => Err(format!("unknown lookback mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadStats {
    pub mean: f64,
    pub stddev: f64,
}

/// Ring of the most recent ETF/FUTURE ratio samples.
#[derive(Debug)]
pub struct RollingSpreadWindow {
    window: usize,
    mode: LookbackMode,
    samples: VecDeque<f64>,
    appended: u64,
}

impl RollingSpreadWindow {
    pub fn new(window: usize, mode: LookbackMode) -> Self {
        let window = window.max(2);
        let capacity = Self::retained_for(window, mode);
        Self {
            window,
            mode,
            samples: VecDeque::with_capacity(capacity),
            appended: 0,
        }
    }

    fn retained_for(window: usize, mode: LookbackMode) -> usize {
        match mode {
            LookbackMode::Legacy => window + 1,
            LookbackMode::Trailing => window,
        }
    }

    pub fn append(&mut self, ratio: f64) {
        if self.samples.len() >= Self::retained_for(self.window, self.mode) {
            self.samples.pop_front();
        }
        self.samples.push_back(ratio);
        self.appended += 1;
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn mode(&self) -> LookbackMode {
        self.mode
    }

    pub fn samples_seen(&self) -> u64 {
        self.appended
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn is_ready(&self) -> bool {
        self.samples.len() == Self::retained_for(self.window, self.mode)
    }

    /// Samples participating in the statistics, oldest first.
    fn lookback(&self) -> Option<impl Iterator<Item = f64> + '_> {
        if !self.is_ready() {
            return None;
        }
        let take = match self.mode {
            LookbackMode::Legacy => self.window - 1,
            LookbackMode::Trailing => self.window,
        };
        Some(self.samples.iter().take(take).copied())
    }

    pub fn mean(&self) -> Option<f64> {
        let total: f64 = self.lookback()?.sum();
        Some(total / self.window as f64)
    }

    pub fn stddev(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some(self.stddev_around(mean))
    }

    fn stddev_around(&self, mean: f64) -> f64 {
        let total: f64 = self
            .lookback()
            .map(|iter| {
                iter.map(|v| {
                    let d = v - mean;
                    d * d
                })
                .sum::<f64>()
            })
            .unwrap_or(0.0);
        (total / (self.window - 1) as f64).sqrt()
    }

    pub fn stats(&self) -> Option<SpreadStats> {
        let mean = self.mean()?;
        Some(SpreadStats {
            mean,
            stddev: self.stddev_around(mean),
        })
    }
}
