use std::error::Error;
use std::fmt;

use crate::spread_window::SpreadStats;

pub const DEFAULT_SHORT_ENTRY_Z: f64 = 1.5;
pub const DEFAULT_LONG_ENTRY_Z: f64 = 0.95;
const MIN_STDDEV: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// ETF rich against FUTURE: sell ETF, hedge by buying FUTURE.
    ShortEtf,
    /// FUTURE rich against ETF: buy ETF, hedge by selling FUTURE.
    LongEtf,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalError {
    DegenerateWindow { stddev: f64 },
    NonFiniteRatio(f64),
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalError::DegenerateWindow { stddev } => {
                write!(f, "degenerate spread window (stddev={})", stddev)
            }
            SignalError::NonFiniteRatio(ratio) => write!(f, "non-finite spread ratio {}", ratio),
        }
    }
}

impl Error for SignalError {}

#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    short_entry_z: f64,
    long_entry_z: f64,
}

impl Default for SignalEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_ENTRY_Z, DEFAULT_LONG_ENTRY_Z)
    }
}

impl SignalEvaluator {
    pub fn new(short_entry_z: f64, long_entry_z: f64) -> Self {
        Self {
            short_entry_z,
            long_entry_z,
        }
    }

    pub fn z_score(&self, ratio: f64, stats: &SpreadStats) -> Result<f64, SignalError> {
        if !ratio.is_finite() {
            return Err(SignalError::NonFiniteRatio(ratio));
        }
        if !stats.stddev.is_finite() || stats.stddev < MIN_STDDEV {
            return Err(SignalError::DegenerateWindow {
                stddev: stats.stddev,
            });
        }
        Ok((ratio - stats.mean) / stats.stddev)
    }

    /// The two thresholds are independent; they need not straddle zero.
    pub fn classify(&self, z: f64) -> Signal {
        if z > self.short_entry_z {
            Signal::ShortEtf
        } else if z < self.long_entry_z {
            Signal::LongEtf
        } else {
            Signal::None
        }
    }

    pub fn evaluate(&self, ratio: f64, stats: &SpreadStats) -> Result<(f64, Signal), SignalError> {
        let z = self.z_score(ratio, stats)?;
        Ok((z, self.classify(z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64, stddev: f64) -> SpreadStats {
        SpreadStats { mean, stddev }
    }

    #[test]
    fn z_score_normalizes_distance_from_mean() {
        let eval = SignalEvaluator::default();
        let z = eval.z_score(1.04, &stats(1.0, 0.02)).unwrap();
        assert!((z - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_stddev_is_rejected() {
        let eval = SignalEvaluator::default();
        let err = eval.z_score(1.1, &stats(1.02, 0.0)).unwrap_err();
        assert!(matches!(err, SignalError::DegenerateWindow { .. }));
        assert!(eval.evaluate(1.1, &stats(1.02, f64::NAN)).is_err());
    }

    #[test]
    fn thresholds_are_asymmetric() {
        let eval = SignalEvaluator::default();
        assert_eq!(eval.classify(1.51), Signal::ShortEtf);
        assert_eq!(eval.classify(1.5), Signal::None);
        assert_eq!(eval.classify(1.0), Signal::None);
        assert_eq!(eval.classify(0.95), Signal::None);
        assert_eq!(eval.classify(0.94), Signal::LongEtf);
        assert_eq!(eval.classify(-3.0), Signal::LongEtf);
    }

    #[test]
    fn custom_thresholds_apply() {
        let eval = SignalEvaluator::new(2.0, -2.0);
        assert_eq!(eval.classify(1.9), Signal::None);
        assert_eq!(eval.classify(-1.9), Signal::None);
        assert_eq!(eval.classify(-2.1), Signal::LongEtf);
    }
}
