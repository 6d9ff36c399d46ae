//! Volume-tiered exchange fees.
//!
//! The default schedule averages maker and taker rates of a retail crypto
//! exchange. Each tier's volume is an inclusive upper bound on the rolling
//! thirty-day traded volume; volumes above the last bound use its rate.

use crate::domain::error::MeanrevError;

/// Source of the per-trade fee rate for a given thirty-day volume.
pub trait FeeModel {
    fn rate(&self, thirty_day_volume: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeTier {
    pub max_volume: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    tiers: Vec<FeeTier>,
}

const DEFAULT_TIERS: [(f64, f64); 8] = [
    (10_000.0, 0.005),
    (50_000.0, 0.00325),
    (100_000.0, 0.002),
    (1_000_000.0, 0.0015),
    (15_000_000.0, 0.0013),
    (75_000_000.0, 0.0011),
    (250_000_000.0, 0.00075),
    (400_000_000.0, 0.0004),
];

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            tiers: DEFAULT_TIERS
                .iter()
                .map(|&(max_volume, rate)| FeeTier { max_volume, rate })
                .collect(),
        }
    }
}

impl FeeSchedule {
    /// Build a schedule from tiers given in ascending volume order.
    ///
    /// Volumes must be strictly ascending and rates must lie in `[0, 1)`.
    pub fn new(tiers: Vec<FeeTier>) -> Result<Self, MeanrevError> {
        if tiers.is_empty() {
            return Err(MeanrevError::InvalidParameter {
                name: "fee tiers".into(),
                reason: "at least one tier is required".into(),
            });
        }
        for tier in &tiers {
            if !(0.0..1.0).contains(&tier.rate) {
                return Err(MeanrevError::InvalidParameter {
                    name: "fee tiers".into(),
                    reason: format!("rate {} must be between 0 and 1", tier.rate),
                });
            }
        }
        if tiers.windows(2).any(|w| w[1].max_volume <= w[0].max_volume) {
            return Err(MeanrevError::InvalidParameter {
                name: "fee tiers".into(),
                reason: "volumes must be strictly ascending".into(),
            });
        }
        Ok(FeeSchedule { tiers })
    }

    /// Parse `volume:rate` pairs separated by commas, e.g. `10000:0.005, 50000:0.00325`.
    pub fn parse(input: &str) -> Result<Self, MeanrevError> {
        let mut tiers = Vec::new();
        for token in input.split(',') {
            let token = token.trim();
            let (volume, rate) =
                token
                    .split_once(':')
                    .ok_or_else(|| MeanrevError::InvalidParameter {
                        name: "fee tiers".into(),
                        reason: format!("expected volume:rate, got '{}'", token),
                    })?;
            let max_volume: f64 =
                volume
                    .trim()
                    .parse()
                    .map_err(|_| MeanrevError::InvalidParameter {
                        name: "fee tiers".into(),
                        reason: format!("invalid volume '{}'", volume.trim()),
                    })?;
            let rate: f64 = rate
                .trim()
                .parse()
                .map_err(|_| MeanrevError::InvalidParameter {
                    name: "fee tiers".into(),
                    reason: format!("invalid rate '{}'", rate.trim()),
                })?;
            tiers.push(FeeTier { max_volume, rate });
        }
        Self::new(tiers)
    }

    pub fn tiers(&self) -> &[FeeTier] {
        &self.tiers
    }
}

impl FeeModel for FeeSchedule {
    fn rate(&self, thirty_day_volume: f64) -> f64 {
        self.tiers
            .iter()
            .find(|tier| thirty_day_volume <= tier.max_volume)
            .or_else(|| self.tiers.last())
            .map(|tier| tier.rate)
            .unwrap_or(0.0)
    }
}
