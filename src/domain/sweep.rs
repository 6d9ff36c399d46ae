//! Parameter sweeps over independent backtest runs.
//!
//! Each parameter set runs in its own simulator on a rayon worker. Runs only
//! borrow the series and fee model immutably, so nothing mutable is shared.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::error::MeanrevError;
use crate::domain::fee::FeeSchedule;
use crate::domain::params::StrategyParams;
use crate::domain::price_point::PricePoint;
use crate::domain::simulator::run_backtest;

/// Candidate values per swept parameter. Empty lists keep the base value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    pub ma_length: Vec<usize>,
    pub buy_threshold: Vec<f64>,
    pub take_profit: Vec<f64>,
    pub stop_loss: Vec<f64>,
    pub order_sizing: Vec<f64>,
}

impl ParameterGrid {
    /// Cartesian product of the grid applied over `base`.
    pub fn expand(&self, base: &StrategyParams) -> Vec<StrategyParams> {
        let ma_lengths = or_base(&self.ma_length, base.ma_length);
        let buys = or_base(&self.buy_threshold, base.buy_threshold);
        let takes = or_base(&self.take_profit, base.take_profit);
        let stops = or_base(&self.stop_loss, base.stop_loss);
        let sizings = or_base(&self.order_sizing, base.order_sizing);

        let mut out = Vec::with_capacity(
            ma_lengths.len() * buys.len() * takes.len() * stops.len() * sizings.len(),
        );
        for &ma_length in &ma_lengths {
            for &buy_threshold in &buys {
                for &take_profit in &takes {
                    for &stop_loss in &stops {
                        for &order_sizing in &sizings {
                            out.push(StrategyParams {
                                ma_length,
                                buy_threshold,
                                take_profit,
                                stop_loss,
                                order_sizing,
                                record_balance: false,
                                display_results: false,
                                ..base.clone()
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

fn or_base<T: Copy>(values: &[T], base: T) -> Vec<T> {
    if values.is_empty() {
        vec![base]
    } else {
        values.to_vec()
    }
}

/// Headline numbers of one sweep run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub ma_length: usize,
    pub buy_threshold: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub order_sizing: f64,
    pub final_return_rate: f64,
    pub baseline_return_rate: f64,
    pub total_trades: usize,
    pub quarters_beating_baseline: Option<f64>,
    pub strategy_quarterly_stdev: Option<f64>,
}

/// Run every parameter set, skipping runs the simulator rejects (for
/// example a moving average longer than the series). Outcomes are sorted by
/// final return, best first.
pub fn run_sweep(
    series: &[PricePoint],
    grid: &[StrategyParams],
    fees: &FeeSchedule,
) -> Vec<SweepOutcome> {
    info!(runs = grid.len(), "starting parameter sweep");

    let mut outcomes: Vec<SweepOutcome> = grid
        .par_iter()
        .filter_map(|params| match run_backtest(series, params, fees) {
            Ok(result) => Some(SweepOutcome {
                ma_length: params.ma_length,
                buy_threshold: params.buy_threshold,
                take_profit: params.take_profit,
                stop_loss: params.stop_loss,
                order_sizing: params.order_sizing,
                final_return_rate: result.final_return_rate,
                baseline_return_rate: result.baseline_return_rate,
                total_trades: result.total_trades,
                quarters_beating_baseline: result.quarters_beating_baseline,
                strategy_quarterly_stdev: result.strategy_quarterly_stdev,
            }),
            Err(e) => {
                warn!(ma_length = params.ma_length, "sweep run skipped: {}", e);
                None
            }
        })
        .collect();

    outcomes.sort_by(|a, b| b.final_return_rate.total_cmp(&a.final_return_rate));
    outcomes
}

/// Run the sweep on a dedicated pool of `threads` workers.
pub fn run_sweep_with_threads(
    series: &[PricePoint],
    grid: &[StrategyParams],
    fees: &FeeSchedule,
    threads: usize,
) -> Result<Vec<SweepOutcome>, MeanrevError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| MeanrevError::InvalidParameter {
            name: "threads".into(),
            reason: e.to_string(),
        })?;
    Ok(pool.install(|| run_sweep(series, grid, fees)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + chrono::Duration::hours(i as i64), p, 1))
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 12.0 * ((i as f64) * 0.25).sin())
            .collect()
    }

    #[test]
    fn expand_empty_grid_yields_base() {
        let base = StrategyParams::default();
        let grid = ParameterGrid::default().expand(&base);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0].ma_length, base.ma_length);
    }

    #[test]
    fn expand_cartesian_product() {
        let grid = ParameterGrid {
            ma_length: vec![10, 20, 30],
            buy_threshold: vec![0.01, 0.02],
            stop_loss: vec![0.05, 0.1],
            ..ParameterGrid::default()
        };
        let base = StrategyParams {
            record_balance: true,
            ..StrategyParams::default()
        };
        let expanded = grid.expand(&base);
        assert_eq!(expanded.len(), 12);
        assert!(expanded.iter().all(|p| !p.record_balance));
        assert!(expanded.iter().all(|p| p.take_profit == base.take_profit));
    }

    #[test]
    fn sweep_matches_sequential_runs() {
        let data = series(&wave(200));
        let base = StrategyParams {
            fixed_fee: true,
            fee: 0.001,
            ..StrategyParams::default()
        };
        let grid = ParameterGrid {
            ma_length: vec![6, 12, 24],
            buy_threshold: vec![0.01, 0.03],
            ..ParameterGrid::default()
        }
        .expand(&base);
        let fees = FeeSchedule::default();

        let outcomes = run_sweep(&data, &grid, &fees);
        assert_eq!(outcomes.len(), 6);

        for outcome in &outcomes {
            let params = grid
                .iter()
                .find(|p| {
                    p.ma_length == outcome.ma_length && p.buy_threshold == outcome.buy_threshold
                })
                .unwrap();
            let direct = run_backtest(&data, params, &fees).unwrap();
            assert_eq!(
                direct.final_return_rate.to_bits(),
                outcome.final_return_rate.to_bits()
            );
        }
    }

    #[test]
    fn sweep_sorted_best_first() {
        let data = series(&wave(150));
        let grid = ParameterGrid {
            ma_length: vec![4, 8, 16],
            ..ParameterGrid::default()
        }
        .expand(&StrategyParams::default());
        let outcomes = run_sweep(&data, &grid, &FeeSchedule::default());
        assert!(outcomes
            .windows(2)
            .all(|w| w[0].final_return_rate >= w[1].final_return_rate));
    }

    #[test]
    fn sweep_skips_runs_longer_than_series() {
        let data = series(&wave(50));
        let grid = ParameterGrid {
            ma_length: vec![10, 100],
            ..ParameterGrid::default()
        }
        .expand(&StrategyParams::default());
        let outcomes = run_sweep(&data, &grid, &FeeSchedule::default());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].ma_length, 10);
    }

    #[test]
    fn sweep_on_dedicated_pool() {
        let data = series(&wave(80));
        let grid = ParameterGrid {
            ma_length: vec![5, 10],
            ..ParameterGrid::default()
        }
        .expand(&StrategyParams::default());
        let outcomes =
            run_sweep_with_threads(&data, &grid, &FeeSchedule::default(), 2).unwrap();
        assert_eq!(outcomes.len(), 2);
    }
}
