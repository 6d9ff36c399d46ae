//! CSV report adapter.
//!
//! Writes one file per table into an output directory so an external
//! charting tool can draw the quarterly bar charts and balance curves:
//! - `summary.csv`: headline metrics as `metric,value` rows
//! - `quarters.csv`: per-quarter return, trades, hit rate and baseline return
//! - `trades.csv`: every executed order
//! - `balance.csv`: strategy and baseline value per step (when recorded)
//! - `sweep.csv`: one row per parameter set of a sweep

use crate::domain::error::MeanrevError;
use crate::domain::result::{BacktestResult, QuarterSummary};
use crate::domain::state::LastMove;
use crate::domain::sweep::SweepOutcome;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvReportAdapter {
    directory: PathBuf,
}

#[derive(Serialize)]
struct SummaryRow {
    metric: &'static str,
    value: String,
}

#[derive(Serialize)]
struct QuarterRow {
    quarter: u32,
    return_rate: f64,
    trades: usize,
    hit_rate: String,
    baseline_return_rate: f64,
}

impl From<&QuarterSummary> for QuarterRow {
    fn from(q: &QuarterSummary) -> Self {
        QuarterRow {
            quarter: q.quarter,
            return_rate: q.return_rate,
            trades: q.trades,
            hit_rate: optional(q.hit_rate),
            baseline_return_rate: q.baseline_return_rate,
        }
    }
}

#[derive(Serialize)]
struct TradeRow {
    timestamp: String,
    kind: LastMove,
    price: f64,
    fee: f64,
}

#[derive(Serialize)]
struct BalanceRow {
    timestamp: String,
    strategy: f64,
    baseline: f64,
    moving_average: Option<f64>,
}

#[derive(Serialize)]
struct SweepRow {
    ma_length: usize,
    buy_threshold: f64,
    take_profit: f64,
    stop_loss: f64,
    order_sizing: f64,
    final_return_rate: f64,
    baseline_return_rate: f64,
    total_trades: usize,
    quarters_beating_baseline: String,
    strategy_quarterly_stdev: String,
}

impl From<&SweepOutcome> for SweepRow {
    fn from(o: &SweepOutcome) -> Self {
        SweepRow {
            ma_length: o.ma_length,
            buy_threshold: o.buy_threshold,
            take_profit: o.take_profit,
            stop_loss: o.stop_loss,
            order_sizing: o.order_sizing,
            final_return_rate: o.final_return_rate,
            baseline_return_rate: o.baseline_return_rate,
            total_trades: o.total_trades,
            quarters_beating_baseline: optional(o.quarters_beating_baseline),
            strategy_quarterly_stdev: optional(o.strategy_quarterly_stdev),
        }
    }
}

/// Undefined metrics are written as `N/A` in every table.
fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

impl CsvReportAdapter {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_rows<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), MeanrevError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(name);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| MeanrevError::Report {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        for row in rows {
            writer.serialize(row).map_err(|e| MeanrevError::Report {
                reason: format!("failed to write {}: {}", path.display(), e),
            })?;
        }
        writer.flush()?;
        info!(path = %path.display(), rows = rows.len(), "report table written");
        Ok(())
    }
}

fn summary_rows(result: &BacktestResult) -> Vec<SummaryRow> {
    vec![
        SummaryRow {
            metric: "final_return_rate",
            value: result.final_return_rate.to_string(),
        },
        SummaryRow {
            metric: "baseline_return_rate",
            value: result.baseline_return_rate.to_string(),
        },
        SummaryRow {
            metric: "hit_rate",
            value: optional(result.hit_rate),
        },
        SummaryRow {
            metric: "quarters_beating_baseline",
            value: optional(result.quarters_beating_baseline),
        },
        SummaryRow {
            metric: "strategy_quarterly_stdev",
            value: optional(result.strategy_quarterly_stdev),
        },
        SummaryRow {
            metric: "baseline_quarterly_stdev",
            value: optional(result.baseline_quarterly_stdev),
        },
        SummaryRow {
            metric: "total_trades",
            value: result.total_trades.to_string(),
        },
        SummaryRow {
            metric: "final_quarter_trades",
            value: result.final_quarter_trades.to_string(),
        },
        SummaryRow {
            metric: "steps",
            value: result.steps.to_string(),
        },
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult) -> Result<(), MeanrevError> {
        self.write_rows("summary.csv", &summary_rows(result))?;
        let quarters: Vec<QuarterRow> = result.quarters.iter().map(QuarterRow::from).collect();
        self.write_rows("quarters.csv", &quarters)?;

        let trades: Vec<TradeRow> = result
            .trade_log
            .iter()
            .map(|t| TradeRow {
                timestamp: t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                kind: t.kind,
                price: t.price,
                fee: t.fee,
            })
            .collect();
        self.write_rows("trades.csv", &trades)?;

        if let Some(trace) = &result.balance {
            let rows: Vec<BalanceRow> = (0..trace.len())
                .map(|i| BalanceRow {
                    timestamp: trace.timestamps[i].format(TIMESTAMP_FORMAT).to_string(),
                    strategy: trace.strategy[i],
                    baseline: trace.baseline[i],
                    moving_average: trace.moving_average.get(i).copied(),
                })
                .collect();
            self.write_rows("balance.csv", &rows)?;
        }

        Ok(())
    }

    fn write_sweep(&self, outcomes: &[SweepOutcome]) -> Result<(), MeanrevError> {
        let rows: Vec<SweepRow> = outcomes.iter().map(SweepRow::from).collect();
        self.write_rows("sweep.csv", &rows)
    }
}
