//! Backtest output records.

use crate::domain::state::LastMove;
use chrono::NaiveDateTime;

/// Statistics for one closed calendar quarter.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterSummary {
    pub quarter: u32,
    pub return_rate: f64,
    pub trades: usize,
    /// `None` when the quarter had no scored trades.
    pub hit_rate: Option<f64>,
    pub baseline_return_rate: f64,
}

/// One executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub timestamp: NaiveDateTime,
    pub kind: LastMove,
    pub price: f64,
    pub fee: f64,
}

/// Step-by-step portfolio values, recorded only on request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceTrace {
    pub timestamps: Vec<NaiveDateTime>,
    pub strategy: Vec<f64>,
    pub baseline: Vec<f64>,
    /// Filled only when moving averages were requested.
    pub moving_average: Vec<f64>,
}

impl BalanceTrace {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub final_return_rate: f64,
    /// Hit rate of the final, still-open quarter.
    pub hit_rate: Option<f64>,
    pub baseline_return_rate: f64,
    pub quarters: Vec<QuarterSummary>,
    pub quarters_beating_baseline: Option<f64>,
    pub strategy_quarterly_stdev: Option<f64>,
    pub baseline_quarterly_stdev: Option<f64>,
    /// Trades placed in the final, still-open quarter.
    pub final_quarter_trades: usize,
    pub total_trades: usize,
    pub steps: usize,
    pub trade_log: Vec<TradeEvent>,
    pub balance: Option<BalanceTrace>,
}

impl BacktestResult {
    pub fn quarter_return_rates(&self) -> Vec<f64> {
        self.quarters.iter().map(|q| q.return_rate).collect()
    }

    pub fn quarter_trades(&self) -> Vec<usize> {
        self.quarters.iter().map(|q| q.trades).collect()
    }

    pub fn quarter_hit_rates(&self) -> Vec<Option<f64>> {
        self.quarters.iter().map(|q| q.hit_rate).collect()
    }

    pub fn baseline_return_rates(&self) -> Vec<f64> {
        self.quarters
            .iter()
            .map(|q| q.baseline_return_rate)
            .collect()
    }

    pub fn count_moves(&self, kind: LastMove) -> usize {
        self.trade_log.iter().filter(|t| t.kind == kind).count()
    }
}

/// Render an optional rate as a percentage, or `N/A`.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "N/A".to_string(),
    }
}
