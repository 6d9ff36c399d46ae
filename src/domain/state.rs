//! Mutable per-run simulation state.

use crate::domain::volume_window::VolumeWindow;
use serde::Serialize;
use std::fmt;

/// The most recent decision of the entry/exit state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LastMove {
    Pass,
    Buy,
    Sell,
    #[serde(rename = "Short-Sell")]
    ShortSell,
}

impl fmt::Display for LastMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastMove::Pass => write!(f, "Pass"),
            LastMove::Buy => write!(f, "Buy"),
            LastMove::Sell => write!(f, "Sell"),
            LastMove::ShortSell => write!(f, "Short-Sell"),
        }
    }
}

/// Whether the held position is a short.
///
/// `Unset` until the first buy of a run with shorting enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortState {
    Unset,
    Flat,
    Short,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub fiat: f64,
    pub position_size: f64,
    pub short_position: ShortState,
    pub purchase_price: f64,
    pub last_move: LastMove,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub volume: VolumeWindow,
    pub quarter_initial_balance: f64,
    pub quarter_baseline_initial_balance: f64,
    pub annual_baseline_balance: f64,
    pub past_year: i32,
    pub past_quarter: u32,
}

impl SimulationState {
    pub fn new(starting_capital: f64, first_year: i32, first_quarter: u32) -> Self {
        SimulationState {
            fiat: starting_capital,
            position_size: 0.0,
            short_position: ShortState::Unset,
            purchase_price: 0.0,
            last_move: LastMove::Pass,
            trades: 0,
            wins: 0,
            losses: 0,
            volume: VolumeWindow::new(),
            quarter_initial_balance: starting_capital,
            quarter_baseline_initial_balance: starting_capital,
            annual_baseline_balance: starting_capital,
            past_year: first_year,
            past_quarter: first_quarter,
        }
    }

    pub fn is_short(&self) -> bool {
        self.short_position == ShortState::Short
    }

    /// Unrealised gain on the open short at `price`.
    pub fn short_delta(&self, price: f64) -> f64 {
        self.purchase_price * self.position_size - price * self.position_size
    }

    /// `fiat + price * position_size`, ignoring the short side.
    pub fn plain_value(&self, price: f64) -> f64 {
        self.fiat + price * self.position_size
    }

    /// Portfolio value with an open short valued at its entry notional plus delta.
    pub fn mark_to_market(&self, price: f64) -> f64 {
        if self.is_short() {
            self.purchase_price * self.position_size + self.short_delta(price) + self.fiat
        } else {
            price * self.position_size + self.fiat
        }
    }

    pub fn hit_rate(&self) -> Option<f64> {
        hit_rate(self.wins, self.losses)
    }

    pub fn reset_quarter_counters(&mut self) {
        self.trades = 0;
        self.wins = 0;
        self.losses = 0;
    }
}

/// `wins / (wins + losses)`, or `None` when no trade was scored.
pub fn hit_rate(wins: usize, losses: usize) -> Option<f64> {
    let scored = wins + losses;
    if scored > 0 {
        Some(wins as f64 / scored as f64)
    } else {
        None
    }
}
