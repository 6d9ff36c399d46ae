//! Strategy parameters for one simulation run.

use crate::domain::error::MeanrevError;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Fraction of available fiat deployed per order, in `(0, 1]`.
    pub order_sizing: f64,
    /// Moving average window in steps (hours).
    pub ma_length: usize,
    pub starting_capital: f64,
    /// Buy when price is this fraction below the moving average.
    pub buy_threshold: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub shorting_allowed: bool,
    pub fixed_fee: bool,
    /// Per-trade fee rate, used only when `fixed_fee` is set.
    pub fee: f64,
    pub display_results: bool,
    pub record_balance: bool,
    pub show_moving_averages: bool,
    pub annual_taxes: bool,
    pub tax_percentage: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            order_sizing: 1.0,
            ma_length: 480,
            starting_capital: 1_000.0,
            buy_threshold: 0.05,
            take_profit: 0.05,
            stop_loss: 0.1,
            shorting_allowed: false,
            fixed_fee: false,
            fee: 0.0,
            display_results: false,
            record_balance: false,
            show_moving_averages: false,
            annual_taxes: false,
            tax_percentage: 0.0,
        }
    }
}

impl StrategyParams {
    /// Reject parameter sets the simulator cannot run.
    pub fn validate(&self) -> Result<(), MeanrevError> {
        if !(self.starting_capital > 0.0) {
            return Err(invalid(
                "starting_capital",
                "starting_capital must be greater than zero",
            ));
        }
        if !(self.order_sizing > 0.0 && self.order_sizing <= 1.0) {
            return Err(invalid(
                "order_sizing",
                "order_sizing must be between 0 (exclusive) and 1",
            ));
        }
        if self.ma_length == 0 {
            return Err(invalid("ma_length", "ma_length must be at least 1"));
        }
        for (name, value) in [
            ("buy_threshold", self.buy_threshold),
            ("take_profit", self.take_profit),
            ("stop_loss", self.stop_loss),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(name, &format!("{} must be non-negative", name)));
            }
        }
        if !(0.0..=1.0).contains(&self.tax_percentage) {
            return Err(invalid(
                "tax_percentage",
                "tax_percentage must be between 0 and 1",
            ));
        }
        if self.fixed_fee && !(0.0..1.0).contains(&self.fee) {
            return Err(invalid("fee", "fee must be between 0 and 1"));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> MeanrevError {
    MeanrevError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
