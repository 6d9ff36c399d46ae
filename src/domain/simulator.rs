//! Mean-reversion simulation engine.
//!
//! A single ordered pass over the warmed-up series. Each step resolves the
//! fee, settles annual taxes, rolls quarters, evaluates the entry/exit state
//! machine against the moving average, records balances and ages the
//! thirty-day volume window. Every decision depends on all prior state, so a
//! run is strictly sequential; independent runs share nothing.

use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::error::MeanrevError;
use crate::domain::fee::FeeModel;
use crate::domain::moving_average::{simple_moving_average, warmed_up};
use crate::domain::params::StrategyParams;
use crate::domain::price_point::{validate_series, PricePoint};
use crate::domain::result::{BacktestResult, BalanceTrace, QuarterSummary, TradeEvent};
use crate::domain::state::{LastMove, ShortState, SimulationState};
use crate::domain::stats::{quarters_beating_baseline, sample_stddev};

/// Run one backtest over `series`.
///
/// Fails before simulating anything when the parameters are out of range,
/// the series is malformed, or the series is shorter than `ma_length`.
pub fn run_backtest(
    series: &[PricePoint],
    params: &StrategyParams,
    fees: &dyn FeeModel,
) -> Result<BacktestResult, MeanrevError> {
    params.validate()?;
    validate_series(series)?;
    let averages = simple_moving_average(series, params.ma_length)?;
    let steps = warmed_up(series, params.ma_length);

    let mut sim = Simulator::new(&series[0], &steps[0], params, fees);
    for (x, (point, &average)) in steps.iter().zip(&averages).enumerate() {
        sim.step(x, point, average);
    }

    let result = sim.finish(series[0].price);
    info!(
        steps = result.steps,
        trades = result.total_trades,
        final_return = result.final_return_rate,
        "backtest complete"
    );
    Ok(result)
}

struct Simulator<'a> {
    params: &'a StrategyParams,
    fees: &'a dyn FeeModel,
    state: SimulationState,
    baseline_position: f64,
    fee: f64,
    quarters: Vec<QuarterSummary>,
    closed_trades: usize,
    trade_log: Vec<TradeEvent>,
    balance: Option<BalanceTrace>,
    last_price: f64,
    steps: usize,
}

impl<'a> Simulator<'a> {
    fn new(
        first: &PricePoint,
        first_step: &PricePoint,
        params: &'a StrategyParams,
        fees: &'a dyn FeeModel,
    ) -> Self {
        Simulator {
            params,
            fees,
            state: SimulationState::new(
                params.starting_capital,
                first_step.timestamp.year(),
                first.quarter,
            ),
            baseline_position: params.starting_capital / first.price,
            fee: params.fee,
            quarters: Vec::new(),
            closed_trades: 0,
            trade_log: Vec::new(),
            balance: params.record_balance.then(BalanceTrace::default),
            last_price: first.price,
            steps: 0,
        }
    }

    fn step(&mut self, x: usize, point: &PricePoint, average: f64) {
        let price = point.price;

        if !self.params.fixed_fee {
            self.fee = self.fees.rate(self.state.volume.total());
        }

        if self.params.annual_taxes {
            let year = point.timestamp.year();
            if year != self.state.past_year {
                self.settle_taxes(price);
            }
            self.state.past_year = year;
        }

        if point.quarter != self.state.past_quarter {
            self.roll_quarter(price);
        }
        self.state.past_quarter = point.quarter;

        if x == 0 {
            self.state.last_move = LastMove::Pass;
        } else {
            self.evaluate_signals(point.timestamp, price, average);
        }

        if let Some(trace) = self.balance.as_mut() {
            trace.timestamps.push(point.timestamp);
            trace.strategy.push(self.state.mark_to_market(price));
            trace.baseline.push(self.baseline_position * price);
            if self.params.show_moving_averages {
                trace.moving_average.push(average);
            }
        }

        self.state.volume.advance();
        self.last_price = price;
        self.steps += 1;
    }

    fn settle_taxes(&mut self, price: f64) {
        let state = &mut self.state;
        let annual_change = state.mark_to_market(price) - state.annual_baseline_balance;

        if annual_change > 0.0 {
            let taxes_due = annual_change * self.params.tax_percentage;
            if state.position_size != 0.0 {
                let remainder = taxes_due - state.fiat;
                if remainder > 0.0 {
                    state.fiat = 0.0;
                    state.position_size -= remainder / price;
                } else {
                    state.fiat -= taxes_due;
                }
            } else {
                state.fiat -= taxes_due;
            }
            debug!(annual_change, taxes_due, "annual taxes settled");
        }

        state.annual_baseline_balance = state.position_size * price + state.fiat;
    }

    fn roll_quarter(&mut self, price: f64) {
        let state = &mut self.state;
        let summary = QuarterSummary {
            quarter: state.past_quarter,
            return_rate: state.plain_value(price) / state.quarter_initial_balance - 1.0,
            trades: state.trades,
            hit_rate: state.hit_rate(),
            baseline_return_rate: self.baseline_position * price
                / state.quarter_baseline_initial_balance
                - 1.0,
        };
        debug!(
            quarter = summary.quarter,
            return_rate = summary.return_rate,
            trades = summary.trades,
            "quarter closed"
        );

        self.closed_trades += state.trades;
        self.quarters.push(summary);
        state.reset_quarter_counters();
        state.quarter_initial_balance = state.plain_value(price);
        state.quarter_baseline_initial_balance = price * self.baseline_position;
    }

    fn evaluate_signals(&mut self, timestamp: NaiveDateTime, price: f64, average: f64) {
        let params = self.params;
        let fee = self.fee;
        let state = &mut self.state;

        if state.last_move != LastMove::Buy && price <= average * (1.0 - params.buy_threshold) {
            let mut traded = 0.0;
            if params.shorting_allowed {
                if state.is_short() {
                    let short_delta = state.short_delta(price);
                    let notional = state.purchase_price * state.position_size + short_delta;
                    state.fiat += notional * (1.0 - fee);
                    state.position_size = 0.0;
                    traded += notional;
                    debug!(short_delta, "short covered");
                }
                state.short_position = ShortState::Flat;
            }

            let spent = params.order_sizing * state.fiat;
            state.position_size += spent * (1.0 - fee) / price;
            state.fiat -= spent;
            state.last_move = LastMove::Buy;
            state.trades += 1;
            state.purchase_price = price;
            traded += spent;

            state.volume.record(traded);
            self.log_trade(timestamp, LastMove::Buy, price);
        } else if state.last_move == LastMove::Buy
            && (price >= average * (1.0 + params.take_profit)
                || price <= average * (1.0 - params.stop_loss))
        {
            let mut traded = state.position_size * price;
            state.fiat += traded * (1.0 - fee);
            state.position_size = 0.0;

            if params.shorting_allowed {
                state.position_size = params.order_sizing * state.fiat * (1.0 - fee) / price;
                state.fiat -= state.position_size * price;
                state.last_move = LastMove::ShortSell;
                state.short_position = ShortState::Short;
                state.purchase_price = price;
                traded += state.position_size * price;
            } else {
                state.last_move = LastMove::Sell;
                state.purchase_price = 0.0;
            }

            state.trades += 1;

            // Reads the purchase price as updated above: a plain sell always
            // scores a win and a sell-and-short always scores a loss.
            if state.purchase_price < price {
                state.wins += 1;
            } else {
                state.losses += 1;
            }

            let kind = state.last_move;
            state.volume.record(traded);
            self.log_trade(timestamp, kind, price);
        }
    }

    fn log_trade(&mut self, timestamp: NaiveDateTime, kind: LastMove, price: f64) {
        debug!(%timestamp, %kind, price, fee = self.fee, "order filled");
        self.trade_log.push(TradeEvent {
            timestamp,
            kind,
            price,
            fee: self.fee,
        });
    }

    fn finish(self, baseline_initial: f64) -> BacktestResult {
        let price = self.last_price;
        let state = &self.state;

        let strategy_returns: Vec<f64> = self.quarters.iter().map(|q| q.return_rate).collect();
        let baseline_returns: Vec<f64> = self
            .quarters
            .iter()
            .map(|q| q.baseline_return_rate)
            .collect();

        BacktestResult {
            final_return_rate: state.plain_value(price) / self.params.starting_capital - 1.0,
            hit_rate: state.hit_rate(),
            baseline_return_rate: price / baseline_initial - 1.0,
            quarters_beating_baseline: quarters_beating_baseline(
                &strategy_returns,
                &baseline_returns,
            ),
            strategy_quarterly_stdev: sample_stddev(&strategy_returns),
            baseline_quarterly_stdev: sample_stddev(&baseline_returns),
            final_quarter_trades: state.trades,
            total_trades: self.closed_trades + state.trades,
            steps: self.steps,
            quarters: self.quarters,
            trade_log: self.trade_log,
            balance: self.balance,
        }
    }
}
