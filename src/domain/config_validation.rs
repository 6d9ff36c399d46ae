//! Configuration validation.
//!
//! Validates config fields before any data is loaded or simulated.

use crate::domain::error::MeanrevError;
use crate::domain::fee::FeeSchedule;
use crate::domain::params::StrategyParams;
use crate::domain::quarter::{parse_years, validate_years};
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(MeanrevError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            })
        }
    }
    validate_years_list(config)?;
    Ok(())
}

/// Strategy, fee, tax and output settings as written, with
/// [`StrategyParams::default`] filling absent keys. Ranges are not checked.
pub fn read_strategy_params(config: &dyn ConfigPort) -> StrategyParams {
    let defaults = StrategyParams::default();
    let ma_length = config.get_int("strategy", "ma_length", defaults.ma_length as i64);
    StrategyParams {
        order_sizing: config.get_double("strategy", "order_sizing", defaults.order_sizing),
        // negative lengths become 0 and are rejected by validation
        ma_length: usize::try_from(ma_length).unwrap_or(0),
        starting_capital: config.get_double(
            "strategy",
            "starting_capital",
            defaults.starting_capital,
        ),
        buy_threshold: config.get_double("strategy", "buy_threshold", defaults.buy_threshold),
        take_profit: config.get_double("strategy", "take_profit", defaults.take_profit),
        stop_loss: config.get_double("strategy", "stop_loss", defaults.stop_loss),
        shorting_allowed: config.get_bool("strategy", "shorting_allowed", false),
        fixed_fee: config.get_bool("fees", "fixed_fee", false),
        fee: config.get_double("fees", "fee", defaults.fee),
        display_results: config.get_bool("output", "display_results", false),
        record_balance: config.get_bool("output", "record_balance", false),
        show_moving_averages: config.get_bool("output", "show_moving_averages", false),
        annual_taxes: config.get_bool("taxes", "annual_taxes", false),
        tax_percentage: config.get_double("taxes", "tax_percentage", defaults.tax_percentage),
    }
}

/// Range checks come from [`StrategyParams::validate`]; failures are
/// reported against the config section and key they were read from.
pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    read_strategy_params(config)
        .validate()
        .map_err(config_error)?;
    validate_fee_tiers(config)?;
    Ok(())
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    for key in ["ma_length", "threads", "top"] {
        for value in config.get_list("sweep", key) {
            match value.parse::<usize>() {
                Ok(v) if v >= 1 => {}
                _ => {
                    return Err(invalid(
                        "sweep",
                        key,
                        &format!("'{}' is not a positive integer", value),
                    ))
                }
            }
        }
    }
    for key in ["buy_threshold", "take_profit", "stop_loss", "order_sizing"] {
        for value in config.get_list("sweep", key) {
            let parsed: f64 = value
                .parse()
                .map_err(|_| invalid("sweep", key, &format!("'{}' is not a number", value)))?;
            let mut params = StrategyParams::default();
            match key {
                "buy_threshold" => params.buy_threshold = parsed,
                "take_profit" => params.take_profit = parsed,
                "stop_loss" => params.stop_loss = parsed,
                _ => params.order_sizing = parsed,
            }
            params
                .validate()
                .map_err(|e| invalid("sweep", key, &e.to_string()))?;
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> MeanrevError {
    MeanrevError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_years_list(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if let Some(years) = config.get_string("data", "years") {
        let parsed = parse_years(&years)?;
        validate_years(&parsed)?;
    }
    Ok(())
}

fn config_error(err: MeanrevError) -> MeanrevError {
    match err {
        MeanrevError::InvalidParameter { name, reason } => {
            let section = match name.as_str() {
                "fee" => "fees",
                "tax_percentage" => "taxes",
                _ => "strategy",
            };
            invalid(section, &name, &reason)
        }
        other => other,
    }
}

fn validate_fee_tiers(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if let Some(tiers) = config.get_string("fees", "tiers") {
        FeeSchedule::parse(&tiers).map_err(|e| invalid("fees", "tiers", &e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[data]
path = data/btc.csv
years = 2019, 2020

[strategy]
order_sizing = 0.5
ma_length = 480
starting_capital = 1000
buy_threshold = 0.05
take_profit = 0.05
stop_loss = 0.1

[fees]
fixed_fee = true
fee = 0.001

[taxes]
annual_taxes = true
tax_percentage = 0.3
"#;

    fn with_override(section: &str, key: &str, value: &str) -> FileConfigAdapter {
        let mut lines: Vec<String> = Vec::new();
        let mut in_section = false;
        let mut replaced = false;
        for line in VALID.lines() {
            if line.starts_with('[') {
                if in_section && !replaced {
                    lines.push(format!("{} = {}", key, value));
                    replaced = true;
                }
                in_section = line == format!("[{}]", section);
            }
            if in_section && line.starts_with(&format!("{} =", key)) {
                lines.push(format!("{} = {}", key, value));
                replaced = true;
                continue;
            }
            lines.push(line.to_string());
        }
        if !replaced {
            if !in_section {
                lines.push(format!("[{}]", section));
            }
            lines.push(format!("{} = {}", key, value));
        }
        FileConfigAdapter::from_string(&lines.join("\n")).unwrap()
    }

    fn invalid_key(err: MeanrevError) -> String {
        invalid_at(err).1
    }

    fn invalid_at(err: MeanrevError) -> (String, String) {
        match err {
            MeanrevError::ConfigInvalid { section, key, .. }
            | MeanrevError::ConfigMissing { section, key } => (section, key),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = FileConfigAdapter::from_string(VALID).unwrap();
        assert!(validate_data_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
        assert!(validate_sweep_config(&config).is_ok());
    }

    #[test]
    fn missing_data_path() {
        let config = FileConfigAdapter::from_string("[strategy]\nma_length = 4\n").unwrap();
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, MeanrevError::ConfigMissing { ref key, .. } if key == "path"));
    }

    #[test]
    fn unsupported_year_in_config() {
        let config = with_override("data", "years", "2019, 2031");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, MeanrevError::UnsupportedYear { year: 2031, .. }));
    }

    #[test]
    fn non_positive_capital() {
        let config = with_override("strategy", "starting_capital", "0");
        assert_eq!(
            invalid_key(validate_strategy_config(&config).unwrap_err()),
            "starting_capital"
        );
    }

    #[test]
    fn order_sizing_out_of_range() {
        let config = with_override("strategy", "order_sizing", "1.5");
        assert_eq!(
            invalid_key(validate_strategy_config(&config).unwrap_err()),
            "order_sizing"
        );
    }

    #[test]
    fn missing_ma_length_uses_default() {
        let config = FileConfigAdapter::from_string("[strategy]\nstop_loss = 0.1\n").unwrap();
        assert!(validate_strategy_config(&config).is_ok());
        assert_eq!(read_strategy_params(&config).ma_length, 480);
    }

    #[test]
    fn zero_or_negative_ma_length() {
        for value in ["0", "-3"] {
            let config = with_override("strategy", "ma_length", value);
            assert_eq!(
                invalid_at(validate_strategy_config(&config).unwrap_err()),
                ("strategy".to_string(), "ma_length".to_string())
            );
        }
    }

    #[test]
    fn negative_stop_loss() {
        let config = with_override("strategy", "stop_loss", "-0.1");
        assert_eq!(
            invalid_key(validate_strategy_config(&config).unwrap_err()),
            "stop_loss"
        );
    }

    #[test]
    fn fixed_fee_out_of_range() {
        let config = with_override("fees", "fee", "2");
        assert_eq!(
            invalid_at(validate_strategy_config(&config).unwrap_err()),
            ("fees".to_string(), "fee".to_string())
        );
    }

    #[test]
    fn malformed_fee_tiers() {
        let config = with_override("fees", "tiers", "10000-0.005");
        assert_eq!(invalid_key(validate_strategy_config(&config).unwrap_err()), "tiers");
    }

    #[test]
    fn tax_percentage_out_of_range() {
        let config = with_override("taxes", "tax_percentage", "1.2");
        assert_eq!(
            invalid_at(validate_strategy_config(&config).unwrap_err()),
            ("taxes".to_string(), "tax_percentage".to_string())
        );
    }

    #[test]
    fn sweep_rejects_bad_values() {
        let config = with_override("sweep", "ma_length", "24, zero");
        assert_eq!(invalid_key(validate_sweep_config(&config).unwrap_err()), "ma_length");

        let config = with_override("sweep", "order_sizing", "0.5, 0");
        assert_eq!(
            invalid_key(validate_sweep_config(&config).unwrap_err()),
            "order_sizing"
        );
    }
}
