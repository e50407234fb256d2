//! Server configuration read from the environment.

use allin_core::{MAX_SEATS, MAX_STACK, MIN_SEATS, TableConfig};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Pause between a settled hand and the next deal.
    pub next_hand_delay: Duration,
    /// Outgoing message buffer per connection.
    pub channel_capacity: usize,
    /// Settings used when a create request leaves them out or sends zero.
    pub table_defaults: TableConfig,
}

impl ServerConfig {
    /// Reads `ALLIN_*` variables, falling back to defaults for anything
    /// missing or unparseable. Call `dotenvy::dotenv()` first to pick up a
    /// `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = match std::env::var("ALLIN_BIND") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "ALLIN_BIND".to_string(),
                reason: format!("{:?} is not a socket address", value),
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 25917)),
        };

        let defaults = TableConfig::default();
        let config = ServerConfig {
            bind,
            next_hand_delay: Duration::from_millis(parse_env_or("ALLIN_NEXT_HAND_DELAY_MS", 4000)),
            channel_capacity: parse_env_or("ALLIN_CHANNEL_CAPACITY", 32),
            table_defaults: TableConfig {
                max_seats: parse_env_or("ALLIN_DEFAULT_SEATS", defaults.max_seats),
                small_blind: parse_env_or("ALLIN_DEFAULT_SMALL_BLIND", defaults.small_blind),
                big_blind: parse_env_or("ALLIN_DEFAULT_BIG_BLIND", defaults.big_blind),
                buy_in: parse_env_or("ALLIN_DEFAULT_BUY_IN", defaults.buy_in),
                is_private: false,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "ALLIN_CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let defaults = &self.table_defaults;
        if !(MIN_SEATS..=MAX_SEATS).contains(&defaults.max_seats) {
            return Err(ConfigError::Invalid {
                var: "ALLIN_DEFAULT_SEATS".to_string(),
                reason: format!("Must be between {} and {}", MIN_SEATS, MAX_SEATS),
            });
        }
        if defaults.small_blind == 0 {
            return Err(ConfigError::Invalid {
                var: "ALLIN_DEFAULT_SMALL_BLIND".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }
        if defaults.big_blind < defaults.small_blind {
            return Err(ConfigError::Invalid {
                var: "ALLIN_DEFAULT_BIG_BLIND".to_string(),
                reason: format!("Must be at least the small blind ({})", defaults.small_blind),
            });
        }
        if defaults.big_blind > MAX_STACK {
            return Err(ConfigError::Invalid {
                var: "ALLIN_DEFAULT_BIG_BLIND".to_string(),
                reason: format!("Must be at most {}", MAX_STACK),
            });
        }
        if defaults.buy_in == 0 || defaults.buy_in > MAX_STACK {
            return Err(ConfigError::Invalid {
                var: "ALLIN_DEFAULT_BUY_IN".to_string(),
                reason: format!("Must be between 1 and {}", MAX_STACK),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:25917".parse().unwrap(),
            next_hand_delay: Duration::from_millis(4000),
            channel_capacity: 32,
            table_defaults: TableConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_inverted_blinds_rejected() {
        let mut config = config();
        config.table_defaults.small_blind = 50;
        config.table_defaults.big_blind = 20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ALLIN_DEFAULT_BIG_BLIND"));
    }

    #[test]
    fn test_seat_count_rejected() {
        let mut config = config();
        config.table_defaults.max_seats = 11;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_buy_in_above_cap_rejected() {
        let mut config = config();
        config.table_defaults.buy_in = MAX_STACK + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ALLIN_DEFAULT_BUY_IN"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = config();
        config.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_or_falls_back() {
        assert_eq!(parse_env_or("ALLIN_TEST_SURELY_UNSET_VARIABLE", 7u32), 7);
    }
}
