//! Runtime configuration from the process environment.
//!
//! `canary` is configured entirely through environment variables so the same
//! image runs unchanged across pipeline stages:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `3000` | listen port |
//! | `APP_ENV` | `development` | `development` or `production` |
//! | `RATE_LIMIT_WINDOW_SECS` | `900` | admission window duration |
//! | `RATE_LIMIT_MAX` | `100` | requests admitted per window per client |
//!
//! Malformed values fall back to the defaults rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use crate::middleware::RateLimitConfig;

/// Deployment environment flag.
///
/// Controls log verbosity and whether the error handler redacts internal
/// fault messages. Anything other than `production` is treated as
/// development.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl From<&str> for Environment {
    fn from(flag: &str) -> Self {
        if flag.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }
}

/// Resolved service configuration.
///
/// Built once at startup and passed into [`app`](crate::app) — nothing in
/// the pipeline reads the process environment after this point.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let environment = std::env::var("APP_ENV")
            .map(|v| Environment::from(v.as_str()))
            .unwrap_or(Environment::Development);

        Self {
            port: env_or("PORT", 3000),
            environment,
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECS", 900)),
                max_requests: env_or("RATE_LIMIT_MAX", 100),
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_flag_is_recognised() {
        assert_eq!(Environment::from("production"), Environment::Production);
        assert_eq!(Environment::from("PRODUCTION"), Environment::Production);
    }

    #[test]
    fn anything_else_is_development() {
        assert_eq!(Environment::from("development"), Environment::Development);
        assert_eq!(Environment::from("staging"), Environment::Development);
        assert_eq!(Environment::from(""), Environment::Development);
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        assert_eq!(env_or("CANARY_TEST_UNSET_PORT", 3000u16), 3000);
    }
}
