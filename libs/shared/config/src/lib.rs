use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub slot_duration_minutes: u32,
    pub schedule_range_days: u32,
    pub orphan_policy: String,
    pub generate_latency_ms: u64,
    pub mutation_latency_ms: u64,
    pub toggle_latency_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            slot_duration_minutes: 12,
            schedule_range_days: 30,
            orphan_policy: "preserve".to_string(),
            generate_latency_ms: 1000,
            mutation_latency_ms: 500,
            toggle_latency_ms: 300,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| {
                warn!("HOST not set, using default");
                defaults.host.clone()
            }),
            port: parse_var("PORT", defaults.port),
            slot_duration_minutes: parse_var("SCHEDULE_SLOT_DURATION", defaults.slot_duration_minutes),
            schedule_range_days: parse_var("SCHEDULE_RANGE_DAYS", defaults.schedule_range_days),
            orphan_policy: env::var("SCHEDULE_ORPHAN_POLICY").unwrap_or_else(|_| {
                warn!("SCHEDULE_ORPHAN_POLICY not set, using default");
                defaults.orphan_policy.clone()
            }),
            generate_latency_ms: parse_var("SIMULATED_GENERATE_LATENCY_MS", defaults.generate_latency_ms),
            mutation_latency_ms: parse_var("SIMULATED_MUTATION_LATENCY_MS", defaults.mutation_latency_ms),
            toggle_latency_ms: parse_var("SIMULATED_TOGGLE_LATENCY_MS", defaults.toggle_latency_ms),
        };

        if !config.is_schedule_configured() {
            warn!("Schedule settings out of range - slot duration and range must be positive");
        }

        config
    }

    /// Zero-latency configuration, used by tests and local tooling.
    pub fn without_latency() -> Self {
        Self {
            generate_latency_ms: 0,
            mutation_latency_ms: 0,
            toggle_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_schedule_configured(&self) -> bool {
        (1..=60).contains(&self.slot_duration_minutes)
            && (1..=365).contains(&self.schedule_range_days)
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_console_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.slot_duration_minutes, 12);
        assert_eq!(config.schedule_range_days, 30);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.is_schedule_configured());
    }

    #[test]
    fn without_latency_zeroes_delays() {
        let config = AppConfig::without_latency();
        assert_eq!(config.generate_latency_ms, 0);
        assert_eq!(config.mutation_latency_ms, 0);
        assert_eq!(config.toggle_latency_ms, 0);
    }

    #[test]
    fn out_of_range_duration_is_not_configured() {
        let config = AppConfig {
            slot_duration_minutes: 0,
            ..AppConfig::default()
        };
        assert!(!config.is_schedule_configured());
    }
}
