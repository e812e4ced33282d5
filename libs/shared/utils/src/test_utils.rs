use std::sync::Arc;

use shared_config::AppConfig;

pub struct TestConfig {
    pub slot_duration_minutes: u32,
    pub schedule_range_days: u32,
    pub orphan_policy: String,
    pub latency_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 12,
            schedule_range_days: 7,
            orphan_policy: "preserve".to_string(),
            latency_ms: 0,
        }
    }
}

impl TestConfig {
    pub fn with_slot_duration(mut self, minutes: u32) -> Self {
        self.slot_duration_minutes = minutes;
        self
    }

    pub fn with_range(mut self, days: u32) -> Self {
        self.schedule_range_days = days;
        self
    }

    pub fn dropping_orphans(mut self) -> Self {
        self.orphan_policy = "drop".to_string();
        self
    }

    /// Apply the same simulated delay to every operation.
    pub fn with_latency(mut self, millis: u64) -> Self {
        self.latency_ms = millis;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            slot_duration_minutes: self.slot_duration_minutes,
            schedule_range_days: self.schedule_range_days,
            orphan_policy: self.orphan_policy.clone(),
            generate_latency_ms: self.latency_ms,
            mutation_latency_ms: self.latency_ms,
            toggle_latency_ms: self.latency_ms,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestPatient {
    pub name: String,
    pub phone: String,
}

impl Default for TestPatient {
    fn default() -> Self {
        Self {
            name: "علی احمدی".to_string(),
            phone: "09123456789".to_string(),
        }
    }
}

impl TestPatient {
    pub fn new(name: &str, phone: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let app_config = TestConfig::default().to_app_config();

        assert_eq!(app_config.slot_duration_minutes, 12);
        assert_eq!(app_config.schedule_range_days, 7);
        assert_eq!(app_config.mutation_latency_ms, 0);
        assert!(app_config.is_schedule_configured());
    }

    #[test]
    fn test_config_builders() {
        let app_config = TestConfig::default()
            .with_slot_duration(30)
            .with_range(14)
            .dropping_orphans()
            .with_latency(25)
            .to_app_config();

        assert_eq!(app_config.slot_duration_minutes, 30);
        assert_eq!(app_config.schedule_range_days, 14);
        assert_eq!(app_config.orphan_policy, "drop");
        assert_eq!(app_config.toggle_latency_ms, 25);
    }

    #[test]
    fn test_patient_creation() {
        let patient = TestPatient::new("فاطمه کریمی", "09187654321");
        assert_eq!(patient.phone, "09187654321");
        assert!(!TestPatient::default().name.is_empty());
    }
}
