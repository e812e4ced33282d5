// libs/schedule-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use shared_config::AppConfig;

/// First bookable hour of a working day.
pub const WORKDAY_START_HOUR: u32 = 8;
/// Generated slots stop before this hour.
pub const WORKDAY_END_HOUR: u32 = 18;

// ==============================================================================
// SLOT MODELS
// ==============================================================================

/// Identity of a slot: one doctor, one date, one time of day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub doctor_id: String,
}

impl SlotKey {
    pub fn new(date: NaiveDate, time: NaiveTime, doctor_id: impl Into<String>) -> Self {
        Self {
            date,
            time,
            doctor_id: doctor_id.into(),
        }
    }

    /// Display identifier in the console's `{date}-{time}-{doctor}` form.
    /// Never parsed back; use the structured key for lookups.
    pub fn display_id(&self) -> String {
        format!("{}-{}-{}", self.date, self.time.format(hhmm::FORMAT), self.doctor_id)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Booked => write!(f, "booked"),
            SlotStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Slot status together with the data that only exists in that status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotState {
    Available,
    Booked {
        patient_name: String,
        patient_phone: String,
    },
    Blocked,
}

impl SlotState {
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotState::Available => SlotStatus::Available,
            SlotState::Booked { .. } => SlotStatus::Booked,
            SlotState::Blocked => SlotStatus::Blocked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub duration: u32,
    #[serde(flatten)]
    pub state: SlotState,
    pub doctor_id: String,
    pub doctor_name: String,
}

impl TimeSlot {
    pub fn available(key: &SlotKey, doctor_name: &str, duration: u32) -> Self {
        Self {
            id: key.display_id(),
            date: key.date,
            time: key.time,
            duration,
            state: SlotState::Available,
            doctor_id: key.doctor_id.clone(),
            doctor_name: doctor_name.to_string(),
        }
    }

    pub fn key(&self) -> SlotKey {
        SlotKey::new(self.date, self.time, self.doctor_id.clone())
    }

    pub fn status(&self) -> SlotStatus {
        self.state.status()
    }

    pub fn is_booked(&self) -> bool {
        matches!(self.state, SlotState::Booked { .. })
    }

    pub fn patient_name(&self) -> Option<&str> {
        match &self.state {
            SlotState::Booked { patient_name, .. } => Some(patient_name),
            _ => None,
        }
    }

    pub fn patient_phone(&self) -> Option<&str> {
        match &self.state {
            SlotState::Booked { patient_phone, .. } => Some(patient_phone),
            _ => None,
        }
    }
}

// ==============================================================================
// DOCTORS & SETTINGS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
}

impl Doctor {
    pub fn new(id: &str, name: &str, specialty: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            specialty: specialty.to_string(),
        }
    }

    /// Clinic roster served by the console.
    pub fn default_roster() -> Vec<Doctor> {
        vec![
            Doctor::new("1", "دکتر احمد محمدی", "پزشک عمومی"),
            Doctor::new("2", "دکتر مریم حسینی", "پزشک متخصص"),
            Doctor::new("3", "دکتر حسن موسوی", "پزشک متخصص"),
        ]
    }
}

/// What regeneration does with a booking whose slot is no longer produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Keep the booked slot as-is alongside the fresh schedule.
    #[default]
    Preserve,
    /// Discard it; the booking is lost.
    Drop,
}

impl FromStr for OrphanPolicy {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(OrphanPolicy::Preserve),
            "drop" => Ok(OrphanPolicy::Drop),
            other => Err(ScheduleError::ValidationError(format!(
                "Unknown orphan policy '{}', expected 'preserve' or 'drop'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSettings {
    /// Minutes per slot.
    pub slot_duration: u32,
    /// Days generated forward from today.
    pub schedule_range: u32,
    #[serde(default)]
    pub orphan_policy: OrphanPolicy,
}

impl Default for AppointmentSettings {
    fn default() -> Self {
        Self {
            slot_duration: 12,
            schedule_range: 30,
            orphan_policy: OrphanPolicy::Preserve,
        }
    }
}

impl AppointmentSettings {
    pub const MAX_SLOT_DURATION: u32 = 60;
    pub const MAX_SCHEDULE_RANGE: u32 = 365;

    /// Build settings from the process config, falling back to defaults
    /// for anything out of range.
    pub fn from_config(config: &AppConfig) -> Self {
        let defaults = Self::default();

        let orphan_policy = config.orphan_policy.parse().unwrap_or_else(|e| {
            tracing::warn!("{}; using default", e);
            defaults.orphan_policy
        });

        let settings = Self {
            slot_duration: config.slot_duration_minutes,
            schedule_range: config.schedule_range_days,
            orphan_policy,
        };

        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::warn!("Invalid schedule settings in config ({}), using defaults", e);
                Self {
                    orphan_policy,
                    ..defaults
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.slot_duration == 0 || self.slot_duration > Self::MAX_SLOT_DURATION {
            return Err(ScheduleError::ValidationError(format!(
                "Slot duration must be between 1 and {} minutes",
                Self::MAX_SLOT_DURATION
            )));
        }

        if self.schedule_range == 0 || self.schedule_range > Self::MAX_SCHEDULE_RANGE {
            return Err(ScheduleError::ValidationError(format!(
                "Schedule range must be between 1 and {} days",
                Self::MAX_SCHEDULE_RANGE
            )));
        }

        Ok(())
    }

    pub fn apply(&self, update: &UpdateSettingsRequest) -> Self {
        Self {
            slot_duration: update.slot_duration.unwrap_or(self.slot_duration),
            schedule_range: update.schedule_range.unwrap_or(self.schedule_range),
            orphan_policy: update.orphan_policy.unwrap_or(self.orphan_policy),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub slot_duration: Option<u32>,
    pub schedule_range: Option<u32>,
    pub orphan_policy: Option<OrphanPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    #[serde(flatten)]
    pub slot: SlotKey,
    pub patient_name: String,
    pub patient_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTransferRequest {
    pub from: SlotKey,
    pub to: SlotKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub doctor_id: String,
    pub working_days: usize,
    pub slots_generated: usize,
    pub bookings_carried_over: usize,
    pub orphaned_bookings: Vec<SlotKey>,
    pub orphan_policy: OrphanPolicy,
}

/// A booking picked up for transfer. Only one may be pending at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub id: Uuid,
    pub source: SlotKey,
    pub patient_name: String,
    pub patient_phone: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub source: TimeSlot,
    pub destination: TimeSlot,
}

// ==============================================================================
// GRID MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub is_working_hour: bool,
}

impl TimeBucket {
    pub fn new(time: NaiveTime) -> Self {
        Self {
            time,
            is_working_hour: is_working_time(time),
        }
    }
}

/// Working hours are 08:00-12:00 and 13:00-18:00, end-exclusive.
pub fn is_working_time(time: NaiveTime) -> bool {
    let hour = time.hour();
    (WORKDAY_START_HOUR..12).contains(&hour) || (13..WORKDAY_END_HOUR).contains(&hour)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridFilter {
    pub show_working_hours: bool,
    pub show_non_working_hours: bool,
}

impl Default for GridFilter {
    fn default() -> Self {
        Self {
            show_working_hours: true,
            show_non_working_hours: false,
        }
    }
}

impl GridFilter {
    pub fn accepts(&self, bucket: &TimeBucket) -> bool {
        (bucket.is_working_hour && self.show_working_hours)
            || (!bucket.is_working_hour && self.show_non_working_hours)
    }
}

/// A grid cell either has no slot behind it yet or shows one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Materialized {
        slot: TimeSlot,
        /// Actions the slot's current status permits.
        actions: Vec<SlotAction>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GridDay {
    pub date: NaiveDate,
    pub weekday_name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridRow {
    #[serde(flatten)]
    pub bucket: TimeBucket,
    /// Time rendered with Persian digits.
    pub label: String,
    /// One cell per entry of `WeeklyGrid::days`, in the same order.
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyGrid {
    pub doctor_id: String,
    pub week_start: NaiveDate,
    pub days: Vec<GridDay>,
    pub rows: Vec<GridRow>,
}

impl WeeklyGrid {
    pub fn cell(&self, date: NaiveDate, time: NaiveTime) -> Option<&Cell> {
        let column = self.days.iter().position(|d| d.date == date)?;
        self.rows
            .iter()
            .find(|row| row.bucket.time == time)
            .and_then(|row| row.cells.get(column))
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotAction {
    Book,
    Cancel,
    Toggle,
    BeginTransfer,
    TransferOut,
    TransferInto,
}

impl fmt::Display for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotAction::Book => write!(f, "book"),
            SlotAction::Cancel => write!(f, "cancel"),
            SlotAction::Toggle => write!(f, "toggle"),
            SlotAction::BeginTransfer => write!(f, "begin transfer from"),
            SlotAction::TransferOut => write!(f, "transfer out of"),
            SlotAction::TransferInto => write!(f, "transfer into"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("No doctor selected")]
    DoctorNotSelected,

    #[error("Doctor not found: {0}")]
    DoctorNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotKey),

    #[error("Cannot {action} a {from} slot")]
    InvalidTransition { from: SlotStatus, action: SlotAction },

    #[error("Slot {0} is outside working hours")]
    OutsideWorkingHours(SlotKey),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Another schedule operation is in progress")]
    Busy,
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// `HH:MM` encoding for times of day. Persian digits are accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};
    use shared_utils::to_english_digits;

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(&to_english_digits(raw.trim()), FORMAT)
    }
}
