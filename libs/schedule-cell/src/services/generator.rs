// libs/schedule-cell/src/services/generator.rs
use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use tracing::{debug, warn};

use crate::models::{
    Doctor, OrphanPolicy, ScheduleError, SlotKey, TimeSlot, WORKDAY_END_HOUR,
    WORKDAY_START_HOUR,
};

/// Minute offsets within one hour at the given granularity: `0, d, 2d, ... < 60`.
pub fn minute_marks(slot_duration: u32) -> impl Iterator<Item = u32> {
    (0..60).step_by(slot_duration.max(1) as usize)
}

/// Friday (5) and Saturday (6) in Sunday-based numbering are the weekend.
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday().num_days_from_sunday(), 5 | 6)
}

/// Result of merging previous bookings into a freshly generated schedule.
#[derive(Debug, Default)]
pub struct CarryOver {
    pub carried: usize,
    pub orphaned: Vec<TimeSlot>,
}

pub struct SlotGenerator {
    slot_duration: u32,
}

impl SlotGenerator {
    pub fn new(slot_duration: u32) -> Result<Self, ScheduleError> {
        if slot_duration == 0 {
            return Err(ScheduleError::ValidationError(
                "Slot duration must be positive".to_string(),
            ));
        }

        Ok(Self { slot_duration })
    }

    /// One available slot per increment from 08:00 up to, not including, 18:00.
    pub fn generate_day_slots(&self, date: NaiveDate, doctor: &Doctor) -> Vec<TimeSlot> {
        let mut slots = Vec::new();

        for hour in WORKDAY_START_HOUR..WORKDAY_END_HOUR {
            for minute in minute_marks(self.slot_duration) {
                let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
                    continue;
                };
                let key = SlotKey::new(date, time, doctor.id.clone());
                slots.push(TimeSlot::available(&key, &doctor.name, self.slot_duration));
            }
        }

        slots
    }

    /// Slots for `range_days` consecutive days from `start`, weekends skipped.
    pub fn generate_range(
        &self,
        start: NaiveDate,
        range_days: u32,
        doctor: &Doctor,
    ) -> BTreeMap<SlotKey, TimeSlot> {
        debug!(
            "Generating {} days of {}-minute slots for doctor {} from {}",
            range_days, self.slot_duration, doctor.id, start
        );

        (0..range_days as u64)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|date| is_working_day(*date))
            .flat_map(|date| self.generate_day_slots(date, doctor))
            .map(|slot| (slot.key(), slot))
            .collect()
    }

    /// Copy booked state from `previous` onto matching keys of `fresh`.
    ///
    /// Bookings with no matching key are orphans; under `Preserve` they are
    /// inserted into `fresh` unchanged, under `Drop` they are discarded. Either
    /// way they are returned so the caller can report them.
    pub fn carry_over<'a>(
        &self,
        fresh: &mut BTreeMap<SlotKey, TimeSlot>,
        previous: impl IntoIterator<Item = &'a TimeSlot>,
        policy: OrphanPolicy,
    ) -> CarryOver {
        let mut outcome = CarryOver::default();

        for booked in previous.into_iter().filter(|slot| slot.is_booked()) {
            let key = booked.key();
            match fresh.get_mut(&key) {
                Some(slot) => {
                    slot.state = booked.state.clone();
                    outcome.carried += 1;
                }
                None => {
                    warn!(
                        "Booking at {} has no slot in the regenerated schedule ({:?} policy)",
                        key, policy
                    );
                    if policy == OrphanPolicy::Preserve {
                        fresh.insert(key, booked.clone());
                    }
                    outcome.orphaned.push(booked.clone());
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_marks_follow_per_hour_layout() {
        assert_eq!(minute_marks(12).collect::<Vec<_>>(), vec![0, 12, 24, 36, 48]);
        assert_eq!(minute_marks(45).collect::<Vec<_>>(), vec![0, 45]);
        assert_eq!(minute_marks(60).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn weekend_is_friday_and_saturday() {
        // 2024-01-19 is a Friday
        let friday = NaiveDate::from_ymd_opt(2024, 1, 19).unwrap();
        assert!(!is_working_day(friday));
        assert!(!is_working_day(friday.succ_opt().unwrap()));
        assert!(is_working_day(friday + Days::new(2)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(SlotGenerator::new(0).is_err());
    }
}
