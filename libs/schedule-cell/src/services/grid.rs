// libs/schedule-cell/src/services/grid.rs
use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use tracing::debug;

use shared_utils::to_persian_digits;

use crate::models::{
    hhmm, Cell, GridDay, GridFilter, GridRow, ScheduleError, SlotKey, TimeBucket, TimeSlot,
    WeeklyGrid,
};
use crate::services::generator::minute_marks;
use crate::services::lifecycle::SlotLifecycleService;

/// Persian weekday names, Saturday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "شنبه",
    "یکشنبه",
    "دوشنبه",
    "سه‌شنبه",
    "چهارشنبه",
    "پنج‌شنبه",
    "جمعه",
];

const MORNING_HOURS: std::ops::RangeInclusive<u32> = 5..=11;
const EVENING_HOURS: std::ops::RangeInclusive<u32> = 13..=23;

/// Most recent Saturday on or before `today`, `None` past the calendar's edge.
pub fn week_start(today: NaiveDate) -> Option<NaiveDate> {
    let days_since_saturday = (today.weekday().num_days_from_sunday() + 1) % 7;
    today.checked_sub_days(Days::new(days_since_saturday as u64))
}

pub fn week_dates(today: NaiveDate) -> Option<Vec<NaiveDate>> {
    let start = week_start(today)?;
    (0..7)
        .map(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

/// Morning band 05:00-11:xx, an explicit 12:00 boundary row, then the
/// evening band 13:00-23:xx, each at `slot_duration` granularity.
pub fn time_buckets(slot_duration: u32) -> Vec<TimeBucket> {
    let band = move |hours: std::ops::RangeInclusive<u32>| {
        hours.flat_map(move |hour| {
            minute_marks(slot_duration).filter_map(move |minute| NaiveTime::from_hms_opt(hour, minute, 0))
        })
    };

    band(MORNING_HOURS)
        .chain(NaiveTime::from_hms_opt(12, 0, 0))
        .chain(band(EVENING_HOURS))
        .map(TimeBucket::new)
        .collect()
}

pub fn filter_buckets(buckets: Vec<TimeBucket>, filter: GridFilter) -> Vec<TimeBucket> {
    buckets.into_iter().filter(|b| filter.accepts(b)).collect()
}

/// Project a doctor's slots onto the week containing `today`. Materialized
/// cells list the actions their status allows.
pub fn project_week(
    slots: &BTreeMap<SlotKey, TimeSlot>,
    doctor_id: &str,
    today: NaiveDate,
    slot_duration: u32,
    filter: GridFilter,
    lifecycle: &SlotLifecycleService,
) -> Result<WeeklyGrid, ScheduleError> {
    let dates = week_dates(today).ok_or_else(|| {
        ScheduleError::ValidationError(format!(
            "The week of {} is outside the supported calendar",
            today
        ))
    })?;
    let buckets = filter_buckets(time_buckets(slot_duration), filter);

    debug!(
        "Projecting {} rows for doctor {} starting {}",
        buckets.len(),
        doctor_id,
        dates[0]
    );

    let rows = buckets
        .into_iter()
        .map(|bucket| {
            let cells = dates
                .iter()
                .map(|date| {
                    let key = SlotKey::new(*date, bucket.time, doctor_id);
                    match slots.get(&key) {
                        Some(slot) => Cell::Materialized {
                            actions: lifecycle.get_valid_actions(slot.status()),
                            slot: slot.clone(),
                        },
                        None => Cell::Empty,
                    }
                })
                .collect();

            GridRow {
                label: to_persian_digits(&bucket.time.format(hhmm::FORMAT).to_string()),
                bucket,
                cells,
            }
        })
        .collect();

    Ok(WeeklyGrid {
        doctor_id: doctor_id.to_string(),
        week_start: dates[0],
        days: dates
            .iter()
            .zip(WEEKDAY_NAMES)
            .map(|(date, weekday_name)| GridDay {
                date: *date,
                weekday_name,
            })
            .collect(),
        rows,
    })
}
