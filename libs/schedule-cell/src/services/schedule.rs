// libs/schedule-cell/src/services/schedule.rs
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Timelike};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::to_english_digits;

use crate::models::{
    is_working_time, AppointmentSettings, Doctor, GenerationReport, GridFilter, PendingTransfer,
    ScheduleError, SlotAction, SlotKey, SlotState, SlotStatus, TimeSlot, TransferOutcome,
    UpdateSettingsRequest, WeeklyGrid,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::generator::{minute_marks, SlotGenerator};
use crate::services::grid;
use crate::services::lifecycle::SlotLifecycleService;

/// Artificial delays applied while an operation holds the gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedLatency {
    pub generate: Duration,
    pub mutation: Duration,
    pub toggle: Duration,
}

impl SimulatedLatency {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generate: Duration::from_millis(config.generate_latency_ms),
            mutation: Duration::from_millis(config.mutation_latency_ms),
            toggle: Duration::from_millis(config.toggle_latency_ms),
        }
    }
}

#[derive(Debug, Default)]
struct ScheduleState {
    slots: BTreeMap<SlotKey, TimeSlot>,
    settings: AppointmentSettings,
    pending_transfer: Option<PendingTransfer>,
}

/// In-memory owner of every slot, the settings and the pending transfer.
///
/// Mutations go through a single gate: while one is in flight any other
/// mutation fails fast with `ScheduleError::Busy`. Reads never wait on it.
pub struct ScheduleService {
    doctors: Vec<Doctor>,
    state: RwLock<ScheduleState>,
    operation_gate: Mutex<()>,
    latency: SimulatedLatency,
    lifecycle: SlotLifecycleService,
    clock: Arc<dyn Clock>,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let settings = AppointmentSettings::from_config(config);
        debug!("Initializing schedule service with settings: {:?}", settings);

        Self {
            doctors: Doctor::default_roster(),
            state: RwLock::new(ScheduleState {
                settings,
                ..ScheduleState::default()
            }),
            operation_gate: Mutex::new(()),
            latency: SimulatedLatency::from_config(config),
            lifecycle: SlotLifecycleService::new(),
            clock,
        }
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn find_doctor(&self, doctor_id: &str) -> Result<&Doctor, ScheduleError> {
        let doctor_id = doctor_id.trim();
        if doctor_id.is_empty() {
            return Err(ScheduleError::DoctorNotSelected);
        }

        self.doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .ok_or_else(|| ScheduleError::DoctorNotFound(doctor_id.to_string()))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// True while a mutation holds the gate.
    pub fn is_busy(&self) -> bool {
        self.operation_gate.try_lock().is_err()
    }

    async fn begin_operation(&self, delay: Duration) -> Result<MutexGuard<'_, ()>, ScheduleError> {
        let guard = self.operation_gate.try_lock().map_err(|_| {
            warn!("Rejecting schedule operation: another operation is in progress");
            ScheduleError::Busy
        })?;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(guard)
    }

    /// New slot for a grid cell that has none yet. The key must name a
    /// working-hour row of the grid at the current slot duration.
    fn materialize(&self, key: &SlotKey, duration: u32) -> Result<TimeSlot, ScheduleError> {
        let doctor = self.find_doctor(&key.doctor_id)?;

        if !is_working_time(key.time) {
            warn!("Refusing to create slot {} outside working hours", key);
            return Err(ScheduleError::OutsideWorkingHours(key.clone()));
        }

        let on_grid = key.time.second() == 0
            && minute_marks(duration).any(|minute| minute == key.time.minute());
        if !on_grid {
            warn!("Refusing to create slot {} off the {}-minute grid", key, duration);
            return Err(ScheduleError::ValidationError(format!(
                "{} is not a grid cell for {}-minute slots",
                key, duration
            )));
        }

        Ok(TimeSlot::available(key, &doctor.name, duration))
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn settings(&self) -> AppointmentSettings {
        self.state.read().await.settings.clone()
    }

    pub async fn slot(&self, key: &SlotKey) -> Option<TimeSlot> {
        self.state.read().await.slots.get(key).cloned()
    }

    pub async fn doctor_slots(&self, doctor_id: &str) -> Result<Vec<TimeSlot>, ScheduleError> {
        let doctor = self.find_doctor(doctor_id)?;
        let state = self.state.read().await;

        Ok(state
            .slots
            .values()
            .filter(|slot| slot.doctor_id == doctor.id)
            .cloned()
            .collect())
    }

    pub async fn pending_transfer(&self) -> Option<PendingTransfer> {
        self.state.read().await.pending_transfer.clone()
    }

    /// Weekly grid for the week containing `today` (defaults to the clock's date).
    pub async fn weekly_grid(
        &self,
        doctor_id: &str,
        filter: GridFilter,
        today: Option<NaiveDate>,
    ) -> Result<WeeklyGrid, ScheduleError> {
        let doctor = self.find_doctor(doctor_id)?;
        let today = today.unwrap_or_else(|| self.clock.today());
        let state = self.state.read().await;

        grid::project_week(
            &state.slots,
            &doctor.id,
            today,
            state.settings.slot_duration,
            filter,
            &self.lifecycle,
        )
    }

    // ==========================================================================
    // MUTATIONS
    // ==========================================================================

    pub async fn update_settings(
        &self,
        request: UpdateSettingsRequest,
    ) -> Result<AppointmentSettings, ScheduleError> {
        let _guard = self.begin_operation(Duration::ZERO).await?;
        let mut state = self.state.write().await;

        let updated = state.settings.apply(&request);
        updated.validate()?;

        info!("Schedule settings updated: {:?}", updated);
        state.settings = updated.clone();
        Ok(updated)
    }

    /// Replace a doctor's slots with a fresh schedule starting today,
    /// carrying existing bookings over.
    pub async fn generate_schedule(&self, doctor_id: &str) -> Result<GenerationReport, ScheduleError> {
        let doctor = self.find_doctor(doctor_id)?.clone();
        let _guard = self.begin_operation(self.latency.generate).await?;

        let today = self.clock.today();
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let settings = state.settings.clone();
        let generator = SlotGenerator::new(settings.slot_duration)?;
        let mut fresh = generator.generate_range(today, settings.schedule_range, &doctor);

        let working_days = fresh.keys().map(|key| key.date).collect::<BTreeSet<_>>().len();
        let slots_generated = fresh.len();

        let previous: Vec<TimeSlot> = state
            .slots
            .values()
            .filter(|slot| slot.doctor_id == doctor.id)
            .cloned()
            .collect();
        let carry = generator.carry_over(&mut fresh, &previous, settings.orphan_policy);

        state.slots.retain(|key, _| key.doctor_id != doctor.id);
        state.slots.extend(fresh);

        let transfer_source_gone = state.pending_transfer.as_ref().is_some_and(|pending| {
            !state
                .slots
                .get(&pending.source)
                .is_some_and(|slot| slot.is_booked())
        });
        if transfer_source_gone {
            warn!("Pending transfer source disappeared during regeneration, clearing it");
            state.pending_transfer = None;
        }

        info!(
            "Generated {} slots over {} working days for doctor {} ({} bookings carried, {} orphaned)",
            slots_generated,
            working_days,
            doctor.id,
            carry.carried,
            carry.orphaned.len()
        );

        Ok(GenerationReport {
            doctor_id: doctor.id,
            working_days,
            slots_generated,
            bookings_carried_over: carry.carried,
            orphaned_bookings: carry.orphaned.iter().map(TimeSlot::key).collect(),
            orphan_policy: settings.orphan_policy,
        })
    }

    pub async fn book_slot(
        &self,
        key: &SlotKey,
        patient_name: &str,
        patient_phone: &str,
    ) -> Result<TimeSlot, ScheduleError> {
        let patient_name = patient_name.trim();
        let patient_phone = to_english_digits(patient_phone.trim());

        if patient_name.is_empty() || patient_phone.is_empty() {
            return Err(ScheduleError::ValidationError(
                "Patient name and phone are required".to_string(),
            ));
        }

        let _guard = self.begin_operation(self.latency.mutation).await?;
        let mut state = self.state.write().await;

        let slot = state
            .slots
            .get_mut(key)
            .ok_or_else(|| ScheduleError::SlotNotFound(key.clone()))?;
        self.lifecycle.validate_transition(slot.status(), SlotAction::Book)?;

        slot.state = SlotState::Booked {
            patient_name: patient_name.to_string(),
            patient_phone,
        };

        info!("Slot {} booked", key);
        Ok(slot.clone())
    }

    pub async fn cancel_booking(&self, key: &SlotKey) -> Result<TimeSlot, ScheduleError> {
        let _guard = self.begin_operation(self.latency.mutation).await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let slot = state
            .slots
            .get_mut(key)
            .ok_or_else(|| ScheduleError::SlotNotFound(key.clone()))?;
        self.lifecycle.validate_transition(slot.status(), SlotAction::Cancel)?;

        slot.state = SlotState::Available;
        let cancelled = slot.clone();

        if state
            .pending_transfer
            .as_ref()
            .is_some_and(|pending| pending.source == *key)
        {
            debug!("Cancelled booking was pending transfer, clearing marker");
            state.pending_transfer = None;
        }

        info!("Booking at {} cancelled", key);
        Ok(cancelled)
    }

    /// Flip `available ⇄ blocked`. A cell with no slot gets an `available`
    /// one; the next toggle blocks it.
    pub async fn toggle_slot(&self, key: &SlotKey) -> Result<TimeSlot, ScheduleError> {
        let _guard = self.begin_operation(self.latency.toggle).await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.slots.get_mut(key) {
            Some(slot) => {
                let next = self
                    .lifecycle
                    .validate_transition(slot.status(), SlotAction::Toggle)?;

                slot.state = match next {
                    SlotStatus::Blocked => SlotState::Blocked,
                    SlotStatus::Available | SlotStatus::Booked => SlotState::Available,
                };

                info!("Slot {} is now {}", key, next);
                Ok(slot.clone())
            }
            None => {
                let slot = self.materialize(key, state.settings.slot_duration)?;
                state.slots.insert(key.clone(), slot.clone());

                info!("Slot {} created as available", key);
                Ok(slot)
            }
        }
    }

    /// Mark a booked slot as the source of a transfer, replacing any
    /// transfer already pending.
    pub async fn begin_transfer(&self, key: &SlotKey) -> Result<PendingTransfer, ScheduleError> {
        let _guard = self.begin_operation(Duration::ZERO).await?;
        let mut state = self.state.write().await;

        let slot = state
            .slots
            .get(key)
            .ok_or_else(|| ScheduleError::SlotNotFound(key.clone()))?;
        self.lifecycle
            .validate_transition(slot.status(), SlotAction::BeginTransfer)?;

        let (Some(patient_name), Some(patient_phone)) = (slot.patient_name(), slot.patient_phone())
        else {
            return Err(ScheduleError::InvalidTransition {
                from: slot.status(),
                action: SlotAction::BeginTransfer,
            });
        };

        let pending = PendingTransfer {
            id: Uuid::new_v4(),
            source: key.clone(),
            patient_name: patient_name.to_string(),
            patient_phone: patient_phone.to_string(),
            started_at: self.clock.now(),
        };

        if let Some(previous) = state.pending_transfer.replace(pending.clone()) {
            debug!("Replacing pending transfer from {}", previous.source);
        }

        info!("Transfer pending from {}", key);
        Ok(pending)
    }

    pub async fn cancel_transfer(&self) -> Option<PendingTransfer> {
        let cleared = self.state.write().await.pending_transfer.take();
        if let Some(pending) = &cleared {
            info!("Pending transfer from {} cancelled", pending.source);
        }
        cleared
    }

    /// Move the booking at `from` to `to` in one step. `to` must be empty or
    /// available; on any error nothing changes and the pending marker stays.
    /// A marker pending for some other slot survives a successful move.
    pub async fn complete_transfer(
        &self,
        from: &SlotKey,
        to: &SlotKey,
    ) -> Result<TransferOutcome, ScheduleError> {
        if from.doctor_id != to.doctor_id {
            return Err(ScheduleError::ValidationError(
                "A booking can only be transferred within the same doctor's schedule".to_string(),
            ));
        }

        let _guard = self.begin_operation(self.latency.mutation).await?;
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let source = state
            .slots
            .get(from)
            .cloned()
            .ok_or_else(|| ScheduleError::SlotNotFound(from.clone()))?;
        self.lifecycle
            .validate_transition(source.status(), SlotAction::TransferOut)?;

        let destination = match state.slots.get(to) {
            Some(slot) => {
                self.lifecycle
                    .validate_transition(slot.status(), SlotAction::TransferInto)?;
                slot.clone()
            }
            None => self.materialize(to, state.settings.slot_duration)?,
        };

        let destination = TimeSlot {
            state: source.state.clone(),
            ..destination
        };
        let source = TimeSlot {
            state: SlotState::Available,
            ..source
        };

        state.slots.insert(from.clone(), source.clone());
        state.slots.insert(to.clone(), destination.clone());

        if state
            .pending_transfer
            .as_ref()
            .is_some_and(|pending| pending.source == *from)
        {
            state.pending_transfer = None;
        }

        info!("Booking transferred from {} to {}", from, to);
        Ok(TransferOutcome {
            source,
            destination,
        })
    }
}
