// libs/schedule-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{ScheduleError, SlotAction, SlotStatus};

/// Transition rules for a single slot.
///
/// ```text
/// available --book / transfer into--> booked
/// booked    --cancel / transfer out--> available
/// available <--------toggle--------> blocked
/// ```
///
/// Booked slots never toggle.
#[derive(Debug, Default)]
pub struct SlotLifecycleService;

impl SlotLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Returns the status a slot ends up in after `action`, or
    /// `InvalidTransition` when the action is not allowed from `current`.
    pub fn validate_transition(
        &self,
        current: SlotStatus,
        action: SlotAction,
    ) -> Result<SlotStatus, ScheduleError> {
        debug!("Validating slot transition: {} on {}", action, current);

        match self.next_status(current, action) {
            Some(next) => Ok(next),
            None => {
                warn!("Rejected slot transition: cannot {} a {} slot", action, current);
                Err(ScheduleError::InvalidTransition {
                    from: current,
                    action,
                })
            }
        }
    }

    /// All actions permitted from `current`.
    pub fn get_valid_actions(&self, current: SlotStatus) -> Vec<SlotAction> {
        [
            SlotAction::Book,
            SlotAction::Cancel,
            SlotAction::Toggle,
            SlotAction::BeginTransfer,
            SlotAction::TransferOut,
            SlotAction::TransferInto,
        ]
        .into_iter()
        .filter(|action| self.next_status(current, *action).is_some())
        .collect()
    }

    fn next_status(&self, current: SlotStatus, action: SlotAction) -> Option<SlotStatus> {
        match (current, action) {
            (SlotStatus::Available, SlotAction::Book) => Some(SlotStatus::Booked),
            (SlotStatus::Available, SlotAction::Toggle) => Some(SlotStatus::Blocked),
            (SlotStatus::Available, SlotAction::TransferInto) => Some(SlotStatus::Booked),
            (SlotStatus::Available, _) => None,

            (SlotStatus::Blocked, SlotAction::Toggle) => Some(SlotStatus::Available),
            (SlotStatus::Blocked, _) => None,

            (SlotStatus::Booked, SlotAction::Cancel) => Some(SlotStatus::Available),
            (SlotStatus::Booked, SlotAction::TransferOut) => Some(SlotStatus::Available),
            (SlotStatus::Booked, SlotAction::BeginTransfer) => Some(SlotStatus::Booked),
            (SlotStatus::Booked, _) => None,
        }
    }
}
