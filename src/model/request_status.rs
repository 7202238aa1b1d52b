use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

/// Lifecycle of absence and vacation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    /// Statuses a request may move to. Rejected and cancelled are final.
    pub fn can_move_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RequestStatus::*;

    #[test]
    fn pending_can_be_decided_or_cancelled() {
        assert!(Pending.can_move_to(Approved));
        assert!(Pending.can_move_to(Rejected));
        assert!(Pending.can_move_to(Cancelled));
    }

    #[test]
    fn approved_can_only_be_cancelled() {
        assert!(Approved.can_move_to(Cancelled));
        assert!(!Approved.can_move_to(Rejected));
        assert!(!Approved.can_move_to(Pending));
    }

    #[test]
    fn final_states_stay_final() {
        for next in [Pending, Approved, Rejected, Cancelled] {
            assert!(!Rejected.can_move_to(next));
            assert!(!Cancelled.can_move_to(next));
        }
    }
}
