//! View model of the approval agent.

use crate::pairing::{PairingStatus, PairingSummary};

pub const FAILED_NOTICE: &str = "Failed to approve flake.";

/// What the operator should currently see.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AgentView {
    /// Nothing pending; presentation hidden.
    #[default]
    Idle,
    /// A pending request awaiting a decision.
    Prompt {
        request: PairingSummary,
        notice: Option<String>,
    },
    /// Accept pressed, waiting for the daemon.
    Approving { request: PairingSummary },
    /// Approval confirmed; shown briefly before going idle.
    Approved { request: PairingSummary },
}

impl AgentView {
    pub fn focused(&self) -> Option<&PairingSummary> {
        match self {
            AgentView::Idle => None,
            AgentView::Prompt { request, .. }
            | AgentView::Approving { request }
            | AgentView::Approved { request } => Some(request),
        }
    }

    /// An action is in flight or its result is on screen; polls must not
    /// replace the view.
    pub fn is_busy(&self) -> bool {
        matches!(self, AgentView::Approving { .. } | AgentView::Approved { .. })
    }
}

/// Decide the next view after a poll. `None` means keep the current view.
///
/// Only the earliest pending request is ever shown; later ones queue
/// behind it.
pub fn reconcile(current: &AgentView, requests: &[PairingSummary]) -> Option<AgentView> {
    if current.is_busy() {
        return None;
    }

    let earliest = requests
        .iter()
        .filter(|r| r.status == PairingStatus::Pending)
        .max_by(|a, b| {
            a.age_sec
                .cmp(&b.age_sec)
                .then_with(|| b.request_id.cmp(&a.request_id))
        });

    match (current, earliest) {
        (AgentView::Idle, None) => None,
        (_, None) => Some(AgentView::Idle),
        (current, Some(next)) => {
            if current.focused().map(|r| &r.request_id) == Some(&next.request_id) {
                None
            } else {
                Some(AgentView::Prompt {
                    request: next.clone(),
                    notice: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, status: PairingStatus, age_sec: u64) -> PairingSummary {
        PairingSummary {
            request_id: id.to_string(),
            status,
            host_id: "h1".to_string(),
            client_ip: Some("10.0.0.5".to_string()),
            message: "m".to_string(),
            age_sec,
        }
    }

    #[test]
    fn test_idle_stays_idle_without_pending() {
        let requests = [summary("d", PairingStatus::Dismissed, 10)];
        assert_eq!(reconcile(&AgentView::Idle, &requests), None);
    }

    #[test]
    fn test_focuses_earliest_pending() {
        let requests = [
            summary("young", PairingStatus::Pending, 3),
            summary("old", PairingStatus::Pending, 30),
            summary("older-but-dismissed", PairingStatus::Dismissed, 90),
        ];
        let next = reconcile(&AgentView::Idle, &requests).unwrap();
        assert_eq!(next.focused().unwrap().request_id, "old");
    }

    #[test]
    fn test_same_focus_keeps_notice() {
        let current = AgentView::Prompt {
            request: summary("r1", PairingStatus::Pending, 5),
            notice: Some(FAILED_NOTICE.to_string()),
        };
        let requests = [summary("r1", PairingStatus::Pending, 8)];
        assert_eq!(reconcile(&current, &requests), None);
    }

    #[test]
    fn test_vanished_focus_goes_idle() {
        let current = AgentView::Prompt {
            request: summary("r1", PairingStatus::Pending, 5),
            notice: None,
        };
        assert_eq!(reconcile(&current, &[]), Some(AgentView::Idle));
    }

    #[test]
    fn test_vanished_focus_moves_to_next() {
        let current = AgentView::Prompt {
            request: summary("r1", PairingStatus::Pending, 5),
            notice: None,
        };
        let requests = [summary("r2", PairingStatus::Pending, 1)];
        let next = reconcile(&current, &requests).unwrap();
        assert_eq!(next.focused().unwrap().request_id, "r2");
    }

    #[test]
    fn test_busy_views_are_not_replaced() {
        let approving = AgentView::Approving {
            request: summary("r1", PairingStatus::Pending, 5),
        };
        let approved = AgentView::Approved {
            request: summary("r1", PairingStatus::Pending, 5),
        };
        assert_eq!(reconcile(&approving, &[]), None);
        assert_eq!(reconcile(&approved, &[]), None);
    }
}
