//! In-memory pairing registry and its state machine.
//!
//! ```text
//! notify   ──► upsert()   ──► pending ──┬─► approve() + preboot ack ──► approved (removed)
//!                                       └─► dismiss()                ──► dismissed (retained)
//! list()   ──► sweep stale pending / expired dismissed, then snapshot
//! ```
//!
//! Every compound read-then-write runs under a single write lock. The
//! preboot callback in `approve` runs with no lock held.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, Semaphore, broadcast};

use crate::config::PairingConfig;
use crate::error::PairingError;
use crate::pairing::clock::{Clock, SystemClock};
use crate::pairing::confirm::RemoteConfirmer;
use crate::pairing::types::{
    ApproveOutcome, DEFAULT_MESSAGE, PairingNotice, PairingRequest, PairingStatus, PairingSummary,
};

/// Events published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// The pending count went from zero to one. Presentation components use
    /// this to surface the approval prompt.
    WorkAvailable { request_id: String },
    Approved { request_id: String },
    Dismissed { request_id: String },
    Expired { request_id: String },
}

/// Owner of all pairing requests.
///
/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct PairingRegistry {
    requests: Arc<RwLock<HashMap<String, PairingRequest>>>,
    events: broadcast::Sender<PairingEvent>,
    confirmer: Arc<dyn RemoteConfirmer>,
    confirm_permits: Arc<Semaphore>,
    clock: Arc<dyn Clock>,
    config: PairingConfig,
}

impl PairingRegistry {
    pub fn new(config: PairingConfig, confirmer: Arc<dyn RemoteConfirmer>) -> Self {
        Self::with_clock(config, confirmer, Arc::new(SystemClock))
    }

    /// Create a registry reading time from `clock`.
    pub fn with_clock(
        config: PairingConfig,
        confirmer: Arc<dyn RemoteConfirmer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            events,
            confirmer,
            confirm_permits: Arc::new(Semaphore::new(config.max_concurrent_confirmations.max(1))),
            clock,
            config,
        }
    }

    /// Subscribe to registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<PairingEvent> {
        self.events.subscribe()
    }

    /// Record a pairing notification.
    ///
    /// Re-notifying a pending request overwrites its fields. A dismissed
    /// request cannot be reopened.
    pub async fn upsert(&self, notice: PairingNotice) -> Result<PairingRequest, PairingError> {
        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let expired = self.sweep_locked(&mut requests, now);

        if let Some(existing) = requests.get(&notice.request_id)
            && existing.status.is_terminal()
        {
            return Err(PairingError::Closed {
                request_id: notice.request_id,
                status: existing.status.to_string(),
            });
        }

        let pending_before = count_pending(&requests);

        let request = PairingRequest {
            request_id: notice.request_id.clone(),
            host_id: notice.host_id,
            client_ip: notice.client_ip,
            preboot_ip: notice.preboot_ip,
            message: notice
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            status: PairingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        requests.insert(notice.request_id.clone(), request.clone());

        let surface = pending_before == 0 && count_pending(&requests) == 1;
        drop(requests);

        self.publish_expired(expired);
        if surface {
            tracing::debug!(request_id = %request.request_id, "First pending pairing request");
            let _ = self.events.send(PairingEvent::WorkAvailable {
                request_id: request.request_id.clone(),
            });
        }

        Ok(request)
    }

    /// Look up a request.
    pub async fn get(&self, request_id: &str) -> Result<PairingRequest, PairingError> {
        self.requests
            .read()
            .await
            .get(request_id)
            .cloned()
            .ok_or_else(|| PairingError::NotFound {
                request_id: request_id.to_string(),
            })
    }

    /// Sweep stale entries, then list the rest oldest first.
    pub async fn list(&self) -> Vec<PairingSummary> {
        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let expired = self.sweep_locked(&mut requests, now);

        let mut live: Vec<&PairingRequest> = requests.values().collect();
        live.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        let summaries = live.into_iter().map(|r| r.summary(now)).collect();
        drop(requests);

        self.publish_expired(expired);
        summaries
    }

    /// Approve a pending request by confirming with its preboot agent.
    ///
    /// A failed confirmation is not an error: the request stays pending and
    /// the outcome reports `confirmed = false`.
    pub async fn approve(&self, request_id: &str) -> Result<ApproveOutcome, PairingError> {
        let preboot_ip = {
            let requests = self.requests.read().await;
            let request = requests
                .get(request_id)
                .ok_or_else(|| PairingError::NotFound {
                    request_id: request_id.to_string(),
                })?;
            if request.status.is_terminal() {
                return Err(PairingError::Closed {
                    request_id: request_id.to_string(),
                    status: request.status.to_string(),
                });
            }
            request
                .preboot_ip
                .ok_or_else(|| PairingError::MissingCallback {
                    request_id: request_id.to_string(),
                })?
        };

        let confirmed = self.confirm_bounded(request_id, preboot_ip).await;

        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| PairingError::NotFound {
                request_id: request_id.to_string(),
            })?;

        if !confirmed {
            return Ok(ApproveOutcome {
                confirmed: false,
                status: request.status,
            });
        }

        if !request.status.can_transition_to(PairingStatus::Approved) {
            tracing::warn!(
                request_id,
                status = %request.status,
                "Preboot confirmed a request that was closed meanwhile"
            );
            return Err(PairingError::Closed {
                request_id: request_id.to_string(),
                status: request.status.to_string(),
            });
        }

        request.status = PairingStatus::Approved;
        request.updated_at = now;
        requests.remove(request_id);
        drop(requests);

        let _ = self.events.send(PairingEvent::Approved {
            request_id: request_id.to_string(),
        });
        Ok(ApproveOutcome {
            confirmed: true,
            status: PairingStatus::Approved,
        })
    }

    /// Dismiss a request. Dismissing twice is a no-op.
    pub async fn dismiss(&self, request_id: &str) -> Result<PairingRequest, PairingError> {
        let now = self.clock.now();
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(request_id)
            .ok_or_else(|| PairingError::NotFound {
                request_id: request_id.to_string(),
            })?;

        match request.status {
            PairingStatus::Dismissed => return Ok(request.clone()),
            PairingStatus::Approved => {
                return Err(PairingError::Closed {
                    request_id: request_id.to_string(),
                    status: request.status.to_string(),
                });
            }
            PairingStatus::Pending => {}
        }

        request.status = PairingStatus::Dismissed;
        request.updated_at = now;
        let dismissed = request.clone();
        drop(requests);

        let _ = self.events.send(PairingEvent::Dismissed {
            request_id: request_id.to_string(),
        });
        Ok(dismissed)
    }

    /// Number of pending requests (not swept).
    pub async fn pending_count(&self) -> usize {
        count_pending(&*self.requests.read().await)
    }

    /// Number of live entries (not swept).
    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }

    /// Waiting for a confirmation slot counts against the same timeout as
    /// the confirmation itself.
    async fn confirm_bounded(&self, request_id: &str, preboot_ip: std::net::IpAddr) -> bool {
        let bounded = async {
            // The semaphore is never closed, so acquire only fails if it were.
            let _permit = self.confirm_permits.acquire().await.ok()?;
            Some(self.confirmer.confirm(request_id, preboot_ip).await)
        };

        match tokio::time::timeout(self.config.confirm_timeout, bounded).await {
            Ok(confirmed) => confirmed.unwrap_or(false),
            Err(_) => {
                tracing::warn!(
                    request_id,
                    timeout_ms = self.config.confirm_timeout.as_millis() as u64,
                    "Preboot confirmation timed out"
                );
                false
            }
        }
    }

    /// Drop stale pending and expired dismissed entries. Caller holds the lock.
    fn sweep_locked(
        &self,
        requests: &mut HashMap<String, PairingRequest>,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut expired = Vec::new();
        requests.retain(|id, request| {
            let keep = match request.status {
                PairingStatus::Pending => {
                    !older_than(request.created_at, now, self.config.pending_ttl)
                }
                PairingStatus::Dismissed => {
                    !older_than(request.updated_at, now, self.config.dismissed_retention)
                }
                PairingStatus::Approved => false,
            };
            if !keep {
                expired.push(id.clone());
            }
            keep
        });
        expired
    }

    fn publish_expired(&self, expired: Vec<String>) {
        for request_id in expired {
            tracing::debug!(request_id = %request_id, "Pairing request expired");
            let _ = self.events.send(PairingEvent::Expired { request_id });
        }
    }
}

fn count_pending(requests: &HashMap<String, PairingRequest>) -> usize {
    requests
        .values()
        .filter(|r| r.status == PairingStatus::Pending)
        .count()
}

fn older_than(since: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    (now - since).num_milliseconds() > limit.as_millis() as i64
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::pairing::clock::ManualClock;

    /// Confirmer with a fixed answer that counts its calls.
    struct FakeConfirmer {
        answer: AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeConfirmer {
        fn new(answer: bool) -> Arc<Self> {
            Arc::new(Self {
                answer: AtomicBool::new(answer),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteConfirmer for FakeConfirmer {
        async fn confirm(&self, _request_id: &str, _preboot_ip: IpAddr) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.load(Ordering::SeqCst)
        }
    }

    /// Confirmer that blocks until released.
    struct GatedConfirmer {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RemoteConfirmer for GatedConfirmer {
        async fn confirm(&self, _request_id: &str, _preboot_ip: IpAddr) -> bool {
            self.entered.notify_one();
            self.release.notified().await;
            true
        }
    }

    fn notice(id: &str) -> PairingNotice {
        PairingNotice {
            request_id: id.to_string(),
            host_id: "h1".to_string(),
            client_ip: Some("10.0.0.5".to_string()),
            preboot_ip: Some("10.0.0.5".parse().unwrap()),
            message: None,
        }
    }

    fn registry(confirmer: Arc<dyn RemoteConfirmer>) -> (PairingRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let registry =
            PairingRegistry::with_clock(PairingConfig::default(), confirmer, clock.clone());
        (registry, clock)
    }

    #[tokio::test]
    async fn test_upsert_creates_pending() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        let request = registry.upsert(notice("r1")).await.unwrap();

        assert_eq!(request.status, PairingStatus::Pending);
        assert_eq!(request.message, DEFAULT_MESSAGE);
        assert_eq!(registry.get("r1").await.unwrap().host_id, "h1");
    }

    #[tokio::test]
    async fn test_renotify_is_idempotent() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("r1")).await.unwrap();
        registry
            .upsert(PairingNotice {
                message: Some("second".to_string()),
                ..notice("r1")
            })
            .await
            .unwrap();

        assert_eq!(registry.len().await, 1);
        let request = registry.get("r1").await.unwrap();
        assert_eq!(request.status, PairingStatus::Pending);
        assert_eq!(request.message, "second");
    }

    #[tokio::test]
    async fn test_renotify_dismissed_is_rejected() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("r1")).await.unwrap();
        registry.dismiss("r1").await.unwrap();

        let err = registry.upsert(notice("r1")).await.unwrap_err();
        assert!(matches!(err, PairingError::Closed { .. }));
        assert_eq!(
            registry.get("r1").await.unwrap().status,
            PairingStatus::Dismissed
        );
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        let err = registry.get("ghost").await.unwrap_err();
        assert!(matches!(err, PairingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_work_available_only_on_first_pending() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        let mut events = registry.subscribe();

        registry.upsert(notice("r1")).await.unwrap();
        registry.upsert(notice("r1")).await.unwrap();
        registry.upsert(notice("r2")).await.unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            PairingEvent::WorkAvailable {
                request_id: "r1".to_string()
            }
        );
        assert!(events.try_recv().is_err());

        // Back to zero pending, then one again.
        registry.dismiss("r1").await.unwrap();
        registry.dismiss("r2").await.unwrap();
        registry.upsert(notice("r3")).await.unwrap();

        let mut surfaced = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PairingEvent::WorkAvailable { request_id } = event {
                surfaced.push(request_id);
            }
        }
        assert_eq!(surfaced, vec!["r3".to_string()]);
    }

    #[tokio::test]
    async fn test_list_sweeps_stale_pending_but_keeps_dismissed() {
        let (registry, clock) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("stale")).await.unwrap();
        registry.upsert(notice("closed")).await.unwrap();
        clock.advance(chrono::Duration::seconds(10));
        registry.dismiss("closed").await.unwrap();

        clock.advance(chrono::Duration::seconds(591));

        let listed = registry.list().await;
        let ids: Vec<_> = listed.iter().map(|s| s.request_id.as_str()).collect();
        assert_eq!(ids, vec!["closed"]);
        assert_eq!(listed[0].status, PairingStatus::Dismissed);
        assert_eq!(listed[0].age_sec, 601);
        assert!(registry.get("stale").await.is_err());
    }

    #[tokio::test]
    async fn test_pending_at_exact_ttl_is_kept() {
        let (registry, clock) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("r1")).await.unwrap();
        clock.advance(chrono::Duration::seconds(600));
        assert_eq!(registry.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dismissed_expires_after_retention() {
        let (registry, clock) = registry(FakeConfirmer::new(true));
        let mut events = registry.subscribe();
        registry.upsert(notice("r1")).await.unwrap();
        registry.dismiss("r1").await.unwrap();

        clock.advance(chrono::Duration::seconds(3601));
        assert!(registry.list().await.is_empty());

        let mut saw_expired = false;
        while let Ok(event) = events.try_recv() {
            saw_expired |= event
                == PairingEvent::Expired {
                    request_id: "r1".to_string(),
                };
        }
        assert!(saw_expired);
    }

    #[tokio::test]
    async fn test_list_sorted_oldest_first_with_age() {
        let (registry, clock) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("b")).await.unwrap();
        clock.advance(chrono::Duration::seconds(5));
        registry.upsert(notice("a")).await.unwrap();
        clock.advance(chrono::Duration::seconds(2));

        let listed = registry.list().await;
        assert_eq!(listed[0].request_id, "b");
        assert_eq!(listed[0].age_sec, 7);
        assert_eq!(listed[1].request_id, "a");
        assert_eq!(listed[1].age_sec, 2);
    }

    #[tokio::test]
    async fn test_approve_success_removes_entry() {
        let confirmer = FakeConfirmer::new(true);
        let (registry, _) = registry(confirmer.clone());
        let mut events = registry.subscribe();
        registry.upsert(notice("r1")).await.unwrap();

        let outcome = registry.approve("r1").await.unwrap();
        assert!(outcome.confirmed);
        assert_eq!(outcome.status, PairingStatus::Approved);
        assert_eq!(confirmer.calls(), 1);
        assert!(matches!(
            registry.get("r1").await,
            Err(PairingError::NotFound { .. })
        ));
        assert!(registry.list().await.is_empty());

        let mut approved = false;
        while let Ok(event) = events.try_recv() {
            approved |= matches!(event, PairingEvent::Approved { .. });
        }
        assert!(approved);
    }

    #[tokio::test]
    async fn test_approve_unknown_never_calls_confirmer() {
        let confirmer = FakeConfirmer::new(true);
        let (registry, _) = registry(confirmer.clone());

        let err = registry.approve("ghost").await.unwrap_err();
        assert!(matches!(err, PairingError::NotFound { .. }));
        assert_eq!(confirmer.calls(), 0);
    }

    #[tokio::test]
    async fn test_approve_failure_keeps_pending() {
        let confirmer = FakeConfirmer::new(false);
        let (registry, _) = registry(confirmer.clone());
        registry.upsert(notice("r1")).await.unwrap();

        let outcome = registry.approve("r1").await.unwrap();
        assert!(!outcome.confirmed);
        assert_eq!(outcome.status, PairingStatus::Pending);
        assert_eq!(
            registry.get("r1").await.unwrap().status,
            PairingStatus::Pending
        );
        assert_eq!(registry.list().await.len(), 1);

        // Retry succeeds once the preboot answers.
        confirmer.answer.store(true, Ordering::SeqCst);
        assert!(registry.approve("r1").await.unwrap().confirmed);
        assert_eq!(confirmer.calls(), 2);
    }

    #[tokio::test]
    async fn test_approve_without_callback_address() {
        let confirmer = FakeConfirmer::new(true);
        let (registry, _) = registry(confirmer.clone());
        registry
            .upsert(PairingNotice {
                preboot_ip: None,
                ..notice("r1")
            })
            .await
            .unwrap();

        let err = registry.approve("r1").await.unwrap_err();
        assert!(matches!(err, PairingError::MissingCallback { .. }));
        assert_eq!(confirmer.calls(), 0);
    }

    #[tokio::test]
    async fn test_approve_dismissed_is_rejected() {
        let confirmer = FakeConfirmer::new(true);
        let (registry, _) = registry(confirmer.clone());
        registry.upsert(notice("r1")).await.unwrap();
        registry.dismiss("r1").await.unwrap();

        let err = registry.approve("r1").await.unwrap_err();
        assert!(matches!(err, PairingError::Closed { .. }));
        assert_eq!(confirmer.calls(), 0);
    }

    #[tokio::test]
    async fn test_dismiss_is_terminal_and_idempotent() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        registry.upsert(notice("r1")).await.unwrap();

        let first = registry.dismiss("r1").await.unwrap();
        let second = registry.dismiss("r1").await.unwrap();
        assert_eq!(first.status, PairingStatus::Dismissed);
        assert_eq!(second.status, PairingStatus::Dismissed);
        assert_eq!(registry.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_dismiss_unknown() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        assert!(matches!(
            registry.dismiss("ghost").await,
            Err(PairingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_confirmation_runs_without_holding_lock() {
        let confirmer = Arc::new(GatedConfirmer {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let (registry, _) = registry(confirmer.clone());
        registry.upsert(notice("r1")).await.unwrap();

        let approving = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.approve("r1").await })
        };
        confirmer.entered.notified().await;

        // Registry stays usable while the callback is in flight.
        registry.upsert(notice("r2")).await.unwrap();
        assert_eq!(registry.list().await.len(), 2);
        assert_eq!(
            registry.get("r1").await.unwrap().status,
            PairingStatus::Pending
        );

        confirmer.release.notify_one();
        let outcome = approving.await.unwrap().unwrap();
        assert!(outcome.confirmed);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_dismiss_during_confirmation_wins() {
        let confirmer = Arc::new(GatedConfirmer {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let (registry, _) = registry(confirmer.clone());
        registry.upsert(notice("r1")).await.unwrap();

        let approving = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.approve("r1").await })
        };
        confirmer.entered.notified().await;
        registry.dismiss("r1").await.unwrap();
        confirmer.release.notify_one();

        let err = approving.await.unwrap().unwrap_err();
        assert!(matches!(err, PairingError::Closed { .. }));
        assert_eq!(
            registry.get("r1").await.unwrap().status,
            PairingStatus::Dismissed
        );
    }

    #[tokio::test]
    async fn test_confirmation_timeout_counts_as_failure() {
        struct Hanging;

        #[async_trait]
        impl RemoteConfirmer for Hanging {
            async fn confirm(&self, _request_id: &str, _preboot_ip: IpAddr) -> bool {
                std::future::pending::<bool>().await
            }
        }

        let config = PairingConfig {
            confirm_timeout: Duration::from_millis(50),
            ..PairingConfig::default()
        };
        let registry = PairingRegistry::new(config, Arc::new(Hanging));
        registry.upsert(notice("r1")).await.unwrap();

        let outcome = registry.approve("r1").await.unwrap();
        assert!(!outcome.confirmed);
        assert_eq!(outcome.status, PairingStatus::Pending);
    }

    #[tokio::test]
    async fn test_waiting_for_confirmation_slot_is_bounded() {
        let confirmer = FakeConfirmer::new(true);
        let config = PairingConfig {
            confirm_timeout: Duration::from_millis(50),
            max_concurrent_confirmations: 1,
            ..PairingConfig::default()
        };
        let registry = PairingRegistry::new(config, confirmer.clone());
        registry.upsert(notice("r1")).await.unwrap();

        let _busy = registry.confirm_permits.clone().acquire_owned().await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(2), registry.approve("r1"))
            .await
            .expect("approve waited past the confirmation timeout")
            .unwrap();
        assert!(!outcome.confirmed);
        assert_eq!(outcome.status, PairingStatus::Pending);
        assert_eq!(confirmer.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_notifies_distinct_ids() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.upsert(notice(&format!("r{}", i))).await })
            })
            .collect();
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        assert_eq!(registry.len().await, 32);
        assert_eq!(registry.pending_count().await, 32);
    }

    #[tokio::test]
    async fn test_concurrent_first_notifies_surface_once() {
        let (registry, _) = registry(FakeConfirmer::new(true));
        let mut events = registry.subscribe();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.upsert(notice(&format!("r{}", i))).await })
            })
            .collect();
        futures::future::join_all(tasks).await;

        let mut surfaced = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, PairingEvent::WorkAvailable { .. }) {
                surfaced += 1;
            }
        }
        assert_eq!(surfaced, 1);
    }
}
