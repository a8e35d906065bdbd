//! Brings the approval UI forward when work appears.
//!
//! Listens to registry events and, on [`PairingEvent::WorkAvailable`],
//! opens the configured surface URL in the desktop browser.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::pairing::PairingEvent;

type Opener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

pub struct WorkSurfacer {
    surface_url: Option<String>,
    opener: Opener,
}

impl WorkSurfacer {
    pub fn new(surface_url: Option<String>) -> Self {
        Self {
            surface_url,
            opener: Arc::new(|url: &str| open::that(url)),
        }
    }

    /// Replace how URLs are opened.
    pub fn with_opener(
        mut self,
        opener: impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    /// Consume events until the registry is dropped.
    pub async fn run(self, mut events: broadcast::Receiver<PairingEvent>) {
        loop {
            match events.recv().await {
                Ok(PairingEvent::WorkAvailable { request_id }) => {
                    tracing::info!(%request_id, "Pairing work available");
                    self.surface().await;
                }
                Ok(event) => tracing::debug!(?event, "Pairing event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Pairing event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn surface(&self) {
        let Some(url) = self.surface_url.clone() else {
            return;
        };
        let opener = Arc::clone(&self.opener);
        let target = url.clone();
        match tokio::task::spawn_blocking(move || opener(&target)).await {
            Ok(Ok(())) => tracing::debug!(%url, "Opened approval surface"),
            Ok(Err(e)) => tracing::warn!(%url, "Failed to open approval surface: {}", e),
            Err(e) => tracing::warn!(%url, "Approval surface task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    fn recording() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> std::io::Result<()> + Send + Sync) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&opened);
        (opened, move |url: &str| {
            sink.lock().unwrap().push(url.to_string());
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_opens_surface_on_work_available_only() {
        let (tx, rx) = broadcast::channel(8);
        let (opened, opener) = recording();
        let surfacer =
            WorkSurfacer::new(Some("http://127.0.0.1:7030/ui".to_string())).with_opener(opener);
        let task = tokio::spawn(surfacer.run(rx));

        tx.send(PairingEvent::Dismissed {
            request_id: "r0".to_string(),
        })
        .unwrap();
        tx.send(PairingEvent::WorkAvailable {
            request_id: "r1".to_string(),
        })
        .unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*opened.lock().unwrap(), vec!["http://127.0.0.1:7030/ui".to_string()]);
    }

    #[tokio::test]
    async fn test_no_url_means_log_only() {
        let (tx, rx) = broadcast::channel(8);
        let (opened, opener) = recording();
        let task = tokio::spawn(WorkSurfacer::new(None).with_opener(opener).run(rx));

        tx.send(PairingEvent::WorkAvailable {
            request_id: "r1".to_string(),
        })
        .unwrap();
        drop(tx);

        task.await.unwrap();
        assert!(opened.lock().unwrap().is_empty());
    }
}
