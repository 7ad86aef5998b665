//! Periodic bookkeeping: lapsed echo offers and stale interest.
//!
//! Readers re-check deadlines themselves, so a missed pass only delays the
//! `EchoExpired` notifications, never the expiry itself.

use std::time::Duration;
use tokio::time;
use tracing::{error, info};

use super::Engine;

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub offers: usize,
    pub interests: usize,
}

impl Engine {
    /// One pass over both expiry kinds. Failures are logged and counted as
    /// zero so the next pass can pick them up.
    pub async fn sweep_once(&self) -> SweepReport {
        let offers = match self.sweep_expired_offers().await {
            Ok(n) => n,
            Err(e) => {
                error!("❌ Failed to sweep echo offers: {}", e);
                0
            }
        };

        let interests = match self.expire_stale_interests().await {
            Ok(n) => n,
            Err(e) => {
                error!("❌ Failed to expire stale interests: {}", e);
                0
            }
        };

        SweepReport { offers, interests }
    }

    /// Sweeps forever at a fixed cadence. Expiry events are published on
    /// this engine's feed, so it should run in the process that serves
    /// feed subscribers.
    pub async fn run_sweeps(&self, every: Duration) {
        let mut interval = time::interval(every);
        let mut iter_count: usize = 0;

        loop {
            interval.tick().await;
            iter_count += 1;

            let report = self.sweep_once().await;
            if iter_count % 60 == 0 {
                info!(
                    "📊 Sweeper iteration {} | last pass: {} offers, {} interests",
                    iter_count, report.offers, report.interests
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{harness_with, settings};
    use crate::models::{FeedEventKind, UserId};
    use crate::utils::EngineSettings;

    const A: UserId = UserId(1);
    const B: UserId = UserId(2);
    const C: UserId = UserId(3);

    #[tokio::test]
    async fn test_sweep_once_covers_offers_and_interest() {
        let h = harness_with(EngineSettings {
            interest_ttl: Some(chrono::Duration::days(30)),
            ..settings()
        });
        h.engine.send_interest(A, B).await.unwrap();
        let offer = h.engine.grant_offer(A, B).await.unwrap();
        h.engine.send_interest(C, B).await.unwrap();
        let mut feed = h.engine.feed().subscribe(B);

        assert_eq!(h.engine.sweep_once().await, SweepReport::default());

        h.clock.advance(chrono::Duration::days(31));
        let report = h.engine.sweep_once().await;
        assert_eq!(report, SweepReport { offers: 1, interests: 2 });

        let event = feed.recv().await.unwrap();
        assert_eq!(event.kind, FeedEventKind::EchoExpired { offer_id: offer.id });
    }

    #[tokio::test]
    async fn test_sweep_survives_store_outage() {
        let h = harness_with(settings());
        h.store.fail_next_calls(100);
        assert_eq!(h.engine.sweep_once().await, SweepReport::default());
    }
}
