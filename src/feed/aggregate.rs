use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use super::client::FeedSource;
use super::parking::normalize_parking_spaces;
use super::traffic::normalize_traffic_incidents;
use super::types::{ParkingSpace, SourceTimestamps, TrafficSection, TransportLivePayload};
use super::{init_cache, PayloadCache};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("Unable to reach Transport Department parking feeds.")]
    Unavailable,
}

/// Orchestrates the three source fetches, applies the fatal/degraded policy
/// and memoizes the assembled snapshot for the cache TTL. The info and
/// vacancy sources are mandatory; the traffic source degrades to an empty
/// incident section.
pub struct TransportFeed<S: FeedSource> {
    source: S,
    cache: PayloadCache,
}

impl<S: FeedSource> TransportFeed<S> {
    pub fn new(source: S, cache_ttl: Duration) -> Self {
        Self {
            source,
            cache: init_cache(cache_ttl),
        }
    }

    /// Returns the current payload, serving the cached snapshot while it is
    /// younger than the TTL. Concurrent refreshes are collapsed into a single
    /// upstream round-trip; every waiting caller shares the resulting
    /// snapshot. A bypass call always re-fetches and leaves the slot alone.
    pub async fn live_payload(
        &self,
        bypass_cache: bool,
    ) -> Result<Arc<TransportLivePayload>, FeedError> {
        if bypass_cache {
            return self.build_payload().await;
        }

        self.cache
            .try_get_with((), self.build_payload())
            .await
            .map_err(|err| (*err).clone())
    }

    /// Linear search of the live parking sequence. A feed outage propagates
    /// to the caller rather than being masked as "not found".
    pub async fn find_space_by_id(&self, id: &str) -> Result<Option<ParkingSpace>, FeedError> {
        let payload = self.live_payload(false).await?;
        Ok(payload
            .parking
            .iter()
            .find(|space| space.id == id)
            .cloned())
    }

    async fn build_payload(&self) -> Result<Arc<TransportLivePayload>, FeedError> {
        let (info, vacancy, traffic_xml) = tokio::join!(
            self.source.carpark_info(),
            self.source.carpark_vacancy(),
            self.source.traffic_news(),
        );

        let (info, vacancy) = match (info, vacancy) {
            (Some(info), Some(vacancy)) => (info, vacancy),
            _ => return Err(FeedError::Unavailable),
        };

        let parking = normalize_parking_spaces(&info, &vacancy);
        let (incidents, incidents_timestamp) = normalize_traffic_incidents(traffic_xml.as_deref());

        Ok(Arc::new(TransportLivePayload {
            generated_at: Utc::now(),
            parking,
            traffic: TrafficSection {
                incidents,
                source_timestamps: SourceTimestamps {
                    incidents: incidents_timestamp,
                },
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::mock::StaticFeedSource;

    fn ttl() -> Duration {
        Duration::from_secs(30)
    }

    #[tokio::test]
    async fn test_missing_vacancy_source_is_fatal() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples().without_vacancy(), ttl());
        assert_eq!(feed.live_payload(false).await, Err(FeedError::Unavailable));
    }

    #[tokio::test]
    async fn test_missing_info_source_is_fatal() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples().without_info(), ttl());
        assert_eq!(feed.live_payload(false).await, Err(FeedError::Unavailable));
    }

    #[tokio::test]
    async fn test_missing_traffic_source_degrades_gracefully() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples().without_traffic(), ttl());
        let payload = feed.live_payload(false).await.unwrap();
        assert!(!payload.parking.is_empty());
        assert!(payload.traffic.incidents.is_empty());
        assert!(payload.traffic.source_timestamps.incidents.is_none());
    }

    #[tokio::test]
    async fn test_full_payload_assembly() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples(), ttl());
        let payload = feed.live_payload(false).await.unwrap();
        assert_eq!(payload.parking.len(), 2);
        assert_eq!(payload.traffic.incidents.len(), 2);
        assert_eq!(
            payload.traffic.source_timestamps.incidents,
            payload.traffic.incidents[0].start_time
        );
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_hits_the_cache() {
        let source = StaticFeedSource::with_samples();
        let rounds = source.round_counter();
        let feed = TransportFeed::new(source, ttl());

        let first = feed.live_payload(false).await.unwrap();
        let second = feed.live_payload(false).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bypass_always_refetches_and_leaves_slot_alone() {
        let source = StaticFeedSource::with_samples();
        let rounds = source.round_counter();
        let feed = TransportFeed::new(source, ttl());

        let cached = feed.live_payload(false).await.unwrap();
        let fresh = feed.live_payload(true).await.unwrap();
        assert!(!Arc::ptr_eq(&cached, &fresh));

        // The slot still holds the first snapshot.
        let third = feed.live_payload(false).await.unwrap();
        assert!(Arc::ptr_eq(&cached, &third));
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_slot_triggers_a_fresh_aggregation() {
        let source = StaticFeedSource::with_samples();
        let rounds = source.round_counter();
        let feed = TransportFeed::new(source, Duration::from_millis(50));

        let first = feed.live_payload(false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let second = feed.live_payload(false).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_cold_calls_collapse_into_one_fetch() {
        let source = StaticFeedSource::with_samples().with_delay(Duration::from_millis(40));
        let rounds = source.round_counter();
        let feed = Arc::new(TransportFeed::new(source, ttl()));

        let (a, b) = tokio::join!(feed.live_payload(false), feed.live_payload(false));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_aggregation_is_not_cached() {
        let source = StaticFeedSource::with_samples().without_vacancy();
        let rounds = source.round_counter();
        let feed = TransportFeed::new(source, ttl());

        assert!(feed.live_payload(false).await.is_err());
        assert!(feed.live_payload(false).await.is_err());
        // Both calls reached upstream: an error never occupies the slot.
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_find_space_by_id() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples(), ttl());

        let found = feed.find_space_by_id("tdc31p2").await.unwrap();
        assert_eq!(found.map(|space| space.title), Some("Star Ferry Carpark".to_string()));

        let missing = feed.find_space_by_id("no-such-carpark").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_space_by_id_propagates_outage() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples().without_info(), ttl());
        assert_eq!(
            feed.find_space_by_id("tdc31p2").await,
            Err(FeedError::Unavailable)
        );
    }
}
