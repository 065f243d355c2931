use crate::feed::aggregate::{FeedError, TransportFeed};
use crate::feed::client::FeedSource;
use crate::feed::types::{Availability, District, ParkingSpace};

/// Curated spaces served even when the live feed is cold or degraded. Slot
/// counts and availability buckets follow the same invariants as normalized
/// records.
pub fn seed_spaces() -> Vec<ParkingSpace> {
    vec![
        ParkingSpace {
            id: "hk-central-001".to_string(),
            title: "Two IFC Carpark".to_string(),
            host: "Henderson management".to_string(),
            district: District::HongKongIsland,
            address: "8 Finance Street, Central".to_string(),
            hourly_rate: 32,
            ev_friendly: true,
            clearance: "2.1m".to_string(),
            availability: Availability::Medium,
            total_slots: 110,
            open_slots: 45,
            rating: 4.6,
            reviews: 182,
            lat: 22.2855,
            lng: 114.1577,
            image: "https://images.unsplash.com/photo-1506521781263-d8422e82f27a?auto=format&fit=crop&w=800&q=80".to_string(),
        },
        ParkingSpace {
            id: "kln-tst-002".to_string(),
            title: "Harbour City Carpark".to_string(),
            host: "Wharf management".to_string(),
            district: District::Kowloon,
            address: "3-27 Canton Road, Tsim Sha Tsui".to_string(),
            hourly_rate: 28,
            ev_friendly: true,
            clearance: "1.9m".to_string(),
            availability: Availability::Low,
            total_slots: 60,
            open_slots: 12,
            rating: 4.4,
            reviews: 236,
            lat: 22.2952,
            lng: 114.1689,
            image: "https://images.unsplash.com/photo-1502877338535-766e1452684a?auto=format&fit=crop&w=800&q=80".to_string(),
        },
        ParkingSpace {
            id: "nt-shatin-003".to_string(),
            title: "New Town Plaza Carpark".to_string(),
            host: "Commercial operator".to_string(),
            district: District::NewTerritories,
            address: "18 Sha Tin Centre Street, Sha Tin".to_string(),
            hourly_rate: 22,
            ev_friendly: false,
            clearance: "2.2m".to_string(),
            availability: Availability::High,
            total_slots: 220,
            open_slots: 150,
            rating: 4.2,
            reviews: 97,
            lat: 22.3817,
            lng: 114.1886,
            image: "https://images.unsplash.com/photo-1503736334956-4c8f8e92946d?auto=format&fit=crop&w=800&q=80".to_string(),
        },
        ParkingSpace {
            id: "hk-causeway-004".to_string(),
            title: "Times Square Carpark".to_string(),
            host: "Wharf management".to_string(),
            district: District::HongKongIsland,
            address: "1 Matheson Street, Causeway Bay".to_string(),
            hourly_rate: 30,
            ev_friendly: false,
            clearance: "1.8m".to_string(),
            availability: Availability::Full,
            total_slots: 80,
            open_slots: 0,
            rating: 4.1,
            reviews: 64,
            lat: 22.2783,
            lng: 114.1822,
            image: "https://images.unsplash.com/photo-1489515217757-5fd1be406fef?auto=format&fit=crop&w=800&q=80".to_string(),
        },
    ]
}

/// Resolves a space by identifier: the curated dataset first, then the live
/// feed. A blank identifier is simply "not found"; a feed outage is re-raised
/// so the caller can render a degraded page instead of a misleading 404.
pub async fn get_parking_space_by_id<S: FeedSource>(
    feed: &TransportFeed<S>,
    id: &str,
) -> Result<Option<ParkingSpace>, FeedError> {
    let normalized = id.trim();
    if normalized.is_empty() {
        return Ok(None);
    }

    if let Some(space) = seed_spaces().into_iter().find(|space| space.id == normalized) {
        return Ok(Some(space));
    }

    feed.find_space_by_id(normalized).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::mock::StaticFeedSource;
    use std::time::Duration;

    #[test]
    fn test_seed_spaces_satisfy_slot_invariants() {
        for space in seed_spaces() {
            assert!(space.open_slots <= space.total_slots, "{}", space.id);
            let ratio = f64::from(space.open_slots) / f64::from(space.total_slots);
            assert_eq!(space.availability, Availability::from_ratio(ratio), "{}", space.id);
        }
    }

    #[tokio::test]
    async fn test_static_dataset_wins_over_live_feed() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples(), Duration::from_secs(30));
        let space = get_parking_space_by_id(&feed, "kln-tst-002").await.unwrap();
        assert_eq!(space.map(|space| space.title), Some("Harbour City Carpark".to_string()));
    }

    #[tokio::test]
    async fn test_live_feed_consulted_for_unknown_static_id() {
        let feed = TransportFeed::new(StaticFeedSource::with_samples(), Duration::from_secs(30));
        let space = get_parking_space_by_id(&feed, " tdc29p1 ").await.unwrap();
        assert_eq!(space.map(|space| space.id), Some("tdc29p1".to_string()));
    }

    #[tokio::test]
    async fn test_blank_id_is_not_found_without_touching_the_feed() {
        let source = StaticFeedSource::with_samples();
        let rounds = source.round_counter();
        let feed = TransportFeed::new(source, Duration::from_secs(30));

        let space = get_parking_space_by_id(&feed, "   ").await.unwrap();
        assert!(space.is_none());
        assert_eq!(rounds.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_lookup_survives_feed_outage() {
        let feed = TransportFeed::new(
            StaticFeedSource::with_samples().without_info(),
            Duration::from_secs(30),
        );

        // Known static id resolves even though the live feed is down.
        let space = get_parking_space_by_id(&feed, "hk-central-001").await.unwrap();
        assert!(space.is_some());

        // Unknown id has to hit the feed, and the outage propagates.
        assert_eq!(
            get_parking_space_by_id(&feed, "tdc29p1").await,
            Err(FeedError::Unavailable)
        );
    }
}
