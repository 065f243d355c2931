use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::client::FeedSource;
use super::types::{CarparkInfoResponse, CarparkVacancyResponse};

/// Static carpark attributes shaped like the data.gov.hk info dataset.
/// `tdc88p9` deliberately lacks coordinates and `tdc31p2` declares no
/// general private-car space, to exercise the join and fallback rules.
pub const SAMPLE_INFO_JSON: &str = r#"{
  "results": [
    {
      "park_Id": "tdc29p1",
      "name": "Kwai Fong Plaza Carpark",
      "nature": "commercial",
      "displayAddress": "Kwai Fong Plaza, 111 Kwai Yi Road, Kwai Chung",
      "district": "Kwai Tsing District",
      "latitude": 22.3579,
      "longitude": 114.1278,
      "facilities": ["evCharger", "washroom"],
      "heightLimits": [{ "height": 1.9 }],
      "address": { "region": "NT", "streetName": "Kwai Yi Road" },
      "privateCar": {
        "space": 40,
        "hourlyCharges": [{ "price": 14, "usageThresholds": [{ "price": 12 }] }]
      }
    },
    {
      "park_Id": "tdc31p2",
      "name": "Star Ferry Carpark",
      "displayAddress": "9 Edinburgh Place, Central",
      "district": "Central & Western District",
      "latitude": 22.2822,
      "longitude": 114.1614,
      "address": { "region": "HK", "streetName": "Edinburgh Place" },
      "privateCar": { "space": 0, "spaceUNL": 340 }
    },
    {
      "park_Id": "tdc88p9",
      "name": "Hung Hom Bay Carpark",
      "district": "Kowloon City District",
      "address": { "region": "KLN" },
      "privateCar": { "space": 25 }
    }
  ]
}"#;

/// Live counts shaped like the vacancy dataset; `missing-park` has no info
/// counterpart and `tdc29p1` reports the feed's -1 "unknown" marker.
pub const SAMPLE_VACANCY_JSON: &str = r#"{
  "results": [
    { "park_Id": "tdc29p1", "privateCar": [{ "vacancy": -1, "lastupdate": "2024-05-01 14:33:21" }] },
    { "park_Id": "tdc31p2", "privateCar": [{ "vacancy": 210 }] },
    { "park_Id": "tdc88p9", "privateCar": [{ "vacancy": 3 }] },
    { "park_Id": "missing-park", "privateCar": [{ "vacancy": 5 }] }
  ]
}"#;

pub const SAMPLE_TRAFFIC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<body>
  <message>
    <msgID>30123</msgID>
    <CurrentStatus>1</CurrentStatus>
    <EngShort>Accident on Gloucester Road</EngShort>
    <EngText>Traffic accident on Gloucester Road near Causeway Bay. Motorists are advised to use alternative routes.</EngText>
    <ReferenceDate>2024/05/01 下午 03:15:00</ReferenceDate>
    <IncidentRefNo>2024050112</IncidentRefNo>
  </message>
  <message>
    <msgID>30124</msgID>
    <CurrentStatus>3</CurrentStatus>
    <EngText>Slow traffic on Tuen Mun Road towards Sham Tseng.</EngText>
    <ReferenceDate>2024/05/01 上午 09:05:00</ReferenceDate>
  </message>
</body>"#;

/// Scripted feed source: serves fixed responses, optionally after a delay,
/// and counts aggregation rounds so tests can assert how often the upstream
/// was actually hit.
pub struct StaticFeedSource {
    info: Option<CarparkInfoResponse>,
    vacancy: Option<CarparkVacancyResponse>,
    traffic: Option<String>,
    delay: Option<Duration>,
    rounds: Arc<AtomicUsize>,
}

impl StaticFeedSource {
    pub fn with_samples() -> Self {
        Self {
            info: Some(serde_json::from_str(SAMPLE_INFO_JSON).expect("info fixture parses")),
            vacancy: Some(
                serde_json::from_str(SAMPLE_VACANCY_JSON).expect("vacancy fixture parses"),
            ),
            traffic: Some(SAMPLE_TRAFFIC_XML.to_string()),
            delay: None,
            rounds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_info(mut self) -> Self {
        self.info = None;
        self
    }

    pub fn without_vacancy(mut self) -> Self {
        self.vacancy = None;
        self
    }

    pub fn without_traffic(mut self) -> Self {
        self.traffic = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Counter of aggregation rounds; hold a clone before handing the source
    /// to a feed.
    pub fn round_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.rounds)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn carpark_info(&self) -> Option<CarparkInfoResponse> {
        self.rounds.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.info.clone()
    }

    async fn carpark_vacancy(&self) -> Option<CarparkVacancyResponse> {
        self.pause().await;
        self.vacancy.clone()
    }

    async fn traffic_news(&self) -> Option<String> {
        self.pause().await;
        self.traffic.clone()
    }
}
