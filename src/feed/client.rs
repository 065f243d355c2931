use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::{CarparkInfoResponse, CarparkVacancyResponse};
use crate::config::Config;

/// Thin wrapper around a reqwest client with the fixed per-request timeout.
/// Every failure mode (non-2xx, network error, timeout, undecodable body)
/// collapses to `None`; fatality is decided by the aggregator, not here.
pub struct TransportApiClient {
    client: Client,
}

impl TransportApiClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("TransportLiveServer/1.0")
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Transport API request failed for {}: {}", url, err);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::error!("Transport API error {} for {}", response.status(), url);
            return None;
        }

        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!("Transport API decode failed for {}: {}", url, err);
                None
            }
        }
    }

    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Transport API request failed for {}: {}", url, err);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::error!("Transport API error {} for {}", response.status(), url);
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(err) => {
                tracing::error!("Transport API body read failed for {}: {}", url, err);
                None
            }
        }
    }
}

/// Seam between fetching and aggregation. Each source resolves to either a
/// complete payload or an absence marker, never a partial response.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    async fn carpark_info(&self) -> Option<CarparkInfoResponse>;

    async fn carpark_vacancy(&self) -> Option<CarparkVacancyResponse>;

    async fn traffic_news(&self) -> Option<String>;
}

pub struct HttpFeedSource {
    client: TransportApiClient,
    info_url: String,
    vacancy_url: String,
    traffic_url: String,
}

impl HttpFeedSource {
    pub fn new(config: &Config) -> Self {
        Self {
            client: TransportApiClient::new(Duration::from_millis(config.feed_timeout_ms)),
            info_url: config.carpark_info_url.clone(),
            vacancy_url: config.carpark_vacancy_url.clone(),
            traffic_url: config.traffic_news_url.clone(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn carpark_info(&self) -> Option<CarparkInfoResponse> {
        self.client.fetch_json(&self.info_url).await
    }

    async fn carpark_vacancy(&self) -> Option<CarparkVacancyResponse> {
        self.client.fetch_json(&self.vacancy_url).await
    }

    async fn traffic_news(&self) -> Option<String> {
        // The XML endpoint sits behind an aggressive intermediary cache; the
        // timestamp parameter forces a fresh copy.
        let url = format!("{}?_={}", self.traffic_url, Utc::now().timestamp_millis());
        self.client.fetch_text(&url).await
    }
}
