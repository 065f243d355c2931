use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub carpark_info_url: String,
    pub carpark_vacancy_url: String,
    pub traffic_news_url: String,
    pub feed_timeout_ms: u64,
    pub cache_ttl_secs: u64,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            carpark_info_url: env::var("CARPARK_INFO_URL").unwrap_or_else(|_| {
                "https://api.data.gov.hk/v1/carpark-info-vacancy?data=info".to_string()
            }),
            carpark_vacancy_url: env::var("CARPARK_VACANCY_URL").unwrap_or_else(|_| {
                "https://api.data.gov.hk/v1/carpark-info-vacancy?data=vacancy".to_string()
            }),
            traffic_news_url: env::var("TRAFFIC_NEWS_URL").unwrap_or_else(|_| {
                "https://resource.data.one.gov.hk/td/en/specialtrafficnews.xml".to_string()
            }),
            feed_timeout_ms: match env::var("FEED_TIMEOUT_MS") {
                Ok(value) => value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("FEED_TIMEOUT_MS must be an integer"))?,
                Err(_) => 6_000,
            },
            cache_ttl_secs: match env::var("FEED_CACHE_TTL_SECS") {
                Ok(value) => value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("FEED_CACHE_TTL_SECS must be an integer"))?,
                Err(_) => 30,
            },
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }
}
