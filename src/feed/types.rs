use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum District {
    #[serde(rename = "Hong Kong Island")]
    HongKongIsland,
    #[serde(rename = "Kowloon")]
    Kowloon,
    #[serde(rename = "New Territories")]
    NewTerritories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Full,
    Low,
    Medium,
    High,
}

impl Availability {
    /// The bucket is a view over `open/total`; it is never stored
    /// independently of the slot counts.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio <= 0.0 {
            Availability::Full
        } else if ratio >= 0.6 {
            Availability::High
        } else if ratio >= 0.35 {
            Availability::Medium
        } else {
            Availability::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpace {
    pub id: String,
    pub title: String,
    pub host: String,
    pub district: District,
    pub address: String,
    pub hourly_rate: u32,
    pub ev_friendly: bool,
    pub clearance: String,
    pub availability: Availability,
    pub total_slots: u32,
    pub open_slots: u32,
    pub rating: f64,
    pub reviews: u32,
    pub lat: f64,
    pub lng: f64,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficIncident {
    pub id: String,
    pub title: String,
    pub category: String,
    pub region: District,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    pub severity: Severity,
}

/// The unit that is cached and returned to callers; treated as an immutable
/// snapshot once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportLivePayload {
    pub generated_at: DateTime<Utc>,
    pub parking: Vec<ParkingSpace>,
    pub traffic: TrafficSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSection {
    pub incidents: Vec<TrafficIncident>,
    pub source_timestamps: SourceTimestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTimestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidents: Option<DateTime<Utc>>,
}

// Raw upstream records. Both JSON sources are loosely typed; every field is
// optional and validated at the normalization boundary.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarparkInfoResponse {
    #[serde(default)]
    pub results: Vec<CarparkInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarparkInfo {
    #[serde(rename = "park_Id")]
    pub park_id: Option<String>,
    pub name: Option<String>,
    pub nature: Option<String>,
    pub display_address: Option<String>,
    pub district: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub facilities: Option<Vec<String>>,
    pub height_limits: Option<Vec<HeightLimit>>,
    pub address: Option<CarparkAddress>,
    pub private_car: Option<PrivateCarInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarparkAddress {
    pub region: Option<String>,
    pub street_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeightLimit {
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrivateCarInfo {
    pub space: Option<i64>,
    #[serde(rename = "spaceUNL")]
    pub space_unl: Option<i64>,
    #[serde(rename = "spaceEV")]
    pub space_ev: Option<i64>,
    #[serde(rename = "spaceDIS")]
    pub space_dis: Option<i64>,
    pub hourly_charges: Option<Vec<HourlyCharge>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HourlyCharge {
    pub price: Option<f64>,
    pub usage_thresholds: Option<Vec<UsageThreshold>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsageThreshold {
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarparkVacancyResponse {
    #[serde(default)]
    pub results: Vec<CarparkVacancy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarparkVacancy {
    #[serde(rename = "park_Id")]
    pub park_id: Option<String>,
    pub private_car: Option<Vec<VacancyCount>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VacancyCount {
    pub vacancy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_thresholds() {
        assert_eq!(Availability::from_ratio(0.0), Availability::Full);
        assert_eq!(Availability::from_ratio(-0.5), Availability::Full);
        assert_eq!(Availability::from_ratio(0.1), Availability::Low);
        assert_eq!(Availability::from_ratio(0.35), Availability::Medium);
        assert_eq!(Availability::from_ratio(0.59), Availability::Medium);
        assert_eq!(Availability::from_ratio(0.6), Availability::High);
        assert_eq!(Availability::from_ratio(1.0), Availability::High);
    }

    #[test]
    fn test_district_wire_names() {
        let json = serde_json::to_string(&District::NewTerritories).unwrap();
        assert_eq!(json, "\"New Territories\"");
        let parsed: District = serde_json::from_str("\"Hong Kong Island\"").unwrap();
        assert_eq!(parsed, District::HongKongIsland);
    }
}
