use std::collections::HashMap;

use super::types::{
    Availability, CarparkInfo, CarparkInfoResponse, CarparkVacancyResponse, District, ParkingSpace,
};

/// The payload carries at most this many spaces, in vacancy-dataset order.
pub const MAX_SPACES: usize = 80;

const FALLBACK_IMAGES: [&str; 6] = [
    "https://images.unsplash.com/photo-1506521781263-d8422e82f27a?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1502877338535-766e1452684a?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1503736334956-4c8f8e92946d?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1489515217757-5fd1be406fef?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1488646953014-85cb44e25828?auto=format&fit=crop&w=800&q=80",
    "https://images.unsplash.com/photo-1469474968028-56623f02e42e?auto=format&fit=crop&w=800&q=80",
];

const REGION_MAP: [(&str, District); 10] = [
    ("HK", District::HongKongIsland),
    ("HKI", District::HongKongIsland),
    ("HONG KONG", District::HongKongIsland),
    ("HONG KONG ISLAND", District::HongKongIsland),
    ("ISLAND", District::HongKongIsland),
    ("KLN", District::Kowloon),
    ("KOWLOON", District::Kowloon),
    ("NT", District::NewTerritories),
    ("NEW TERRITORIES", District::NewTerritories),
    ("NEW TERRITORY", District::NewTerritories),
];

/// Deterministic hash of an identifier folded into `[0, 1]`: a rolling
/// polynomial over UTF-16 code units, `h = (h * 31 + unit) mod 2^32`,
/// normalized by the max u32. Derived fields (rating, reviews, image) must
/// stay reproducible per identifier, so this is not a general-purpose PRNG.
pub fn seeded_fraction(seed: &str) -> f64 {
    let mut hash: u32 = 0;
    for unit in seed.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(unit));
    }
    f64::from(hash) / f64::from(u32::MAX)
}

fn pick_image(seed: &str) -> String {
    let idx = (seeded_fraction(seed) * FALLBACK_IMAGES.len() as f64).floor() as usize;
    FALLBACK_IMAGES
        .get(idx)
        .copied()
        .unwrap_or(FALLBACK_IMAGES[0])
        .to_string()
}

fn resolve_district(region: Option<&str>, district_name: Option<&str>) -> District {
    if let Some(region) = region {
        let key = region.trim().to_uppercase();
        for (code, district) in REGION_MAP {
            if code == key {
                return district;
            }
        }
    }

    if let Some(name) = district_name {
        let key = name.trim().to_uppercase();
        if key.contains("KOWLOON") {
            return District::Kowloon;
        }
        if key.contains("ISLAND") {
            return District::HongKongIsland;
        }
        if key.contains("NEW") {
            return District::NewTerritories;
        }
    }

    District::HongKongIsland
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn derive_host(nature: Option<&str>, name: Option<&str>) -> String {
    if let Some(nature) = nature.filter(|nature| !nature.is_empty()) {
        let label = title_case(&nature.replace('_', " "));
        return format!("{label} operator");
    }
    if let Some(first_word) = name.and_then(|name| name.split_whitespace().next()) {
        return format!("{first_word} management");
    }
    "Transport Department".to_string()
}

fn derive_hourly_rate(info: &CarparkInfo) -> u32 {
    let first_charge = info
        .private_car
        .as_ref()
        .and_then(|car| car.hourly_charges.as_ref())
        .and_then(|charges| charges.first());
    let price = first_charge.and_then(|charge| {
        charge.price.or_else(|| {
            charge
                .usage_thresholds
                .as_ref()
                .and_then(|tiers| tiers.first())
                .and_then(|tier| tier.price)
        })
    });

    match price {
        Some(price) if price > 0.0 => price.round() as u32,
        _ => {
            let seed = info
                .park_id
                .as_deref()
                .or(info.name.as_deref())
                .unwrap_or("rate");
            20 + (seeded_fraction(seed) * 25.0).round() as u32
        }
    }
}

fn derive_clearance(info: &CarparkInfo) -> String {
    let height = info
        .height_limits
        .as_ref()
        .and_then(|limits| limits.first())
        .and_then(|limit| limit.height);
    match height {
        Some(height) if height > 0.0 => format!("{height:.1}m"),
        _ => "2.2m".to_string(),
    }
}

fn has_ev_charger(info: &CarparkInfo) -> bool {
    info.facilities.as_ref().map_or(false, |facilities| {
        facilities
            .iter()
            .any(|facility| facility.to_lowercase().contains("ev"))
    })
}

/// Joins the static info dataset against the live vacancy dataset by carpark
/// identifier and derives the full `ParkingSpace` record for each match.
/// Vacancy records without a matching info record, or whose info lacks
/// numeric coordinates, are dropped: a space that cannot be plotted is not
/// usable downstream.
pub fn normalize_parking_spaces(
    info: &CarparkInfoResponse,
    vacancy: &CarparkVacancyResponse,
) -> Vec<ParkingSpace> {
    let mut info_by_id: HashMap<&str, &CarparkInfo> = HashMap::new();
    for record in &info.results {
        if let Some(id) = record.park_id.as_deref() {
            info_by_id.insert(id, record);
        }
    }

    let mut spaces = Vec::new();
    let mut dropped = 0usize;

    for record in &vacancy.results {
        let Some(id) = record.park_id.as_deref() else {
            continue;
        };
        let Some(info) = info_by_id.get(id) else {
            dropped += 1;
            continue;
        };
        let (Some(lat), Some(lng)) = (info.latitude, info.longitude) else {
            dropped += 1;
            continue;
        };

        let private_car = info.private_car.as_ref();

        let vacancy_count = record
            .private_car
            .as_ref()
            .and_then(|counts| counts.first())
            .and_then(|count| count.vacancy);
        let open_slots = match vacancy_count {
            Some(count) if count >= 0.0 => count as i64,
            _ => private_car.and_then(|car| car.space).unwrap_or(0).max(0),
        };

        let declared_total = private_car
            .map(|car| [car.space, car.space_unl, car.space_ev, car.space_dis])
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .find(|count| *count > 0)
            .unwrap_or(0);
        let total_slots = if declared_total > 0 {
            declared_total
        } else {
            // Rough estimate for carparks that never declare capacity.
            let estimate = (open_slots as f64 * 1.4).round() as i64;
            let estimate = if estimate == 0 { 12 } else { estimate };
            estimate.clamp(8, 500)
        };

        let ratio = if total_slots > 0 {
            open_slots as f64 / total_slots as f64
        } else {
            0.0
        };
        let availability = Availability::from_ratio(ratio);
        let open_slots = open_slots.clamp(0, total_slots);

        spaces.push(ParkingSpace {
            id: id.to_string(),
            title: info
                .name
                .clone()
                .unwrap_or_else(|| "Transport Department Carpark".to_string()),
            host: derive_host(info.nature.as_deref(), info.name.as_deref()),
            district: resolve_district(
                info.address.as_ref().and_then(|address| address.region.as_deref()),
                info.district.as_deref(),
            ),
            address: info
                .display_address
                .clone()
                .or_else(|| {
                    info.address
                        .as_ref()
                        .and_then(|address| address.street_name.clone())
                })
                .unwrap_or_else(|| "Hong Kong".to_string()),
            hourly_rate: derive_hourly_rate(info),
            ev_friendly: has_ev_charger(info),
            clearance: derive_clearance(info),
            availability,
            total_slots: total_slots as u32,
            open_slots: open_slots as u32,
            rating: ((4.0 + seeded_fraction(id) * 0.9) * 10.0).round() / 10.0,
            reviews: 40 + (seeded_fraction(&format!("{id}-reviews")) * 350.0).round() as u32,
            lat,
            lng,
            image: pick_image(id),
        });
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} vacancy records without usable carpark info", dropped);
    }

    spaces.truncate(MAX_SPACES);
    spaces
}
