use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use uuid::Uuid;

use super::types::{District, Severity, TrafficIncident};

const REGION_HINTS: [(District, &[&str]); 3] = [
    (
        District::HongKongIsland,
        &[
            "central",
            "sheung wan",
            "sai ying pun",
            "wan chai",
            "causeway bay",
            "north point",
            "belcher",
            "pok fu lam",
            "happy valley",
        ],
    ),
    (
        District::Kowloon,
        &[
            "kowloon",
            "yau tong",
            "tsim sha tsui",
            "mong kok",
            "sham shui po",
            "kwun tong",
            "kowloon bay",
            "hung hom",
            "yau ma tei",
            "cheung sha wan",
        ],
    ),
    (
        District::NewTerritories,
        &[
            "yuen long",
            "tuen mun",
            "tin shui wai",
            "sha tin",
            "tai po",
            "fanling",
            "sheung shui",
            "sai kung",
            "tsuen wan",
            "ma on shan",
        ],
    ),
];

#[derive(Default)]
struct RawMessage {
    msg_id: Option<String>,
    eng_short: Option<String>,
    eng_text: Option<String>,
    current_status: Option<String>,
    reference_date: Option<String>,
    incident_ref_no: Option<String>,
}

fn assign_field(message: &mut RawMessage, tag: &str, value: String) {
    match tag {
        "msgID" => message.msg_id = Some(value),
        "EngShort" => message.eng_short = Some(value),
        "EngText" => message.eng_text = Some(value),
        "CurrentStatus" => message.current_status = Some(value),
        "ReferenceDate" | "referenceDate" => message.reference_date = Some(value),
        "IncidentRefNo" => message.incident_ref_no = Some(value),
        _ => {}
    }
}

fn collect_messages(xml: &str) -> Result<Vec<RawMessage>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut messages = Vec::new();
    let mut current: Option<RawMessage> = None;
    let mut tag: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name.eq_ignore_ascii_case("message") {
                    current = Some(RawMessage::default());
                    tag = None;
                } else {
                    tag = Some(name);
                }
            }
            Event::End(end) => {
                if end.name().as_ref().eq_ignore_ascii_case(b"message") {
                    if let Some(message) = current.take() {
                        messages.push(message);
                    }
                }
                tag = None;
            }
            Event::Text(text) => {
                if let (Some(message), Some(tag)) = (current.as_mut(), tag.as_deref()) {
                    assign_field(message, tag, text.unescape()?.into_owned());
                }
            }
            Event::CData(cdata) => {
                if let (Some(message), Some(tag)) = (current.as_mut(), tag.as_deref()) {
                    let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    assign_field(message, tag, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(messages)
}

fn clean_text(value: Option<&str>) -> Option<String> {
    let cleaned = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn severity_from_status(status: Option<&str>) -> Severity {
    match status.and_then(|status| status.trim().parse::<i64>().ok()) {
        Some(1) => Severity::Critical,
        Some(2) => Severity::Major,
        _ => Severity::Moderate,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical incident",
        Severity::Major => "Major delay",
        Severity::Moderate => "Advisory",
    }
}

fn infer_region(text: Option<&str>) -> District {
    let Some(text) = text else {
        return District::HongKongIsland;
    };
    let normalized = text.to_lowercase();

    for (district, keywords) in REGION_HINTS {
        if keywords.iter().any(|keyword| normalized.contains(keyword)) {
            return district;
        }
    }
    if normalized.contains("kowloon") {
        return District::Kowloon;
    }
    if normalized.contains("new territories") {
        return District::NewTerritories;
    }
    District::HongKongIsland
}

fn derive_location(text: Option<&str>) -> Option<String> {
    let cleaned = clean_text(text)?;
    cleaned
        .split('.')
        .map(str::trim)
        .find(|sentence| !sentence.is_empty())
        .map(str::to_string)
}

/// Parses the feed's localized reference-date strings, of the form
/// `"<date> <AM/PM marker> <time>"` where the marker may be Chinese
/// (上午 / 下午 / 晚上). The result is interpreted at UTC+8. Structurally
/// incomplete or unparsable strings yield `None`, never an error.
pub fn parse_reference_date(value: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }
    let (date_part, period_part, time_part) = (parts[0], parts[1], parts[2]);

    let mut segments = time_part.split(':').map(|segment| segment.parse::<u32>());
    let (hours, minutes, seconds) = match (segments.next(), segments.next(), segments.next()) {
        (Some(Ok(hours)), Some(Ok(minutes)), Some(Ok(seconds))) => (hours, minutes, seconds),
        _ => return None,
    };

    let period = period_part.to_lowercase();
    let mut hours = hours;
    if (period.contains("下午") || period.contains("晚上")) && hours < 12 {
        hours += 12;
    }
    if period.contains("上午") && hours == 12 {
        hours = 0;
    }

    let iso = format!(
        "{}T{:02}:{:02}:{:02}+08:00",
        date_part.replace('/', "-"),
        hours,
        minutes,
        seconds
    );
    DateTime::parse_from_rfc3339(&iso)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn incident_from_message(message: RawMessage) -> TrafficIncident {
    let english = clean_text(message.eng_text.as_deref())
        .or_else(|| clean_text(message.eng_short.as_deref()));
    let title = clean_text(message.eng_short.as_deref())
        .or_else(|| clean_text(message.eng_text.as_deref()))
        .unwrap_or_else(|| {
            format!(
                "Special traffic news {}",
                message.msg_id.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        });
    let severity = severity_from_status(message.current_status.as_deref());
    let start_time = message
        .reference_date
        .as_deref()
        .and_then(parse_reference_date);
    let category = clean_text(message.incident_ref_no.as_deref())
        .unwrap_or_else(|| severity_label(severity).to_string());

    TrafficIncident {
        id: message
            .msg_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title,
        category,
        region: infer_region(english.as_deref()),
        location: derive_location(english.as_deref()),
        description: english,
        start_time,
        severity,
    }
}

/// Turns the raw XML advisory feed into incident records. An absent payload
/// or an unparsable document degrades to an empty list; parse failure is
/// recovered here and never escalated. Also returns the first incident's
/// start time as the feed's last-updated timestamp.
pub fn normalize_traffic_incidents(
    xml: Option<&str>,
) -> (Vec<TrafficIncident>, Option<DateTime<Utc>>) {
    let Some(xml) = xml else {
        return (Vec::new(), None);
    };

    let messages = match collect_messages(xml) {
        Ok(messages) => messages,
        Err(err) => {
            tracing::error!("Unable to parse special traffic news XML: {}", err);
            return (Vec::new(), None);
        }
    };
    if messages.is_empty() {
        return (Vec::new(), None);
    }

    let incidents: Vec<TrafficIncident> =
        messages.into_iter().map(incident_from_message).collect();
    let timestamp = incidents.first().and_then(|incident| incident.start_time);
    (incidents, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::mock::SAMPLE_TRAFFIC_XML;
    use chrono::TimeZone;

    #[test]
    fn test_normalizes_sample_feed() {
        let (incidents, timestamp) = normalize_traffic_incidents(Some(SAMPLE_TRAFFIC_XML));
        assert_eq!(incidents.len(), 2);

        let first = &incidents[0];
        assert_eq!(first.id, "30123");
        assert_eq!(first.title, "Accident on Gloucester Road");
        assert_eq!(first.severity, Severity::Critical);
        assert_eq!(first.region, District::HongKongIsland);
        assert_eq!(first.category, "2024050112");
        assert_eq!(
            first.location.as_deref(),
            Some("Traffic accident on Gloucester Road near Causeway Bay")
        );
        // 15:15 at UTC+8.
        assert_eq!(
            first.start_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 7, 15, 0).unwrap())
        );

        let second = &incidents[1];
        assert_eq!(second.severity, Severity::Moderate);
        assert_eq!(second.region, District::NewTerritories);
        assert_eq!(second.title, "Slow traffic on Tuen Mun Road towards Sham Tseng.");
        assert_eq!(second.category, "Advisory");

        assert_eq!(timestamp, first.start_time);
    }

    #[test]
    fn test_status_codes_map_to_severity() {
        assert_eq!(severity_from_status(Some("1")), Severity::Critical);
        assert_eq!(severity_from_status(Some("2")), Severity::Major);
        assert_eq!(severity_from_status(Some("3")), Severity::Moderate);
        assert_eq!(severity_from_status(Some("not a number")), Severity::Moderate);
        assert_eq!(severity_from_status(None), Severity::Moderate);
    }

    #[test]
    fn test_absent_payload_yields_empty_list() {
        let (incidents, timestamp) = normalize_traffic_incidents(None);
        assert!(incidents.is_empty());
        assert!(timestamp.is_none());
    }

    #[test]
    fn test_malformed_xml_yields_empty_list() {
        let (incidents, timestamp) =
            normalize_traffic_incidents(Some("<body><message><msgID>1</msgID>"));
        assert!(incidents.is_empty());
        assert!(timestamp.is_none());
    }

    #[test]
    fn test_single_message_is_a_one_element_list() {
        let xml = r#"<body><message><msgID>77</msgID><CurrentStatus>2</CurrentStatus><EngShort>Lane closed on Nathan Road</EngShort></message></body>"#;
        let (incidents, _) = normalize_traffic_incidents(Some(xml));
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].severity, Severity::Major);
        assert_eq!(incidents[0].category, "Major delay");
        assert_eq!(incidents[0].region, District::Kowloon);
    }

    #[test]
    fn test_generated_id_when_upstream_id_missing() {
        let xml = r#"<body><message><EngShort>Water main burst</EngShort></message></body>"#;
        let (incidents, _) = normalize_traffic_incidents(Some(xml));
        assert_eq!(incidents.len(), 1);
        assert!(!incidents[0].id.is_empty());
        assert_eq!(incidents[0].title, "Water main burst");
    }

    #[test]
    fn test_reference_date_afternoon_marker() {
        let parsed = parse_reference_date("2024/05/01 下午 03:15:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 7, 15, 0).unwrap());
    }

    #[test]
    fn test_reference_date_evening_marker() {
        let parsed = parse_reference_date("2024/05/01 晚上 11:30:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 15, 30, 0).unwrap());
    }

    #[test]
    fn test_reference_date_midnight_under_morning_marker() {
        // Hour 12 under a morning marker is midnight local, 16:00 UTC the
        // previous day.
        let parsed = parse_reference_date("2024/05/01 上午 12:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 4, 30, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_reference_date_rejects_incomplete_strings() {
        assert!(parse_reference_date("").is_none());
        assert!(parse_reference_date("2024/05/01 下午").is_none());
        assert!(parse_reference_date("2024/05/01 下午 03:15").is_none());
        assert!(parse_reference_date("2024/05/01 下午 aa:bb:cc").is_none());
        assert!(parse_reference_date("2024/13/01 下午 03:15:00").is_none());
    }

    #[test]
    fn test_region_keyword_precedence() {
        assert_eq!(
            infer_region(Some("Congestion near Causeway Bay flyover")),
            District::HongKongIsland
        );
        assert_eq!(
            infer_region(Some("All lanes blocked in Kwun Tong")),
            District::Kowloon
        );
        assert_eq!(
            infer_region(Some("Landslip warning for Sai Kung")),
            District::NewTerritories
        );
        // "new territories" is not in the keyword table; only the substring
        // fallback can catch it.
        assert_eq!(
            infer_region(Some("Speed restriction across the New Territories circular road")),
            District::NewTerritories
        );
        assert_eq!(infer_region(None), District::HongKongIsland);
        assert_eq!(infer_region(Some("No landmarks here")), District::HongKongIsland);
    }
}
