use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Placeholder shown in the IP column while no address is assigned.
pub const NO_IP: &str = "N/A";

// Same pattern the portal backend enforces.
static MAC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$").unwrap());

// One registered MAC address as the server reports it. Read-only on the
// client; every mutation goes through the server and is followed by a
// fresh fetch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacRecord {
    pub id: i64,
    pub timestamp: String,
    pub user_name: String,
    pub mac_address: String,
    pub description: String,
    pub ipv4address: Option<String>,
}

impl MacRecord {
    /// Assigned IP presence doubles as the enabled flag.
    pub fn is_enabled(&self) -> bool {
        self.ipv4address.is_some()
    }

    pub fn ipv4_display(&self) -> &str {
        self.ipv4address.as_deref().unwrap_or(NO_IP)
    }
}

// Row view-model: everything the table needs, precomputed, so the
// egui pass stays free of record logic.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: i64,
    pub timestamp: String,
    pub user_name: String,
    pub mac_address: String,
    pub description: String,
    pub ipv4address: String,
    pub enabled: bool,
}

impl RecordRow {
    pub fn from_record(record: &MacRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp.clone(),
            user_name: record.user_name.clone(),
            mac_address: record.mac_address.clone(),
            description: record.description.clone(),
            ipv4address: record.ipv4_display().to_string(),
            enabled: record.is_enabled(),
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.enabled {
            "Disable"
        } else {
            "Enable"
        }
    }
}

/// Case-sensitive substring match across the displayed fields,
/// including the "N/A" marker for unassigned IPs.
pub fn record_matches(record: &MacRecord, text: &str) -> bool {
    record.timestamp.contains(text)
        || record.user_name.contains(text)
        || record.mac_address.contains(text)
        || record.description.contains(text)
        || record.ipv4_display().contains(text)
}

/// Lazy, order-preserving filter over the full fetched set. Recomputed
/// per call; never mutates the source.
pub fn filter_records<'a>(
    records: &'a [MacRecord],
    text: &'a str,
) -> impl Iterator<Item = &'a MacRecord> + 'a {
    records
        .iter()
        .filter(move |record| text.is_empty() || record_matches(record, text))
}

pub fn is_valid_mac(mac_address: &str) -> bool {
    MAC_PATTERN.is_match(mac_address)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, mac: &str, description: &str, ip: Option<&str>) -> MacRecord {
        MacRecord {
            id,
            timestamp: format!("2018-06-0{id} 12:00:00"),
            user_name: "alice".to_string(),
            mac_address: mac.to_string(),
            description: description.to_string(),
            ipv4address: ip.map(str::to_string),
        }
    }

    fn sample() -> Vec<MacRecord> {
        vec![
            record(1, "AA:BB:CC:DD:EE:FF", "laptop", None),
            record(2, "11:22:33:44:55:66", "Printer", Some("10.8.0.2")),
            record(3, "AA:00:00:00:00:01", "lab device", Some("10.8.0.3")),
        ]
    }

    #[test]
    fn empty_filter_yields_all_in_order() {
        let records = sample();
        let filtered: Vec<_> = filter_records(&records, "").collect();
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().zip(&records).all(|(a, b)| *a == b));
    }

    #[test]
    fn filter_matches_any_displayed_field() {
        let records = sample();
        // description
        assert_eq!(filter_records(&records, "laptop").count(), 1);
        // MAC address
        assert_eq!(filter_records(&records, "11:22").count(), 1);
        // user name matches everything
        assert_eq!(filter_records(&records, "alice").count(), 3);
        // timestamp
        assert_eq!(filter_records(&records, "2018-06-02").count(), 1);
        // absence marker counts as the displayed IP
        let unassigned: Vec<_> = filter_records(&records, NO_IP).collect();
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, 1);
    }

    #[test]
    fn filter_is_case_sensitive() {
        let records = sample();
        assert_eq!(filter_records(&records, "Printer").count(), 1);
        assert_eq!(filter_records(&records, "printer").count(), 0);
    }

    #[test]
    fn filter_preserves_order() {
        let records = sample();
        let ids: Vec<_> = filter_records(&records, "10.8.0").map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn toggle_label_follows_ip_assignment() {
        let disabled = RecordRow::from_record(&record(1, "AA:BB:CC:DD:EE:FF", "laptop", None));
        assert_eq!(disabled.toggle_label(), "Enable");
        assert_eq!(disabled.ipv4address, NO_IP);
        assert!(!disabled.enabled);

        let enabled =
            RecordRow::from_record(&record(2, "AA:BB:CC:DD:EE:FF", "laptop", Some("10.8.0.2")));
        assert_eq!(enabled.toggle_label(), "Disable");
        assert_eq!(enabled.ipv4address, "10.8.0.2");
        assert!(enabled.enabled);
    }

    #[test]
    fn record_deserializes_from_wire_names() {
        let json = r#"{
            "id": 1,
            "timestamp": "t",
            "userName": "alice",
            "macAddress": "AA:BB:CC:DD:EE:FF",
            "description": "laptop",
            "ipv4address": null
        }"#;
        let record: MacRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.user_name, "alice");
        assert_eq!(record.mac_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(record.ipv4address, None);
        assert_eq!(record.ipv4_display(), NO_IP);
    }

    #[test]
    fn mac_validation() {
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa-bb-cc-dd-ee-ff"));
        assert!(!is_valid_mac("AA:BB:CC:DD:EE"));
        assert!(!is_valid_mac("AA:BB:CC:DD:EE:FF:00"));
        assert!(!is_valid_mac("GG:BB:CC:DD:EE:FF"));
        assert!(!is_valid_mac(""));
    }
}
