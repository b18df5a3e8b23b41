//! Vendor date parsing for ledger ordering.
//!
//! Export files report the event time as free text whose format is not
//! guaranteed. Parsing tries a prioritized list of formats; failure is not an
//! error — the record sorts after every dated one.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parse a vendor-reported date string into a comparable point in time.
/// Returns `None` when no known format matches.
pub fn parse_lead_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_vendor_formats() {
        for raw in [
            "2024-01-15 09:30:00",
            "2024-01-15T09:30:00",
            "01/15/2024 09:30:00",
            "01/15/2024 09:30",
            "15-Jan-2024 09:30:00",
        ] {
            let dt = parse_lead_date(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        }
    }

    #[test]
    fn parses_date_only_as_midnight() {
        let dt = parse_lead_date("2024-03-01").unwrap();
        assert_eq!(dt, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert!(parse_lead_date("03/01/2024").is_some());
    }

    #[test]
    fn parses_rfc3339() {
        let dt = parse_lead_date("2024-01-15T09:30:00Z").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn unparsable_input_is_none() {
        assert!(parse_lead_date("").is_none());
        assert!(parse_lead_date("   ").is_none());
        assert!(parse_lead_date("last Tuesday").is_none());
        assert!(parse_lead_date("2024-13-45").is_none());
    }
}
