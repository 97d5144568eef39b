//! Reduces a raw carrier record to the handful of fields the popup shows.
//!
//! Nothing in here fails: a field the carrier left out turns into a
//! placeholder (`n/a`, `No known location`) instead of an error.

use crate::types::{
    ActivityCollection, ActivityLocation, LocationSummary, PackageSummary, PickupDate,
    RawShippingRecord,
};

pub const NO_KNOWN_LOCATION: &str = "No known location";
pub const MAPS_LANDING_URL: &str = "https://maps.google.com/";
pub const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place/";

/// Placeholder rendered for an address component the carrier did not send
const MISSING_COMPONENT: &str = "undefined";

/// Build the summary for one package from its raw carrier record
pub fn parse_shipping_data(
    package_name: &str,
    tracking_number: &str,
    raw: &RawShippingRecord,
) -> PackageSummary {
    PackageSummary {
        package_name: package_name.to_string(),
        tracking_number: tracking_number.to_string(),
        date: extract_pickup_date(raw),
        latest_location: build_location_summary(raw),
    }
}

/// Split `PickupDate` (`YYYYMMDD`) into month, day and year.
///
/// The value is sliced positionally and never validated, so `20231399`
/// comes back as month `13`, day `99`.
pub fn extract_pickup_date(raw: &RawShippingRecord) -> PickupDate {
    let Some(date) = raw.pickup_date.as_deref() else {
        return PickupDate {
            month: "00".to_string(),
            day: "00".to_string(),
            year: "0000".to_string(),
            full_date: "n/a".to_string(),
        };
    };

    let month = slice(date, 4, 6);
    let day = slice(date, 6, 8);
    let year = slice(date, 0, 4);
    let full_date = format!("{}/{}/{}", month, day, year);

    PickupDate {
        month,
        day,
        year,
        full_date,
    }
}

/// Character slice clamped to the string's length
fn slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Location of the most recent activity that has one.
///
/// Responses are not sorted by date and some checkpoints carry no location,
/// so the whole list is scanned. The first entry is the starting pick and is
/// only replaced by a strictly later entry that has a location; ties keep
/// the earlier entry.
pub fn resolve_latest_activity(raw: &RawShippingRecord) -> Option<&ActivityLocation> {
    match raw.activity_collection()? {
        ActivityCollection::Many(activities) => {
            let mut latest = activities.first()?;
            for activity in activities {
                let is_later = match (latest.date.as_deref(), activity.date.as_deref()) {
                    (Some(current), Some(candidate)) => current < candidate,
                    _ => false,
                };
                if is_later && activity.activity_location.is_some() {
                    latest = activity;
                }
            }
            latest.activity_location.as_ref()
        }
        ActivityCollection::One(activity) => activity.activity_location.as_ref(),
    }
}

/// Drop `undefined` components from a `City, State, Country` label.
///
/// `undefined, ` is always removed. When the label ends in `undefined`,
/// every remaining `undefined` goes too, which leaves a trailing `, `.
pub fn trim_location_label(location: &str) -> String {
    let mut out = location.replace("undefined, ", "");
    if location.ends_with(MISSING_COMPONENT) {
        out = out.replace(MISSING_COMPONENT, "");
    }
    out
}

/// Spaces become `+` for use in a maps URL path
pub fn format_for_url(location: &str) -> String {
    location.replace(' ', "+")
}

/// Untrimmed `City, StateProvinceCode, CountryCode` for one location.
///
/// Components come from the `Address` sub-record when there is one and from
/// the flat fields otherwise; a missing component reads `undefined`.
pub fn location_label(location: &ActivityLocation) -> String {
    let fields = location.fields();
    let component = |value: &Option<String>| -> String {
        value.clone().unwrap_or_else(|| MISSING_COMPONENT.to_string())
    };
    format!(
        "{}, {}, {}",
        component(&fields.city),
        component(&fields.state_province_code),
        component(&fields.country_code)
    )
}

/// Human-readable label and maps link for the latest known location
pub fn build_location_summary(raw: &RawShippingRecord) -> LocationSummary {
    let Some(location) = resolve_latest_activity(raw) else {
        return LocationSummary {
            full_location: NO_KNOWN_LOCATION.to_string(),
            maps_url: MAPS_LANDING_URL.to_string(),
        };
    };

    let address = location_label(location);
    tracing::debug!(address = %address, "resolved latest activity location");

    // The link is built from the untrimmed address.
    LocationSummary {
        full_location: trim_location_label(&address),
        maps_url: format!("{}{}/", MAPS_PLACE_URL, format_for_url(&address)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn record(value: Value) -> RawShippingRecord {
        serde_json::from_value(value).unwrap()
    }

    fn reno() -> Value {
        json!({ "City": "Reno", "StateProvinceCode": "NV", "CountryCode": "US" })
    }

    #[test]
    fn test_pickup_date_missing() {
        let date = extract_pickup_date(&record(json!({})));
        assert_eq!(date.month, "00");
        assert_eq!(date.day, "00");
        assert_eq!(date.year, "0000");
        assert_eq!(date.full_date, "n/a");
    }

    #[test]
    fn test_pickup_date_split() {
        let date = extract_pickup_date(&record(json!({ "PickupDate": "20230415" })));
        assert_eq!(
            date,
            PickupDate {
                month: "04".to_string(),
                day: "15".to_string(),
                year: "2023".to_string(),
                full_date: "04/15/2023".to_string(),
            }
        );
    }

    #[test]
    fn test_pickup_date_not_validated() {
        let date = extract_pickup_date(&record(json!({ "PickupDate": "20231399" })));
        assert_eq!(date.full_date, "13/99/2023");

        let short = extract_pickup_date(&record(json!({ "PickupDate": "2023" })));
        assert_eq!(short.year, "2023");
        assert_eq!(short.month, "");
        assert_eq!(short.full_date, "//2023");
    }

    #[test]
    fn test_latest_activity_ignores_order() {
        let located = json!({ "Date": "20230315", "ActivityLocation": reno() });
        let bare = json!({ "Date": "20230101" });

        for activity in [json!([bare.clone(), located.clone()]), json!([located, bare])] {
            let raw = record(json!({ "Activity": activity }));
            let location = resolve_latest_activity(&raw).unwrap();
            assert_eq!(location.fields().city.as_deref(), Some("Reno"));
        }
    }

    #[test]
    fn test_latest_activity_skips_unlocated_later_entries() {
        let raw = record(json!({
            "Package": {
                "Activity": [
                    { "Date": "20230101", "ActivityLocation": { "City": "Sparks" } },
                    { "Date": "20230301", "ActivityLocation": reno() },
                    { "Date": "20230401" }
                ]
            }
        }));
        let location = resolve_latest_activity(&raw).unwrap();
        assert_eq!(location.fields().city.as_deref(), Some("Reno"));
    }

    #[test]
    fn test_latest_activity_tie_keeps_first() {
        let raw = record(json!({
            "Activity": [
                { "Date": "20230101" },
                { "Date": "20230301", "ActivityLocation": { "City": "First" } },
                { "Date": "20230301", "ActivityLocation": { "City": "Second" } }
            ]
        }));
        let location = resolve_latest_activity(&raw).unwrap();
        assert_eq!(location.fields().city.as_deref(), Some("First"));
    }

    #[test]
    fn test_latest_activity_without_any_location() {
        let raw = record(json!({
            "Activity": [{ "Date": "20230101" }, { "Date": "20230301" }]
        }));
        assert!(resolve_latest_activity(&raw).is_none());
    }

    #[test]
    fn test_latest_activity_first_entry_newest_but_unlocated() {
        // The first entry is the starting pick even without a location.
        let raw = record(json!({
            "Activity": [
                { "Date": "20230501" },
                { "Date": "20230301", "ActivityLocation": reno() }
            ]
        }));
        assert!(resolve_latest_activity(&raw).is_none());
    }

    #[test]
    fn test_single_activity_location_unchanged() {
        let raw = record(json!({
            "Activity": { "Date": "20230101", "ActivityLocation": { "Address": reno() } }
        }));
        let expected: ActivityLocation = serde_json::from_value(json!({ "Address": reno() })).unwrap();
        assert_eq!(resolve_latest_activity(&raw), Some(&expected));
    }

    #[test]
    fn test_missing_or_empty_activity() {
        assert!(resolve_latest_activity(&record(json!({}))).is_none());
        assert!(resolve_latest_activity(&record(json!({ "Activity": [] }))).is_none());
    }

    #[test]
    fn test_trim_location_label() {
        assert_eq!(trim_location_label("undefined, Reno, NV, US"), "Reno, NV, US");
        assert_eq!(trim_location_label("Reno, undefined"), "Reno, ");
        assert_eq!(trim_location_label("undefined, undefined, US"), "US");
        assert_eq!(trim_location_label("Reno, NV, undefined"), "Reno, NV, ");
        assert_eq!(trim_location_label("Reno, NV, US"), "Reno, NV, US");
    }

    #[test]
    fn test_trim_trailing_strips_everywhere() {
        assert_eq!(
            trim_location_label("Undefinedundefinedville, NV, undefined"),
            "Undefinedville, NV, "
        );
    }

    #[test]
    fn test_location_summary_sentinel() {
        let summary = build_location_summary(&record(json!({ "Activity": { "Date": "1" } })));
        assert_eq!(summary.full_location, "No known location");
        assert_eq!(summary.maps_url, "https://maps.google.com/");
    }

    #[test]
    fn test_location_summary_nested_address() {
        let raw = record(json!({
            "Activity": {
                "ActivityLocation": {
                    "Address": { "City": "SALT LAKE CITY", "StateProvinceCode": "UT", "CountryCode": "US" }
                }
            }
        }));
        let summary = build_location_summary(&raw);
        assert_eq!(summary.full_location, "SALT LAKE CITY, UT, US");
        assert_eq!(
            summary.maps_url,
            "https://www.google.com/maps/place/SALT+LAKE+CITY,+UT,+US/"
        );
    }

    #[test]
    fn test_location_summary_nested_wins_over_flat() {
        let raw = record(json!({
            "Activity": {
                "ActivityLocation": {
                    "City": "Flat",
                    "Address": { "CountryCode": "DE" }
                }
            }
        }));
        let summary = build_location_summary(&raw);
        assert_eq!(summary.full_location, "DE");
    }

    #[test]
    fn test_maps_url_keeps_untrimmed_address() {
        let raw = record(json!({
            "Activity": { "ActivityLocation": { "CountryCode": "US" } }
        }));
        let summary = build_location_summary(&raw);
        assert_eq!(summary.full_location, "US");
        assert_eq!(
            summary.maps_url,
            "https://www.google.com/maps/place/undefined,+undefined,+US/"
        );
    }

    #[test]
    fn test_parse_shipping_data() {
        let raw = record(json!({
            "PickupDate": "20230415",
            "Package": {
                "Activity": [
                    { "Date": "20230415", "ActivityLocation": { "City": "Sparks", "StateProvinceCode": "NV", "CountryCode": "US" } },
                    { "Date": "20230417", "ActivityLocation": { "Address": reno() } }
                ]
            }
        }));

        let summary = parse_shipping_data("Gift", "1Z999", &raw);
        assert_eq!(summary.package_name, "Gift");
        assert_eq!(summary.tracking_number, "1Z999");
        assert_eq!(summary.date, extract_pickup_date(&raw));
        assert_eq!(summary.latest_location, build_location_summary(&raw));
        assert_eq!(summary.latest_location.full_location, "Reno, NV, US");

        assert_eq!(summary, parse_shipping_data("Gift", "1Z999", &raw));
    }
}
