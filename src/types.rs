use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::TrackError;

/// Package tracking state, derived from an activity's status type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    LabelCreated,
    PickedUp,
    InTransit,
    Delivered,
    Exception,
    Unknown,
}

impl TrackingState {
    /// Parse from the carrier's single-letter `Status.Type` code
    pub fn from_status_type(code: &str) -> Self {
        match code.trim() {
            "M" | "MV" => Self::LabelCreated,
            "P" => Self::PickedUp,
            "I" => Self::InTransit,
            "D" => Self::Delivered,
            "X" | "RS" => Self::Exception,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LabelCreated => write!(f, "LABEL_CREATED"),
            Self::PickedUp => write!(f, "PICKED_UP"),
            Self::InTransit => write!(f, "IN_TRANSIT"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Exception => write!(f, "EXCEPTION"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A field the carrier sends either as a single object or as a list of them
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// First element, or the single element
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::Many(items) => items.first(),
            Self::One(item) => Some(item),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::Many(items) => items.iter(),
            Self::One(item) => std::slice::from_ref(item).iter(),
        }
    }
}

/// Activity history of a shipment: a list of checkpoints, or one bare record
pub type ActivityCollection = OneOrMany<Activity>;

/// Raw shipment status record as sent by the carrier
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawShippingRecord {
    /// `YYYYMMDD`
    #[serde(rename = "PickupDate", default, deserialize_with = "string_or_number")]
    pub pickup_date: Option<String>,
    #[serde(rename = "Package", default)]
    pub package: Option<OneOrMany<PackageRecord>>,
    #[serde(rename = "Activity", default)]
    pub activity: Option<ActivityCollection>,
}

impl RawShippingRecord {
    /// Activity collection to scan: the package's when a `Package` is present,
    /// the top-level one otherwise.
    pub fn activity_collection(&self) -> Option<&ActivityCollection> {
        match &self.package {
            Some(packages) => packages.first()?.activity.as_ref(),
            None => self.activity.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageRecord {
    #[serde(rename = "TrackingNumber", default)]
    pub tracking_number: Option<String>,
    #[serde(rename = "Activity", default)]
    pub activity: Option<ActivityCollection>,
}

/// One checkpoint in the shipment's history
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Activity {
    /// `YYYYMMDD`, compared as a string
    #[serde(rename = "Date", default, deserialize_with = "string_or_number")]
    pub date: Option<String>,
    /// `HHMMSS`
    #[serde(rename = "Time", default, deserialize_with = "string_or_number")]
    pub time: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<ActivityStatus>,
    #[serde(rename = "ActivityLocation", default)]
    pub activity_location: Option<ActivityLocation>,
}

impl Activity {
    pub fn tracking_state(&self) -> TrackingState {
        self.status
            .as_ref()
            .and_then(|s| s.status_type.as_deref())
            .map(TrackingState::from_status_type)
            .unwrap_or(TrackingState::Unknown)
    }

    pub fn description(&self) -> Option<&str> {
        self.status.as_ref()?.description.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActivityStatus {
    #[serde(rename = "Type", default)]
    pub status_type: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Code", default)]
    pub code: Option<String>,
}

/// Location attached to an activity.
///
/// Some responses nest the fields under `Address`, others put them directly
/// on the location object. The presence of an `Address` key decides which
/// one is read.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityLocation {
    Nested { address: AddressFields },
    Flat(AddressFields),
}

impl ActivityLocation {
    pub fn fields(&self) -> &AddressFields {
        match self {
            Self::Nested { address } => address,
            Self::Flat(fields) => fields,
        }
    }
}

impl<'de> Deserialize<'de> for ActivityLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        match map.remove("Address") {
            Some(address) => AddressFields::deserialize(address)
                .map(|address| Self::Nested { address })
                .map_err(D::Error::custom),
            None => AddressFields::deserialize(Value::Object(map))
                .map(Self::Flat)
                .map_err(D::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressFields {
    #[serde(rename = "City", default, deserialize_with = "string_or_number")]
    pub city: Option<String>,
    #[serde(
        rename = "StateProvinceCode",
        default,
        deserialize_with = "string_or_number"
    )]
    pub state_province_code: Option<String>,
    #[serde(rename = "CountryCode", default, deserialize_with = "string_or_number")]
    pub country_code: Option<String>,
}

/// Body returned by the tracking endpoint.
///
/// The top-level key picks the shape: `TrackResponse` is a wrapped shipment,
/// `response` is a fault, anything else is read as a bare record. A body that
/// names a shape but does not match it is an error rather than an empty
/// record.
#[derive(Debug, Clone)]
pub enum TrackEnvelope {
    Wrapped { track_response: TrackResponseBody },
    Fault { response: FaultBody },
    Bare(RawShippingRecord),
}

impl TrackEnvelope {
    /// Unwrap to the shipment's status record.
    ///
    /// `tracking_number` is only used for error reporting.
    pub fn into_record(self, tracking_number: &str) -> Result<RawShippingRecord, TrackError> {
        match self {
            Self::Wrapped { track_response } => track_response
                .shipment
                .first()
                .cloned()
                .ok_or_else(|| TrackError::NotFound {
                    tracking_number: tracking_number.to_string(),
                }),
            Self::Fault { response } => Err(response.into_error()),
            Self::Bare(record) => Ok(record),
        }
    }
}

impl<'de> Deserialize<'de> for TrackEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        if let Some(body) = map.remove("TrackResponse") {
            return TrackResponseBody::deserialize(body)
                .map(|track_response| Self::Wrapped { track_response })
                .map_err(D::Error::custom);
        }
        if let Some(body) = map.remove("response") {
            return FaultBody::deserialize(body)
                .map(|response| Self::Fault { response })
                .map_err(D::Error::custom);
        }
        RawShippingRecord::deserialize(Value::Object(map))
            .map(Self::Bare)
            .map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackResponseBody {
    #[serde(rename = "Shipment")]
    pub shipment: OneOrMany<RawShippingRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaultBody {
    #[serde(default)]
    pub errors: Vec<CarrierError>,
}

impl FaultBody {
    /// The first reported error, or a generic one when the list is empty
    pub fn into_error(self) -> TrackError {
        match self.errors.into_iter().next() {
            Some(first) => TrackError::Carrier {
                code: first.code,
                message: first.message,
            },
            None => TrackError::Carrier {
                code: String::new(),
                message: "empty fault response".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Pickup date split into its parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupDate {
    pub month: String,
    pub day: String,
    pub year: String,
    pub full_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub full_location: String,
    pub maps_url: String,
}

/// Normalized view of one tracked package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub package_name: String,
    pub tracking_number: String,
    pub date: PickupDate,
    pub latest_location: LocationSummary,
}

/// Accepts `"20230415"` as well as `20230415`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|d| match d {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_shapes() {
        let list: RawShippingRecord = serde_json::from_value(json!({
            "Activity": [{ "Date": "20230101" }, { "Date": "20230102" }]
        }))
        .unwrap();
        assert!(matches!(list.activity, Some(ActivityCollection::Many(ref v)) if v.len() == 2));

        let single: RawShippingRecord = serde_json::from_value(json!({
            "Activity": { "Date": "20230101" }
        }))
        .unwrap();
        assert!(matches!(single.activity, Some(ActivityCollection::One(_))));
    }

    #[test]
    fn test_location_shapes() {
        let nested: ActivityLocation = serde_json::from_value(json!({
            "Address": { "City": "Reno", "StateProvinceCode": "NV", "CountryCode": "US" },
            "Code": "M1"
        }))
        .unwrap();
        assert!(matches!(nested, ActivityLocation::Nested { .. }));
        assert_eq!(nested.fields().city.as_deref(), Some("Reno"));

        let flat: ActivityLocation =
            serde_json::from_value(json!({ "City": "Reno", "CountryCode": "US" })).unwrap();
        assert!(matches!(flat, ActivityLocation::Flat(_)));
        assert_eq!(flat.fields().state_province_code, None);
    }

    #[test]
    fn test_address_key_decides_location_shape() {
        let nested: ActivityLocation = serde_json::from_value(json!({
            "Address": { "City": "Reno", "StateProvinceCode": "NV", "CountryCode": 840 }
        }))
        .unwrap();
        assert!(matches!(nested, ActivityLocation::Nested { .. }));
        assert_eq!(nested.fields().country_code.as_deref(), Some("840"));

        let malformed = serde_json::from_value::<ActivityLocation>(json!({
            "Address": { "City": ["Reno"] },
            "City": "Sparks"
        }));
        assert!(malformed.is_err());
    }

    #[test]
    fn test_envelope_shapes() {
        let wrapped: TrackEnvelope = serde_json::from_value(json!({
            "TrackResponse": { "Shipment": [{ "PickupDate": "20230415" }] }
        }))
        .unwrap();
        let record = wrapped.into_record("1Z1").unwrap();
        assert_eq!(record.pickup_date.as_deref(), Some("20230415"));

        let bare: TrackEnvelope =
            serde_json::from_value(json!({ "PickupDate": "20230101" })).unwrap();
        assert!(matches!(bare, TrackEnvelope::Bare(_)));

        let fault: TrackEnvelope =
            serde_json::from_value(json!({ "response": { "errors": [] } })).unwrap();
        assert!(matches!(
            fault.into_record("1Z1"),
            Err(TrackError::Carrier { .. })
        ));

        let no_shipment: TrackEnvelope =
            serde_json::from_value(json!({ "TrackResponse": { "Shipment": [] } })).unwrap();
        assert!(matches!(
            no_shipment.into_record("1Z1"),
            Err(TrackError::NotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_track_response_is_an_error() {
        let result = serde_json::from_value::<TrackEnvelope>(json!({
            "TrackResponse": {
                "Shipment": { "PickupDate": "20230415", "Package": { "Activity": { "Date": true } } }
            }
        }));
        assert!(result.is_err());

        assert!(serde_json::from_value::<TrackEnvelope>(json!([1, 2])).is_err());
    }

    #[test]
    fn test_numeric_dates() {
        let record: RawShippingRecord = serde_json::from_value(json!({
            "PickupDate": 20230415,
            "Activity": { "Date": 20230416, "Time": "101500" }
        }))
        .unwrap();
        assert_eq!(record.pickup_date.as_deref(), Some("20230415"));
        let activity = record.activity.unwrap();
        assert_eq!(activity.first().unwrap().date.as_deref(), Some("20230416"));
    }

    #[test]
    fn test_package_takes_precedence() {
        let record: RawShippingRecord = serde_json::from_value(json!({
            "Package": { "TrackingNumber": "1Z999", "Activity": { "Date": "20230102" } },
            "Activity": { "Date": "20230101" }
        }))
        .unwrap();
        let activity = record.activity_collection().unwrap();
        assert_eq!(activity.first().unwrap().date.as_deref(), Some("20230102"));

        let no_activity: RawShippingRecord =
            serde_json::from_value(json!({ "Package": {}, "Activity": { "Date": "1" } })).unwrap();
        assert!(no_activity.activity_collection().is_none());
    }

    #[test]
    fn test_tracking_state() {
        assert_eq!(TrackingState::from_status_type("D"), TrackingState::Delivered);
        assert_eq!(TrackingState::from_status_type("I"), TrackingState::InTransit);
        assert_eq!(TrackingState::from_status_type("?"), TrackingState::Unknown);
        assert_eq!(TrackingState::InTransit.to_string(), "IN_TRANSIT");
    }

    #[test]
    fn test_summary_keys() {
        let summary = PackageSummary {
            package_name: "Gift".to_string(),
            tracking_number: "1Z999".to_string(),
            date: PickupDate {
                month: "04".to_string(),
                day: "15".to_string(),
                year: "2023".to_string(),
                full_date: "04/15/2023".to_string(),
            },
            latest_location: LocationSummary {
                full_location: "Reno, NV, US".to_string(),
                maps_url: "https://www.google.com/maps/place/Reno,+NV,+US/".to_string(),
            },
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["packageName"], "Gift");
        assert_eq!(value["trackingNumber"], "1Z999");
        assert_eq!(value["date"]["fullDate"], "04/15/2023");
        assert_eq!(value["latestLocation"]["mapsUrl"], summary.latest_location.maps_url);
    }
}
