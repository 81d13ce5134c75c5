use crate::config::LimitsConfig;
use crate::core::{availability, compatibility, search};
use crate::domain::blood_group::BloodGroup;
use crate::domain::model::{
    AvailabilityReport, CompatibilityResult, DateRange, DonationRecord, RawDonationRecord,
    SearchCriteria, SearchResult,
};
use crate::domain::ports::Operation;
use crate::utils::error::{CalcError, Result};
use crate::utils::validation::require_field;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CHECK_COMPATIBILITY: &str = "check_compatibility";
pub const SEARCH_DONATIONS: &str = "search_donations";
pub const CALCULATE_AVAILABILITY: &str = "calculate_availability";

#[derive(Debug, Deserialize)]
struct CheckCompatibilityWire {
    donor: Option<String>,
    recipient: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchDonationsWire {
    donations: Option<Vec<Value>>,
    blood_group: Option<String>,
    location: Option<String>,
    date_range: Option<DateRangeWire>,
    available_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CalculateAvailabilityWire {
    donations: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DateRangeWire {
    Text(String),
    Bounds { start: String, end: String },
}

impl DateRangeWire {
    fn into_range(self) -> Result<Option<DateRange>> {
        match self {
            DateRangeWire::Text(text) if text.trim().is_empty() => Ok(None),
            DateRangeWire::Text(text) => DateRange::parse(&text).map(Some),
            DateRangeWire::Bounds { start, end } => {
                DateRange::parse(&format!("{}..{}", start.trim(), end.trim())).map(Some)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckCompatibility {
    pub donor: BloodGroup,
    pub recipient: BloodGroup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchDonations {
    pub donations: Vec<DonationRecord>,
    pub criteria: SearchCriteria,
    pub invalid_records: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculateAvailability {
    pub donations: Vec<DonationRecord>,
    pub invalid_records: usize,
}

impl Operation for CheckCompatibility {
    const NAME: &'static str = CHECK_COMPATIBILITY;
    type Output = CompatibilityResult;

    fn execute(self) -> Result<CompatibilityResult> {
        Ok(compatibility::check(self.donor, self.recipient))
    }
}

impl Operation for SearchDonations {
    const NAME: &'static str = SEARCH_DONATIONS;
    type Output = SearchResult;

    fn execute(self) -> Result<SearchResult> {
        let donations = search::filter(&self.donations, &self.criteria);
        Ok(SearchResult {
            count: donations.len(),
            donations,
            invalid_records: self.invalid_records,
        })
    }
}

impl Operation for CalculateAvailability {
    const NAME: &'static str = CALCULATE_AVAILABILITY;
    type Output = AvailabilityReport;

    fn execute(self) -> Result<AvailabilityReport> {
        Ok(availability::aggregate(&self.donations, self.invalid_records))
    }
}

/// 已驗證的請求，依 `operation` 標籤分派
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CheckCompatibility(CheckCompatibility),
    SearchDonations(SearchDonations),
    CalculateAvailability(CalculateAvailability),
}

impl Request {
    pub fn operation(&self) -> &'static str {
        match self {
            Request::CheckCompatibility(_) => CheckCompatibility::NAME,
            Request::SearchDonations(_) => SearchDonations::NAME,
            Request::CalculateAvailability(_) => CalculateAvailability::NAME,
        }
    }

    /// Parses one request line. Top-level problems are fatal; bad donation
    /// records are dropped and counted instead.
    pub fn parse(line: &str, limits: &LimitsConfig) -> Result<Self> {
        let root: Value = serde_json::from_str(line)
            .map_err(|e| CalcError::malformed(format!("invalid JSON: {}", e)))?;

        let operation = match root.get("operation") {
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => {
                return Err(CalcError::malformed(format!(
                    "'operation' must be a string, got {}",
                    other
                )))
            }
            None if root.is_object() => {
                return Err(CalcError::malformed("missing required field 'operation'"))
            }
            None => return Err(CalcError::malformed("request must be a JSON object")),
        };

        match operation.as_str() {
            CHECK_COMPATIBILITY => {
                let wire: CheckCompatibilityWire = decode_fields(root, CHECK_COMPATIBILITY)?;
                let donor = require_field("donor", &wire.donor)?.parse::<BloodGroup>()?;
                let recipient =
                    require_field("recipient", &wire.recipient)?.parse::<BloodGroup>()?;
                Ok(Request::CheckCompatibility(CheckCompatibility {
                    donor,
                    recipient,
                }))
            }
            SEARCH_DONATIONS => {
                let wire: SearchDonationsWire = decode_fields(root, SEARCH_DONATIONS)?;
                let blood_group = match wire.blood_group.filter(|g| !g.trim().is_empty()) {
                    Some(raw) => Some(raw.parse::<BloodGroup>()?),
                    None => None,
                };
                let date_range = match wire.date_range {
                    Some(range) => range.into_range()?,
                    None => None,
                };
                let criteria = SearchCriteria {
                    blood_group,
                    location: wire.location.filter(|l| !l.trim().is_empty()),
                    date_range,
                    available_only: wire.available_only.unwrap_or(true),
                };
                let raw = require_field("donations", &wire.donations)?;
                let (donations, invalid_records) = decode_donations(raw, limits)?;
                Ok(Request::SearchDonations(SearchDonations {
                    donations,
                    criteria,
                    invalid_records,
                }))
            }
            CALCULATE_AVAILABILITY => {
                let wire: CalculateAvailabilityWire =
                    decode_fields(root, CALCULATE_AVAILABILITY)?;
                let raw = require_field("donations", &wire.donations)?;
                let (donations, invalid_records) = decode_donations(raw, limits)?;
                Ok(Request::CalculateAvailability(CalculateAvailability {
                    donations,
                    invalid_records,
                }))
            }
            _ => Err(CalcError::UnknownOperation { operation }),
        }
    }

    pub fn execute(self) -> Result<Response> {
        match self {
            Request::CheckCompatibility(op) => op.execute().map(Response::Compatibility),
            Request::SearchDonations(op) => op.execute().map(Response::Search),
            Request::CalculateAvailability(op) => op.execute().map(Response::Availability),
        }
    }
}

fn decode_fields<T: DeserializeOwned>(root: Value, operation: &str) -> Result<T> {
    serde_json::from_value(root)
        .map_err(|e| CalcError::malformed(format!("invalid fields for {}: {}", operation, e)))
}

/// 逐筆驗證捐血紀錄；無效紀錄略過並計數
pub fn decode_donations(
    raw: &[Value],
    limits: &LimitsConfig,
) -> Result<(Vec<DonationRecord>, usize)> {
    if raw.len() > limits.max_records {
        return Err(CalcError::malformed(format!(
            "{} donation records exceed the limit of {}",
            raw.len(),
            limits.max_records
        )));
    }

    let mut records = Vec::with_capacity(raw.len());
    let mut invalid = 0;

    for (index, value) in raw.iter().enumerate() {
        let decoded = serde_json::from_value::<RawDonationRecord>(value.clone())
            .map_err(|e| CalcError::InvalidRecord {
                index,
                reason: e.to_string(),
            })
            .and_then(|record| record.into_record(index));

        match decoded {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping donation record: {}", e);
                invalid += 1;
            }
        }
    }

    Ok((records, invalid))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl From<&CalcError> for ErrorResponse {
    fn from(e: &CalcError) -> Self {
        Self {
            error: e.to_string(),
            kind: e.kind().to_string(),
        }
    }
}

/// One response line. Variants are told apart by their required fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Compatibility(CompatibilityResult),
    Search(SearchResult),
    Availability(AvailabilityReport),
    Error(ErrorResponse),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    fn parse(value: Value) -> Result<Request> {
        Request::parse(&value.to_string(), &limits())
    }

    #[test]
    fn test_parse_check_compatibility() {
        let request = parse(json!({
            "operation": "check_compatibility",
            "donor": "O-",
            "recipient": "A+"
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::CheckCompatibility(CheckCompatibility {
                donor: BloodGroup::ONeg,
                recipient: BloodGroup::APos,
            })
        );
        assert_eq!(request.operation(), "check_compatibility");
    }

    #[test]
    fn test_missing_operand_is_malformed() {
        let err = parse(json!({"operation": "check_compatibility", "donor": "O-"})).unwrap_err();
        assert!(matches!(err, CalcError::MalformedRequest { .. }));
        assert!(err.to_string().contains("recipient"));
    }

    #[test]
    fn test_invalid_operand_group_is_fatal() {
        let err = parse(json!({
            "operation": "check_compatibility",
            "donor": "Q+",
            "recipient": "A+"
        }))
        .unwrap_err();
        assert!(matches!(err, CalcError::InvalidBloodGroup { ref value } if value == "Q+"));
    }

    #[test]
    fn test_unknown_operation() {
        let err = parse(json!({"operation": "frobnicate"})).unwrap_err();
        assert!(matches!(err, CalcError::UnknownOperation { ref operation } if operation == "frobnicate"));
    }

    #[test]
    fn test_non_object_and_bad_json() {
        assert!(matches!(
            parse(json!([1, 2])).unwrap_err(),
            CalcError::MalformedRequest { .. }
        ));
        assert!(matches!(
            parse(json!({"donor": "O-"})).unwrap_err(),
            CalcError::MalformedRequest { .. }
        ));
        assert!(matches!(
            Request::parse("{not json", &limits()).unwrap_err(),
            CalcError::MalformedRequest { .. }
        ));
        assert!(matches!(
            parse(json!({"operation": 7})).unwrap_err(),
            CalcError::MalformedRequest { .. }
        ));
    }

    #[test]
    fn test_search_defaults_and_nulls() {
        let request = parse(json!({
            "operation": "search_donations",
            "donations": [],
            "blood_group": null,
            "location": "",
            "date_range": null
        }))
        .unwrap();
        match request {
            Request::SearchDonations(op) => {
                assert_eq!(op.criteria, SearchCriteria::default());
                assert!(op.donations.is_empty());
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_search_date_range_object_and_text() {
        for range in [
            json!("2024-01-01..2024-01-31"),
            json!({"start": "2024-01-01", "end": "2024-01-31"}),
        ] {
            let request = parse(json!({
                "operation": "search_donations",
                "donations": [],
                "date_range": range
            }))
            .unwrap();
            let Request::SearchDonations(op) = request else {
                panic!("expected search request");
            };
            let range = op.criteria.date_range.unwrap();
            assert_eq!(range.start.to_string(), "2024-01-01");
            assert_eq!(range.end.to_string(), "2024-01-31");
        }
    }

    #[test]
    fn test_search_requires_donations() {
        let err = parse(json!({"operation": "search_donations"})).unwrap_err();
        assert!(err.to_string().contains("donations"));

        let err = parse(json!({"operation": "calculate_availability", "donations": "x"}))
            .unwrap_err();
        assert!(matches!(err, CalcError::MalformedRequest { .. }));
    }

    #[test]
    fn test_invalid_records_are_counted_not_fatal() {
        let request = parse(json!({
            "operation": "calculate_availability",
            "donations": [
                {"blood_group": "A+", "units": 2, "is_available": true},
                {"blood_group": "A+", "units": -1, "is_available": true},
                {"blood_group": "A+", "units": "lots", "is_available": true},
                "not a record",
                {"blood_group": "Z", "units": 1, "is_available": true}
            ]
        }))
        .unwrap();
        let Request::CalculateAvailability(op) = request else {
            panic!("expected availability request");
        };
        assert_eq!(op.donations.len(), 1);
        assert_eq!(op.invalid_records, 4);
    }

    #[test]
    fn test_record_limit() {
        let limits = LimitsConfig {
            max_records: 1,
            ..LimitsConfig::default()
        };
        let raw = vec![json!({"blood_group": "A+", "units": 1}); 2];
        let err = decode_donations(&raw, &limits).unwrap_err();
        assert!(matches!(err, CalcError::MalformedRequest { .. }));
    }

    #[test]
    fn test_error_response_shape() {
        let err = CalcError::UnknownOperation {
            operation: "frobnicate".to_string(),
        };
        let body = serde_json::to_value(Response::Error(ErrorResponse::from(&err))).unwrap();
        assert_eq!(body["kind"], "unknown_operation");
        assert!(body["error"].as_str().unwrap().contains("frobnicate"));
    }
}
