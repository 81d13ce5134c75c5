use crate::domain::blood_group::BloodGroup;
use crate::utils::error::{CalcError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// 單筆捐血紀錄，搜尋與庫存統計共用同一形狀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub blood_group: BloodGroup,
    pub units: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub is_available: bool,
}

impl DonationRecord {
    pub fn new(blood_group: BloodGroup, units: u64, is_available: bool) -> Self {
        Self {
            blood_group,
            units,
            donor_name: None,
            date: None,
            location: None,
            is_available,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_donor_name(mut self, donor_name: impl Into<String>) -> Self {
        self.donor_name = Some(donor_name.into());
        self
    }
}

/// Donation as it arrives on the wire, before per-record validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDonationRecord {
    pub blood_group: Option<String>,
    pub units: Option<serde_json::Value>,
    pub donor_name: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
    pub is_available: Option<serde_json::Value>,
}

impl RawDonationRecord {
    /// 驗證並轉換成 DonationRecord；`index` 只用於錯誤訊息
    pub fn into_record(self, index: usize) -> Result<DonationRecord> {
        let invalid = |reason: String| CalcError::InvalidRecord { index, reason };

        let blood_group = match non_empty(self.blood_group) {
            Some(raw) => raw
                .parse::<BloodGroup>()
                .map_err(|e| invalid(e.to_string()))?,
            None => return Err(invalid("missing blood_group".to_string())),
        };

        let units = match self.units {
            None | Some(serde_json::Value::Null) => {
                return Err(invalid("missing units".to_string()))
            }
            Some(value) => parse_units(&value).map_err(invalid)?,
        };

        // 日期只在搜尋啟用 date_range 時才需要，無法解析時視為缺少
        let date = non_empty(self.date).and_then(|raw| {
            let parsed = parse_date(&raw);
            if parsed.is_none() {
                tracing::warn!(index, "Ignoring unparseable donation date '{}'", raw);
            }
            parsed
        });

        let is_available = parse_availability(self.is_available).map_err(invalid)?;

        Ok(DonationRecord {
            blood_group,
            units,
            donor_name: non_empty(self.donor_name),
            date,
            location: non_empty(self.location),
            is_available,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_units(value: &serde_json::Value) -> std::result::Result<u64, String> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(units) = n.as_u64() {
                Ok(units)
            } else if n.as_i64().is_some_and(|v| v < 0) || n.as_f64().is_some_and(|v| v < 0.0) {
                Err(format!("negative unit count {}", n))
            } else {
                // 3.0 這類整數值的浮點數仍可接受
                match n.as_f64() {
                    Some(v) if v.is_finite() && v.fract() == 0.0 && v < u64::MAX as f64 => {
                        Ok(v as u64)
                    }
                    _ => Err(format!("non-integer unit count {}", n)),
                }
            }
        }
        other => Err(format!("non-numeric unit count {}", other)),
    }
}

/// Missing or null means unavailable; a number counts as available when non-zero.
fn parse_availability(value: Option<serde_json::Value>) -> std::result::Result<bool, String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(false),
        Some(serde_json::Value::Bool(flag)) => Ok(flag),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Some(other) => Err(format!("is_available must be a boolean, got {}", other)),
    }
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp or an ISO 8601 timestamp
/// without offset; timestamps are reduced to their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Inclusive closed date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn range_separator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?P<start>.+?)\s*(?:\.\.|/|,|\bto\b)\s*(?P<end>.+?)\s*$")
            .expect("date range pattern is valid")
    })
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CalcError::malformed(format!(
                "date_range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// 解析 `A..B`、`A/B`、`A,B`、`A to B` 或單一日期
    pub fn parse(raw: &str) -> Result<Self> {
        let bad_date = |value: &str| {
            CalcError::malformed(format!("date_range contains invalid date '{}'", value))
        };

        if let Some(single) = parse_date(raw) {
            return Self::new(single, single);
        }

        let caps = range_separator()
            .captures(raw)
            .ok_or_else(|| CalcError::malformed(format!("unrecognised date_range '{}'", raw)))?;
        let start = parse_date(&caps["start"]).ok_or_else(|| bad_date(&caps["start"]))?;
        let end = parse_date(&caps["end"]).ok_or_else(|| bad_date(&caps["end"]))?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// 搜尋條件，所有已設定的條件以 AND 組合
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    pub blood_group: Option<BloodGroup>,
    pub location: Option<String>,
    pub date_range: Option<DateRange>,
    pub available_only: bool,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            blood_group: None,
            location: None,
            date_range: None,
            available_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub donor: BloodGroup,
    pub recipient: BloodGroup,
    pub compatible: bool,
    pub description: String,
    pub is_universal_donor: bool,
    pub is_universal_recipient: bool,
    pub compatible_donors: Vec<BloodGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub donations: Vec<DonationRecord>,
    pub count: usize,
    pub invalid_records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    pub available: u64,
    pub total: u64,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub availability: BTreeMap<BloodGroup, u64>,
    pub statistics: BTreeMap<BloodGroup, GroupStatistics>,
    pub total_available: u64,
    pub invalid_records: usize,
}

impl AvailabilityReport {
    pub fn available(&self, group: BloodGroup) -> u64 {
        self.availability.get(&group).copied().unwrap_or(0)
    }
}
