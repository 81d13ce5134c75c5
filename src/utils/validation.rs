use crate::utils::error::{CalcError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(CalcError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(CalcError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_log_level(field_name: &str, level: &str) -> Result<()> {
    let normalized = level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&normalized.as_str()) {
        return Err(CalcError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: level.to_string(),
            reason: format!("Unsupported log level. Valid levels: {}", LOG_LEVELS.join(", ")),
        });
    }
    Ok(())
}

/// 請求中的必要欄位；缺少時視為格式錯誤的請求
pub fn require_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| CalcError::malformed(format!("missing required field '{}'", field_name)))
}
