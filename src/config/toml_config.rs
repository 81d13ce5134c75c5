use crate::utils::error::{CalcError, Result};
use crate::utils::validation::{
    validate_log_level, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_ENV_VAR: &str = "BLOOD_CALC_CONFIG";

const MIN_REQUEST_BYTES: usize = 64;
const MAX_REQUEST_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_records: usize,
    pub max_request_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_records: 100_000,
            max_request_bytes: 16 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| CalcError::ConfigError {
            message: format!("cannot read '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CalcError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Explicit path first, then `BLOOD_CALC_CONFIG`, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${MAX_RECORDS})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CalcError::ConfigError {
            message: format!("environment substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        validate_log_level("logging.level", &self.logging.level)?;
        validate_positive_number("limits.max_records", self.limits.max_records, 1)?;
        validate_range(
            "limits.max_request_bytes",
            self.limits.max_request_bytes,
            MIN_REQUEST_BYTES,
            MAX_REQUEST_BYTES,
        )?;
        Ok(())
    }
}
