use crate::config::toml_config::EngineConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "blood-calc")]
#[command(about = "Blood group compatibility and donation analytics engine")]
#[command(
    long_about = "Reads one JSON request line from stdin and writes one JSON response line to stdout. \
Supported operations: check_compatibility, search_donations, calculate_availability."
)]
pub struct CliConfig {
    /// Path to a TOML configuration file (falls back to $BLOOD_CALC_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging on stderr")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    /// Override limits.max_records from the config file
    #[arg(long)]
    pub max_records: Option<usize>,
}

impl CliConfig {
    /// 命令列參數覆蓋檔案設定
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if self.log_json {
            config.logging.json = true;
        }
        if let Some(max_records) = self.max_records {
            config.limits.max_records = max_records;
        }
    }
}
