pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{EngineConfig, LimitsConfig};

pub use crate::core::dispatcher::{Dispatcher, Outcome};
pub use crate::core::protocol::{Request, Response};
pub use crate::core::{availability::aggregate, compatibility::check, search::filter};
pub use crate::domain::blood_group::BloodGroup;
pub use crate::domain::model::{
    AvailabilityReport, CompatibilityResult, DateRange, DonationRecord, SearchCriteria,
    SearchResult,
};
pub use crate::utils::error::{CalcError, Result};
