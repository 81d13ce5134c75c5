pub mod availability;
pub mod compatibility;
pub mod dispatcher;
pub mod protocol;
pub mod search;

pub use crate::domain::blood_group::{compatible, BloodGroup};
pub use crate::domain::model::{
    AvailabilityReport, CompatibilityResult, DonationRecord, SearchCriteria, SearchResult,
};
pub use crate::domain::ports::Operation;
pub use crate::utils::error::Result;
