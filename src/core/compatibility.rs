use crate::domain::blood_group::{compatible, BloodGroup};
use crate::domain::model::CompatibilityResult;

/// 判斷捐血者與受血者是否相容，並附上說明文字
pub fn check(donor: BloodGroup, recipient: BloodGroup) -> CompatibilityResult {
    let is_compatible = compatible(donor, recipient);
    let compatible_donors = recipient.compatible_donors();

    let rule = if donor.is_universal_donor() {
        format!("{} is a universal donor and can donate to {}", donor, recipient)
    } else if recipient.is_universal_recipient() {
        format!(
            "{} can receive from any donor, including {}",
            recipient, donor
        )
    } else if is_compatible {
        format!("{} can donate to {}", donor, recipient)
    } else {
        format!("{} cannot donate to {}", donor, recipient)
    };

    let sources = compatible_donors
        .iter()
        .map(BloodGroup::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    tracing::debug!(%donor, %recipient, compatible = is_compatible, "compatibility checked");

    CompatibilityResult {
        donor,
        recipient,
        compatible: is_compatible,
        description: format!("{}; {} can receive from {}", rule, recipient, sources),
        is_universal_donor: donor.is_universal_donor(),
        is_universal_recipient: recipient.is_universal_recipient(),
        compatible_donors,
    }
}
