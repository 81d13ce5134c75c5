use crate::domain::blood_group::BloodGroup;
use crate::domain::model::{AvailabilityReport, DonationRecord, GroupStatistics};
use std::collections::BTreeMap;

/// 依血型加總可用單位；八種血型一律出現在報表中
///
/// `invalid_records` is the number of wire records dropped before aggregation.
/// A record whose units would overflow any running sum is skipped and added to
/// that count.
pub fn aggregate(records: &[DonationRecord], invalid_records: usize) -> AvailabilityReport {
    let mut available: BTreeMap<BloodGroup, u64> =
        BloodGroup::ALL.into_iter().map(|g| (g, 0)).collect();
    let mut total: BTreeMap<BloodGroup, u64> = available.clone();
    let mut total_available: u64 = 0;
    let mut invalid_records = invalid_records;

    for (index, record) in records.iter().enumerate() {
        let group = record.blood_group;
        let group_total = total[&group].checked_add(record.units);
        let (group_available, grand_total) = if record.is_available {
            (
                available[&group].checked_add(record.units),
                total_available.checked_add(record.units),
            )
        } else {
            (Some(available[&group]), Some(total_available))
        };

        match (group_total, group_available, grand_total) {
            (Some(group_total), Some(group_available), Some(grand_total)) => {
                total.insert(group, group_total);
                available.insert(group, group_available);
                total_available = grand_total;
            }
            _ => {
                // 加總溢位：整筆略過，不影響其他紀錄
                tracing::warn!(
                    index,
                    units = record.units,
                    "Skipping donation record: unit sum overflows for {}",
                    group
                );
                invalid_records += 1;
            }
        }
    }

    let statistics = BloodGroup::ALL
        .into_iter()
        .map(|group| {
            let available = available[&group];
            let total = total[&group];
            let utilization = if total == 0 {
                0.0
            } else {
                available as f64 / total as f64
            };
            (
                group,
                GroupStatistics {
                    available,
                    total,
                    utilization,
                },
            )
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        invalid_records,
        total_available,
        "availability aggregated"
    );

    AvailabilityReport {
        availability: available,
        statistics,
        total_available,
        invalid_records,
    }
}
