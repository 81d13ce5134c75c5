use crate::domain::model::{DonationRecord, SearchCriteria};

/// Stable filter: keeps records matching every active criterion, in input order.
pub fn filter(records: &[DonationRecord], criteria: &SearchCriteria) -> Vec<DonationRecord> {
    let needle = criteria
        .location
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let matches: Vec<DonationRecord> = records
        .iter()
        .filter(|record| !criteria.available_only || record.is_available)
        .filter(|record| {
            criteria
                .blood_group
                .map_or(true, |group| record.blood_group == group)
        })
        .filter(|record| match &needle {
            // 紀錄沒有地點時不符合任何非空的地點條件
            Some(needle) => record
                .location
                .as_deref()
                .is_some_and(|location| location.to_lowercase().contains(needle.as_str())),
            None => true,
        })
        .filter(|record| match criteria.date_range {
            Some(range) => record.date.is_some_and(|date| range.contains(date)),
            None => true,
        })
        .cloned()
        .collect();

    tracing::debug!(
        candidates = records.len(),
        matched = matches.len(),
        "donation search finished"
    );

    matches
}
