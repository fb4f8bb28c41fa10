use chrono::{Days, NaiveDateTime};

use crate::types::{ComplianceStatus, Record};

/// Deadline-compliance of a single vehicle.
///
/// First match wins:
/// 1. no contract date or no completion date: `Indeterminate`
/// 2. allowance known, finished by `contract + allowed_days`: `OnTime`
/// 3. allowance known, finished after it: `Late`
/// 4. no allowance, finished before the contract date: `Early`
/// 5. otherwise `Indeterminate`
pub fn classify(
    completion: Option<NaiveDateTime>,
    contract: Option<NaiveDateTime>,
    allowed_days: Option<u32>,
) -> ComplianceStatus {
    let (Some(completion), Some(contract)) = (completion, contract) else {
        return ComplianceStatus::Indeterminate;
    };
    match allowed_days {
        // A deadline past the calendar's end can't be missed.
        Some(days) => match contract.checked_add_days(Days::new(u64::from(days))) {
            Some(deadline) if completion > deadline => ComplianceStatus::Late,
            _ => ComplianceStatus::OnTime,
        },
        None if completion < contract => ComplianceStatus::Early,
        None => ComplianceStatus::Indeterminate,
    }
}

impl Record {
    pub fn compliance(&self) -> ComplianceStatus {
        classify(
            Some(self.completion_date),
            self.contract_date,
            self.allowed_days,
        )
    }
}
