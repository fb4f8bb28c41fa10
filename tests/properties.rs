use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use vehicle_report::{
    aggregate, bucket, classify, week_of_month, ComplianceStatus, FilterContext, GroupField,
    Record, SortOrder,
};

fn arb_timestamp() -> impl Strategy<Value = NaiveDateTime> {
    // 1990-01-01 plus up to ~70 years of minutes.
    (0i64..36_800_000).prop_map(|minutes| {
        NaiveDate::from_ymd_opt(1990, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
            + Duration::minutes(minutes)
    })
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        prop_oneof![Just("Toyota"), Just("Ford"), Just("Jeep"), Just("BMW")],
        prop_oneof![Just("A"), Just("B"), Just("C")],
        arb_timestamp(),
        proptest::option::of(arb_timestamp()),
        proptest::option::of(0u32..400),
    )
        .prop_map(|(brand, model, done, contract, allowed)| Record {
            brand: brand.to_string(),
            model: model.to_string(),
            completion_date: done,
            contract_date: contract,
            allowed_days: allowed,
        })
}

fn arb_fields() -> impl Strategy<Value = Vec<GroupField>> {
    proptest::collection::vec(
        prop_oneof![
            Just(GroupField::Brand),
            Just(GroupField::Model),
            Just(GroupField::MonthKey),
            Just(GroupField::WeekOfMonth),
            Just(GroupField::IsoWeek),
            Just(GroupField::Day),
            Just(GroupField::Year),
            Just(GroupField::Compliance),
        ],
        0..4,
    )
}

proptest! {
    #[test]
    fn month_key_is_monotonic_in_completion_date(
        mut records in proptest::collection::vec(arb_record(), 1..40),
    ) {
        records.sort_by_key(|r| r.completion_date);
        let keys: Vec<String> = records.iter().map(|r| bucket(r).month_key).collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn week_of_month_stays_in_range(day in 1u32..=31) {
        let w = week_of_month(day);
        prop_assert!((1..=5).contains(&w));
    }

    #[test]
    fn classify_is_total_and_follows_priority(
        done in proptest::option::of(arb_timestamp()),
        contract in proptest::option::of(arb_timestamp()),
        allowed in proptest::option::of(0u32..400),
    ) {
        let status = classify(done, contract, allowed);
        match (done, contract, allowed) {
            (None, _, _) | (_, None, _) => prop_assert_eq!(status, ComplianceStatus::Indeterminate),
            (Some(d), Some(c), Some(a)) => {
                let deadline = c + Duration::days(i64::from(a));
                let expected = if d <= deadline {
                    ComplianceStatus::OnTime
                } else {
                    ComplianceStatus::Late
                };
                prop_assert_eq!(status, expected);
            }
            (Some(d), Some(c), None) => {
                let expected = if d < c {
                    ComplianceStatus::Early
                } else {
                    ComplianceStatus::Indeterminate
                };
                prop_assert_eq!(status, expected);
            }
        }
    }

    #[test]
    fn aggregate_is_idempotent_and_counts_every_row(
        records in proptest::collection::vec(arb_record(), 0..60),
        fields in arb_fields(),
        sort in prop_oneof![
            Just(SortOrder::None),
            Just(SortOrder::ByKey),
            Just(SortOrder::ByCount),
        ],
    ) {
        let filter = FilterContext::default();
        let first = aggregate(&records, &fields, &filter, sort);
        let second = aggregate(&records, &fields, &filter, sort);
        prop_assert_eq!(&first, &second);
        let total: usize = first.iter().filter_map(|r| r.count()).sum();
        prop_assert_eq!(total, records.len());
        prop_assert!(first.iter().all(|r| r.count() > Some(0)));
    }
}

#[test]
fn week_of_month_examples() {
    assert_eq!(week_of_month(1), 1);
    assert_eq!(week_of_month(8), 2);
}

#[test]
fn documented_classification_examples() {
    let at = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(0, 0, 0));
    assert_eq!(classify(at(2024, 3, 10), at(2024, 3, 1), Some(14)), ComplianceStatus::OnTime);
    assert_eq!(classify(at(2024, 3, 20), at(2024, 3, 1), Some(14)), ComplianceStatus::Late);
    assert_eq!(classify(at(2024, 2, 25), at(2024, 3, 1), None), ComplianceStatus::Early);
    assert_eq!(classify(at(2024, 3, 10), None, Some(14)), ComplianceStatus::Indeterminate);
}
