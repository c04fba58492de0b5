use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use serde_json::json;

use healthcare_portal::models::{Appointment, AppointmentStatus};
use healthcare_portal::reconciler::{categorize, is_past, merge};

const STATUSES: [&str; 5] = ["scheduled", "confirmed", "pending", "completed", "cancelled"];
const TIMES: [&str; 5] = ["09:00 AM", "2:30 PM", "14:45", "12:00 PM", "whenever"];

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
}

fn arb_appointment() -> impl Strategy<Value = Appointment> {
    (0u8..12, 0i64..60, 0usize..TIMES.len(), 0usize..STATUSES.len()).prop_map(
        |(id, offset, time, status)| {
            serde_json::from_value(json!({
                "id": id.to_string(),
                "userId": "1",
                "date": (base() + Duration::days(offset)).format("%Y-%m-%d").to_string(),
                "time": TIMES[time],
                "status": STATUSES[status]
            }))
            .unwrap()
        },
    )
}

fn arb_list() -> impl Strategy<Value = Vec<Appointment>> {
    prop::collection::vec(arb_appointment(), 0..10)
}

proptest! {
    #[test]
    fn merge_keeps_every_server_entry(server in arb_list(), cache in arb_list()) {
        let merged = merge(server.clone(), cache);
        prop_assert_eq!(&merged[..server.len()], &server[..]);
    }

    #[test]
    fn merge_adds_only_unseen_cache_ids(server in arb_list(), cache in arb_list()) {
        let server_ids: HashSet<_> = server.iter().map(|a| a.id.clone()).collect();
        let merged = merge(server.clone(), cache.clone());

        let mut seen = server_ids.clone();
        for extra in &merged[server.len()..] {
            prop_assert!(seen.insert(extra.id.clone()));
            prop_assert!(cache.contains(extra));
        }
        for apt in &cache {
            prop_assert!(merged.iter().any(|m| m.id == apt.id));
        }
    }

    #[test]
    fn categorize_partitions_and_orders(list in arb_list(), today_offset in 0i64..60) {
        let today = base() + Duration::days(today_offset);
        let buckets = categorize(&list, today);

        prop_assert_eq!(buckets.upcoming.len() + buckets.past.len(), list.len());
        for apt in &buckets.upcoming {
            prop_assert!(!is_past(apt, today));
            prop_assert!(apt.date >= today);
            prop_assert!(!matches!(apt.status, AppointmentStatus::Completed | AppointmentStatus::Cancelled));
        }
        for apt in &buckets.past {
            prop_assert!(is_past(apt, today));
        }
        for pair in buckets.upcoming.windows(2) {
            prop_assert!(pair[0].ordering_key() <= pair[1].ordering_key());
        }
        for pair in buckets.past.windows(2) {
            prop_assert!(pair[0].ordering_key() >= pair[1].ordering_key());
        }
    }
}
