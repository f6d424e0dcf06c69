use chrono::{Duration, TimeZone, Utc};
use docket_server::domains::analytics::service::resolve_range;
use proptest::prelude::*;

proptest! {
    #[test]
    fn resolved_ranges_are_ordered_and_capped(
        from_offset in -2_000i64..2_000,
        to_offset in -2_000i64..2_000,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date");
        let from = now + Duration::days(from_offset);
        let to = now + Duration::days(to_offset);
        match resolve_range(Some(from), Some(to), now) {
            Ok((start, end)) => {
                prop_assert!(from < to);
                prop_assert_eq!(end, to);
                prop_assert!(start < end);
                prop_assert!(end - start <= Duration::days(366));
                prop_assert!(start >= from);
            }
            Err(_) => prop_assert!(from >= to),
        }
    }

    #[test]
    fn open_ranges_default_to_thirty_days(to_offset in -500i64..500) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date");
        let to = now + Duration::days(to_offset);
        let (start, end) = resolve_range(None, Some(to), now).expect("range");
        prop_assert_eq!(end - start, Duration::days(30));
    }
}
