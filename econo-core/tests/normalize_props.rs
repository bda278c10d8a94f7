use econo_core::series::{normalize_points, parse_period, validate_strictly_ascending};
use econo_types::NormalizedPoint;
use proptest::prelude::*;

fn arb_label() -> impl Strategy<Value = String> {
    prop_oneof![
        (1990i32..2030).prop_map(|y| y.to_string()),
        (1990i32..2030, 1u8..=4).prop_map(|(y, q)| format!("{y}-Q{q}")),
        (1990i32..2030, 1u8..=12).prop_map(|(y, m)| format!("{y}-{m:02}")),
        (1990i32..2030, 1u8..=12, 1u8..=28).prop_map(|(y, m, d)| format!("{y}-{m:02}-{d:02}")),
    ]
}

fn arb_point() -> impl Strategy<Value = NormalizedPoint> {
    (arb_label(), proptest::option::of(-1.0e9f64..1.0e9)).prop_map(|(date, value)| {
        NormalizedPoint { date, value }
    })
}

proptest! {
    #[test]
    fn normalized_points_are_strictly_ascending(points in proptest::collection::vec(arb_point(), 0..200)) {
        let (out, _) = normalize_points(points).unwrap();
        prop_assert!(validate_strictly_ascending(&out).is_ok());
    }

    #[test]
    fn normalize_is_idempotent(points in proptest::collection::vec(arb_point(), 0..200)) {
        let (once, _) = normalize_points(points).unwrap();
        let (twice, had_duplicates) = normalize_points(once.clone()).unwrap();
        prop_assert_eq!(once, twice);
        prop_assert!(!had_duplicates);
    }

    #[test]
    fn last_occurrence_wins(points in proptest::collection::vec(arb_point(), 1..100)) {
        let (out, _) = normalize_points(points.clone()).unwrap();
        for kept in &out {
            let key = parse_period(&kept.date).unwrap();
            // The kept value must equal the last input point in that period.
            let expected = points
                .iter()
                .rev()
                .find(|p| parse_period(&p.date) == Some(key))
                .unwrap();
            prop_assert_eq!(kept.value, expected.value);
        }
    }

    #[test]
    fn no_periods_are_lost_or_invented(points in proptest::collection::vec(arb_point(), 0..100)) {
        let (out, _) = normalize_points(points.clone()).unwrap();
        let mut input_keys: Vec<_> = points.iter().map(|p| parse_period(&p.date).unwrap()).collect();
        input_keys.sort();
        input_keys.dedup();
        let out_keys: Vec<_> = out.iter().map(|p| parse_period(&p.date).unwrap()).collect();
        prop_assert_eq!(out_keys, input_keys);
    }
}
