//! Property-based tests for the classifier and the query parameter parser

use proptest::prelude::*;
use repository_core::{parse_duplicate_entry, FilterAction, QueryParams};

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn entry_segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,8}"
}

fn filter_action() -> impl Strategy<Value = FilterAction> {
    prop_oneof![
        Just(FilterAction::Equals),
        Just(FilterAction::Like),
        Just(FilterAction::In),
        Just(FilterAction::GreaterThan),
        Just(FilterAction::GreaterThanEqual),
        Just(FilterAction::LessThan),
        Just(FilterAction::LessThanEqual),
    ]
}

proptest! {
    #[test]
    fn duplicate_entry_tokens_are_table_then_segments(
        table in identifier(),
        index in identifier(),
        segments in prop::collection::vec(entry_segment(), 1..4),
    ) {
        let message = format!(
            "Error 1062 (23000): Duplicate entry '{}' for key '{}.{}'",
            segments.join("-"),
            table,
            index
        );

        let entry = parse_duplicate_entry(&message).expect("message should match");
        let mut expected = vec![table];
        expected.extend(segments);
        prop_assert_eq!(entry.tokens(), expected);
    }

    #[test]
    fn arbitrary_text_without_marker_never_matches(text in "[^']{0,64}") {
        prop_assume!(!text.contains("Error 1062"));
        prop_assert!(parse_duplicate_entry(&text).is_none());
    }

    #[test]
    fn parse_is_idempotent(
        limit in "[0-9a-z]{0,4}",
        page in "[0-9a-z]{0,4}",
        attribute in identifier(),
        action in filter_action(),
        value in "[a-z0-9,]{0,10}",
    ) {
        let raw = vec![
            ("limit".to_string(), vec![limit]),
            ("page".to_string(), vec![page]),
            (format!("{}.{}", attribute, action), vec![value]),
        ];

        let first = QueryParams::parse(raw.clone());
        let second = QueryParams::parse(raw);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.filter_params.len(), 1);
        prop_assert_eq!(first.filter_params[0].action, action);
    }

    #[test]
    fn pagination_offset_matches_formula(number in 1u64..10_000, limit in 1u64..1_000) {
        let params = QueryParams::parse([
            ("page", vec![number.to_string()]),
            ("limit", vec![limit.to_string()]),
        ]);
        let query = params.pagination_modifier()(repository_core::Query::table("t"));
        prop_assert_eq!(query.offset, Some((number - 1) * limit));
        prop_assert_eq!(query.limit, Some(limit));
    }
}
