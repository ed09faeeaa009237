//! Local evaluation of event filters after decoding.
//!
//! Indexed `eq` filters are pushed into the provider subscription as topic
//! filters and never re-checked here. Everything else — non-indexed
//! parameters and comparison operators the provider can't express — is
//! evaluated against the decoded parameter map.

use alloy_primitives::{I256, U256};
use serde_json::{Map, Value};

use crate::hook::{EventFilter, FilterOperator};

/// Whether a filter is already satisfied by the provider-side topic filter.
pub fn is_topic_filtered(filter: &EventFilter) -> bool {
    filter.indexed && filter.operator == FilterOperator::Eq
}

/// Apply every filter that was not already enforced provider-side.
///
/// An event with zero configured filters always matches.
pub fn matches_offchain(params: &Map<String, Value>, filters: &[EventFilter]) -> bool {
    filters
        .iter()
        .filter(|f| !is_topic_filtered(f))
        .all(|f| matches_filter(params, f))
}

/// Evaluate a single filter against the decoded parameter map.
///
/// A missing parameter value fails the filter.
pub fn matches_filter(params: &Map<String, Value>, filter: &EventFilter) -> bool {
    let Some(actual) = params.get(&filter.parameter) else {
        return false;
    };
    let actual = value_to_string(actual);
    let expected = value_to_string(&filter.value);

    match filter.operator {
        FilterOperator::Eq => actual.eq_ignore_ascii_case(&expected),
        FilterOperator::Ne => !actual.eq_ignore_ascii_case(&expected),
        FilterOperator::Contains => actual
            .to_ascii_lowercase()
            .contains(&expected.to_ascii_lowercase()),
        FilterOperator::Gt | FilterOperator::Lt | FilterOperator::Gte | FilterOperator::Lte => {
            let (Some(a), Some(b)) = (parse_big_int(&actual), parse_big_int(&expected)) else {
                return false;
            };
            match filter.operator {
                FilterOperator::Gt => a > b,
                FilterOperator::Lt => a < b,
                FilterOperator::Gte => a >= b,
                FilterOperator::Lte => a <= b,
                _ => unreachable!(),
            }
        }
    }
}

/// Canonical string form used for comparisons.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Parse a decimal (sign-aware) or 0x-hex integer of up to 256 bits.
fn parse_big_int(s: &str) -> Option<I256> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        let raw = U256::from_str_radix(hex, 16).ok()?;
        return Some(I256::from_raw(raw));
    }
    I256::from_dec_str(s).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn filter(parameter: &str, operator: FilterOperator, value: Value, indexed: bool) -> EventFilter {
        EventFilter {
            parameter: parameter.to_string(),
            parameter_index: None,
            operator,
            value,
            indexed,
        }
    }

    // -- numeric comparisons ------------------------------------------------

    #[test]
    fn gte_excludes_smaller_includes_larger() {
        let f = filter(
            "value",
            FilterOperator::Gte,
            json!("1000000000000000000"),
            false,
        );
        let small = params(&[("value", json!("500000000000000000"))]);
        let large = params(&[("value", json!("2000000000000000000"))]);
        assert!(!matches_filter(&small, &f));
        assert!(matches_filter(&large, &f));
    }

    #[test]
    fn gt_is_strict() {
        let f = filter("value", FilterOperator::Gt, json!("100"), false);
        assert!(!matches_filter(&params(&[("value", json!("100"))]), &f));
        assert!(matches_filter(&params(&[("value", json!("101"))]), &f));
    }

    #[test]
    fn lt_and_lte_compare_as_big_integers() {
        // Values beyond u64 range must still compare correctly.
        let f = filter(
            "value",
            FilterOperator::Lte,
            json!("340282366920938463463374607431768211456"),
            false,
        );
        assert!(matches_filter(
            &params(&[("value", json!("340282366920938463463374607431768211456"))]),
            &f
        ));
        let f = filter("value", FilterOperator::Lt, json!("0"), false);
        assert!(matches_filter(&params(&[("value", json!("-5"))]), &f));
    }

    #[test]
    fn numeric_operator_on_non_numeric_fails() {
        let f = filter("value", FilterOperator::Gt, json!("100"), false);
        assert!(!matches_filter(&params(&[("value", json!("abc"))]), &f));
    }

    #[test]
    fn hex_values_compare_numerically() {
        let f = filter("value", FilterOperator::Gte, json!("0x10"), false);
        assert!(matches_filter(&params(&[("value", json!("16"))]), &f));
        assert!(!matches_filter(&params(&[("value", json!("15"))]), &f));
    }

    // -- string comparisons -------------------------------------------------

    #[test]
    fn eq_is_case_insensitive() {
        let f = filter(
            "to",
            FilterOperator::Eq,
            json!("0xAbCd000000000000000000000000000000000000"),
            false,
        );
        let p = params(&[("to", json!("0xabcd000000000000000000000000000000000000"))]);
        assert!(matches_filter(&p, &f));
    }

    #[test]
    fn ne_inverts_eq() {
        let f = filter("to", FilterOperator::Ne, json!("0xA"), false);
        assert!(!matches_filter(&params(&[("to", json!("0xa"))]), &f));
        assert!(matches_filter(&params(&[("to", json!("0xb"))]), &f));
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        let f = filter("uri", FilterOperator::Contains, json!("IPFS"), false);
        assert!(matches_filter(
            &params(&[("uri", json!("ipfs://Qm1234"))]),
            &f
        ));
        assert!(!matches_filter(&params(&[("uri", json!("https://x"))]), &f));
    }

    // -- structural behavior ------------------------------------------------

    #[test]
    fn missing_parameter_fails_filter() {
        let f = filter("value", FilterOperator::Eq, json!("1"), false);
        assert!(!matches_filter(&params(&[]), &f));
    }

    #[test]
    fn zero_filters_always_match() {
        assert!(matches_offchain(&params(&[]), &[]));
    }

    #[test]
    fn indexed_eq_filter_is_skipped_offchain() {
        // Provider already enforced it; a mismatching value must not reject
        // the event locally.
        let f = filter("from", FilterOperator::Eq, json!("0xsomebody"), true);
        assert!(matches_offchain(&params(&[]), &[f]));
    }

    #[test]
    fn indexed_non_eq_filter_is_still_evaluated() {
        let f = filter("value", FilterOperator::Gte, json!("10"), true);
        assert!(!matches_offchain(&params(&[("value", json!("5"))]), &[f.clone()]));
        assert!(matches_offchain(&params(&[("value", json!("50"))]), &[f]));
    }

    #[test]
    fn all_offchain_filters_must_pass() {
        let f1 = filter("value", FilterOperator::Gte, json!("10"), false);
        let f2 = filter("to", FilterOperator::Eq, json!("0xa"), false);
        let p = params(&[("value", json!("50")), ("to", json!("0xB"))]);
        assert!(!matches_offchain(&p, &[f1.clone(), f2.clone()]));
        let p = params(&[("value", json!("50")), ("to", json!("0xA"))]);
        assert!(matches_offchain(&p, &[f1, f2]));
    }
}
