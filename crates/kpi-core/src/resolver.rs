//! Field resolution over heterogeneous quote records.
//!
//! Providers name the same figure differently (`currentPrice`,
//! `regularMarketPrice`, `lastPrice`, ...). A metric therefore carries an
//! ordered list of candidate keys and the resolver returns the first usable
//! value. Records are probed in priority order: the full-info record always
//! wins over the fast quote.

use crate::types::{QuoteRecord, Resolved};

/// Returns the first present, non-null, non-placeholder value among `keys`.
///
/// A missing record (`None`) behaves like an empty one. Zero is a valid value
/// and is returned as such.
#[must_use]
pub fn resolve<K: AsRef<str>>(record: Option<&QuoteRecord>, keys: &[K]) -> Resolved {
    let Some(record) = record else {
        return Resolved::Unavailable;
    };

    keys.iter()
        .filter_map(|key| record.get(key.as_ref()))
        .map(|value| Resolved::from_value(value.clone()))
        .find(Resolved::is_available)
        .unwrap_or(Resolved::Unavailable)
}

/// Like [`resolve`], but only finite numbers count.
///
/// Each key is probed in order, so a text value under an earlier key does
/// not hide a number under a later one.
#[must_use]
pub fn resolve_numeric<K: AsRef<str>>(record: Option<&QuoteRecord>, keys: &[K]) -> Resolved {
    let Some(record) = record else {
        return Resolved::Unavailable;
    };

    keys.iter()
        .filter_map(|key| record.get(key.as_ref()))
        .map(|value| Resolved::from_value(value.clone()).numeric())
        .find(Resolved::is_available)
        .unwrap_or(Resolved::Unavailable)
}

/// Resolves `keys` against each record in turn, first success wins.
#[must_use]
pub fn resolve_first<K: AsRef<str>>(records: &[&QuoteRecord], keys: &[K]) -> Resolved {
    records.iter().fold(Resolved::Unavailable, |acc, record| {
        acc.or_else(|| resolve(Some(*record), keys))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NOT_AVAILABLE, QuoteValue};

    #[test]
    fn test_zero_is_not_unavailable() {
        let record = QuoteRecord::empty()
            .with("a", QuoteValue::Null)
            .with("b", 0_i64);
        assert_eq!(resolve(Some(&record), &["a", "b"]), Resolved::Value(QuoteValue::Int(0)));
    }

    #[test]
    fn test_candidate_order() {
        let record = QuoteRecord::empty()
            .with("regularMarketPrice", 101.5)
            .with("currentPrice", 102.0);
        let resolved = resolve(Some(&record), &["currentPrice", "regularMarketPrice"]);
        assert_eq!(resolved.as_f64(), Some(102.0));
    }

    #[test]
    fn test_placeholder_is_skipped() {
        let record = QuoteRecord::empty()
            .with("trailingPE", NOT_AVAILABLE)
            .with("forwardPE", 18.2);
        let resolved = resolve(Some(&record), &["trailingPE", "forwardPE"]);
        assert_eq!(resolved.as_f64(), Some(18.2));
    }

    #[test]
    fn test_numeric_skips_text_candidates() {
        let record = QuoteRecord::empty()
            .with("trailingPE", "Infinity")
            .with("forwardPE", 18.2);
        let keys = ["trailingPE", "forwardPE"];
        assert_eq!(resolve_numeric(Some(&record), &keys).as_f64(), Some(18.2));
        assert!(resolve(Some(&record), &keys).as_f64().is_none());
        assert_eq!(
            resolve_numeric(Some(&QuoteRecord::empty().with("beta", "high")), &["beta"]),
            Resolved::Unavailable
        );
    }

    #[test]
    fn test_missing_record_and_keys() {
        assert_eq!(resolve::<&str>(None, &["beta"]), Resolved::Unavailable);
        let record = QuoteRecord::empty().with("beta", 1.1);
        assert_eq!(resolve(Some(&record), &["alpha"]), Resolved::Unavailable);
    }

    #[test]
    fn test_full_info_takes_priority() {
        let full = QuoteRecord::empty().with("marketCap", 2_000_i64);
        let fast = QuoteRecord::empty().with("marketCap", 1_999_i64);
        let resolved = resolve_first(&[&full, &fast], &["marketCap"]);
        assert_eq!(resolved, Resolved::Value(QuoteValue::Int(2_000)));
    }

    #[test]
    fn test_falls_back_to_second_record() {
        let full = QuoteRecord::empty().with("previousClose", QuoteValue::Null);
        let fast = QuoteRecord::empty().with("previousClose", 99.5);
        let resolved = resolve_first(&[&full, &fast], &["previousClose"]);
        assert_eq!(resolved.as_f64(), Some(99.5));
    }
}
