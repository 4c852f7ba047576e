//! Category normalization.
//!
//! Raw membership/category strings are free-form. They are folded into the
//! report's [`CategorySet`] with a lenient policy: synonyms first, then the
//! canonical labels, both case-insensitive, and anything else lands in the
//! default category. Normalization never fails.
//!
//! Day sets have no default, so an unresolvable day maps to `None` and the
//! record is left out of the report.

use crate::models::CategorySet;

/// Map a raw category label onto a member of `categories`.
///
/// - `None` or empty input returns the default category.
/// - Synonyms are consulted before canonical labels.
/// - Unmatched input silently returns the default category.
///
/// The result is `None` only for sets without a default.
pub fn normalize_category<'a>(raw: Option<&str>, categories: &'a CategorySet) -> Option<&'a str> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return categories.default_label(),
    };

    let lowered = raw.to_lowercase();
    categories
        .synonym(&lowered)
        .or_else(|| categories.label_matching(&lowered))
        .or_else(|| categories.default_label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportPeriod;

    #[test]
    fn test_missing_and_empty_use_default() {
        let set = CategorySet::membership();
        assert_eq!(normalize_category(None, &set), Some("Guest"));
        assert_eq!(normalize_category(Some(""), &set), Some("Guest"));
    }

    #[test]
    fn test_case_insensitive_labels() {
        let set = CategorySet::membership();
        assert_eq!(normalize_category(Some("member"), &set), Some("Member"));
        assert_eq!(normalize_category(Some("WORKER"), &set), Some("Worker"));
        assert_eq!(normalize_category(Some("Associate Coord"), &set), Some("Associate Coord"));
    }

    #[test]
    fn test_synonyms() {
        let set = CategorySet::membership();
        assert_eq!(
            normalize_category(Some("Associate Coordinator"), &set),
            Some("Associate Coord")
        );
        assert_eq!(
            normalize_category(Some("ASSOCIATE COORD"), &set),
            Some("Associate Coord")
        );
    }

    #[test]
    fn test_garbage_falls_back_silently() {
        let set = CategorySet::membership();
        for raw in ["visitor", " member", "m3mb3r", "\u{0}", "Guest!", "🙂"] {
            assert_eq!(normalize_category(Some(raw), &set), Some("Guest"), "raw = {raw:?}");
        }
    }

    #[test]
    fn test_categories_report_default_is_others() {
        let set = CategorySet::congress_categories();
        assert_eq!(normalize_category(Some("corper"), &set), Some("Corper"));
        assert_eq!(normalize_category(Some("pastor"), &set), Some("Others"));
        assert_eq!(normalize_category(None, &set), Some("Others"));
    }

    #[test]
    fn test_result_always_member_of_set() {
        let set = CategorySet::membership();
        let inputs = [
            None,
            Some(""),
            Some("guest"),
            Some("associate coordinator"),
            Some("totally unknown"),
            Some("   "),
            Some("MEMBER\n"),
        ];
        for raw in inputs {
            assert!(normalize_category(raw, &set).is_some_and(|l| set.contains(l)));
        }
    }

    #[test]
    fn test_days_resolve_by_key_or_date() {
        let period = ReportPeriod::new(Some("2025-04-01".into()), Some("2025-04-02".into()));
        let days = CategorySet::congress_days(&period);

        assert_eq!(normalize_category(Some("day2"), &days), Some("Day 2 (Apr 2)"));
        assert_eq!(normalize_category(Some("2025-04-01"), &days), Some("Day 1 (Apr 1)"));
        assert_eq!(normalize_category(Some("day3"), &days), None);
        assert_eq!(normalize_category(None, &days), None);
    }
}
