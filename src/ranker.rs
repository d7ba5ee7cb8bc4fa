//! Newest-first ordering of posts.

use crate::models::NormalizedPost;

/// Sort posts newest first.
///
/// Works on a copy; the caller's slice is left as it was. The sort is stable,
/// so posts with equal instants keep their source order.
pub fn rank(posts: &[NormalizedPost]) -> Vec<NormalizedPost> {
    let mut ranked = posts.to_vec();
    ranked.sort_by(|a, b| b.published.cmp(&a.published));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{DateNormalizer, FixedClock};
    use crate::models::RawPost;
    use crate::sanitize::MarkupSanitizer;
    use chrono::{TimeZone, Utc};

    fn posts(dates: &[(&str, &str)]) -> Vec<NormalizedPost> {
        let normalizer = DateNormalizer::with_clock(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
        let sanitizer = MarkupSanitizer::default();
        dates
            .iter()
            .map(|(title, date)| {
                let raw = RawPost {
                    title: title.to_string(),
                    date: date.to_string(),
                    ..RawPost::default()
                };
                NormalizedPost::from_raw(raw, &normalizer, &sanitizer)
            })
            .collect()
    }

    fn titles(posts: &[NormalizedPost]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_malformed_first_missing_last() {
        let input = posts(&[
            ("jan", "2024-01-01"),
            ("malformed", "sometime last week"),
            ("missing", ""),
            ("jun", "2024-06-01"),
        ]);
        let ranked = rank(&input);
        assert_eq!(titles(&ranked), vec!["malformed", "jun", "jan", "missing"]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = posts(&[("old", "2020-01-01"), ("new", "2025-01-01")]);
        let before = input.clone();
        let ranked = rank(&input);
        assert_eq!(input, before);
        assert_eq!(titles(&ranked), vec!["new", "old"]);
    }

    #[test]
    fn test_stable_for_equal_dates() {
        let input = posts(&[
            ("first", "2024-03-01T10:00:00Z"),
            ("second", "2024-03-01T10:00:00Z"),
            ("undated-a", ""),
            ("third", "2024-03-01T10:00:00Z"),
            ("undated-b", ""),
        ]);
        let ranked = rank(&input);
        assert_eq!(titles(&ranked), vec!["first", "second", "third", "undated-a", "undated-b"]);
    }

    #[test]
    fn test_empty() {
        assert!(rank(&[]).is_empty());
    }
}
