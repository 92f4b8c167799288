//! Chapter selection: language filtering, natural ordering and range
//! expressions such as `"1-5, 7, !3"`.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ChapterSummary;

/// Errors parsing a range expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// The expression selects nothing at all.
    #[error("empty chapter range")]
    Empty,

    /// A `lo-hi` item is missing one of its bounds.
    #[error("malformed chapter range item: {item:?}")]
    Malformed {
        /// The offending item.
        item: String,
    },
}

/// Keeps only chapters in `language`, preserving listing order.
#[must_use]
pub fn filter_language(chapters: Vec<ChapterSummary>, language: &str) -> Vec<ChapterSummary> {
    let before = chapters.len();
    let kept: Vec<_> = chapters
        .into_iter()
        .filter(|c| c.language == language)
        .collect();
    debug!(language, before, after = kept.len(), "filtered chapters by language");
    kept
}

/// Sort key for a chapter number: its numeric value, or 0 when it is not a
/// number.
#[must_use]
pub fn natural_key(chapter: &str) -> f64 {
    chapter.trim().parse::<f64>().unwrap_or(0.0)
}

/// Compares chapter numbers naturally, then lexically for equal keys.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a)
        .total_cmp(&natural_key(b))
        .then_with(|| a.cmp(b))
}

/// Distinct chapter numbers of `chapters` in natural order.
#[must_use]
pub fn available_numbers(chapters: &[ChapterSummary]) -> Vec<String> {
    let distinct: BTreeSet<&str> = chapters.iter().map(|c| c.chapter.as_str()).collect();
    let mut numbers: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    numbers.sort_by(|a, b| natural_cmp(a, b));
    numbers
}

/// One comma-separated item of a range expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RangeItem {
    Single(String),
    Span(String, String),
}

impl RangeItem {
    fn parse(item: &str) -> Result<Self, SelectionError> {
        match item.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (lo.trim(), hi.trim());
                if lo.is_empty() || hi.is_empty() {
                    return Err(SelectionError::Malformed {
                        item: item.to_string(),
                    });
                }
                Ok(Self::Span(lo.to_string(), hi.to_string()))
            }
            None => Ok(Self::Single(item.trim().to_string())),
        }
    }

    /// Chapter numbers this item names, taken from the naturally ordered
    /// `numbers`. Unknown bounds select nothing.
    fn expand<'a>(&self, numbers: &'a [String]) -> &'a [String] {
        let position = |label: &str| numbers.iter().position(|n| n == label);
        match self {
            Self::Single(label) => match position(label) {
                Some(i) => &numbers[i..=i],
                None => {
                    warn!(chapter = %label, "chapter does not exist, skipping");
                    &[]
                }
            },
            Self::Span(lo, hi) => match (position(lo), position(hi)) {
                (Some(lo), Some(hi)) if lo <= hi => &numbers[lo..=hi],
                (Some(_), Some(_)) => &[],
                (None, _) => {
                    warn!(chapter = %lo, range = %format!("{lo}-{hi}"), "chapter does not exist, skipping range");
                    &[]
                }
                (_, None) => {
                    warn!(chapter = %hi, range = %format!("{lo}-{hi}"), "chapter does not exist, skipping range");
                    &[]
                }
            },
        }
    }
}

/// A parsed range expression.
///
/// Items are chapter numbers (`7`) or inclusive spans (`1-5`) whose bounds
/// must be chapter numbers the title actually has; spans follow natural
/// order. `all` selects everything. Items prefixed with `!` are removed from
/// the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRange {
    all: bool,
    include: Vec<RangeItem>,
    exclude: Vec<RangeItem>,
}

impl ChapterRange {
    /// Selects every chapter.
    #[must_use]
    pub fn all() -> Self {
        Self {
            all: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Returns the chapters whose number is selected, in their original
    /// order.
    #[must_use]
    pub fn apply(&self, chapters: Vec<ChapterSummary>) -> Vec<ChapterSummary> {
        let numbers = available_numbers(&chapters);
        let mut selected: BTreeSet<&str> = if self.all {
            numbers.iter().map(String::as_str).collect()
        } else {
            self.include
                .iter()
                .flat_map(|item| item.expand(&numbers))
                .map(String::as_str)
                .collect()
        };
        for item in &self.exclude {
            for number in item.expand(&numbers) {
                selected.remove(number.as_str());
            }
        }
        let selected: BTreeSet<String> = selected.into_iter().map(str::to_string).collect();
        chapters
            .into_iter()
            .filter(|c| selected.contains(&c.chapter))
            .collect()
    }
}

impl FromStr for ChapterRange {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut range = Self {
            all: false,
            include: Vec::new(),
            exclude: Vec::new(),
        };
        for raw in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if let Some(excluded) = raw.strip_prefix('!') {
                range.exclude.push(RangeItem::parse(excluded)?);
            } else if raw.eq_ignore_ascii_case("all") {
                range.all = true;
            } else {
                range.include.push(RangeItem::parse(raw)?);
            }
        }
        if !range.all && range.include.is_empty() {
            return Err(SelectionError::Empty);
        }
        Ok(range)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary(id: u64, chapter: &str, language: &str) -> ChapterSummary {
        ChapterSummary {
            id,
            volume: String::new(),
            chapter: chapter.to_string(),
            title: String::new(),
            language: language.to_string(),
            groups: Vec::new(),
        }
    }

    fn listing(numbers: &[&str]) -> Vec<ChapterSummary> {
        numbers
            .iter()
            .zip(1u64..)
            .map(|(n, id)| summary(id, n, "gb"))
            .collect()
    }

    fn chapters_of(selected: &[ChapterSummary]) -> Vec<&str> {
        selected.iter().map(|c| c.chapter.as_str()).collect()
    }

    #[test]
    fn test_filter_language() {
        let chapters = vec![summary(1, "1", "gb"), summary(2, "1", "fr"), summary(3, "2", "gb")];
        let kept = filter_language(chapters, "gb");
        assert_eq!(kept.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_available_numbers_natural_order() {
        let numbers = available_numbers(&listing(&["10", "2", "1.5", "Oneshot", "2", "1"]));
        assert_eq!(numbers, vec!["Oneshot", "1", "1.5", "2", "10"]);
    }

    #[test]
    fn test_range_spans_singles_and_exclusions() {
        let chapters = listing(&["1", "2", "3", "4", "5", "6", "7", "8"]);
        let range: ChapterRange = "1-5, 7, !3".parse().unwrap();
        assert_eq!(chapters_of(&range.apply(chapters)), vec!["1", "2", "4", "5", "7"]);
    }

    #[test]
    fn test_range_all_with_excluded_span() {
        let chapters = listing(&["1", "2", "3", "4", "5"]);
        let range: ChapterRange = "all, !2-4".parse().unwrap();
        assert_eq!(chapters_of(&range.apply(chapters)), vec!["1", "5"]);
    }

    #[test]
    fn test_range_unknown_bounds_are_skipped() {
        let chapters = listing(&["1", "2", "3"]);
        let range: ChapterRange = "0-2, 3, 9".parse().unwrap();
        assert_eq!(chapters_of(&range.apply(chapters)), vec!["3"]);
    }

    #[test]
    fn test_range_keeps_every_chapter_with_selected_number() {
        let mut chapters = listing(&["1", "2"]);
        chapters.push(summary(9, "2", "gb"));
        let range: ChapterRange = "2".parse().unwrap();
        let selected = range.apply(chapters);
        assert_eq!(selected.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 9]);
    }

    #[test]
    fn test_range_decimal_chapters_inside_span() {
        let chapters = listing(&["1", "1.5", "2", "3"]);
        let range: ChapterRange = "1-2".parse().unwrap();
        assert_eq!(chapters_of(&range.apply(chapters)), vec!["1", "1.5", "2"]);
    }

    #[test]
    fn test_range_parse_errors() {
        assert_eq!("".parse::<ChapterRange>(), Err(SelectionError::Empty));
        assert_eq!("!3".parse::<ChapterRange>(), Err(SelectionError::Empty));
        assert!(matches!(
            "1-".parse::<ChapterRange>(),
            Err(SelectionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_range_all_constructor() {
        let chapters = listing(&["1", "2"]);
        assert_eq!(ChapterRange::all().apply(chapters).len(), 2);
    }
}
