//! Per-volume chapter prefix letters.
//!
//! The service lets the same chapter number appear in more than one volume
//! (re-releases, split scans). When that happens, sorting archives by name
//! would interleave chapters from different volumes, so volumes whose
//! chapter numbers overlap with a neighbour get their own prefix letter in
//! place of the default `c`.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

/// Prefix used for volumes without overlaps and volume-less chapters.
pub const DEFAULT_PREFIX: char = 'c';

/// Base letter the overlap prefixes count up from.
const OVERLAP_BASE: u8 = b'b';

/// Volume label → chapter prefix letter for one title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumePrefixTable {
    prefixes: BTreeMap<String, char>,
}

impl VolumePrefixTable {
    /// Prefix letter for `volume`, [`DEFAULT_PREFIX`] when it has no entry.
    #[must_use]
    pub fn prefix_for(&self, volume: &str) -> char {
        self.prefixes
            .get(volume)
            .copied()
            .unwrap_or(DEFAULT_PREFIX)
    }

    /// Returns true if `volume` has an explicit entry.
    #[must_use]
    pub fn contains(&self, volume: &str) -> bool {
        self.prefixes.contains_key(volume)
    }

    /// Number of volumes with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Returns true if no volume has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Assigns a prefix letter to every volume of a title.
///
/// `chapters` yields `(volume, chapter)` pairs in listing order. Volumes are
/// walked in reverse first-seen order; each is compared with the next volume
/// in that order (the last one with its predecessor). A shared chapter
/// number gives the volume the letter `'b' + index_of_next_volume`,
/// otherwise it keeps [`DEFAULT_PREFIX`]. The empty volume label never gets
/// an entry but still takes part in comparisons.
pub fn assign_prefixes<'a, I>(chapters: I) -> VolumePrefixTable
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut numbers: HashMap<&str, Vec<&str>> = HashMap::new();
    for (volume, chapter) in chapters {
        numbers
            .entry(volume)
            .or_insert_with(|| {
                order.push(volume);
                Vec::new()
            })
            .push(chapter);
    }
    order.reverse();

    let mut prefixes = BTreeMap::new();
    for (index, volume) in order.iter().enumerate() {
        let next_index = index + 1;
        let neighbour = order
            .get(next_index)
            .or_else(|| index.checked_sub(1).and_then(|prev| order.get(prev)));

        let overlaps = neighbour.is_some_and(|other| {
            let ours = &numbers[volume];
            let theirs = &numbers[other];
            ours.iter().any(|chapter| theirs.contains(chapter))
        });

        if volume.is_empty() {
            continue;
        }

        let prefix = if overlaps {
            overlap_letter(next_index)
        } else {
            DEFAULT_PREFIX
        };
        debug!(volume, %prefix, overlaps, "assigned volume prefix");
        prefixes.insert((*volume).to_string(), prefix);
    }

    VolumePrefixTable { prefixes }
}

/// `'b' + offset`, saturating at `'z'` so the prefix stays a path-safe letter.
fn overlap_letter(offset: usize) -> char {
    u8::try_from(offset)
        .ok()
        .and_then(|offset| OVERLAP_BASE.checked_add(offset))
        .filter(u8::is_ascii_lowercase)
        .map_or('z', char::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs<'a>(volumes: &'a [(&'a str, &'a [&'a str])]) -> Vec<(&'a str, &'a str)> {
        volumes
            .iter()
            .flat_map(|(volume, chapters)| chapters.iter().map(move |c| (*volume, *c)))
            .collect()
    }

    #[test]
    fn test_overlapping_volumes_get_letters() {
        let table = assign_prefixes(pairs(&[
            ("1", &["1", "2", "3"][..]),
            ("2", &["3", "4", "5"][..]),
            ("3", &["6", "7"][..]),
        ]));

        assert_ne!(table.prefix_for("1"), DEFAULT_PREFIX);
        assert_ne!(table.prefix_for("2"), DEFAULT_PREFIX);
        assert_eq!(table.prefix_for("3"), DEFAULT_PREFIX);
        // Reversed order is [3, 2, 1]: volume 2 compares with 1 (next index 2),
        // volume 1 is last and compares with 2 (next index 3).
        assert_eq!(table.prefix_for("2"), 'd');
        assert_eq!(table.prefix_for("1"), 'e');
    }

    #[test]
    fn test_single_volume_gets_default() {
        let table = assign_prefixes(pairs(&[("1", &["1", "2"][..])]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.prefix_for("1"), DEFAULT_PREFIX);
    }

    #[test]
    fn test_empty_volume_never_gets_entry() {
        let table = assign_prefixes(pairs(&[("", &["1", "2"][..]), ("1", &["2", "3"][..])]));
        assert!(!table.contains(""));
        assert!(table.contains("1"));
        // Order reversed is ["1", ""]; volume 1 overlaps with "" on chapter 2.
        assert_eq!(table.prefix_for("1"), 'c');
        assert_eq!(table.prefix_for(""), DEFAULT_PREFIX);
    }

    #[test]
    fn test_disjoint_volumes_all_default() {
        let table = assign_prefixes(pairs(&[
            ("2", &["4", "5"][..]),
            ("1", &["1", "2", "3"][..]),
        ]));
        assert_eq!(table.prefix_for("1"), DEFAULT_PREFIX);
        assert_eq!(table.prefix_for("2"), DEFAULT_PREFIX);
    }

    #[test]
    fn test_every_volume_label_has_entry() {
        let table = assign_prefixes(pairs(&[
            ("3", &["9"][..]),
            ("2", &["5", "9"][..]),
            ("1", &["1"][..]),
        ]));
        assert_eq!(table.len(), 3);
        assert!(table.contains("1") && table.contains("2") && table.contains("3"));
    }

    #[test]
    fn test_empty_listing_gives_empty_table() {
        let table = assign_prefixes(std::iter::empty());
        assert!(table.is_empty());
        assert_eq!(table.prefix_for("4"), DEFAULT_PREFIX);
    }

    #[test]
    fn test_overlap_letter_saturates() {
        assert_eq!(overlap_letter(0), 'b');
        assert_eq!(overlap_letter(2), 'd');
        assert_eq!(overlap_letter(24), 'z');
        assert_eq!(overlap_letter(25), 'z');
        assert_eq!(overlap_letter(1000), 'z');
    }
}
