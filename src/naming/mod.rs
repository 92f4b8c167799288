//! Deterministic on-disk names for chapters and pages.
//!
//! A chapter of title `Title` by group `Group`, chapter `12.5` of volume `3`
//! resolves to:
//!
//! ```text
//! folder:  Title - c012.5 (v03) [Group]
//! archive: Title - c012.5 (v03) [Group].cbz
//! page:    Title - c012.5 (v03) - p001 [Group].png
//! ```
//!
//! Non-default languages add a ` [Language]` tag after the title, the `c`
//! letter comes from the title's [`VolumePrefixTable`], and the volume
//! segment is dropped entirely for volume-less chapters.

mod prefix;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub use prefix::{DEFAULT_PREFIX, VolumePrefixTable, assign_prefixes};

use crate::config::ArchiveFormat;
use crate::languages::DEFAULT_LANGUAGE;
use crate::metadata::ChapterMetadata;

/// Page names of the form `x12.png`: one letter then the page number.
#[allow(clippy::expect_used)]
static LETTER_PAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]([0-9]+)(\..*)$").expect("letter page regex is valid") // Static pattern, safe to panic
});

/// Page names of the form `12-3f9c....png`: page number then a dash.
#[allow(clippy::expect_used)]
static DASHED_PAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)-.*(\..*)$").expect("dashed page regex is valid") // Static pattern, safe to panic
});

/// Chapter numbers with a decimal sub-chapter (`12.5`).
#[allow(clippy::expect_used)]
static DECIMAL_CHAPTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)").expect("decimal chapter regex is valid") // Static pattern, safe to panic
});

/// Names derived from one chapter's metadata.
///
/// Identical inputs always produce identical names, which is what lets a
/// repeated run find the folder and archive a previous run created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    /// Name of the loose page folder.
    pub folder_name: String,
    /// File name of the chapter archive, extension included.
    pub archive_file_name: String,
    /// `Title [Lang] - c012.5 (v03)` shared by the folder and every page.
    stem: String,
    /// `[Group, Other Group]`.
    groups_tag: String,
}

impl ResolvedNames {
    /// File name for the page at `page_index` (0-based) whose remote name is
    /// `image_ref`.
    ///
    /// The page number is read from the remote name when it follows one of
    /// the known layouts (`x12.png`, `12-hash.png`); otherwise the position
    /// in the page list is used. The remote extension is preserved.
    #[must_use]
    pub fn page_file_name(&self, page_index: usize, image_ref: &str) -> String {
        let (page_no, extension) = page_number_and_extension(page_index, image_ref);
        self.format_page(&page_no, &extension)
    }

    /// File names for every page of a chapter, in page order.
    ///
    /// If two remote names yield the same file name, every page of the
    /// chapter is numbered by position instead so each page keeps its own
    /// file.
    #[must_use]
    pub fn page_file_names(&self, image_refs: &[String]) -> Vec<String> {
        let detected: Vec<String> = image_refs
            .iter()
            .enumerate()
            .map(|(index, image_ref)| self.page_file_name(index, image_ref))
            .collect();
        let distinct: BTreeSet<&str> = detected.iter().map(String::as_str).collect();
        if distinct.len() == detected.len() {
            return detected;
        }
        warn!(
            pages = image_refs.len(),
            "page numbers repeat within chapter, numbering by position"
        );
        image_refs
            .iter()
            .enumerate()
            .map(|(index, image_ref)| {
                let (_, extension) = page_number_and_extension(index, image_ref);
                self.format_page(&(index + 1).to_string(), &extension)
            })
            .collect()
    }

    fn format_page(&self, page_no: &str, extension: &str) -> String {
        format!(
            "{} - p{} {}{}",
            self.stem,
            zero_pad(page_no, 3),
            self.groups_tag,
            extension
        )
    }
}

/// Resolves folder, archive and page names for a chapter.
///
/// `title` is the raw upstream title; it is unescaped and sanitized here.
/// `language_name` is the display name used when the chapter is not in the
/// default language.
#[must_use]
pub fn resolve(
    meta: &ChapterMetadata,
    title: &str,
    prefixes: &VolumePrefixTable,
    language_name: &str,
    format: ArchiveFormat,
) -> ResolvedNames {
    let title = sanitize_title(title);
    let language_tag = if meta.language == DEFAULT_LANGUAGE {
        String::new()
    } else {
        format!(" [{language_name}]")
    };
    let prefix = prefixes.prefix_for(&meta.volume);
    let chapter = format_chapter_number(&meta.chapter);
    let volume = format_volume_segment(&meta.volume);
    let stem = format!("{title}{language_tag} - {prefix}{chapter}{volume}");
    let groups_tag = format!("[{}]", format_groups(&meta.groups));

    let folder_name = format!("{stem} {groups_tag}");
    let archive_file_name = format!("{folder_name}.{}", format.extension());

    ResolvedNames {
        folder_name,
        archive_file_name,
        stem,
        groups_tag,
    }
}

/// Unescapes HTML entities and replaces characters that are invalid in
/// path segments: `\ / : * ? " < > |`.
#[must_use]
pub fn sanitize_path_segment(value: &str) -> String {
    let unescaped = html_escape::decode_html_entities(value);
    unescaped
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitized title with trailing whitespace and dots removed.
///
/// Used both for the series directory and inside chapter names.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    sanitize_path_segment(title)
        .trim_end()
        .trim_end_matches('.')
        .trim_end()
        .to_string()
}

/// Directory name for a whole series. Adult titles get an ` (H)` suffix.
#[must_use]
pub fn series_folder_name(title: &str, adult: bool) -> String {
    let name = sanitize_title(title);
    if adult { format!("{name} (H)") } else { name }
}

/// Renders a chapter number: integer part padded to 3, decimal part kept.
///
/// `"12.5"` → `"012.5"`, `"7"` → `"007"`. Non-numeric labels are returned
/// unchanged.
#[must_use]
pub fn format_chapter_number(chapter: &str) -> String {
    if let Some(caps) = DECIMAL_CHAPTER_PATTERN.captures(chapter) {
        return format!("{}.{}", zero_pad(&caps[1], 3), &caps[2]);
    }
    zero_pad(chapter, 3)
}

/// ` (v03)` for volume `"3"`, empty for a volume-less chapter.
#[must_use]
pub fn format_volume_segment(volume: &str) -> String {
    if volume.is_empty() {
        return String::new();
    }
    format!(" (v{})", zero_pad(volume, 2))
}

fn format_groups(groups: &[String]) -> String {
    let joined = groups
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    sanitize_path_segment(&joined)
}

/// Left-pads an all-digit string with zeros; anything else is untouched.
fn zero_pad(value: &str, width: usize) -> String {
    if value.chars().all(|c| c.is_ascii_digit()) {
        format!("{value:0>width$}")
    } else {
        value.to_string()
    }
}

fn page_number_and_extension(page_index: usize, image_ref: &str) -> (String, String) {
    if let Some(caps) = LETTER_PAGE_PATTERN.captures(image_ref) {
        return (caps[1].to_string(), caps[2].to_string());
    }
    if let Some(caps) = DASHED_PAGE_PATTERN.captures(image_ref) {
        return (caps[1].to_string(), caps[2].to_string());
    }
    let extension = image_ref
        .rfind('.')
        .map_or_else(String::new, |pos| image_ref[pos..].to_string());
    ((page_index + 1).to_string(), extension)
}
