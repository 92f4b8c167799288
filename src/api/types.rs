//! Response types for the upstream JSON API and their conversion into the
//! crate's records.

use std::collections::HashMap;

use serde::Deserialize;

use crate::metadata::ChapterMetadata;

/// Status the service reports for chapters hosted elsewhere.
pub(crate) const EXTERNAL_STATUS: &str = "external";

// ==================== API Response Types ====================

/// Envelope wrapping every response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// A group reference with its display name.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GroupDto {
    pub id: u64,
    pub name: String,
}

/// Full chapter record (`chapter/{id}`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChapterDto {
    pub id: u64,
    pub hash: String,
    pub manga_id: u64,
    #[serde(default)]
    pub manga_title: String,
    #[serde(default)]
    pub volume: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub title: String,
    pub language: String,
    #[serde(default)]
    pub groups: Vec<GroupDto>,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub status: String,
}

/// Title record with its chapter summaries (`manga/{id}?include=chapters`).
#[derive(Debug, Deserialize)]
pub(crate) struct TitleDto {
    pub manga: MangaDto,
    #[serde(default)]
    pub chapters: Vec<ChapterSummaryDto>,
    #[serde(default)]
    pub groups: Vec<GroupDto>,
}

/// Title header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MangaDto {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub is_hentai: bool,
}

/// One entry of a title's chapter list. Groups are ids into
/// [`TitleDto::groups`].
#[derive(Debug, Deserialize)]
pub(crate) struct ChapterSummaryDto {
    pub id: u64,
    #[serde(default)]
    pub volume: String,
    #[serde(default)]
    pub chapter: String,
    #[serde(default)]
    pub title: String,
    pub language: String,
    #[serde(default)]
    pub groups: Vec<u64>,
}

// ==================== Records ====================

/// A chapter record: the chapter's metadata plus the raw title of the
/// series it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    /// Metadata used for naming and fetching.
    pub metadata: ChapterMetadata,
    /// Raw (escaped) title of the owning series.
    pub manga_title: String,
}

/// A title and the chapters listed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    /// Title identifier.
    pub id: u64,
    /// Raw (escaped) title.
    pub title: String,
    /// Adult-content flag; marks the series folder.
    pub is_hentai: bool,
    /// Chapter summaries in listing order.
    pub chapters: Vec<ChapterSummary>,
}

/// Chapter fields available from a title listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    /// Chapter identifier.
    pub id: u64,
    /// Volume label, empty for none.
    pub volume: String,
    /// Chapter number.
    pub chapter: String,
    /// Chapter title.
    pub title: String,
    /// Service language code.
    pub language: String,
    /// Group names.
    pub groups: Vec<String>,
}

impl From<ChapterDto> for ChapterRecord {
    fn from(dto: ChapterDto) -> Self {
        Self {
            metadata: ChapterMetadata {
                id: dto.id,
                manga_id: dto.manga_id,
                volume: dto.volume,
                chapter: dto.chapter,
                title: dto.title,
                language: dto.language,
                groups: dto.groups.into_iter().map(|g| g.name).collect(),
                pages: dto.pages,
                hash: dto.hash,
                server: dto.server,
            },
            manga_title: dto.manga_title,
        }
    }
}

impl From<TitleDto> for TitleRecord {
    fn from(dto: TitleDto) -> Self {
        let names: HashMap<u64, String> = dto.groups.into_iter().map(|g| (g.id, g.name)).collect();
        let chapters = dto
            .chapters
            .into_iter()
            .map(|c| ChapterSummary {
                id: c.id,
                volume: c.volume,
                chapter: c.chapter,
                title: c.title,
                language: c.language,
                groups: c
                    .groups
                    .iter()
                    .filter_map(|id| names.get(id).cloned())
                    .collect(),
            })
            .collect();
        Self {
            id: dto.manga.id,
            title: dto.manga.title,
            is_hentai: dto.manga.is_hentai,
            chapters,
        }
    }
}
