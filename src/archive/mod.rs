//! Existing-content inspection and archive writing for chapter targets.
//!
//! Before a chapter is fetched, [`inspect`] looks at its loose folder and
//! archive and returns a [`PriorState`]. Every fetched page is then passed
//! through [`reconcile`], which decides whether the page is already present
//! or has to be written. [`ChapterWorkspace`] executes those decisions
//! against the folder and a [`ChapterArchive`].
//!
//! # Archive strategies
//!
//! | Existing archive | Compare mode | Strategy |
//! |---|---|---|
//! | none | any | create at `<name>.part`, rename on finish |
//! | yes | names | append in place |
//! | yes | data | extract to scratch, rebuild at `<name>.part`, rename over the original |

mod error;
mod state;
mod workspace;
mod writer;

pub use error::ArchiveError;
pub use state::{Action, ArchiveContents, PageIndex, PriorState, inspect, reconcile};
pub use workspace::ChapterWorkspace;
pub use writer::{ChapterArchive, WriteStrategy};
