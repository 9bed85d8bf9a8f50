//! Processing state tracking.
//!
//! An image's location is its durable completion marker: files in the images
//! directory are candidates, files under `processed/` are done. Moving a file
//! is always the final step of a successful publish, so a crash between
//! publishing and moving leaves the image eligible and it is published again
//! on the next run (at-least-once delivery).
//!
//! The optional [`PublishJournal`] closes that gap by recording an explicit
//! per-file [`PublishStatus`]: a file whose journal entry says `Published`
//! (with an unchanged content hash) is only moved, never republished.

mod error;
mod journal;
mod sqlite_journal;
mod state;

pub use error::TrackerError;
pub use journal::{JournalEntry, JournalError, PublishJournal, PublishStatus};
pub use sqlite_journal::SqlitePublishJournal;
pub use state::{file_sha256, Candidate, ProcessingTracker, PROCESSED_DIR};
