//! Bulk study-matching importer.
//!
//! An administrator uploads a spreadsheet of study titles; each title is
//! matched against record paragraphs, reviewed, and the confirmed matches
//! receive the sheet's metadata columns.

mod matcher;
mod normalize;
mod propagate;
mod session;
mod table;

pub use matcher::{match_table, MatchCandidate, MatchConfidence, MatchReport, UnmatchedRow};
pub use normalize::{detect_title_column, extract_climate_code, normalize_title, TitleColumn};
pub use propagate::{propagate, ColumnMap, PropagationReport, RecordOutcome};
pub use session::{
    ConfirmOutcome, ImportSessions, ImportState, ReviewEntry, ReviewPage, SelectionUpdate,
    UploadSummary, DEFAULT_IDLE_TIMEOUT, DEFAULT_PAGE_SIZE,
};
pub use table::Table;
