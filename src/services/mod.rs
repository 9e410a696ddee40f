//! Service layer for evidence business logic.
//!
//! Services hold the domain rules and are shared by the CLI and the web
//! server.

pub mod analyses;
pub mod records;
pub mod vocabulary;

pub use analyses::{saved_model, AnalysisService, RenderedAnalysis};
pub use records::{Affirmed, Deleted, RecordService, Submission};
pub use vocabulary::VocabularyService;
