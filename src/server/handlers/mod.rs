//! HTTP request handlers for the web server.

mod analyses;
mod api;
mod import;
mod records;

pub use analyses::{
    build_analysis, delete_analysis, export_analysis_svg, list_analyses, save_analysis,
};
pub use api::{health, query, search, vocabulary};
pub use import::{confirm_import, discard_import, match_import, select_import, upload_import};
pub use records::{delete_record, edit_record, moderate_record, my_records, submit_record};
