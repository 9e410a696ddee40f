//! Data models for the evidence database.

mod analysis;
mod record;
mod user;
pub mod vocab;

pub use analysis::{
    AnalysisModel, EnergySelection, NewSavedAnalysis, SavedAnalysis, Tally, ALL_DECREASE,
    ALL_INCREASE, NONE_ENERGY,
};
pub use record::{
    is_present_paragraph, Direction, NewRecord, Record, RecordPatch, RecordStatus, Visibility,
    AWAITING_DATA,
};
pub use user::{Actor, NewUser, Role, User};
pub use vocab::{Approach, BuildingUse, Climate, ClimateCode, Moderator, ScaleLevel};
