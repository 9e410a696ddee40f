//! Faceted filtering, free-text search and selection state.

pub mod engine;
pub mod facet;
pub mod search;
pub mod selection;

pub use engine::{compute, FacetedResult, FilterEngine, FilterSet};
pub use facet::{Facet, FacetOption};
pub use search::{search, DEFAULT_SEARCH_LIMIT};
pub use selection::SelectionController;
