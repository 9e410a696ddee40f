//! Moderator analysis: tally records of one determinant by a moderator and
//! render the result as a stacked chart.

mod builder;
mod geometry;
mod html;
mod legacy;
mod svg;

pub use builder::{build_model, tally, AnalysisBuilder, AnalysisRequest};
pub use geometry::{layout, text_color, Layout, BAR_HEIGHT, BOX_HEIGHT, PADDING, SVG_WIDTH};
pub use html::render_html;
pub use legacy::parse_legacy_html;
pub use svg::{render_svg, svg_data_uri};
