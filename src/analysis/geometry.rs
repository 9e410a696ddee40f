//! Chart layout shared by the HTML and SVG renderers.

use crate::models::{AnalysisModel, Moderator};

pub const BAR_HEIGHT: i64 = 28;
pub const BOX_HEIGHT: i64 = 36;
pub const SVG_WIDTH: i64 = 500;
pub const BAR_WIDTH: i64 = 380;
/// Room above and below the stacks for arrow labels.
pub const PADDING: i64 = 120;

pub const UP_ARROW_COLOR: &str = "#e74c3c";
pub const DOWN_ARROW_COLOR: &str = "#3498db";

/// Backgrounds dark enough to need white text.
const DARK_COLORS: &[&str] = &[
    "#0000FF", "#0078FF", "#FF0000", "#4B50B4", "#320087", "#007D7D", "#00465F", "#5A78DC",
    "#666666", "#105e8d", "#266e99",
];

pub fn text_color(background: &str) -> &'static str {
    if DARK_COLORS
        .iter()
        .any(|dark| dark.eq_ignore_ascii_case(background))
    {
        "white"
    } else {
        "black"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub y: i64,
    pub label: String,
    pub color: &'static str,
    pub text_color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrow {
    pub y: i64,
    pub height: i64,
    pub label: String,
    pub color: &'static str,
    pub up: bool,
}

/// Absolute positions in SVG user units, padding included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub width: i64,
    pub height: i64,
    pub top_bars: Vec<Bar>,
    pub bottom_bars: Vec<Bar>,
    pub box_y: i64,
    pub determinant: String,
    pub top_arrow: Option<Arrow>,
    pub bottom_arrow: Option<Arrow>,
}

/// One bar per counted record, in tally order.
fn stack(tallies: &[(String, i64)], moderator: Moderator, start: i64) -> Vec<Bar> {
    let mut y = start;
    let mut bars = Vec::new();
    for (label, count) in tallies {
        let color = moderator.color_for(label);
        for _ in 0..*count {
            bars.push(Bar {
                y,
                label: label.clone(),
                color,
                text_color: text_color(color),
            });
            y += BAR_HEIGHT;
        }
    }
    bars
}

pub fn layout(model: &AnalysisModel) -> Layout {
    let top_span = model.top_height * BAR_HEIGHT;
    let bottom_span = model.bottom_height * BAR_HEIGHT;
    let box_y = PADDING + top_span;
    let bottom_y = box_y + BOX_HEIGHT;

    let top_arrow = (!model.top_sorted.is_empty()).then(|| Arrow {
        y: PADDING,
        height: top_span,
        label: model.top_energy.clone(),
        color: UP_ARROW_COLOR,
        up: true,
    });
    let bottom_arrow = (!model.bottom_sorted.is_empty()).then(|| Arrow {
        y: bottom_y,
        height: bottom_span,
        label: model.bottom_energy.clone(),
        color: DOWN_ARROW_COLOR,
        up: false,
    });

    Layout {
        width: SVG_WIDTH,
        height: top_span + BOX_HEIGHT + bottom_span + 2 * PADDING,
        top_bars: stack(&model.top_sorted, model.moderator, PADDING),
        bottom_bars: stack(&model.bottom_sorted, model.moderator, bottom_y),
        box_y,
        determinant: model.determinant.clone(),
        top_arrow,
        bottom_arrow,
    }
}
