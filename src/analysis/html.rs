//! Live HTML fragment of an analysis chart.
//!
//! The fragment is also what gets cached with a saved analysis, so
//! [`super::legacy`] reads the same class names back.

use super::geometry::{layout, Arrow, Bar, BAR_HEIGHT, BOX_HEIGHT};
use crate::models::AnalysisModel;
use crate::utils::html_escape;

fn bar(out: &mut String, bar: &Bar) {
    out.push_str(&format!(
        "      <div class=\"bar\" data-value=\"{value}\" style=\"height:{h}px;background:{bg};color:{fg}\">{label}</div>\n",
        value = html_escape(&bar.label),
        h = BAR_HEIGHT,
        bg = bar.color,
        fg = bar.text_color,
        label = html_escape(&bar.label),
    ));
}

fn arrow(out: &mut String, class: &str, arrow: Option<&Arrow>, fallback_height: i64) {
    match arrow {
        Some(a) => out.push_str(&format!(
            "      <div class=\"arrow {class}\" style=\"height:{h}px;color:{c};border-color:{c}\"><span class=\"arrow-label\">{label}</span></div>\n",
            h = a.height,
            c = a.color,
            label = html_escape(&a.label),
        )),
        None => out.push_str(&format!(
            "      <div class=\"arrow-spacer\" style=\"height:{}px\"></div>\n",
            fallback_height
        )),
    }
}

/// Render the chart as a fluid-width HTML fragment.
pub fn render_html(model: &AnalysisModel) -> String {
    let layout = layout(model);
    let mut out = format!(
        "<div class=\"analysis-chart\" data-moderator=\"{}\" data-determinant=\"{}\">\n  <div class=\"analysis-body\" style=\"display:flex;width:100%\">\n    <div class=\"analysis-stack\" style=\"flex:1\">\n",
        model.moderator.as_str(),
        html_escape(&model.determinant),
    );

    out.push_str("      <div class=\"analysis-half analysis-top\">\n");
    for b in &layout.top_bars {
        bar(&mut out, b);
    }
    out.push_str("      </div>\n");
    out.push_str(&format!(
        "      <div class=\"determinant-box\" style=\"height:{}px\">{}</div>\n",
        BOX_HEIGHT,
        html_escape(&layout.determinant)
    ));
    out.push_str("      <div class=\"analysis-half analysis-bottom\">\n");
    for b in &layout.bottom_bars {
        bar(&mut out, b);
    }
    out.push_str("      </div>\n    </div>\n");

    out.push_str("    <div class=\"analysis-arrows\" style=\"width:80px\">\n");
    arrow(
        &mut out,
        "arrow-up",
        layout.top_arrow.as_ref(),
        model.top_height * BAR_HEIGHT,
    );
    out.push_str(&format!(
        "      <div class=\"arrow-spacer\" style=\"height:{}px\"></div>\n",
        BOX_HEIGHT
    ));
    arrow(
        &mut out,
        "arrow-down",
        layout.bottom_arrow.as_ref(),
        model.bottom_height * BAR_HEIGHT,
    );
    out.push_str("    </div>\n  </div>\n</div>\n");
    out
}
