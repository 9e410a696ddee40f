//! Standalone SVG export.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::geometry::{
    layout, Arrow, Bar, Layout, BAR_HEIGHT, BAR_WIDTH, BOX_HEIGHT, SVG_WIDTH,
};
use crate::models::AnalysisModel;
use crate::utils::xml_escape;

const STYLE: &str = r#"<style>
    text { font-family: Arial, Helvetica, sans-serif; }
    .bar-label { font-size: 12px; }
    .display-box { font-size: 14px; font-weight: bold; }
    .arrow-text { font-size: 13px; font-weight: bold; }
  </style>"#;

const ARROW_X: i64 = BAR_WIDTH + 40;
const ARROW_LABEL_X: i64 = BAR_WIDTH + 80;
const HEAD: i64 = 12;

fn bar(out: &mut String, bar: &Bar) {
    out.push_str(&format!(
        r#"  <rect x="0" y="{y}" width="{w}" height="{h}" fill="{fill}" stroke="white" stroke-width="1"/>
  <text class="bar-label" x="{tx}" y="{ty}" fill="{text}" text-anchor="middle" dominant-baseline="middle">{label}</text>
"#,
        y = bar.y,
        w = BAR_WIDTH,
        h = BAR_HEIGHT,
        fill = bar.color,
        tx = BAR_WIDTH / 2,
        ty = bar.y + BAR_HEIGHT / 2,
        text = bar.text_color,
        label = xml_escape(&bar.label),
    ));
}

fn arrow(out: &mut String, arrow: &Arrow) {
    let (tip, tail) = if arrow.up {
        (arrow.y, arrow.y + arrow.height)
    } else {
        (arrow.y + arrow.height, arrow.y)
    };
    let back = if arrow.up { tip + HEAD } else { tip - HEAD };
    let mid = arrow.y + arrow.height / 2;
    out.push_str(&format!(
        r#"  <line x1="{x}" y1="{tail}" x2="{x}" y2="{back}" stroke="{c}" stroke-width="4"/>
  <polygon points="{x},{tip} {l},{back} {r},{back}" fill="{c}"/>
  <text class="arrow-text" x="{lx}" y="{mid}" fill="{c}" text-anchor="middle" transform="rotate(-90 {lx} {mid})">{label}</text>
"#,
        x = ARROW_X,
        l = ARROW_X - HEAD / 2 - 2,
        r = ARROW_X + HEAD / 2 + 2,
        c = arrow.color,
        lx = ARROW_LABEL_X,
        label = xml_escape(&arrow.label),
    ));
}

fn determinant_box(out: &mut String, layout: &Layout) {
    out.push_str(&format!(
        r##"  <rect x="0" y="{y}" width="{w}" height="{h}" fill="#f5f5f5" stroke="#333333" stroke-width="2"/>
  <text class="display-box" x="{tx}" y="{ty}" fill="black" text-anchor="middle" dominant-baseline="middle">{label}</text>
"##,
        y = layout.box_y,
        w = BAR_WIDTH,
        h = BOX_HEIGHT,
        tx = BAR_WIDTH / 2,
        ty = layout.box_y + BOX_HEIGHT / 2,
        label = xml_escape(&layout.determinant),
    ));
}

/// Render a self-contained SVG document. Depends only on the model.
pub fn render_svg(model: &AnalysisModel) -> String {
    let layout = layout(model);
    let mut out = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n  {STYLE}\n",
        w = SVG_WIDTH,
        h = layout.height,
    );
    out.push_str(&format!(
        "  <rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
        layout.width, layout.height
    ));
    for b in &layout.top_bars {
        bar(&mut out, b);
    }
    determinant_box(&mut out, &layout);
    for b in &layout.bottom_bars {
        bar(&mut out, b);
    }
    for a in layout.top_arrow.iter().chain(layout.bottom_arrow.iter()) {
        arrow(&mut out, a);
    }
    out.push_str("</svg>\n");
    out
}

/// `data:` URI for offering the SVG as a download link.
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Moderator;

    fn model() -> AnalysisModel {
        AnalysisModel {
            determinant: "Compactness & form".to_string(),
            moderator: Moderator::Climate,
            top_energy: "EUI".to_string(),
            bottom_energy: "None".to_string(),
            top_sorted: vec![("Cfa".to_string(), 3), ("Cwa".to_string(), 1)],
            bottom_sorted: vec![],
            top_height: 4,
            bottom_height: 0,
        }
    }

    #[test]
    fn test_svg_document_shape() {
        let svg = render_svg(&model());
        assert!(svg.starts_with("<?xml version=\"1.0\""));
        assert!(svg.contains("height=\"388\""));
        assert!(svg.contains("class=\"bar-label\""));
        assert!(svg.contains("class=\"display-box\""));
        assert!(svg.contains("Compactness &amp; form"));
        assert!(svg.contains("rotate(-90"));
        assert!(svg.contains("#e74c3c"));
        assert!(!svg.contains("#3498db"));
        assert_eq!(svg.matches("class=\"bar-label\"").count(), 4);
        assert!(!svg.contains("href"));
    }

    #[test]
    fn test_svg_is_deterministic() {
        assert_eq!(render_svg(&model()), render_svg(&model()));
    }

    #[test]
    fn test_data_uri() {
        let uri = svg_data_uri("<svg/>");
        assert_eq!(uri, "data:image/svg+xml;base64,PHN2Zy8+");
    }
}
