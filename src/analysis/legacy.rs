//! Recover a chart model from cached HTML when the stored tallies are gone.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::models::{AnalysisModel, Moderator, Tally, NONE_ENERGY};

static TOP_BARS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".analysis-top .bar").unwrap());
static BOTTOM_BARS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".analysis-bottom .bar").unwrap());
static DETERMINANT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".determinant-box").unwrap());
static UP_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".arrow-up .arrow-label").unwrap());
static DOWN_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".arrow-down .arrow-label").unwrap());
static CHART: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".analysis-chart").unwrap());

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Consecutive bars with the same label form one tally.
fn tallies(document: &Html, selector: &Selector) -> Vec<Tally> {
    let mut out: Vec<Tally> = Vec::new();
    for element in document.select(selector) {
        let label = element
            .value()
            .attr("data-value")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| text_of(element));
        match out.last_mut() {
            Some((last, count)) if *last == label => *count += 1,
            _ => out.push((label, 1)),
        }
    }
    out
}

/// Parse a cached chart fragment.
///
/// `analysis_type` and `determinant` come from the saved row and win over
/// whatever the fragment says. Returns `None` when the HTML is not a chart.
pub fn parse_legacy_html(
    html: &str,
    analysis_type: &str,
    determinant: &str,
) -> Option<AnalysisModel> {
    let document = Html::parse_fragment(html);
    let chart = document.select(&CHART).next();
    let box_text = document.select(&DETERMINANT).next().map(text_of);
    if chart.is_none() && box_text.is_none() {
        return None;
    }

    let moderator = Moderator::from_str(analysis_type).or_else(|| {
        chart
            .and_then(|c| c.value().attr("data-moderator"))
            .and_then(Moderator::from_str)
    })?;
    let label = |selector: &Selector| {
        document
            .select(selector)
            .next()
            .map(text_of)
            .unwrap_or_else(|| NONE_ENERGY.to_string())
    };

    let top_sorted = tallies(&document, &TOP_BARS);
    let bottom_sorted = tallies(&document, &BOTTOM_BARS);
    let determinant = if determinant.trim().is_empty() {
        box_text.unwrap_or_default()
    } else {
        determinant.to_string()
    };

    Some(AnalysisModel {
        determinant,
        moderator,
        top_energy: label(&UP_LABEL),
        bottom_energy: label(&DOWN_LABEL),
        top_height: top_sorted.iter().map(|(_, c)| c).sum(),
        bottom_height: bottom_sorted.iter().map(|(_, c)| c).sum(),
        top_sorted,
        bottom_sorted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::html::render_html;

    #[test]
    fn test_recovers_rendered_model() {
        let model = AnalysisModel {
            determinant: "Compactness".to_string(),
            moderator: Moderator::Climate,
            top_energy: "EUI".to_string(),
            bottom_energy: "Cooling".to_string(),
            top_sorted: vec![("Cfa".to_string(), 3), ("Cwa".to_string(), 1)],
            bottom_sorted: vec![("Dfb".to_string(), 2)],
            top_height: 4,
            bottom_height: 2,
        };
        let html = render_html(&model);
        let parsed = parse_legacy_html(&html, "Climate", "Compactness").unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_not_a_chart() {
        assert!(parse_legacy_html("<p>hello</p>", "Climate", "Density").is_none());
    }
}
