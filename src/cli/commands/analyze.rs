//! Analysis chart commands.

use std::path::Path;
use std::sync::Arc;

use console::style;

use crate::analysis::{render_svg, AnalysisBuilder, AnalysisRequest};
use crate::config::Settings;
use crate::models::{AnalysisModel, Moderator, Tally, ALL_DECREASE, ALL_INCREASE};
use crate::services::saved_model;

/// "all" on the command line selects every energy output of that half.
fn energy_arg(raw: Option<String>, sentinel: &str) -> Option<String> {
    raw.map(|value| {
        if value.trim().eq_ignore_ascii_case("all") {
            sentinel.to_string()
        } else {
            value
        }
    })
}

fn print_half(title: &str, energy: &str, tallies: &[Tally]) {
    println!("{} {}", style(title).bold(), style(energy).dim());
    if tallies.is_empty() {
        println!("  {}", style("(no records)").dim());
    }
    for (value, count) in tallies {
        println!("  {:<40} {}", value, "█".repeat(*count as usize));
    }
}

fn print_model(model: &AnalysisModel) {
    print_half("Increase", &model.top_energy, &model.top_sorted);
    println!(
        "{} {} by {}",
        style("■").cyan(),
        style(&model.determinant).bold(),
        model.moderator.as_str()
    );
    print_half("Decrease", &model.bottom_energy, &model.bottom_sorted);
}

/// Build a chart and print it, optionally writing the SVG.
pub async fn cmd_analyze(
    settings: &Settings,
    determinant: &str,
    moderator: &str,
    top: Option<String>,
    bottom: Option<String>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let moderator = Moderator::from_str(moderator).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown moderator {:?} (expected climate, scale, building_use or approach)",
            moderator
        )
    })?;
    let request = AnalysisRequest {
        determinant: determinant.to_string(),
        moderator,
        top_energy: energy_arg(top, ALL_INCREASE),
        bottom_energy: energy_arg(bottom, ALL_DECREASE),
    };

    let ctx = settings.create_db_context()?;
    let builder = AnalysisBuilder::new(Arc::new(ctx.records()));
    let model = builder.build(&request).await?;

    if model.is_empty() {
        println!(
            "{} No approved records for {:?} in the selected halves",
            style("!").yellow(),
            determinant
        );
    } else {
        print_model(&model);
    }

    if let Some(path) = out {
        tokio::fs::write(path, render_svg(&model)).await?;
        println!("{} Wrote {}", style("✓").green(), path.display());
    }

    Ok(())
}

/// Write a saved analysis as SVG.
pub async fn cmd_export(settings: &Settings, id: i64, out: &Path) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let saved = ctx
        .analyses()
        .get(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No saved analysis {}", id))?;

    let model = saved_model(&saved)?;
    tokio::fs::write(out, render_svg(&model)).await?;
    println!(
        "{} Exported analysis {} ({} by {}) to {}",
        style("✓").green(),
        id,
        model.determinant,
        model.moderator.as_str(),
        out.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_arg_all_maps_to_sentinel() {
        assert_eq!(
            energy_arg(Some("ALL".to_string()), ALL_INCREASE).as_deref(),
            Some(ALL_INCREASE)
        );
        assert_eq!(
            energy_arg(Some("Heating".to_string()), ALL_DECREASE).as_deref(),
            Some("Heating")
        );
        assert_eq!(energy_arg(None, ALL_INCREASE), None);
    }
}
