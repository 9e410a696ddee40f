//! Query and search commands.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::filter::{self, Facet, FilterEngine, FilterSet};
use crate::models::Record;
use crate::repository::RecordStore;

fn open_store(settings: &Settings) -> anyhow::Result<Arc<dyn RecordStore>> {
    let ctx = settings.create_db_context()?;
    Ok(Arc::new(ctx.records()))
}

fn print_record(record: &Record) {
    println!(
        "{} {} {} {} {}",
        style(format!("#{}", record.id)).dim(),
        style(&record.criteria).bold(),
        style("→").dim(),
        record.energy_method,
        match record.direction.as_str() {
            "Increase" => style(record.direction.as_str()).red(),
            "Decrease" => style(record.direction.as_str()).blue(),
            other => style(other),
        }
    );
    let meta: Vec<&str> = [
        record.scale.as_deref(),
        record.climate.as_deref(),
        record.location.as_deref(),
        record.building_use.as_deref(),
        record.approach.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|v| !v.trim().is_empty())
    .collect();
    if !meta.is_empty() {
        println!("    {}", style(meta.join(" · ")).dim());
    }
    if let Some(paragraph) = &record.paragraph {
        println!("    {}", paragraph);
    }
}

/// Run a faceted query and print the result set.
pub async fn cmd_query(
    settings: &Settings,
    filter: &FilterSet,
    show_facets: bool,
    json: bool,
) -> anyhow::Result<()> {
    let engine = FilterEngine::new(open_store(settings)?);
    let result = engine.query(filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if show_facets {
        for facet in Facet::ALL {
            let options = result.options_for(facet);
            println!(
                "{} ({})",
                style(facet.as_str()).cyan().bold(),
                options.len()
            );
            for option in options {
                println!("  {:<40} {:>5}", option.value, option.count);
            }
        }
        println!();
    }

    for record in &result.results {
        print_record(record);
    }
    println!(
        "{} {} listed of {} matching records",
        style("✓").green(),
        result.results.len(),
        result.matched
    );

    Ok(())
}

/// Substring search across record text fields.
pub async fn cmd_search(
    settings: &Settings,
    query: &str,
    limit: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let hits = filter::search(&store, query, limit.or(Some(settings.search_limit))).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("{} No records match {:?}", style("!").yellow(), query);
        return Ok(());
    }
    for record in &hits {
        print_record(record);
    }
    println!("{} {} hits", style("✓").green(), hits.len());

    Ok(())
}
