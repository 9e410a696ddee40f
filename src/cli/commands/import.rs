//! Spreadsheet import command.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::import::{detect_title_column, match_table, propagate, MatchCandidate, Table};
use crate::repository::RecordStore;

/// Match a spreadsheet against record paragraphs, then optionally write the
/// exact matches back.
pub async fn cmd_import(settings: &Settings, file: &Path, apply: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file).await?;
    let filename = file.file_name().and_then(|n| n.to_str());
    let table = Table::from_bytes(&bytes, filename)?;
    let title_column = detect_title_column(&table.headers)
        .ok_or_else(|| anyhow::anyhow!("{} has no columns", file.display()))?;

    println!(
        "{} Read {} rows from {}",
        style("→").cyan(),
        table.rows.len(),
        file.display()
    );
    if title_column.detected {
        println!("  Title column: {}", style(&title_column.header).bold());
    } else {
        println!(
            "  {} No title-like header, using first column {:?}",
            style("!").yellow(),
            title_column.header
        );
    }

    let ctx = settings.create_db_context()?;
    let store = ctx.records();
    let report = match_table(&store, &table, &title_column).await?;

    for candidate in &report.matches {
        let marker = if candidate.confidence.is_importable() {
            style("✓").green()
        } else {
            style("~").yellow()
        };
        println!(
            "  {} #{} {} ({})",
            marker,
            candidate.db_record_id,
            candidate.excel_study,
            candidate.confidence.as_str()
        );
    }
    for row in &report.unmatched {
        println!(
            "  {} {} {}",
            style("✗").red(),
            row.excel_study,
            style(&row.reason).dim()
        );
    }

    let confirmed: Vec<MatchCandidate> = report.importable().map(|(_, c)| c.clone()).collect();
    println!(
        "{} {} importable matches, {} refused, {} unmatched rows",
        style("→").cyan(),
        confirmed.len(),
        report.non_importable_count(),
        report.unmatched.len()
    );

    if !apply {
        println!("  Re-run with --apply to write these matches");
        return Ok(());
    }
    if confirmed.is_empty() {
        println!("{} Nothing to apply", style("!").yellow());
        return Ok(());
    }

    let pb = ProgressBar::new(confirmed.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    let store: &dyn RecordStore = &store;
    let outcome = propagate(store, &table, &title_column, &confirmed, |record| {
        pb.set_message(format!("#{}", record.record_id));
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    for failed in &outcome.failed {
        println!(
            "  {} #{} {}: {}",
            style("✗").red(),
            failed.record_id,
            failed.excel_study,
            failed.error.as_deref().unwrap_or("failed")
        );
    }
    println!(
        "{} Updated {} records ({} failed)",
        if outcome.is_complete() {
            style("✓").green()
        } else {
            style("!").yellow()
        },
        outcome.updated.len(),
        outcome.failed.len()
    );

    if outcome.is_complete() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} records could not be updated",
            outcome.failed.len()
        ))
    }
}
