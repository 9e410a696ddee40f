//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context()?;
    let applied = ctx.init_schema().await?;
    for name in &applied {
        println!("  {} Applied migration: {}", style("✓").green(), name);
    }

    let records = ctx.records();
    let count = crate::repository::RecordStore::max_id(&records).await?;
    if count.is_none() {
        println!("{} The record table is empty", style("!").yellow());
        println!("  Submit records through the API or point --data at an existing database");
    }

    println!(
        "{} Initialized evidence database ({}) in {}",
        style("✓").green(),
        settings.mode.as_str(),
        settings.data_dir.display()
    );

    Ok(())
}
