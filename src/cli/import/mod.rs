//! Import command - bulk loads users into the configured store

use std::path::Path;

use tracing::info;

use crate::infrastructure::user::UserImporter;

/// Import the given file and print the counts
pub async fn run(file: &Path) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let repository = crate::create_user_repository(&config).await?;
    let report = UserImporter::new(repository).import_file(file).await?;

    info!(total = report.total(), "Import complete");
    println!(
        "Imported {}: {} inserted, {} updated, {} skipped",
        file.display(),
        report.inserted,
        report.updated,
        report.skipped
    );

    Ok(())
}
