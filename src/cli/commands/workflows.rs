use serde_json::json;

use super::load_state;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub async fn migrate(output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_state().await?;
    let report = state.workflows.migrate().await?;

    let message = format!(
        "Scanned {} workflow(s): {} encrypted, {} already encrypted, {} failed",
        report.scanned,
        report.encrypted,
        report.skipped,
        report.failed.len()
    );
    output_success(&output_format, &message, Some(json!({ "report": report })))?;

    if !report.failed.is_empty() {
        anyhow::bail!("migration failed for: {}", report.failed.join(", "));
    }
    Ok(())
}
