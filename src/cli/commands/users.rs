use serde_json::json;

use super::load_state;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::services::NewUser;

pub async fn create(new: NewUser, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = load_state().await?;
    let profile = state.users.create(new).await?;

    output_success(
        &output_format,
        &format!("Created user {} ({})", profile.email, profile.role),
        Some(json!({ "user": profile })),
    )
}
