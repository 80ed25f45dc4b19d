pub mod keys;
pub mod users;
pub mod workflows;

use anyhow::Context;

use crate::app::{self, AppState};
use crate::config;

/// Same startup path as the server, without binding a port.
pub(crate) async fn load_state() -> anyhow::Result<AppState> {
    let config = config::config().clone();
    app::bootstrap(config)
        .await
        .context("failed to initialize storage and encryption")
}
