use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::session::ReplaySession;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
    session: OnceCell<Arc<ReplaySession>>,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            session: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Session built on first use, so `info` never touches the solution file.
    pub async fn session(&self) -> Result<Arc<ReplaySession>> {
        self.session
            .get_or_try_init(|| async {
                ReplaySession::from_config(self.config().clone())
                    .map(Arc::new)
                    .map_err(anyhow::Error::from)
            })
            .await
            .map(Arc::clone)
    }
}
