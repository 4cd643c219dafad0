//! Cloudflare Pages deployment via the `wrangler` CLI.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument};

use daybrief_shared::{DaybriefError, DeployConfig, Result};

/// Pushes a rendered site directory to its hosting target.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, site_dir: &Path) -> Result<()>;
}

/// Deploys via `wrangler pages deploy`.
pub struct WranglerDeployer {
    project_name: String,
    account_id: String,
    timeout: Duration,
}

impl WranglerDeployer {
    pub fn new(config: &DeployConfig) -> Self {
        Self {
            project_name: config.project_name.clone(),
            account_id: config.account_id.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Deployer for WranglerDeployer {
    #[instrument(skip_all, fields(project = %self.project_name))]
    async fn deploy(&self, site_dir: &Path) -> Result<()> {
        let mut cmd = Command::new("wrangler");
        cmd.arg("pages")
            .arg("deploy")
            .arg(site_dir)
            .arg("--project-name")
            .arg(&self.project_name)
            .kill_on_drop(true);

        if !self.account_id.is_empty() {
            cmd.env("CLOUDFLARE_ACCOUNT_ID", &self.account_id);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                DaybriefError::Deploy(format!(
                    "wrangler timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DaybriefError::Deploy(
                        "wrangler not found on PATH; install it with `npm install -g wrangler`"
                            .into(),
                    )
                } else {
                    DaybriefError::Deploy(format!("failed to spawn wrangler: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(500).collect();
            return Err(DaybriefError::Deploy(format!(
                "wrangler exited with {}: {}",
                output.status,
                excerpt.trim()
            )));
        }

        info!(?site_dir, "site deployed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployer_carries_config() {
        let deployer = WranglerDeployer::new(&DeployConfig {
            project_name: "daybrief".into(),
            account_id: "abc123".into(),
            timeout_secs: 60,
        });
        assert_eq!(deployer.project_name, "daybrief");
        assert_eq!(deployer.account_id, "abc123");
        assert_eq!(deployer.timeout, Duration::from_secs(60));
    }
}
