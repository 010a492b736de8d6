//! Hot reload delta generation
//!
//! Some conformance tests edit the program under debug while it runs. They
//! hand new source text to a [`DeltaGenerator`], which builds whatever
//! artifact the debugger needs to apply the change and returns its path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::bridge::process::shell_command;
use crate::common::config::DeltaConfig;
use crate::common::paths::delta_dir;
use crate::common::{Error, Result};

/// Builds a delta artifact from new source text
#[async_trait]
pub trait DeltaGenerator: Send + Sync {
    /// Produce the artifact for `target_file` rebuilt from `source_text`
    async fn generate(&self, source_text: &str, target_file: &str) -> Result<PathBuf>;
}

/// Runs a shell command to build deltas
///
/// The new source is written to the work directory under the target's file
/// name. The command then runs with these variables set:
///
/// - `DELTA_SOURCE`: path of the written source
/// - `DELTA_TARGET`: target file name as given by the script
/// - `DELTA_OUTPUT`: path the artifact must be written to
#[derive(Debug, Clone)]
pub struct CommandDeltaGenerator {
    command: String,
    work_dir: PathBuf,
}

impl CommandDeltaGenerator {
    pub fn new(command: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Build a generator from config; `None` if no command is set
    pub fn from_config(config: &DeltaConfig) -> Option<Self> {
        let command = config.command.as_deref()?.trim();
        if command.is_empty() {
            return None;
        }
        let work_dir = config.work_dir.clone().unwrap_or_else(delta_dir);
        Some(Self::new(command, work_dir))
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[async_trait]
impl DeltaGenerator for CommandDeltaGenerator {
    async fn generate(&self, source_text: &str, target_file: &str) -> Result<PathBuf> {
        let file_name = Path::new(target_file)
            .file_name()
            .ok_or_else(|| Error::delta_failed(target_file, "target has no file name"))?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let source_path = self.work_dir.join(file_name);
        let output_path = source_path.with_extension("delta");

        tokio::fs::write(&source_path, source_text).await?;
        if output_path.exists() {
            tokio::fs::remove_file(&output_path).await?;
        }

        tracing::info!(
            "Generating delta for {} with: {}",
            target_file,
            self.command
        );

        let output = shell_command(&self.command)
            .env("DELTA_SOURCE", &source_path)
            .env("DELTA_TARGET", target_file)
            .env("DELTA_OUTPUT", &output_path)
            .current_dir(&self.work_dir)
            .output()
            .await
            .map_err(|e| Error::delta_failed(target_file, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::delta_failed(
                target_file,
                format!("command exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        if !output_path.exists() {
            return Err(Error::delta_failed(
                target_file,
                format!("command did not produce {}", output_path.display()),
            ));
        }

        tracing::debug!("Delta written to {}", output_path.display());
        Ok(output_path)
    }
}
