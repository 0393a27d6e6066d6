use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::ConversionError;
use crate::MarkdownConversion;

pub const DEFAULT_PROGRAM: &str = "pandoc";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Converts Markdown to HTML by shelling out to pandoc (or anything that
/// speaks the same `-f markdown -t html <file>` contract).
pub struct PandocConverter {
    program: String,
    timeout: Duration,
}

impl PandocConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl MarkdownConversion for PandocConverter {
    async fn convert(&self, markdown_path: &Path) -> Result<String, ConversionError> {
        let child = Command::new(&self.program)
            .arg("-f")
            .arg("markdown")
            .arg("-t")
            .arg("html")
            .arg(markdown_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::Timeout(self.timeout))?
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let html = String::from_utf8(output.stdout)?.trim().to_string();
        if html.is_empty() {
            return Err(ConversionError::Empty);
        }

        Ok(html)
    }
}
