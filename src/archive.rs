use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::ReportError;

pub const RAW_FILE: &str = "raw.json";
pub const ANALYSIS_FILE: &str = "analysis.json";
pub const DIGEST_FILE: &str = "digest.txt";

/// Per-run output directory, `<output_dir>/<YYYY-MM-DD_HHMMSS>/`.
#[derive(Debug, Clone)]
pub struct RunArchive {
    run_id: String,
    dir: PathBuf,
}

impl RunArchive {
    pub async fn create(output_dir: &Path, started_at: NaiveDateTime) -> Result<Self, ReportError> {
        let run_id = run_id(started_at);
        let dir = output_dir.join(&run_id);
        ensure_dir(&dir).await?;
        tracing::debug!(dir = %dir.display(), "created run directory");
        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf, ReportError> {
        let payload = serde_json::to_string_pretty(value)?;
        self.write_text(name, &payload).await
    }

    pub async fn write_text(&self, name: &str, contents: &str) -> Result<PathBuf, ReportError> {
        let path = self.dir.join(name);
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        tracing::info!(path = %path.display(), "saved");
        Ok(path)
    }
}

pub fn run_id(started_at: NaiveDateTime) -> String {
    started_at.format("%Y-%m-%d_%H%M%S").to_string()
}

async fn ensure_dir(path: &Path) -> Result<(), ReportError> {
    if path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}
