//! Newline-delimited JSON output for article records.
//!
//! Each run writes one file named after its start time:
//! ```text
//! output_dir/
//! └── data_2026-10-17_14-07-17.jsonl
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::models::ArticleRecord;
use crate::utils::ensure_writable_dir;

/// Appends one JSON object per line to a `.jsonl` file.
#[derive(Debug)]
pub struct JsonlWriter {
    path: PathBuf,
    file: File,
    written: usize,
}

impl JsonlWriter {
    /// Create `data_<timestamp>.jsonl` inside `output_dir`, creating the
    /// directory if needed.
    ///
    /// # Arguments
    ///
    /// * `output_dir` - Directory that receives the file
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or written to,
    /// or if the file cannot be opened.
    #[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
    pub async fn create(output_dir: &str) -> Result<Self, Box<dyn Error>> {
        ensure_writable_dir(output_dir).await?;
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = Path::new(output_dir).join(format!("data_{timestamp}.jsonl"));
        Self::create_at(path).await
    }

    /// Open `path` for appending.
    pub async fn create_at(path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        info!(path = %path.display(), "Saving records");
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Append one record as a single JSON line.
    ///
    /// # Arguments
    ///
    /// * `record` - The validated article to write
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub async fn write_record(&mut self, record: &ArticleRecord) -> Result<(), Box<dyn Error>> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    /// Flush and close, returning the number of records written.
    pub async fn finish(mut self) -> Result<usize, Box<dyn Error>> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        info!(path = %self.path.display(), records = self.written, "Closed output file");
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleDraft;

    fn record(title: &str) -> ArticleRecord {
        ArticleDraft {
            title: Some(title.to_string()),
            url: Some("https://wiadomosci.onet.pl/kraj/test/abc123".to_string()),
            date: Some("2026-10-17".to_string()),
            content: Some("Zażółć gęślą jaźń.".to_string()),
            ..Default::default()
        }
        .into_record()
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::create(dir.path().to_str().unwrap()).await.unwrap();
        let name = writer.path().file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("data_"));
        assert!(name.ends_with(".jsonl"));
        assert_eq!(writer.finish().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut writer = JsonlWriter::create_at(&path).await.unwrap();
        writer.write_record(&record("Pierwszy")).await.unwrap();
        writer.write_record(&record("Drugi")).await.unwrap();
        assert_eq!(writer.finish().await.unwrap(), 2);

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        // Non-ASCII text is written as-is, not \u-escaped.
        assert!(lines[0].contains("Zażółć gęślą jaźń."));
        let back: ArticleRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.title, "Drugi");
    }
}
