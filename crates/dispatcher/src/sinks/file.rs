//! FileSink - appends scenes to a JSON lines file

use chrono::{SecondsFormat, Utc};
use contracts::{ContractError, SceneSink, SceneUpdate};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

const DEFAULT_FILE_NAME: &str = "scenes.jsonl";

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Output file name inside `base_path`
    pub file_name: String,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let file_name = params
            .get("file_name")
            .cloned()
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

        Self {
            base_path,
            file_name,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.base_path.join(&self.file_name)
    }
}

/// One line of the output file
#[derive(Serialize)]
struct SceneRecord<'a> {
    written_at: String,
    #[serde(flatten)]
    update: &'a SceneUpdate,
}

/// Sink that appends scenes to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl FileSink {
    /// Create a new FileSink, creating the output directory if needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.output_path())?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn output_path(&self) -> PathBuf {
        self.config.output_path()
    }

    fn append_line(&mut self, update: &SceneUpdate) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("sink already closed"))?;

        let record = SceneRecord {
            written_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            update,
        };
        serde_json::to_writer(&mut *writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn persist_scene(&mut self, update: &SceneUpdate) -> Result<(), ContractError> {
        self.append_line(update).map_err(|e| {
            error!(sink = %self.name, sequence = update.sequence, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl SceneSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, update),
        fields(sink = %self.name, sequence = update.sequence)
    )]
    async fn write(&mut self, update: &SceneUpdate) -> Result<(), ContractError> {
        self.persist_scene(update)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        self.writer = None;
        debug!(sink = %self.name, lines = self.lines, path = %self.output_path().display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_update;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_write() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            base_path: dir.path().to_path_buf(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&sample_update(1)).await.unwrap();
        sink.write(&sample_update(2)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(dir.path().join(DEFAULT_FILE_NAME)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["sequence"], 1);
        assert_eq!(first["cause"], "tick");
        assert!(first["written_at"].is_string());
        assert_eq!(first["scene"]["latency"]["latency"], 45.0);
        assert_eq!(first["scene"]["latency"]["t"], 0.1);
    }

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempdir().unwrap();
        let params = HashMap::from([
            ("base_path".to_string(), dir.path().display().to_string()),
            ("file_name".to_string(), "run.jsonl".to_string()),
        ]);

        for seq in 0..2 {
            let mut sink = FileSink::from_params("append", &params).unwrap();
            sink.write(&sample_update(seq)).await.unwrap();
            sink.close().await.unwrap();
        }

        let content = fs::read_to_string(dir.path().join("run.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let params = HashMap::from([("base_path".to_string(), dir.path().display().to_string())]);
        let mut sink = FileSink::from_params("closed", &params).unwrap();
        sink.close().await.unwrap();
        assert!(sink.write(&sample_update(1)).await.is_err());
    }
}
