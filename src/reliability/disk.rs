use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Every spill file name starts with this prefix.
pub const SPILL_PREFIX: &str = "logs";
const SPILL_EXTENSION: &str = "txt";
const MAX_NAME_ATTEMPTS: u32 = 10_000;
const STAGING_PREFIX: &str = ".staging";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Error, Debug)]
pub enum SpillError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Spill file not found: {0}")]
    NotFound(String),
    #[error("Invalid spill file name: {0}")]
    InvalidName(String),
    #[error("Disk space exceeded: {needed} bytes needed, limit is {limit} bytes")]
    DiskSpaceExceeded { needed: u64, limit: u64 },
    #[error("No unique spill file name available in {0}")]
    NamesExhausted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpillFile {
    pub name: String,
    pub size_bytes: u64,
}

/// Durable storage for batches that could not be delivered.
///
/// Each file holds one serialized batch. Files are only ever created, read whole
/// and deleted; nothing is rewritten in place.
#[async_trait]
pub trait SpillStore: Send + Sync {
    /// Writes `content` to a new uniquely named spill file and returns its name.
    async fn write_batch(&self, content: &str) -> Result<String, SpillError>;

    async fn list(&self) -> Result<Vec<SpillFile>, SpillError>;

    async fn read(&self, name: &str) -> Result<String, SpillError>;

    async fn delete(&self, name: &str) -> Result<(), SpillError>;
}

#[derive(Debug, Clone)]
pub struct SpillConfig {
    pub storage_path: PathBuf,
    pub max_disk_usage: u64, // bytes
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            storage_path: std::env::temp_dir().join("rask-client-logger"),
            max_disk_usage: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Spill store over a private directory.
///
/// Names follow `logs.txt`, `logs (2).txt`, `logs (3).txt`, ... A batch is written and
/// synced under a staging name first, then hard-linked onto a free spill name, so a
/// listed file is always complete and concurrent writers never share a file.
#[derive(Debug, Clone)]
pub struct FileSpillStore {
    config: SpillConfig,
}

impl FileSpillStore {
    pub fn new(config: SpillConfig) -> Self {
        Self { config }
    }

    pub fn at(storage_path: impl Into<PathBuf>) -> Self {
        Self::new(SpillConfig {
            storage_path: storage_path.into(),
            ..Default::default()
        })
    }

    pub fn storage_path(&self) -> &Path {
        &self.config.storage_path
    }

    pub async fn current_disk_usage(&self) -> Result<u64, SpillError> {
        Ok(self.list().await?.iter().map(|f| f.size_bytes).sum())
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, SpillError> {
        if !is_spill_name(name) || name.contains(['/', '\\']) || name.contains("..") {
            return Err(SpillError::InvalidName(name.to_string()));
        }
        Ok(self.config.storage_path.join(name))
    }

    /// Writes `content` to a synced staging file that `list` never reports.
    async fn stage(&self, content: &str) -> Result<PathBuf, SpillError> {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self
            .config
            .storage_path
            .join(format!("{STAGING_PREFIX}-{}-{seq}.tmp", std::process::id()));

        let written = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await
        }
        .await;

        match written {
            Ok(()) => Ok(path),
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(SpillError::IoError(e))
            }
        }
    }

    /// Links a staged file onto the first free spill name, then drops the staging name.
    ///
    /// `hard_link` fails on an existing target, so a published name is never overwritten.
    async fn publish(&self, staged: &Path) -> Result<String, SpillError> {
        let published = self.link_unique(staged).await;
        let _ = fs::remove_file(staged).await;
        published
    }

    async fn link_unique(&self, staged: &Path) -> Result<String, SpillError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = spill_file_name(attempt);
            let path = self.config.storage_path.join(&name);

            match fs::hard_link(staged, &path).await {
                Ok(()) => return Ok(name),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(SpillError::IoError(e)),
            }
        }

        Err(SpillError::NamesExhausted(
            self.config.storage_path.display().to_string(),
        ))
    }
}

#[async_trait]
impl SpillStore for FileSpillStore {
    async fn write_batch(&self, content: &str) -> Result<String, SpillError> {
        fs::create_dir_all(&self.config.storage_path).await?;

        let needed = self.current_disk_usage().await? + content.len() as u64;
        if needed > self.config.max_disk_usage {
            return Err(SpillError::DiskSpaceExceeded {
                needed,
                limit: self.config.max_disk_usage,
            });
        }

        let staged = self.stage(content).await?;
        let name = self.publish(&staged).await?;

        tracing::debug!("Spilled batch to {} ({} bytes)", name, content.len());
        Ok(name)
    }

    async fn list(&self) -> Result<Vec<SpillFile>, SpillError> {
        let mut entries = match fs::read_dir(&self.config.storage_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str()
                && is_spill_name(name)
                && entry.file_type().await?.is_file()
            {
                files.push(SpillFile {
                    name: name.to_string(),
                    size_bytes: entry.metadata().await?.len(),
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn read(&self, name: &str) -> Result<String, SpillError> {
        let path = self.file_path(name)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SpillError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), SpillError> {
        let path = self.file_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted spill file {}", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SpillError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn is_spill_name(name: &str) -> bool {
    name.starts_with(SPILL_PREFIX)
}

fn spill_file_name(attempt: u32) -> String {
    if attempt <= 1 {
        format!("{SPILL_PREFIX}.{SPILL_EXTENSION}")
    } else {
        format!("{SPILL_PREFIX} ({attempt}).{SPILL_EXTENSION}")
    }
}
