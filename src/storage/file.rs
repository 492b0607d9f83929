// src/storage/file.rs
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::history::HistoryPoint;
use crate::models::server::{sort_for_display, ClassFilter, ServerClass, ServerConfig};
use crate::storage::{select_history, HistoryStore, ServerDirectory, StorageError};

/// Server list kept in a JSON array file, re-read on every call so admin
/// edits show up on the next refresh cycle.
pub struct JsonServerDirectory {
    path: PathBuf,
}

impl JsonServerDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ServerDirectory for JsonServerDirectory {
    fn list_servers(&self, filter: ClassFilter) -> Result<Vec<ServerConfig>, StorageError> {
        let raw = fs::read(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        let servers: Vec<ServerConfig> =
            serde_json::from_slice(&raw).map_err(|e| StorageError::json(&self.path, e))?;

        let mut servers: Vec<ServerConfig> = servers
            .into_iter()
            .filter(|s| filter.matches(s.class))
            .collect();
        sort_for_display(&mut servers);
        Ok(servers)
    }
}

/// History persisted as JSON lines. Points inside the retention window are
/// also held in memory to answer range queries.
pub struct JsonlHistoryStore {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    points: RwLock<Vec<HistoryPoint>>,
    retention: Duration,
}

impl JsonlHistoryStore {
    pub fn open(path: impl Into<PathBuf>, retention: Duration) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let cutoff = Utc::now() - retention;
        let points = load_points(&path, cutoff)?;
        info!("Loaded {} history points from {}", points.len(), path.display());

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            points: RwLock::new(points),
            retention,
        })
    }
}

fn load_points(path: &Path, cutoff: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let mut points = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| StorageError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryPoint>(&line) {
            Ok(point) if point.recorded_at >= cutoff => points.push(point),
            Ok(_) => {}
            Err(e) => warn!("Skipping bad history line {} in {}: {}", n + 1, path.display(), e),
        }
    }
    Ok(points)
}

impl HistoryStore for JsonlHistoryStore {
    fn append(&self, point: HistoryPoint) -> Result<(), StorageError> {
        {
            let mut writer = self.writer.lock();
            serde_json::to_writer(&mut *writer, &point)
                .map_err(|e| StorageError::json(&self.path, e))?;
            writer
                .write_all(b"\n")
                .and_then(|_| writer.flush())
                .map_err(|e| StorageError::io(&self.path, e))?;
        }

        let cutoff = point.recorded_at - self.retention;
        let mut points = self.points.write();
        points.retain(|p| p.recorded_at >= cutoff);
        points.push(point);
        Ok(())
    }

    fn since(
        &self,
        class: Option<ServerClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError> {
        Ok(select_history(&self.points.read(), class, since))
    }
}
