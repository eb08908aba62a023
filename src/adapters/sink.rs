use crate::domain::model::FieldRecord;
use crate::domain::ports::FieldSink;
use crate::utils::error::{CouplerError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Keeps every record in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<FieldRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Result<Vec<FieldRecord>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| CouplerError::lifecycle("memory sink lock poisoned"))
    }
}

impl FieldSink for MemorySink {
    fn write(&mut self, record: FieldRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| CouplerError::lifecycle("memory sink lock poisoned"))?
            .push(record);
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FieldSink for NullSink {
    fn write(&mut self, _record: FieldRecord) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow {
    step: u64,
    date: String,
    tile: usize,
    i: usize,
    j: usize,
    k: usize,
    value: f64,
}

/// Writes one `<context>_<field>.csv` file per field under a directory.
pub struct CsvSink {
    base_path: PathBuf,
    writers: HashMap<String, csv::Writer<File>>,
}

impl CsvSink {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            writers: HashMap::new(),
        })
    }

    pub fn file_path(&self, context_id: &str, field_id: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", context_id, field_id))
    }

    fn writer(&mut self, context_id: &str, field_id: &str) -> Result<&mut csv::Writer<File>> {
        let key = format!("{}/{}", context_id, field_id);
        if !self.writers.contains_key(&key) {
            let path = self.file_path(context_id, field_id);
            tracing::debug!("Opening field output {}", path.display());
            self.writers.insert(key.clone(), csv::Writer::from_path(path)?);
        }
        self.writers
            .get_mut(&key)
            .ok_or_else(|| CouplerError::lifecycle(format!("no writer for {}", key)))
    }
}

impl FieldSink for CsvSink {
    fn write(&mut self, record: FieldRecord) -> Result<()> {
        let [ni, nj, _] = record.block.shape;
        if ni == 0 || nj == 0 {
            tracing::debug!(
                context = %record.context_id,
                field = %record.field_id,
                step = record.step,
                "skipping empty field block"
            );
            return Ok(());
        }
        let date = record.date.to_string();
        let writer = self.writer(&record.context_id, &record.field_id)?;
        for (idx, value) in record.block.values.iter().enumerate() {
            writer.serialize(CsvRow {
                step: record.step,
                date: date.clone(),
                tile: record.tile_id,
                i: idx % ni,
                j: idx / ni % nj,
                k: idx / (ni * nj),
                value: *value,
            })?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
