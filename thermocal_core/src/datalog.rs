//! CSV-backed calibration log.

use std::fs::File;
use std::path::{Path, PathBuf};

use thermocal_traits::DataLog;

pub use thermocal_config::fit::RUN_HEADER as RECORD_HEADER;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

/// Writes `raw,temp` rows to a CSV file. Text fields are quoted, numbers are
/// not; temperatures carry four decimals. Every row is flushed so a power cut
/// loses at most the row being written.
#[derive(Debug)]
pub struct CsvDataLog {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvDataLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

impl DataLog for CsvDataLog {
    fn begin(&mut self, header: &[&str]) -> Result<(), BoxErr> {
        self.writer = None;
        let file = File::create(&self.path)?;
        let mut w = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::NonNumeric)
            .from_writer(file);
        w.write_record(header)?;
        w.flush()?;
        tracing::info!(path = %self.path.display(), "calibration log opened");
        self.writer = Some(w);
        Ok(())
    }

    fn append(&mut self, raw: i32, temp_f: f32) -> Result<(), BoxErr> {
        let w = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("calibration log is not open"))?;
        w.write_record([raw.to_string(), format!("{temp_f:.4}")])?;
        w.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxErr> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            tracing::info!(path = %self.path.display(), "calibration log closed");
        }
        Ok(())
    }
}
