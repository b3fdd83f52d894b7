//! Local CSV sink. Rows go straight to disk as they arrive; nothing is collected in memory.

use crate::error::{EtlError, EtlResult};
use crate::record::{CanonicalPost, POST_FIELDS};
use crate::util::create_with_backoff;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvSink {
    path: PathBuf,
    w: csv::Writer<File>,
    rows: u64,
}

impl CsvSink {
    /// Create `path` (truncating) and write the header row.
    pub fn open(path: &Path) -> EtlResult<Self> {
        let f = create_with_backoff(path, 16, 50).map_err(|e| EtlError::local_write(path, e))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(f);
        w.write_record(POST_FIELDS).map_err(|e| EtlError::local_write(path, csv_io(e)))?;
        w.flush().map_err(|e| EtlError::local_write(path, e))?;
        Ok(Self { path: path.to_path_buf(), w, rows: 0 })
    }

    /// Append one row and push it to the OS.
    pub fn write_row(&mut self, post: &CanonicalPost) -> EtlResult<()> {
        self.w
            .serialize(post)
            .map_err(|e| EtlError::local_write(&self.path, csv_io(e)))?;
        self.w.flush().map_err(|e| EtlError::local_write(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, close the file and return the number of data rows written.
    pub fn finish(mut self) -> EtlResult<u64> {
        self.w.flush().map_err(|e| EtlError::local_write(&self.path, e))?;
        Ok(self.rows)
    }
}

fn csv_io(e: csv::Error) -> io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", other)),
    }
}
