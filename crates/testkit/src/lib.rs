#![warn(missing_docs)]
//! Deterministic testing surfaces: an in-process XR host, a recording
//! renderer, a callback log, and a JSONL trace sink.

mod calls;
mod host;
mod renderer;

use anyhow::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use calls::*;
pub use host::*;
pub use renderer::*;

/// One interaction callback captured by headless runs.
#[derive(Debug, Serialize)]
pub struct InteractionRecord<'a> {
    /// Frame tick when the callback fired.
    pub frame: u64,
    /// Callback name (`hover_start`, `drag`, ...).
    pub kind: &'a str,
    /// Node name.
    pub node: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append a record to the log.
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}
