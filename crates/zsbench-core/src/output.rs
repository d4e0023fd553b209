//! Output formatting for evaluation reports and per-example predictions.
//!
//! Reports and predictions are written as a single JSON document or as
//! JSON Lines (one object per line).

use serde::Serialize;
use std::io::{self, Write};

use crate::error::Result;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one line per item.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item followed by a newline.
    ///
    /// Serialization failures surface as [`ZsError::Json`](crate::ZsError::Json),
    /// write failures as [`ZsError::Io`](crate::ZsError::Io).
    pub fn write<T: Serialize + ?Sized>(&mut self, item: &T) -> Result<()> {
        let json = if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_string_pretty(item)?
        } else {
            serde_json::to_string(item)?
        };
        writeln!(self.writer, "{json}")?;
        self.items_written += 1;
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
