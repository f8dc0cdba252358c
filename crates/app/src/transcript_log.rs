use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append-only transcript log, one per backend. Every entry is written as
/// a leading newline followed by the joined text, so the file reads as one
/// transcript per line.
pub struct TranscriptLog {
    file: File,
}

impl TranscriptLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn append(&mut self, text: &str) -> io::Result<()> {
        self.file.write_all(b"\n")?;
        self.file.write_all(text.as_bytes())?;
        self.file.flush()
    }
}
