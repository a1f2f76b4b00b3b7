// src/replay.rs
//
// Observation source backed by recorded JSONL files: one frame per line.

use crate::observation::ObservationFrame;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct ReplayProcessor {
    config: Config,
}

impl ReplayProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn find_recordings(&self) -> Result<Vec<PathBuf>> {
        let mut recordings = Vec::new();

        for entry in WalkDir::new(&self.config.source.input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_jsonl = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("jsonl"))
                .unwrap_or(false);
            if is_jsonl && entry.file_type().is_file() {
                recordings.push(path.to_path_buf());
            }
        }

        recordings.sort();
        info!("Found {} recording(s)", recordings.len());
        Ok(recordings)
    }

    pub fn open(&self, path: &Path) -> Result<ReplayReader<BufReader<File>>> {
        info!("Opening recording: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(ReplayReader::new(BufReader::new(file), path.display().to_string()))
    }
}

/// Line-oriented frame reader. `Ok(None)` is end of stream; a malformed
/// record is returned as an error and the caller stops the stream.
pub struct ReplayReader<R: BufRead> {
    lines: Lines<R>,
    source_name: String,
    line_no: usize,
    pub frames_read: u64,
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R, source_name: String) -> Self {
        Self {
            lines: reader.lines(),
            source_name,
            line_no: 0,
            frames_read: 0,
        }
    }

    pub fn read_frame(&mut self) -> Result<Option<ObservationFrame>> {
        loop {
            let Some(line) = self.lines.next() else {
                debug!("{}: end of stream after {} frames", self.source_name, self.frames_read);
                return Ok(None);
            };
            self.line_no += 1;
            let line = line.with_context(|| {
                format!("{}: read failure at line {}", self.source_name, self.line_no)
            })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let frame: ObservationFrame = serde_json::from_str(trimmed).with_context(|| {
                format!("{}: malformed frame at line {}", self.source_name, self.line_no)
            })?;
            self.frames_read += 1;
            return Ok(Some(frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> ReplayReader<Cursor<Vec<u8>>> {
        ReplayReader::new(Cursor::new(text.as_bytes().to_vec()), "test".to_string())
    }

    #[test]
    fn test_reads_frames_and_skips_blank_lines() {
        let mut r = reader(
            "{\"frame_id\":0,\"observations\":[]}\n\n{\"frame_id\":1,\"observations\":[{\"bbox\":[0,0,4,4]}]}\n",
        );
        assert_eq!(r.read_frame().unwrap().unwrap().frame_id, 0);
        let f = r.read_frame().unwrap().unwrap();
        assert_eq!(f.frame_id, 1);
        assert_eq!(f.observations.len(), 1);
        assert!(r.read_frame().unwrap().is_none());
        assert_eq!(r.frames_read, 2);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let mut r = reader("{\"frame_id\":0}\nnot json\n");
        assert!(r.read_frame().unwrap().is_some());
        assert!(r.read_frame().is_err());
    }

    #[test]
    fn test_find_recordings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cam_a")).unwrap();
        std::fs::write(dir.path().join("cam_a").join("day1.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("day2.JSONL"), "").unwrap();

        let config: Config = serde_yaml::from_str(&format!(
            "source:\n  input_dir: {:?}\n  frame_width: 10\n  frame_height: 10\n",
            dir.path().display().to_string()
        ))
        .unwrap();
        let found = ReplayProcessor::new(config).find_recordings().unwrap();
        assert_eq!(found.len(), 2);
    }
}
