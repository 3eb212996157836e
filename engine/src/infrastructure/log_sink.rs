//! Per-unit log sinks
//!
//! Child stdout and stderr are appended to per-stream files plus an
//! optional combined file. All writes go through one mutex so interleaved
//! lines from the two streams never tear. Files are opened append-only:
//! a restart continues after the previous incarnation's output.

use crate::domain::LogConfig;
use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Timestamp tokens ("YYYY-MM-DD HH:mm:ss" style) mapped onto strftime
/// specifiers. Replacement order keeps month (MM) and minute (mm) apart.
static DATE_TOKENS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("YYYY", "%Y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("SSS", "%3f"),
    ]
});

fn translate_date_format(format: &str) -> String {
    DATE_TOKENS
        .iter()
        .fold(format.to_string(), |acc, (token, spec)| {
            acc.replace(token, spec)
        })
}

/// Which child stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

struct SinkFiles {
    out: Option<File>,
    err: Option<File>,
    combined: Option<File>,
}

/// Append-only log sink for one unit
pub struct UnitLogSink {
    files: Mutex<SinkFiles>,
    date_format: Option<String>,
    capture_stdout: bool,
    capture_stderr: bool,
}

impl UnitLogSink {
    /// Open the sinks declared by a log configuration.
    /// Returns None when no sink is configured at all.
    pub fn open(config: &LogConfig) -> io::Result<Option<Arc<UnitLogSink>>> {
        if !config.is_configured() {
            return Ok(None);
        }

        let out = config.out_file.as_deref().map(open_append).transpose()?;
        let err = config.error_file.as_deref().map(open_append).transpose()?;
        let combined = config.log_file.as_deref().map(open_append).transpose()?;

        Ok(Some(Arc::new(UnitLogSink {
            capture_stdout: out.is_some() || combined.is_some(),
            capture_stderr: err.is_some() || combined.is_some(),
            files: Mutex::new(SinkFiles { out, err, combined }),
            date_format: config.date_format.as_deref().map(translate_date_format),
        })))
    }

    pub fn captures_stdout(&self) -> bool {
        self.capture_stdout
    }

    pub fn captures_stderr(&self) -> bool {
        self.capture_stderr
    }

    /// Append one line to the stream's own sink and to the combined sink
    pub fn write_line(&self, stream: LogStream, line: &str) {
        let rendered = match &self.date_format {
            Some(format) => format!("{}: {}\n", Local::now().format(format), line),
            None => format!("{}\n", line),
        };

        let mut files = self.files.lock().unwrap();
        match stream {
            LogStream::Stdout => {
                if let Some(file) = files.out.as_mut() {
                    append(file, rendered.as_bytes());
                }
            }
            LogStream::Stderr => {
                if let Some(file) = files.err.as_mut() {
                    append(file, rendered.as_bytes());
                }
            }
        }
        if let Some(file) = files.combined.as_mut() {
            append(file, rendered.as_bytes());
        }
    }
}

fn open_append(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn append(file: &mut File, bytes: &[u8]) {
    if let Err(e) = file.write_all(bytes) {
        warn!(error = %e, "Failed to append to log sink");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_date_format() {
        assert_eq!(
            translate_date_format("YYYY-MM-DD HH:mm:ss"),
            "%Y-%m-%d %H:%M:%S"
        );
        assert_eq!(
            translate_date_format("YYYY-MM-DD HH:mm:ss.SSS"),
            "%Y-%m-%d %H:%M:%S.%3f"
        );
        assert_eq!(translate_date_format("HH:mm"), "%H:%M");
    }

    #[test]
    fn test_unconfigured_sink_is_none() {
        let sink = UnitLogSink::open(&LogConfig::default()).unwrap();
        assert!(sink.is_none());
    }

    #[test]
    fn test_streams_route_to_their_files_and_combined() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
            error_file: Some(dir.path().join("err.log").to_str().unwrap().to_string()),
            log_file: Some(dir.path().join("all.log").to_str().unwrap().to_string()),
            date_format: None,
        };
        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        assert!(sink.captures_stdout());
        assert!(sink.captures_stderr());

        sink.write_line(LogStream::Stdout, "hello");
        sink.write_line(LogStream::Stderr, "oops");

        let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
        let err = std::fs::read_to_string(dir.path().join("err.log")).unwrap();
        let all = std::fs::read_to_string(dir.path().join("all.log")).unwrap();
        assert_eq!(out, "hello\n");
        assert_eq!(err, "oops\n");
        assert_eq!(all, "hello\noops\n");
    }

    #[test]
    fn test_combined_only_captures_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            out_file: None,
            error_file: None,
            log_file: Some(dir.path().join("all.log").to_str().unwrap().to_string()),
            date_format: None,
        };
        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        assert!(sink.captures_stdout());
        assert!(sink.captures_stderr());
    }

    #[test]
    fn test_reopen_appends_instead_of_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
            error_file: None,
            log_file: None,
            date_format: None,
        };

        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        sink.write_line(LogStream::Stdout, "first run");
        drop(sink);

        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        sink.write_line(LogStream::Stdout, "second run");

        let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
        assert_eq!(out, "first run\nsecond run\n");
    }

    #[test]
    fn test_timestamp_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            out_file: Some(dir.path().join("out.log").to_str().unwrap().to_string()),
            error_file: None,
            log_file: None,
            date_format: Some("YYYY".to_string()),
        };
        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        sink.write_line(LogStream::Stdout, "stamped");

        let out = std::fs::read_to_string(dir.path().join("out.log")).unwrap();
        // "2026: stamped\n" style prefix
        assert!(out.starts_with("20"), "unexpected content: {}", out);
        assert!(out.ends_with(": stamped\n"));
    }

    #[test]
    fn test_missing_log_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("deep");
        let config = LogConfig {
            out_file: Some(nested.join("out.log").to_str().unwrap().to_string()),
            error_file: None,
            log_file: None,
            date_format: None,
        };
        let sink = UnitLogSink::open(&config).unwrap().unwrap();
        sink.write_line(LogStream::Stdout, "created");
        assert!(nested.join("out.log").exists());
    }
}
