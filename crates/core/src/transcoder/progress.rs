//! Parsing of ffmpeg's stderr progress stream.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::VecDeque;

use crate::progress::StageProgress;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid duration regex")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid time regex")
});

static FPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"fps=\s*(\d+(?:\.\d+)?)").expect("valid fps regex"));

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"size=\s*(\d+)\s*(?:kB|KiB)").expect("valid size regex"));

/// Turns ffmpeg stderr lines into de-duplicated progress reports.
#[derive(Debug)]
pub struct ProgressParser {
    label: String,
    duration_secs: Option<f64>,
    last_message: Option<String>,
}

impl ProgressParser {
    /// Creates a parser whose messages are tagged with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            duration_secs: None,
            last_message: None,
        }
    }

    /// Total media duration, once seen.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Whether the line is a periodic stats line rather than diagnostics.
    pub fn is_progress_line(line: &str) -> bool {
        TIME_RE.is_match(line)
    }

    /// Feeds one line. Returns a report only when the line carries progress
    /// and its message differs from the previous one.
    pub fn feed(&mut self, line: &str) -> Option<StageProgress> {
        if self.duration_secs.is_none() {
            if let Some(caps) = DURATION_RE.captures(line) {
                self.duration_secs = timestamp_secs(&caps[1], &caps[2], &caps[3]);
                return None;
            }
        }

        let caps = TIME_RE.captures(line)?;
        let elapsed = timestamp_secs(&caps[1], &caps[2], &caps[3])?;

        let percentage = match self.duration_secs {
            Some(duration) if duration > 0.0 => (elapsed / duration * 100.0).min(100.0) as f32,
            _ => 0.0,
        };
        let fps = FPS_RE
            .captures(line)
            .and_then(|c| c[1].parse::<f32>().ok());
        let size_mb = SIZE_RE
            .captures(line)
            .and_then(|c| c[1].parse::<u64>().ok())
            .map(|kb| kb as f64 / 1024.0);

        let mut message = format!("Compressing [{}] {:.0}%", self.label, percentage);
        if let Some(fps) = fps {
            message.push_str(&format!(" at {:.0} fps", fps));
        }
        if let Some(mb) = size_mb {
            message.push_str(&format!(", {:.1} MB written", mb));
        }

        if self.last_message.as_deref() == Some(message.as_str()) {
            return None;
        }
        self.last_message = Some(message.clone());

        Some(StageProgress {
            percentage,
            size_current_mb: size_mb,
            size_total_mb: None,
            message: Some(message),
        })
    }
}

fn timestamp_secs(hours: &str, minutes: &str, seconds: &str) -> Option<f64> {
    let h: f64 = hours.parse().ok()?;
    let m: f64 = minutes.parse().ok()?;
    let s: f64 = seconds.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Bounded tail of non-progress stderr lines, kept for error reports.
#[derive(Debug)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    pub fn render(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}
