use crate::core::model::{SessionStatus, SiteHint};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(SessionStatus),
    Log(LogEntry),
    /// Emitted once, right after resolution.
    Meta { total: usize },
    /// Running completion counter, sent after every finished item.
    Tally { completed: usize, total: usize, remaining: usize },
    Progress(ProgressEvent),
    Done(SessionSummary),
}

/// Normalized progress for the item currently downloading.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub item_index: usize,
    pub title: String,
    pub file_fraction: f64,
    pub overall_fraction: f64,
    pub speed_bps: Option<f64>,
    pub eta_secs: Option<f64>,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    SiteSelected { site: SiteHint },
    CookiesMissing { path: PathBuf },
    ItemStarted { index: usize, total: usize, title: String },
    ItemFailed { index: usize, title: String, message: String },
    CancelRequested,
    Fatal { message: String },
}

impl LogEntry {
    pub fn level(&self) -> LogLevel {
        match self {
            LogEntry::SiteSelected { .. } | LogEntry::ItemStarted { .. } | LogEntry::CancelRequested => LogLevel::Info,
            LogEntry::CookiesMissing { .. } => LogLevel::Warn,
            LogEntry::ItemFailed { .. } | LogEntry::Fatal { .. } => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub completed: usize,
    pub total: usize,
}
