//! Per-item translation of engine progress into [`ProgressEvent`]s.

use crate::core::events::{ProgressEvent, SessionEvent};
use crate::plugins::registry::{EngineProgress, ProgressStatus};
use std::ops::ControlFlow;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Scoped to item `idx` of `total`. Engines call [`ProgressHook::on_progress`]
/// for every native report and stop when it answers `Break`.
pub struct ProgressHook {
    idx: usize,
    total: usize,
    title: String,
    tx: UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
}

impl ProgressHook {
    pub fn new(
        idx: usize,
        total: usize,
        title: impl Into<String>,
        tx: UnboundedSender<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self { idx, total, title: title.into(), tx, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested, for engines that sit idle between reports.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn on_progress(&self, p: &EngineProgress) -> ControlFlow<()> {
        if self.cancel.is_cancelled() {
            return ControlFlow::Break(());
        }
        if let Some(evt) = self.normalize(p) {
            // receiver gone means nobody is watching; the download still proceeds
            let _ = self.tx.send(SessionEvent::Progress(evt));
        }
        ControlFlow::Continue(())
    }

    fn normalize(&self, p: &EngineProgress) -> Option<ProgressEvent> {
        let remaining = self.total.saturating_sub(self.idx);
        match p.status {
            ProgressStatus::Downloading => {
                let file_fraction = file_fraction(p);
                let overall = if self.total > 0 {
                    (self.idx.saturating_sub(1) as f64 + file_fraction) / self.total as f64
                } else {
                    file_fraction
                };
                Some(ProgressEvent {
                    item_index: self.idx,
                    title: self.title.clone(),
                    file_fraction,
                    overall_fraction: overall.clamp(0.0, 1.0),
                    speed_bps: p.speed.filter(|s| *s > 0.0),
                    eta_secs: p.eta,
                    remaining,
                })
            }
            ProgressStatus::Finished => Some(ProgressEvent {
                item_index: self.idx,
                title: self.title.clone(),
                file_fraction: 1.0,
                overall_fraction: if self.total > 0 { self.idx as f64 / self.total as f64 } else { 1.0 },
                speed_bps: None,
                eta_secs: None,
                remaining,
            }),
            ProgressStatus::Other => None,
        }
    }
}

fn file_fraction(p: &EngineProgress) -> f64 {
    let downloaded = p.downloaded_bytes.unwrap_or(0.0);
    let frac = match p.known_total() {
        Some(total) => downloaded / total,
        None => match (p.fragment_index, p.fragment_count) {
            (Some(i), Some(c)) if c > 0.0 => i / c,
            _ => 0.0,
        },
    };
    if frac.is_nan() { 0.0 } else { frac.clamp(0.0, 1.0) }
}
