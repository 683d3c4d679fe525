//! Consumer side of the event stream.

use crate::core::events::{LogEntry, SessionEvent, SessionOutcome, SessionSummary};
use crate::core::model::SessionStatus;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// Latest value of every displayed quantity.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub status: SessionStatus,
    pub title: Option<String>,
    pub file_fraction: f64,
    pub overall_fraction: f64,
    pub speed_bps: Option<f64>,
    pub eta_secs: Option<f64>,
    pub remaining: usize,
    pub completed: usize,
    pub total: usize,
    pub log: Vec<LogEntry>,
    pub summary: Option<SessionSummary>,
}

impl SessionView {
    pub fn apply(&mut self, evt: SessionEvent) {
        match evt {
            // a late cancel must not reopen a finished session
            SessionEvent::Status(_) if self.summary.is_some() => {}
            SessionEvent::Status(status) => self.status = status,
            SessionEvent::Log(entry) => self.log.push(entry),
            SessionEvent::Meta { total } => {
                self.total = total;
                self.remaining = total;
                self.overall_fraction = 0.0;
            }
            SessionEvent::Tally { completed, total, remaining } => {
                self.completed = completed;
                self.total = total;
                self.remaining = remaining;
            }
            SessionEvent::Progress(p) => {
                self.title = Some(p.title);
                self.file_fraction = p.file_fraction;
                self.overall_fraction = p.overall_fraction;
                self.speed_bps = p.speed_bps;
                self.eta_secs = p.eta_secs;
                self.remaining = p.remaining;
            }
            SessionEvent::Done(summary) => {
                self.status = match summary.outcome {
                    SessionOutcome::Failed => SessionStatus::Failed,
                    _ => SessionStatus::Done,
                };
                self.completed = summary.completed;
                self.total = summary.total;
                self.summary = Some(summary);
            }
        }
    }
}

/// Whatever the view is reflected into.
pub trait Presenter {
    fn log(&mut self, entry: &LogEntry);
    fn render(&mut self, view: &SessionView);
    fn finish(&mut self, _view: &SessionView) {}
}

pub struct Observer<P> {
    rx: UnboundedReceiver<SessionEvent>,
    view: SessionView,
    presenter: P,
    closed: bool,
}

impl<P: Presenter> Observer<P> {
    pub fn new(rx: UnboundedReceiver<SessionEvent>, presenter: P) -> Self {
        Self { rx, view: SessionView::default(), presenter, closed: false }
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    /// Applies everything queued and renders once if anything arrived.
    /// Returns the number of events drained; zero is a normal empty poll.
    pub fn poll(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(evt) => {
                    if let SessionEvent::Log(entry) = &evt {
                        self.presenter.log(entry);
                    }
                    self.view.apply(evt);
                    drained += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        if drained > 0 {
            self.presenter.render(&self.view);
        }
        drained
    }

    pub fn is_finished(&self) -> bool {
        self.view.summary.is_some() || self.closed
    }

    /// Polls every `every` until the session reports its summary or all senders are gone.
    pub async fn run(mut self, every: Duration) -> (SessionView, P) {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            self.poll();
            if self.is_finished() {
                break;
            }
        }
        self.presenter.finish(&self.view);
        (self.view, self.presenter)
    }
}
