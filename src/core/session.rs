//! Starting and cancelling a download session.

use crate::core::events::{LogEntry, SessionEvent};
use crate::core::model::{SessionId, SessionState, SessionStatus};
use crate::core::orchestrator::{Orchestrator, SessionOptions};
use crate::plugins::registry::PluginRegistry;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("no URL given")]
    EmptyUrl,
}

/// Strips whitespace and surrounding quotes; `None` when nothing is left.
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = raw.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
    (!url.is_empty()).then(|| url.to_string())
}

/// Control side of a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionControl {
    cancel: CancellationToken,
    /// Set once the orchestrator has returned.
    finished: CancellationToken,
    event_tx: UnboundedSender<SessionEvent>,
}

impl SessionControl {
    /// Requests cooperative cancellation. Only the first call on a running
    /// session has any effect.
    pub fn cancel(&self) {
        if self.cancel.is_cancelled() || self.finished.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        let _ = self.event_tx.send(SessionEvent::Log(LogEntry::CancelRequested));
        let _ = self.event_tx.send(SessionEvent::Status(SessionStatus::Cancelling));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct SessionHandle {
    id: SessionId,
    events: UnboundedReceiver<SessionEvent>,
    control: SessionControl,
    task: JoinHandle<SessionState>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    pub async fn wait(self) -> anyhow::Result<SessionState> {
        Ok(self.task.await?)
    }

    pub fn split(self) -> (UnboundedReceiver<SessionEvent>, SessionControl, JoinHandle<SessionState>) {
        (self.events, self.control, self.task)
    }
}

/// Validates the URL and spawns the orchestrator. Empty input is rejected
/// before anything is spawned. Must be called inside a tokio runtime.
pub fn start(
    registry: Arc<PluginRegistry>,
    options: SessionOptions,
    raw_url: &str,
) -> Result<SessionHandle, SessionError> {
    let url = normalize_url(raw_url).ok_or(SessionError::EmptyUrl)?;

    let id = Uuid::new_v4();
    let (event_tx, events) = unbounded_channel();
    let cancel = CancellationToken::new();

    let _ = event_tx.send(SessionEvent::Log(LogEntry::SiteSelected { site: options.site }));
    tracing::info!(%id, site = %options.site, %url, "starting session");

    let orchestrator = Orchestrator::new(id, registry, options, event_tx.clone(), cancel.clone());
    let finished = CancellationToken::new();
    let task = tokio::spawn({
        let finished = finished.clone();
        async move {
            let state = orchestrator.run(url).await;
            finished.cancel();
            state
        }
    });

    Ok(SessionHandle { id, events, control: SessionControl { cancel, finished, event_tx }, task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{LogLevel, SessionOutcome, SessionSummary};
    use crate::core::test_support::{downloading, drain, finished, item_drafts, ScriptedEngine, Step};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn options(dir: &tempfile::TempDir) -> SessionOptions {
        let mut opts = SessionOptions::default();
        opts.engine.out_dir = dir.path().to_path_buf();
        opts.engine.cookies_file = None;
        opts
    }

    fn registry(engine: &Arc<ScriptedEngine>) -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::empty().with_engine(engine.clone()))
    }

    fn overall_fractions(events: &[SessionEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Progress(p) => Some(p.overall_fraction),
                _ => None,
            })
            .collect()
    }

    fn statuses(events: &[SessionEvent]) -> Vec<SessionStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Status(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn started_items(events: &[SessionEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Log(LogEntry::ItemStarted { index, .. }) => Some(*index),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn normalize_strips_quotes_and_whitespace() {
        assert_eq!(normalize_url("  \"https://x/y\" ").as_deref(), Some("https://x/y"));
        assert_eq!(normalize_url("'https://x/y'").as_deref(), Some("https://x/y"));
        assert_eq!(normalize_url(""), None);
        assert_eq!(normalize_url("   "), None);
        assert_eq!(normalize_url(" \"' '\" "), None);
    }

    #[tokio::test]
    async fn empty_url_is_rejected_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(item_drafts(1)));
        for raw in ["", "   ", "\"\"", "' '"] {
            let err = start(registry(&engine), options(&dir), raw).err();
            assert_eq!(err, Some(SessionError::EmptyUrl));
        }
        assert!(engine.attempted().is_empty());
        assert!(engine.seen_cookies().is_empty(), "resolve must not run");
    }

    #[tokio::test]
    async fn three_items_with_one_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            ScriptedEngine::new(item_drafts(3))
                .script(1, vec![downloading(10.0, 100.0), downloading(90.0, 100.0), finished()])
                .script(2, vec![downloading(30.0, 100.0), Step::Fail("network reset")])
                .script(3, vec![downloading(40.0, 100.0), finished()]),
        );
        let handle = start(registry(&engine), options(&dir), "https://example.com/course").unwrap();
        let (mut rx, _control, task) = handle.split();
        let state = task.await.unwrap();
        let events = drain(&mut rx);

        assert_eq!(state.status, SessionStatus::Done);
        assert_eq!(state.completed, 2);
        assert_eq!(state.total, 3);
        assert!(!state.cancel_requested);

        let errors: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Log(l) if l.level() == LogLevel::Error))
            .collect();
        assert_eq!(errors.len(), 1);

        let fractions = overall_fractions(&events);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{fractions:?}");
        assert_eq!(fractions.last().copied(), Some(1.0));

        assert_eq!(
            events.last(),
            Some(&SessionEvent::Done(SessionSummary { outcome: SessionOutcome::Completed, completed: 2, total: 3 }))
        );
    }

    #[tokio::test]
    async fn finished_item_reaches_exact_fraction() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(item_drafts(3)));
        let (mut rx, _, task) = start(registry(&engine), options(&dir), "https://example.com/course").unwrap().split();
        task.await.unwrap();
        let events = drain(&mut rx);

        let finals: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Progress(p) if p.file_fraction == 1.0 => Some((p.item_index, p.overall_fraction)),
                _ => None,
            })
            .collect();
        assert_eq!(finals, vec![(1, 1.0 / 3.0), (2, 2.0 / 3.0), (3, 1.0)]);
    }

    #[tokio::test]
    async fn progress_precedes_next_item_start() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(item_drafts(3)));
        let (mut rx, _, task) = start(registry(&engine), options(&dir), "https://example.com/course").unwrap().split();
        task.await.unwrap();

        let mut current = 0;
        for evt in drain(&mut rx) {
            match evt {
                SessionEvent::Log(LogEntry::ItemStarted { index, .. }) => current = index,
                SessionEvent::Progress(p) => assert_eq!(p.item_index, current),
                _ => {}
            }
        }
        assert_eq!(current, 3);
    }

    #[tokio::test]
    async fn empty_course_goes_straight_to_done() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let (mut rx, _, task) = start(registry(&engine), options(&dir), "https://example.com/empty").unwrap().split();
        let state = task.await.unwrap();
        let events = drain(&mut rx);

        assert_eq!(state.status, SessionStatus::Done);
        assert_eq!(state.completed, 0);
        assert_eq!(statuses(&events), vec![SessionStatus::Analyzing, SessionStatus::Done]);
        assert!(events.contains(&SessionEvent::Meta { total: 0 }));
        assert!(started_items(&events).is_empty());
        assert!(overall_fractions(&events).is_empty());
    }

    #[tokio::test]
    async fn wait_returns_final_state() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(item_drafts(2)));
        let state = start(registry(&engine), options(&dir), "'https://example.com/course'")
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(
            state,
            SessionState { status: SessionStatus::Done, completed: 2, total: 2, cancel_requested: false }
        );
    }

    #[tokio::test]
    async fn cancel_after_done_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::new(item_drafts(1)));
        let (mut rx, control, task) = start(registry(&engine), options(&dir), "https://example.com/course").unwrap().split();
        task.await.unwrap();
        control.cancel();

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(SessionEvent::Done(_))));
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Status(SessionStatus::Cancelling))));
        assert!(!control.is_cancelled());
    }

    #[tokio::test]
    async fn resolution_failure_ends_failed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::failing("login required"));
        let (mut rx, _, task) = start(registry(&engine), options(&dir), "https://example.com/private").unwrap().split();
        let state = task.await.unwrap();
        let events = drain(&mut rx);

        assert_eq!(state.status, SessionStatus::Failed);
        assert!(engine.attempted().is_empty());
        let fatal: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Log(LogEntry::Fatal { message }) => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(fatal.len(), 1);
        assert!(fatal[0].contains("login required"), "{}", fatal[0]);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Done(SessionSummary { outcome: SessionOutcome::Failed, .. }))
        ));
    }

    #[tokio::test]
    async fn cancel_during_second_of_five() {
        let dir = tempfile::tempdir().unwrap();
        let reached = Arc::new(Notify::new());
        let resume = Arc::new(Notify::new());
        let engine = Arc::new(ScriptedEngine::new(item_drafts(5)).script(
            2,
            vec![
                downloading(20.0, 100.0),
                Step::Pause { reached: reached.clone(), resume: resume.clone() },
                downloading(60.0, 100.0),
                finished(),
            ],
        ));
        let handle = start(registry(&engine), options(&dir), "https://example.com/course").unwrap();

        tokio::time::timeout(Duration::from_secs(5), reached.notified()).await.unwrap();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.control().is_cancelled());
        resume.notify_one();

        let (mut rx, _, task) = handle.split();
        let state = task.await.unwrap();
        let events = drain(&mut rx);

        assert!(state.cancel_requested);
        assert_eq!(state.completed, 1);
        assert_eq!(engine.attempted(), vec![1, 2]);
        assert_eq!(started_items(&events), vec![1, 2]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, SessionEvent::Log(LogEntry::CancelRequested))).count(),
            1
        );
        assert!(statuses(&events).contains(&SessionStatus::Cancelling));
        // nothing from item 2 after the cancel landed
        assert!(overall_fractions(&events).iter().all(|f| *f < 0.25));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Done(SessionSummary { outcome: SessionOutcome::Cancelled, completed: 1, total: 5 }))
        );
    }
}
