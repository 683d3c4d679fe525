use crate::core::events::{LogEntry, SessionEvent, SessionOutcome, SessionSummary};
use crate::core::hook::ProgressHook;
use crate::core::model::*;
use crate::plugins::registry::{DownloadOutcome, EngineOptions, MediaEngine, PluginRegistry};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub site: SiteHint,
    pub engine: EngineOptions,
}

/// Drives one session: setup, resolution, then items strictly one at a time.
pub struct Orchestrator {
    id: SessionId,
    registry: Arc<PluginRegistry>,
    options: SessionOptions,
    event_tx: UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
    state: SessionState,
}

impl Orchestrator {
    pub fn new(
        id: SessionId,
        registry: Arc<PluginRegistry>,
        options: SessionOptions,
        event_tx: UnboundedSender<SessionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self { id, registry, options, event_tx, cancel, state: SessionState::default() }
    }

    pub async fn run(self, url: String) -> SessionState {
        let span = tracing::info_span!("session", id = %self.id);
        self.run_inner(url).instrument(span).await
    }

    async fn run_inner(mut self, url: String) -> SessionState {
        self.set_status(SessionStatus::Analyzing);

        let (engine, items) = match self.prepare(&url).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "session failed before downloading");
                self.emit(SessionEvent::Log(LogEntry::Fatal { message: format!("{:#}", e) }));
                self.set_status(SessionStatus::Failed);
                self.emit(SessionEvent::Done(SessionSummary {
                    outcome: SessionOutcome::Failed,
                    completed: 0,
                    total: self.state.total,
                }));
                return self.state;
            }
        };

        let total = items.total();
        self.state.total = total;
        self.emit(SessionEvent::Meta { total });
        tracing::info!(total, engine = engine.name(), "resolved");

        if !items.is_empty() {
            self.set_status(SessionStatus::Downloading);
            self.download_all(engine.as_ref(), items).await;
        }

        let outcome = if self.state.cancel_requested { SessionOutcome::Cancelled } else { SessionOutcome::Completed };
        self.set_status(SessionStatus::Done);
        self.emit(SessionEvent::Done(SessionSummary { outcome, completed: self.state.completed, total }));
        tracing::info!(completed = self.state.completed, total, ?outcome, "session finished");
        self.state
    }

    async fn prepare(&mut self, url: &str) -> anyhow::Result<(Arc<dyn MediaEngine>, ItemList)> {
        let opts = &mut self.options.engine;
        tokio::fs::create_dir_all(&opts.out_dir)
            .await
            .with_context(|| format!("create out_dir {}", opts.out_dir.display()))?;
        opts.out_dir = tokio::fs::canonicalize(&opts.out_dir)
            .await
            .with_context(|| format!("resolve out_dir {}", opts.out_dir.display()))?;

        if let Some(path) = opts.cookies_file.clone() {
            if opts.usable_cookies().is_none() {
                opts.cookies_file = None;
                self.emit(SessionEvent::Log(LogEntry::CookiesMissing { path }));
            }
        }

        let engine = self
            .registry
            .engine_for(url)
            .ok_or_else(|| anyhow::anyhow!("no engine can handle URL: {}", url))?;
        let drafts = engine
            .resolve(url, &self.options.engine)
            .await
            .with_context(|| format!("resolve({}) {}", engine.name(), url))?;
        Ok((engine, ItemList::from_drafts(drafts, url)))
    }

    async fn download_all(&mut self, engine: &dyn MediaEngine, items: ItemList) {
        let total = items.total();
        for item in items {
            if self.cancel.is_cancelled() {
                self.state.cancel_requested = true;
                break;
            }

            self.emit(SessionEvent::Log(LogEntry::ItemStarted {
                index: item.index,
                total,
                title: item.title.clone(),
            }));

            let hook = ProgressHook::new(item.index, total, item.title.clone(), self.event_tx.clone(), self.cancel.clone());
            let result = engine
                .download(&item, &self.options.engine, &hook)
                .instrument(tracing::debug_span!("item", index = item.index))
                .await;

            match result {
                Ok(DownloadOutcome::Completed) => {
                    self.state.completed += 1;
                    self.emit(SessionEvent::Tally {
                        completed: self.state.completed,
                        total,
                        remaining: total - item.index,
                    });
                }
                Ok(DownloadOutcome::Cancelled) => {
                    tracing::info!(index = item.index, "item interrupted by cancellation");
                    self.state.status = SessionStatus::Cancelling;
                    self.state.cancel_requested = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(index = item.index, error = %format!("{:#}", e), "item failed, continuing");
                    self.emit(SessionEvent::Log(LogEntry::ItemFailed {
                        index: item.index,
                        title: item.title,
                        message: format!("{:#}", e),
                    }));
                }
            }
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.state.status = status;
        self.emit(SessionEvent::Status(status));
    }

    fn emit(&self, evt: SessionEvent) {
        let _ = self.event_tx.send(evt);
    }
}
