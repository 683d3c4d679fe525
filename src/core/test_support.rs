//! Scripted engine and helpers shared by the session tests.

use crate::core::events::SessionEvent;
use crate::core::hook::ProgressHook;
use crate::core::model::Item;
use crate::plugins::registry::{
    DownloadOutcome, EngineOptions, EngineProgress, ItemDraft, MediaEngine, ProgressStatus,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

pub enum Step {
    Progress(EngineProgress),
    Fail(&'static str),
    /// Signals `reached`, then waits for `resume`.
    Pause { reached: Arc<Notify>, resume: Arc<Notify> },
}

pub fn downloading(done: f64, total: f64) -> Step {
    Step::Progress(EngineProgress {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(done),
        total_bytes: Some(total),
        speed: Some(4096.0),
        eta: Some(3.0),
        ..Default::default()
    })
}

pub fn finished() -> Step {
    Step::Progress(EngineProgress::finished())
}

pub fn item_drafts(n: usize) -> Vec<ItemDraft> {
    (1..=n)
        .map(|i| ItemDraft {
            id: Some(format!("vid{i}")),
            title: Some(format!("Lesson {i}")),
            source_url: Some(format!("https://example.com/course/{i}")),
            meta: HashMap::new(),
        })
        .collect()
}

pub struct ScriptedEngine {
    drafts: Result<Vec<ItemDraft>, String>,
    scripts: Mutex<HashMap<usize, Vec<Step>>>,
    attempted: Mutex<Vec<usize>>,
    cookies: Mutex<Vec<Option<PathBuf>>>,
}

impl ScriptedEngine {
    pub fn new(drafts: Vec<ItemDraft>) -> Self {
        Self {
            drafts: Ok(drafts),
            scripts: Mutex::new(HashMap::new()),
            attempted: Mutex::new(vec![]),
            cookies: Mutex::new(vec![]),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self { drafts: Err(message.to_string()), ..Self::new(vec![]) }
    }

    /// Items without a script report half-way, then finish.
    pub fn script(self, index: usize, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().insert(index, steps);
        self
    }

    pub fn attempted(&self) -> Vec<usize> {
        self.attempted.lock().unwrap().clone()
    }

    pub fn seen_cookies(&self) -> Vec<Option<PathBuf>> {
        self.cookies.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn can_handle(&self, _url: &str) -> u8 {
        1
    }

    async fn resolve(&self, _url: &str, opts: &EngineOptions) -> anyhow::Result<Vec<ItemDraft>> {
        self.cookies.lock().unwrap().push(opts.cookies_file.clone());
        self.drafts.clone().map_err(anyhow::Error::msg)
    }

    async fn download(&self, item: &Item, _opts: &EngineOptions, hook: &ProgressHook) -> anyhow::Result<DownloadOutcome> {
        self.attempted.lock().unwrap().push(item.index);
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .remove(&item.index)
            .unwrap_or_else(|| vec![downloading(50.0, 100.0), finished()]);
        for step in steps {
            match step {
                Step::Progress(p) => {
                    if hook.on_progress(&p).is_break() {
                        return Ok(DownloadOutcome::Cancelled);
                    }
                }
                Step::Fail(msg) => anyhow::bail!(msg),
                Step::Pause { reached, resume } => {
                    reached.notify_one();
                    resume.notified().await;
                }
            }
        }
        Ok(DownloadOutcome::Completed)
    }
}

/// Everything currently queued, without waiting.
pub fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = vec![];
    while let Ok(evt) = rx.try_recv() {
        out.push(evt);
    }
    out
}
