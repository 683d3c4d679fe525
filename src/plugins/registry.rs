use async_trait::async_trait;
use crate::core::hook::ProgressHook;
use crate::core::model::Item;
use clap::{ArgMatches, Command};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// What a resolver hands back for one entry of a course or playlist.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub id: Option<String>,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub meta: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed,
    /// The progress hook asked the engine to stop.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Finished,
    #[default]
    #[serde(other)]
    Other,
}

/// Engine-native progress report, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineProgress {
    pub status: ProgressStatus,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    pub fragment_index: Option<f64>,
    pub fragment_count: Option<f64>,
    pub speed: Option<f64>,
    pub eta: Option<f64>,
}

impl EngineProgress {
    pub fn finished() -> Self {
        Self { status: ProgressStatus::Finished, ..Default::default() }
    }

    /// Known total size, falling back to the estimate when the exact size is missing or zero.
    pub fn known_total(&self) -> Option<f64> {
        [self.total_bytes, self.total_bytes_estimate]
            .into_iter()
            .flatten()
            .find(|t| *t > 0.0)
    }
}

/// Settings every engine call receives.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub binary: PathBuf,
    pub out_dir: PathBuf,
    /// Relative to `out_dir`; must encode course/chapter/item.
    pub output_template: String,
    pub archive_file: PathBuf,
    pub write_subtitles: bool,
    pub subtitle_format: String,
    pub retries: u32,
    pub fragment_retries: u32,
    pub concurrent_fragments: u32,
    pub expand_playlist: bool,
    pub cookies_file: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            out_dir: PathBuf::from("./downloads"),
            output_template:
                "%(playlist_title)s/%(chapter_number)s - %(chapter)s/%(playlist_index)s - %(title)s.%(ext)s"
                    .to_string(),
            archive_file: PathBuf::from("download-archive.txt"),
            write_subtitles: true,
            subtitle_format: "srt/best".to_string(),
            retries: 100,
            fragment_retries: 100,
            concurrent_fragments: 4,
            expand_playlist: true,
            cookies_file: Some(PathBuf::from("cookies.txt")),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl EngineOptions {
    pub fn archive_path(&self) -> PathBuf {
        self.out_dir.join(&self.archive_file)
    }

    /// Cookie file to hand to the engine, only when it actually exists.
    pub fn usable_cookies(&self) -> Option<&PathBuf> {
        self.cookies_file.as_ref().filter(|p| p.is_file())
    }
}

/// The opaque download capability the orchestrator drives.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, url: &str) -> u8;

    /// Expands a URL into its entries without downloading anything.
    async fn resolve(&self, url: &str, opts: &EngineOptions) -> anyhow::Result<Vec<ItemDraft>>;

    /// Downloads one item. Every native progress report goes through `hook`;
    /// when the hook answers `Break` the engine stops and returns `Cancelled`.
    async fn download(&self, item: &Item, opts: &EngineOptions, hook: &ProgressHook) -> anyhow::Result<DownloadOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct DownloadCliConfig {
    pub engine: EngineOptions,
}

pub trait CliPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    fn augment_download_command(&self, cmd: Command) -> Command;
    fn apply_download_matches(&self, matches: &ArgMatches, cfg: &mut DownloadCliConfig) -> anyhow::Result<()>;
}

pub struct PluginRegistry {
    engines: Vec<Arc<dyn MediaEngine>>,
    cli_plugins: Vec<Box<dyn CliPlugin>>,
}

impl PluginRegistry {
    pub fn empty() -> Self {
        Self { engines: vec![], cli_plugins: vec![] }
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.engines.push(Arc::new(crate::plugins::ytdlp::engine::YtDlpEngine::new()));
        reg.cli_plugins.push(Box::new(crate::plugins::ytdlp::cli::YtDlpCliPlugin::new()));
        reg
    }

    pub fn with_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engines.push(engine);
        self
    }

    pub fn augment_download_command(&self, cmd: Command) -> Command {
        self.cli_plugins
            .iter()
            .fold(cmd, |c, p| p.augment_download_command(c))
    }

    pub fn apply_download_matches(&self, matches: &ArgMatches, cfg: &mut DownloadCliConfig) -> anyhow::Result<()> {
        for p in &self.cli_plugins {
            tracing::debug!(plugin = p.name(), "applying cli options");
            p.apply_download_matches(matches, cfg)?;
        }
        Ok(())
    }

    pub fn engine_for(&self, url: &str) -> Option<Arc<dyn MediaEngine>> {
        self.engines
            .iter()
            .map(|e| (e.can_handle(url), e))
            .max_by_key(|(c, _)| *c)
            .and_then(|(c, e)| if c == 0 { None } else { Some(e.clone()) })
    }
}
