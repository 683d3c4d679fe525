use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use url::Url;

use crate::core::hook::ProgressHook;
use crate::core::model::Item;
use crate::plugins::registry::{DownloadOutcome, EngineOptions, EngineProgress, ItemDraft, MediaEngine, ProgressStatus};
use crate::plugins::ytdlp::info::InfoJson;
use crate::plugins::ytdlp::progress::{parse_progress_line, progress_template};

#[derive(thiserror::Error, Debug)]
pub enum YtDlpError {
    #[error("cannot run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp exited with {status}: {message}")]
    Exit { status: ExitStatus, message: String },

    #[error("failed to extract metadata; check the URL or cookies")]
    NoMetadata,
}

/// Drives an external `yt-dlp` binary, one child process per call.
pub struct YtDlpEngine;

impl YtDlpEngine {
    pub fn new() -> Self {
        Self
    }

    fn auth_args(opts: &EngineOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--user-agent".into(), opts.user_agent.clone().into()];
        if let Some(cookies) = opts.usable_cookies() {
            args.push("--cookies".into());
            args.push(cookies.into());
        }
        args
    }

    pub fn resolve_args(url: &str, opts: &EngineOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-J".into(), "--flat-playlist".into()];
        let playlist = if opts.expand_playlist { "--yes-playlist" } else { "--no-playlist" };
        args.push(playlist.into());
        args.extend(Self::auth_args(opts));
        args.push(url.into());
        args
    }

    pub fn download_args(item: &Item, opts: &EngineOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--quiet".into(),
            "--progress".into(),
            "--progress-template".into(),
            progress_template().into(),
            "-o".into(),
            Self::output_path(item, opts).into(),
            "--windows-filenames".into(),
            "--no-overwrites".into(),
            "--continue".into(),
            "--download-archive".into(),
            opts.archive_path().into(),
            "--retries".into(),
            opts.retries.to_string().into(),
            "--fragment-retries".into(),
            opts.fragment_retries.to_string().into(),
            "--concurrent-fragments".into(),
            opts.concurrent_fragments.max(1).to_string().into(),
            "--skip-unavailable-fragments".into(),
        ];
        if opts.write_subtitles {
            for flag in ["--write-subs", "--sub-langs", "all", "--sub-format"] {
                args.push(flag.into());
            }
            args.push(opts.subtitle_format.clone().into());
        }
        args.extend(Self::auth_args(opts));
        args.push("--no-playlist".into());
        args.push(item.source_url.clone().into());
        args
    }

    /// Output path with the course context baked in, since each item is
    /// downloaded from its own URL and yt-dlp no longer sees the playlist.
    pub fn output_path(item: &Item, opts: &EngineOptions) -> PathBuf {
        let mut template = opts.output_template.clone();
        for key in ["playlist_title", "chapter", "chapter_number"] {
            if let Some(value) = item.meta.get(key) {
                template = template.replace(&format!("%({key})s"), &template_literal(value));
            }
        }
        if let Some(count) = item.meta.get("playlist_count") {
            let width = count.len().max(2);
            let index = item
                .meta
                .get("playlist_index")
                .and_then(|i| i.parse::<usize>().ok())
                .unwrap_or(item.index);
            template = template.replace("%(playlist_index)s", &format!("{:0width$}", index));
        }
        opts.out_dir.join(template)
    }

    fn spawn_error(opts: &EngineOptions, source: std::io::Error) -> YtDlpError {
        YtDlpError::Spawn { binary: opts.binary.display().to_string(), source }
    }
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str { "yt-dlp" }

    fn can_handle(&self, url: &str) -> u8 {
        if let Ok(u) = Url::parse(url) {
            if u.scheme() == "http" || u.scheme() == "https" { return 50; }
        }
        0
    }

    async fn resolve(&self, url: &str, opts: &EngineOptions) -> anyhow::Result<Vec<ItemDraft>> {
        let out = Command::new(&opts.binary)
            .args(Self::resolve_args(url, opts))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Self::spawn_error(opts, e))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(YtDlpError::Exit { status: out.status, message: error_message(stderr.lines()) }.into());
        }
        if out.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(YtDlpError::NoMetadata.into());
        }
        let info = InfoJson::parse(&out.stdout).map_err(|_| YtDlpError::NoMetadata)?;
        Ok(info.into_drafts())
    }

    async fn download(&self, item: &Item, opts: &EngineOptions, hook: &ProgressHook) -> anyhow::Result<DownloadOutcome> {
        if hook.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }
        let mut child = Command::new(&opts.binary)
            .args(Self::download_args(item, opts))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::spawn_error(opts, e))?;

        // progress can land on either stream depending on --quiet handling
        let (line_tx, mut lines) = mpsc::unbounded_channel();
        if let Some(out) = child.stdout.take() {
            tokio::spawn(forward_lines(out, line_tx.clone()));
        }
        if let Some(err) = child.stderr.take() {
            tokio::spawn(forward_lines(err, line_tx));
        }

        let mut saw_finished = false;
        let mut output = Vec::new();
        loop {
            let line = tokio::select! {
                line = lines.recv() => line,
                _ = hook.cancelled() => {
                    tracing::info!(index = item.index, "cancelled while yt-dlp was silent, stopping it");
                    child.kill().await.ok();
                    return Ok(DownloadOutcome::Cancelled);
                }
            };
            let Some(line) = line else { break };
            match parse_progress_line(&line) {
                Some(p) => {
                    saw_finished |= p.status == ProgressStatus::Finished;
                    if hook.on_progress(&p).is_break() {
                        tracing::info!(index = item.index, "stopping yt-dlp");
                        child.kill().await.ok();
                        return Ok(DownloadOutcome::Cancelled);
                    }
                }
                None => {
                    tracing::trace!(%line, "yt-dlp");
                    output.push(line);
                }
            }
        }

        let status = child.wait().await?;
        // Ctrl-C reaches the child too; its non-zero exit is our interrupt, not an item failure
        if hook.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }
        if !status.success() {
            return Err(YtDlpError::Exit { status, message: error_message(output.iter().map(String::as_str)) }.into());
        }
        if !saw_finished {
            // already archived items finish without reporting; the item is complete either way
            let _ = hook.on_progress(&EngineProgress::finished());
        }
        Ok(DownloadOutcome::Completed)
    }
}

async fn forward_lines<R: AsyncRead + Unpin + Send + 'static>(reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).is_err() {
            break;
        }
    }
}

/// Last `ERROR:` line, else the last non-empty line.
fn error_message<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut last = None;
    let mut last_error = None;
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(msg) = line.strip_prefix("ERROR:") {
            last_error = Some(msg.trim().to_string());
        }
        last = Some(line.to_string());
    }
    last_error.or(last).unwrap_or_else(|| "no output".to_string())
}

fn template_literal(s: &str) -> String {
    s.replace('%', "%%").replace(['/', '\\'], "_")
}
