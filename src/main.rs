mod core;
mod i18n;
mod plugins;
mod ui;

use clap::builder::PossibleValuesParser;
use clap::{Arg, Command};
use crate::core::model::{SessionStatus, SiteHint};
use crate::core::observer::Observer;
use crate::core::orchestrator::SessionOptions;
use crate::core::session::{self, SessionError};
use crate::plugins::registry::{DownloadCliConfig, PluginRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_EVERY: Duration = Duration::from_millis(100);

fn build_cli(registry: &PluginRegistry) -> Command {
    let download = Command::new("download")
        .about("Download a course, playlist or single video")
        .arg(
            Arg::new("url")
                .help("Course / playlist / video URL")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new("out_dir")
                .long("out-dir")
                .help("Output directory")
                .default_value("./downloads")
                .num_args(1),
        )
        .arg(
            Arg::new("site")
                .long("site")
                .help("Site hint (informational)")
                .value_parser(PossibleValuesParser::new(SiteHint::ALL.iter().map(|s| s.key())))
                .default_value("auto")
                .num_args(1),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .help("Console language (en, zh)")
                .default_value("en")
                .num_args(1),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .help("tracing filter used when RUST_LOG is not set")
                .default_value("warn")
                .num_args(1),
        );

    let download = registry.augment_download_command(download);

    Command::new("course-downloader")
        .about("Course and playlist downloader driving yt-dlp - plugin based")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(download)
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = PluginRegistry::with_defaults();
    let app = build_cli(&registry);
    let matches = app.get_matches();

    let Some(("download", m)) = matches.subcommand() else {
        return Ok(());
    };

    let log_level = m.get_one::<String>("log_level").map(String::as_str).unwrap_or("warn");
    init_tracing(log_level);

    let msgs = i18n::get_messages(i18n::Locale::from_str(
        m.get_one::<String>("locale").map(String::as_str).unwrap_or("en"),
    ));
    let site = m
        .get_one::<String>("site")
        .and_then(|s| SiteHint::from_key(s))
        .unwrap_or_default();

    let mut cfg = DownloadCliConfig::default();
    if let Some(dir) = m.get_one::<String>("out_dir") {
        cfg.engine.out_dir = PathBuf::from(dir);
    }
    registry.apply_download_matches(m, &mut cfg)?;

    let raw_url = m.get_one::<String>("url").map(String::as_str).unwrap_or_default();
    let options = SessionOptions { site, engine: cfg.engine };
    let handle = match session::start(Arc::new(registry), options, raw_url) {
        Ok(h) => h,
        Err(SessionError::EmptyUrl) => {
            eprintln!("{}", msgs.empty_url);
            std::process::exit(2);
        }
    };
    tracing::debug!(id = %handle.id(), "session spawned");

    let (events, control, task) = handle.split();

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            control.cancel();
        }
    });

    let presenter = ui::ConsolePresenter::new(msgs)?;
    let (view, _presenter) = Observer::new(events, presenter).run(POLL_EVERY).await;
    let state = task.await?;
    ctrl_c.abort();

    tracing::info!(?state, "session finished");
    if state.status == SessionStatus::Failed || view.status == SessionStatus::Failed {
        anyhow::bail!("{}", msgs.failed);
    }
    Ok(())
}
