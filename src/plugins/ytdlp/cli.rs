use crate::plugins::registry::{CliPlugin, DownloadCliConfig};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

pub struct YtDlpCliPlugin;

impl YtDlpCliPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YtDlpCliPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl CliPlugin for YtDlpCliPlugin {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn augment_download_command(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new("ytdlp_bin")
                .long("yt-dlp-bin")
                .help_heading("YT-DLP")
                .help("Path to the yt-dlp binary")
                .default_value("yt-dlp")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_cookies")
                .long("cookies")
                .help_heading("YT-DLP")
                .help("Netscape-format cookies file; skipped when it does not exist")
                .default_value("cookies.txt")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_user_agent")
                .long("user-agent")
                .help_heading("YT-DLP")
                .help("User-Agent header override")
                .default_value("Mozilla/5.0")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_retries")
                .long("retries")
                .help_heading("YT-DLP")
                .help("Retries for transient download errors")
                .default_value("100")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_fragment_retries")
                .long("fragment-retries")
                .help_heading("YT-DLP")
                .help("Retries per fragment")
                .default_value("100")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_concurrent_fragments")
                .long("concurrent-fragments")
                .help_heading("YT-DLP")
                .help("Fragments fetched in parallel per item")
                .default_value("4")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_archive_file")
                .long("archive-file")
                .help_heading("YT-DLP")
                .help("Download archive, relative to the output directory")
                .default_value("download-archive.txt")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_output_template")
                .long("output-template")
                .help_heading("YT-DLP")
                .help("yt-dlp output template, relative to the output directory")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_sub_format")
                .long("sub-format")
                .help_heading("YT-DLP")
                .help("Preferred subtitle format")
                .default_value("srt/best")
                .num_args(1),
        )
        .arg(
            Arg::new("ytdlp_no_subs")
                .long("no-subs")
                .help_heading("YT-DLP")
                .help("Do not write subtitle files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ytdlp_no_playlist")
                .long("no-playlist")
                .help_heading("YT-DLP")
                .help("Treat the URL as a single item even if it belongs to a playlist")
                .action(ArgAction::SetTrue),
        )
    }

    fn apply_download_matches(&self, matches: &ArgMatches, cfg: &mut DownloadCliConfig) -> anyhow::Result<()> {
        let e = &mut cfg.engine;
        if let Some(v) = matches.get_one::<String>("ytdlp_bin") {
            e.binary = PathBuf::from(v);
        }
        if let Some(v) = matches.get_one::<String>("ytdlp_cookies") {
            e.cookies_file = (!v.trim().is_empty()).then(|| PathBuf::from(v.trim()));
        }
        if let Some(v) = matches.get_one::<String>("ytdlp_user_agent") {
            e.user_agent = v.clone();
        }
        if let Some(s) = matches.get_one::<String>("ytdlp_retries") {
            e.retries = s.parse()?;
        }
        if let Some(s) = matches.get_one::<String>("ytdlp_fragment_retries") {
            e.fragment_retries = s.parse()?;
        }
        if let Some(s) = matches.get_one::<String>("ytdlp_concurrent_fragments") {
            e.concurrent_fragments = s.parse()?;
        }
        if let Some(v) = matches.get_one::<String>("ytdlp_archive_file") {
            e.archive_file = PathBuf::from(v);
        }
        if let Some(v) = matches.get_one::<String>("ytdlp_output_template") {
            if !v.contains('/') {
                anyhow::bail!("output template must encode course/chapter/item folders: {}", v);
            }
            e.output_template = v.clone();
        }
        if let Some(v) = matches.get_one::<String>("ytdlp_sub_format") {
            e.subtitle_format = v.clone();
        }
        e.write_subtitles = !matches.get_flag("ytdlp_no_subs");
        e.expand_playlist = !matches.get_flag("ytdlp_no_playlist");
        Ok(())
    }
}
