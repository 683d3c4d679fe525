use crate::core::events::{LogEntry, LogLevel};
use crate::core::format::{format_bytes_per_second, format_duration};
use crate::core::observer::{Presenter, SessionView};
use crate::i18n::Messages;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const BAR_LEN: u64 = 100;

/// Two bars (current file, whole course) plus a status line.
pub struct ConsolePresenter {
    mp: MultiProgress,
    file: ProgressBar,
    overall: ProgressBar,
    status: ProgressBar,
    msgs: &'static Messages,
}

impl ConsolePresenter {
    pub fn new(msgs: &'static Messages) -> anyhow::Result<Self> {
        let mp = MultiProgress::new();
        let sty_bar = ProgressStyle::with_template("{prefix:>8} {bar:40.cyan/blue} {percent:>3}% {wide_msg}")?
            .progress_chars("=> ");
        let sty_line = ProgressStyle::with_template("{wide_msg}")?;

        let file = mp.add(ProgressBar::new(BAR_LEN));
        file.set_style(sty_bar.clone());
        file.set_prefix("file");
        let overall = mp.add(ProgressBar::new(BAR_LEN));
        overall.set_style(sty_bar);
        overall.set_prefix("course");
        let status = mp.add(ProgressBar::new_spinner());
        status.set_style(sty_line);

        Ok(Self { mp, file, overall, status, msgs })
    }
}

fn to_position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_LEN as f64).round() as u64
}

impl Presenter for ConsolePresenter {
    fn log(&mut self, entry: &LogEntry) {
        match entry.level() {
            LogLevel::Info => tracing::info!(?entry, "session log"),
            LogLevel::Warn => tracing::warn!(?entry, "session log"),
            LogLevel::Error => tracing::error!(?entry, "session log"),
        }
        let _ = self.mp.println(self.msgs.log_line(entry));
    }

    fn render(&mut self, view: &SessionView) {
        self.file.set_position(to_position(view.file_fraction));
        self.file.set_message(view.title.clone().unwrap_or_default());
        self.overall.set_position(to_position(view.overall_fraction));
        self.overall.set_message(format!(
            "{} {} | {} {}",
            self.msgs.speed_label,
            format_bytes_per_second(view.speed_bps),
            self.msgs.eta_label,
            format_duration(view.eta_secs),
        ));
        self.status.set_message(self.msgs.status_line(view));
    }

    fn finish(&mut self, view: &SessionView) {
        self.render(view);
        self.file.finish();
        self.overall.finish();
        self.status.finish_with_message(self.msgs.status_line(view));
    }
}
