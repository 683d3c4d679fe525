/// Console localization for CourseDownloader.
/// Locale can be selected via the `--locale` CLI flag (e.g. `--locale zh`).
use crate::core::events::{LogEntry, SessionOutcome};
use crate::core::model::SessionStatus;
use crate::core::observer::SessionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "zh-tw" | "zh_tw" => Self::Zh,
            _ => Self::En,
        }
    }
}

pub struct Messages {
    pub idle: &'static str,
    pub analyzing: &'static str,
    pub downloading: &'static str,
    pub remaining: &'static str,
    pub cancelling: &'static str,
    pub done: &'static str,
    pub completed: &'static str,
    pub cancelled: &'static str,
    pub cancelled_done: &'static str,
    pub failed: &'static str,
    pub site_selected: &'static str,
    pub cookies_missing: &'static str,
    pub cancel_requested: &'static str,
    pub empty_url: &'static str,
    pub error_prefix: &'static str,
    pub fatal_prefix: &'static str,
    pub speed_label: &'static str,
    pub eta_label: &'static str,
}

pub static EN: Messages = Messages {
    idle: "Ready.",
    analyzing: "Analyzing…",
    downloading: "Downloading…",
    remaining: "Remaining",
    cancelling: "Cancelling…",
    done: "Done.",
    completed: "completed.",
    cancelled: "Cancelled.",
    cancelled_done: "done.",
    failed: "Failed.",
    site_selected: "Starting for site:",
    cookies_missing: "Cookie file not found, continuing without it:",
    cancel_requested: "Cancel requested. Finishing current fragment…",
    empty_url: "Please paste a URL.",
    error_prefix: "ERROR",
    fatal_prefix: "FATAL",
    speed_label: "Speed",
    eta_label: "ETA",
};

pub static ZH: Messages = Messages {
    idle: "就绪。",
    analyzing: "正在分析…",
    downloading: "正在下载…",
    remaining: "剩余",
    cancelling: "正在取消…",
    done: "完成。",
    completed: "已完成。",
    cancelled: "已取消。",
    cancelled_done: "已完成。",
    failed: "失败。",
    site_selected: "开始处理站点：",
    cookies_missing: "未找到 Cookie 文件，将不使用 Cookie 继续：",
    cancel_requested: "已请求取消，正在完成当前分片…",
    empty_url: "请粘贴一个 URL。",
    error_prefix: "错误",
    fatal_prefix: "致命错误",
    speed_label: "速度",
    eta_label: "剩余时间",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}

impl Messages {
    pub fn status_line(&self, view: &SessionView) -> String {
        let (c, t) = (view.completed, view.total);
        match view.status {
            SessionStatus::Idle => self.idle.to_string(),
            SessionStatus::Analyzing => self.analyzing.to_string(),
            SessionStatus::Downloading => {
                format!("{} {}/{} ({} {})", self.downloading, c, t, self.remaining, view.remaining)
            }
            SessionStatus::Cancelling => self.cancelling.to_string(),
            SessionStatus::Failed => self.failed.to_string(),
            SessionStatus::Done => match view.summary.map(|s| s.outcome) {
                Some(SessionOutcome::Cancelled) => format!("{} {}/{} {}", self.cancelled, c, t, self.cancelled_done),
                Some(SessionOutcome::Failed) => self.failed.to_string(),
                _ => format!("{} {}/{} {}", self.done, c, t, self.completed),
            },
        }
    }

    pub fn log_line(&self, entry: &LogEntry) -> String {
        match entry {
            LogEntry::SiteSelected { site } => format!("{} {}", self.site_selected, site),
            LogEntry::CookiesMissing { path } => format!("{} {}", self.cookies_missing, path.display()),
            LogEntry::ItemStarted { index, total, title } => format!("[{}/{}] {}", index, total, title),
            LogEntry::ItemFailed { index, title, message } => {
                format!("{}: [{}] {}: {}", self.error_prefix, index, title, message)
            }
            LogEntry::CancelRequested => self.cancel_requested.to_string(),
            LogEntry::Fatal { message } => format!("{}: {}", self.fatal_prefix, message),
        }
    }
}
