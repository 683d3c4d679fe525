use crate::plugins::registry::{EngineProgress, ProgressStatus};

pub const PROGRESS_MARKER: &str = "cdl-progress";

const FIELDS: [&str; 8] = [
    "status",
    "downloaded_bytes",
    "total_bytes",
    "total_bytes_estimate",
    "fragment_index",
    "fragment_count",
    "speed",
    "eta",
];

/// Value for `--progress-template`: one marker-prefixed, pipe-separated line per report.
pub fn progress_template() -> String {
    let fields: Vec<String> = FIELDS.iter().map(|f| format!("%(progress.{f})s")).collect();
    format!("download:{}|{}", PROGRESS_MARKER, fields.join("|"))
}

/// Parses a line produced by [`progress_template`]. Fields yt-dlp renders as
/// `NA` or `None` come back absent.
pub fn parse_progress_line(line: &str) -> Option<EngineProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?.strip_prefix('|')?;
    let f: Vec<&str> = rest.split('|').collect();
    if f.len() != FIELDS.len() {
        return None;
    }
    let num = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());

    let status = match f[0].trim() {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        _ => ProgressStatus::Other,
    };

    Some(EngineProgress {
        status,
        downloaded_bytes: num(f[1]),
        total_bytes: num(f[2]),
        total_bytes_estimate: num(f[3]),
        fragment_index: num(f[4]),
        fragment_count: num(f[5]),
        speed: num(f[6]),
        eta: num(f[7]),
    })
}
