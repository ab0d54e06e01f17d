use chrono::{DateTime, Local};

/// `[YYYY-MM-DD HH:MM:SS.mmm]` for the given instant.
pub fn log_prefix_at(now: DateTime<Local>) -> String {
    now.format("[%Y-%m-%d %H:%M:%S%.3f]").to_string()
}

/// Prefixes `message` with the current local wall-clock time.
pub fn log_line(message: &str) -> String {
    format!("{} {}", log_prefix_at(Local::now()), message)
}
