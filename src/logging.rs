//! Structured logging module for OCEAN Duet
//!
//! Events go through the `log` facade (rendered by `env_logger`) and, when a
//! log directory is configured, are also appended to a daily file. Categories:
//! - TURN: Dialogue generation and turn commits
//! - ANALYSIS: Trait analysis results
//! - ADAPTIVE: Adaptive cue computation
//! - RETRIEVAL: Document ingestion and similarity search
//! - SESSION: Run lifecycle (start, pause, stop, complete, reset)
//! - ERROR: Failures

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Turn,
    Analysis,
    Adaptive,
    Retrieval,
    Session,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Turn => "TURN",
            LogCategory::Analysis => "ANALYSIS",
            LogCategory::Adaptive => "ADAPTIVE",
            LogCategory::Retrieval => "RETRIEVAL",
            LogCategory::Session => "SESSION",
            LogCategory::Error => "ERROR",
        }
    }

    fn target(&self) -> &'static str {
        match self {
            LogCategory::Turn => "ocean_duet::turn",
            LogCategory::Analysis => "ocean_duet::analysis",
            LogCategory::Adaptive => "ocean_duet::adaptive",
            LogCategory::Retrieval => "ocean_duet::retrieval",
            LogCategory::Session => "ocean_duet::session",
            LogCategory::Error => "ocean_duet::error",
        }
    }

    fn level(&self) -> log::Level {
        match self {
            LogCategory::Error => log::Level::Error,
            LogCategory::Retrieval | LogCategory::Analysis => log::Level::Debug,
            _ => log::Level::Info,
        }
    }
}

/// Directory for daily log files, if file logging is enabled
static LOG_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("ocean-duet-{}.log", today))
}

/// Initialize logging. Safe to call more than once; only the first call
/// installs the `env_logger` backend.
pub fn init_logging(log_dir: Option<&Path>) -> std::io::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    if let Some(dir) = log_dir {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        if let Ok(mut slot) = LOG_DIR.lock() {
            *slot = Some(dir.to_path_buf());
        }
    }

    log_session(None, "OCEAN Duet logging initialized");
    Ok(())
}

/// Render one log line. Conversation ids are shortened to 8 chars (not bytes).
pub fn format_line(category: LogCategory, conversation_id: Option<&str>, message: &str) -> String {
    let conv_context = conversation_id
        .map(|id| format!("conversation={} | ", id.chars().take(8).collect::<String>()))
        .unwrap_or_default();
    format!("[{}] {}{}", category.as_str(), conv_context, message)
}

/// Log a message with category and optional conversation context
pub fn log(category: LogCategory, conversation_id: Option<&str>, message: &str) {
    let line = format_line(category, conversation_id, message);
    log::log!(target: category.target(), category.level(), "{}", line);

    let dir = match LOG_DIR.lock() {
        Ok(slot) => slot.clone(),
        Err(_) => None,
    };
    if let Some(dir) = dir {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path(&dir))
        {
            let _ = writeln!(file, "[{}] {}", timestamp, line);
        }
    }
}

pub fn log_turn(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Turn, conversation_id, message);
}

pub fn log_analysis(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Analysis, conversation_id, message);
}

pub fn log_adaptive(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Adaptive, conversation_id, message);
}

pub fn log_retrieval(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Retrieval, conversation_id, message);
}

pub fn log_session(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Session, conversation_id, message);
}

pub fn log_error(conversation_id: Option<&str>, message: &str) {
    log(LogCategory::Error, conversation_id, message);
}

/// Clean up log files older than `keep_days`. Returns how many were deleted.
pub fn cleanup_old_logs(keep_days: i64) -> std::io::Result<usize> {
    let dir = match LOG_DIR.lock() {
        Ok(slot) => slot.clone(),
        Err(_) => None,
    };
    let Some(log_dir) = dir else {
        return Ok(0);
    };
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(keep_days);
    let mut deleted = 0;

    for entry in fs::read_dir(&log_dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            let modified_time: chrono::DateTime<Utc> = modified.into();
            if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
    }

    Ok(deleted)
}
