//! Logger initialization (console + dated file)

use anyhow::Result;
use chrono::Local;
use simplelog::*;
use std::path::{Path, PathBuf};

/// Log file for today: `<log_dir>/bot_YYYYMMDD.log`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("bot_{}.log", Local::now().format("%Y%m%d")))
}

/// Initialize logger for both console and file output
///
/// Creates `log_dir` if needed and appends to today's file, so restarts on the
/// same day keep the earlier records.
pub fn init_logger(log_dir: &Path) -> Result<PathBuf> {
    fs_err::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", path.display(), e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(path)
}
