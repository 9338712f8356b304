//! Canonical paths for voicetask.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use voicetask::config::paths;
//!
//! let log = paths::task_log()?;
//! ```

use std::path::PathBuf;

use anyhow::Result;

/// Task log CSV (~/.voicetask/tasks.csv)
pub fn task_log() -> Result<PathBuf> {
    Ok(crate::config::config()?.task_log.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_log_matches_resolved_config() {
        let config = crate::config::config().unwrap();
        assert_eq!(task_log().unwrap(), config.task_log);
        // Without overrides the log lives under home
        if std::env::var("VOICETASK_TASK_LOG").is_err() && config.config_file.is_none() {
            assert!(config.task_log.starts_with(&config.home));
        }
    }
}
