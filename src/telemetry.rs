//! Telemetry and logging for SQL rendering
//!
//! This module provides configurable logging for debugging the SQL a
//! prepared statement turns into. Events go through `tracing` under the
//! `stmtcraft.render` target; the level below decides how much of the
//! statement is included.
//!
//! # Configuration
//!
//! Set the `STMTCRAFT_LOG_LEVEL` environment variable to one of:
//! - `off` - No logging (default)
//! - `basic` - Log SQL (truncated) and timing only
//! - `detailed` - Log full SQL and parameters
//! - `debug` - Log everything including the AST
//!
//! # Example
//!
//! ```bash
//! export STMTCRAFT_LOG_LEVEL=detailed
//! ```

use crate::ast::RenderedSql;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const LOG_LEVEL_VAR: &str = "STMTCRAFT_LOG_LEVEL";

/// SQL longer than this is truncated below [`LogLevel::Detailed`]
const TRUNCATE_AT: usize = 1000;

/// Log level for SQL telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// No logging
    #[default]
    Off = 0,
    /// Basic info: SQL and timing
    Basic = 1,
    /// Detailed: SQL and parameters
    Detailed = 2,
    /// Debug: Everything including AST
    Debug = 3,
}

impl LogLevel {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "basic" => Self::Basic,
            "detailed" => Self::Detailed,
            "debug" => Self::Debug,
            _ => Self::Off,
        }
    }
}

/// Cut `sql` to at most `max` bytes on a char boundary.
fn truncate(sql: &str, max: usize) -> String {
    if sql.len() <= max {
        return sql.to_string();
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}

/// Log rendered SQL
pub fn log_rendered(level: LogLevel, kind: &str, rendered: &RenderedSql) {
    if level < LogLevel::Basic {
        return;
    }

    let sql_display = if level >= LogLevel::Detailed {
        rendered.sql.clone()
    } else {
        truncate(&rendered.sql, TRUNCATE_AT)
    };

    info!(
        target: "stmtcraft.render",
        kind,
        params = rendered.params.len(),
        batches = rendered.batches.len(),
        "SQL:\n{}",
        sql_display
    );

    if level >= LogLevel::Detailed {
        for (i, param) in rendered.params.iter().enumerate() {
            info!(target: "stmtcraft.render", "Param ?{}: {:?} ({})", i + 1, param, param.type_name());
        }
        for (row, values) in rendered.batches.iter().enumerate() {
            info!(target: "stmtcraft.render", "Batch row {}: {:?}", row, values);
        }
    }
}

/// Dump the AST at `debug` level
pub fn log_ast(level: LogLevel, node: &impl Debug) {
    if level >= LogLevel::Debug {
        debug!(target: "stmtcraft.render", "AST: {:#?}", node);
    }
}

/// Log a render failure
pub fn log_error(level: LogLevel, context: &str, error: &str) {
    if level < LogLevel::Basic {
        return;
    }

    warn!(target: "stmtcraft.render", "Error in {}: {}", context, error);
}

/// A guard that logs render timing on drop
pub struct RenderTimer {
    start: Instant,
    context: String,
    level: LogLevel,
    logged: bool,
}

impl RenderTimer {
    /// Start a new render timer
    pub fn new(level: LogLevel, context: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            context: context.into(),
            level,
            logged: false,
        }
    }

    /// Get elapsed time in microseconds
    pub fn elapsed_us(&self) -> u128 {
        self.start.elapsed().as_micros()
    }

    /// Mark as successful and log
    pub fn success(mut self) {
        self.logged = true;
        self.log_result(true);
    }

    /// Mark as failed and log
    pub fn failure(mut self, error: &str) {
        self.logged = true;
        log_error(self.level, &self.context, error);
        self.log_result(false);
    }

    fn log_result(&self, success: bool) {
        if self.level < LogLevel::Basic {
            return;
        }
        let status = if success { "completed" } else { "failed" };
        info!(
            target: "stmtcraft.render",
            "Render of {} {} in {}us",
            self.context,
            status,
            self.elapsed_us()
        );
    }
}

impl Drop for RenderTimer {
    fn drop(&mut self) {
        // Neither success nor failure reported: treat as failed
        if !self.logged {
            self.log_result(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("off"), LogLevel::Off);
        assert_eq!(LogLevel::from_str("basic"), LogLevel::Basic);
        assert_eq!(LogLevel::from_str("detailed"), LogLevel::Detailed);
        assert_eq!(LogLevel::from_str("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("BASIC"), LogLevel::Basic);
        assert_eq!(LogLevel::from_str("invalid"), LogLevel::Off);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Off < LogLevel::Basic);
        assert!(LogLevel::Basic < LogLevel::Detailed);
        assert!(LogLevel::Detailed < LogLevel::Debug);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("select 1", 100), "select 1");
        assert_eq!(truncate("abcdef", 3), "abc...");
        // 'é' is two bytes; cutting inside it backs off
        assert_eq!(truncate("aé", 2), "a...");
    }

    #[test]
    fn test_render_timer() {
        let timer = RenderTimer::new(LogLevel::Off, "test");
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(timer.elapsed_us() >= 2000);
        timer.success();
    }
}
