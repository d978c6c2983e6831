//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, open_backing)
//! - `expenses` - Expense commands (list, add, delete)
//! - `budget` - Budget snapshot and analysis commands
//! - `serve` - Web server command

pub mod budget;
pub mod core;
pub mod expenses;
pub mod serve;

// Re-export command functions for main.rs
pub use budget::*;
pub use self::core::*;
pub use expenses::*;
pub use serve::*;

/// Truncate a string for table output, counting characters
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
