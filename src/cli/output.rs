//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Briefsmith CLI.
//! Status lines go to stderr so that a brief printed to stdout can be piped.

use crate::research::progress::ProgressEvent;
use crate::types::{SessionStatus, TaskStatus};
use owo_colors::OwoColorize;

/// Output style configuration
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            eprintln!(
                "\n  {} {}\n  {}\n",
                "briefsmith".bright_cyan().bold(),
                version.dimmed(),
                "Research briefs from a single query".bright_white()
            );
        } else {
            eprintln!("\n  briefsmith {}\n  Research briefs from a single query\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            eprintln!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            eprintln!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            eprintln!("\n  {}", title.bright_white().bold().underline());
        } else {
            eprintln!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            eprintln!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            eprintln!("    {} {}", "•".blue(), item);
        } else {
            eprintln!("    - {}", item);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            eprintln!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            eprintln!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            eprintln!("     $ {}", cmd);
        }
    }

    pub fn complete(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            eprintln!("\n  [DONE] {}", message);
        }
    }

    /// Print one live progress update
    pub fn progress(&self, event: &ProgressEvent) {
        let line = format_progress(event);
        if !self.colored {
            eprintln!("  {}", line);
            return;
        }

        let percent = format!("[{:>3}%]", event.percent);
        match event.status {
            Some(TaskStatus::Done) => {
                eprintln!("  {} {} {}", percent.dimmed(), "✓".green(), event.message)
            }
            Some(TaskStatus::Failed) => {
                eprintln!("  {} {} {}", percent.dimmed(), "✗".red(), event.message.red())
            }
            Some(_) => eprintln!("  {} {} {}", percent.dimmed(), "…".blue(), event.message.dimmed()),
            None if event.stage == SessionStatus::Failed => {
                eprintln!("  {} {}", percent.dimmed(), event.message.red().bold())
            }
            None => eprintln!("  {} {}", percent.dimmed(), event.message.bright_white().bold()),
        }
    }
}

/// Plain rendering of a progress update, e.g. `[ 30%] Task 1: Solar costs (done)`.
pub fn format_progress(event: &ProgressEvent) -> String {
    format!("[{:>3}%] {}", event.percent, event.message)
}
