//! Styling for the CLI's own messages.
//!
//! This module uses the anstyle ecosystem:
//! - anstream for auto-detecting color support on the CLI's streams
//! - anstyle for composable styling
//! - Semantic style constants for domain-specific use
//!
//! Prompt output itself never goes through these: prompt colors are
//! capability-negotiated per render by the color model.

use anstyle::{AnsiColor, Color, Style};

/// Auto-detecting println that respects NO_COLOR and terminal capabilities
pub use anstream::println;

/// Auto-detecting eprintln that respects NO_COLOR and terminal capabilities
pub use anstream::eprintln;

/// Auto-detecting print that respects NO_COLOR and terminal capabilities
pub use anstream::print;

/// Error style (red) - use as `{ERROR}text{ERROR:#}`
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Warning style (yellow) - use as `{WARNING}text{WARNING:#}`
pub const WARNING: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));

/// Hint style (dimmed) - use as `{HINT}text{HINT:#}`
pub const HINT: Style = Style::new().dimmed();

/// Heading style (cyan + bold) for list output
pub const HEADING: Style = Style::new()
    .bold()
    .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
