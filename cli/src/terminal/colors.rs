use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const HIGHLIGHT: Color = Color::BrightWhite;

/// Rows where the hostname or vendor could not be resolved.
pub const UNRESOLVED: Color = Color::Yellow;
