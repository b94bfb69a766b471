//! Terminal logging for the build pipeline.
//!
//! Every line is printed as `[module] message`, with the module prefix
//! colored by its kind:
//!
//! ```ignore
//! log!("blog"; "blog/{}/ ({:.1}KB)", slug, kb);
//! log!("skip"; "{}: not found", file);
//! ```

use colored::{ColoredString, Colorize};
use std::io::{stdout, Write};

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::log::log($module, &format!($($arg)*))
    }};
}

/// Writes a single `[module] message` line to stdout.
pub fn log(module: &str, message: &str) {
    let mut stdout = stdout().lock();
    writeln!(stdout, "{} {}", colorize_prefix(module), message).ok();
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{}]", module);
    match module.to_ascii_lowercase().as_str() {
        "error" => prefix.red().bold(),
        "warn" | "skip" => prefix.yellow().bold(),
        "done" => prefix.green().bold(),
        _ => prefix.cyan().bold(),
    }
}
