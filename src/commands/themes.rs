//! List registered themes and where they came from.

use anyhow::Result;

use promptline::segment::SegmentRegistry;
use promptline::styling::{println, HEADING, HINT};
use promptline::theme::ThemeRegistry;

pub fn run() -> Result<()> {
    let segments = SegmentRegistry::with_builtins();
    let themes = ThemeRegistry::with_builtins();
    themes.load_user_themes(&segments);

    println!("{HEADING}{:<16}{HEADING:#} source", "theme");
    for (name, source) in themes.list() {
        println!("{:<16} {HINT}{}{HINT:#}", name, source);
    }
    Ok(())
}
