//! Theme file discovery and parsing.
//!
//! Theme files are TOML with sections `[theme]`, `[layout]`, `[colors]`,
//! `[symbols]`, `[syntax]`, `[segments]`, and `[segments.<name>]`. They are
//! discovered under `$XDG_CONFIG_HOME/promptline/themes/` and
//! `/etc/promptline/themes/`; a user theme overrides a built-in of the same
//! name. Parsing is tolerant: a malformed color spec is skipped with a
//! warning rather than rejecting the whole file.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::Deserialize;

use crate::color::Color;
use crate::theme::{Layout, Palette, PromptStyle, SegmentOverride, Symbols, Theme};

/// System-wide theme directory.
const SYSTEM_THEME_DIR: &str = "/etc/promptline/themes";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThemeFile {
    #[serde(default)]
    theme: MetaSection,
    #[serde(default)]
    layout: LayoutSection,
    #[serde(default)]
    colors: HashMap<String, String>,
    #[serde(default)]
    symbols: SymbolsSection,
    #[serde(default)]
    syntax: HashMap<String, String>,
    #[serde(default)]
    segments: SegmentsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetaSection {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutSection {
    style: Option<String>,
    ps1: Option<String>,
    ps2: Option<String>,
    rprompt: Option<String>,
    #[serde(default)]
    enable_transient: bool,
    transient: Option<String>,
    #[serde(default)]
    newline_before_prompt: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymbolsSection {
    prompt_char: Option<String>,
    root_char: Option<String>,
    branch_glyph: Option<String>,
    separator_left: Option<String>,
    separator_right: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentsSection {
    #[serde(default)]
    enabled: Vec<String>,
    #[serde(flatten)]
    overrides: HashMap<String, OverrideSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideSection {
    fg_color: Option<String>,
    bg_color: Option<String>,
    show: Option<bool>,
    truncation_length: Option<usize>,
    format: Option<String>,
}

/// Directories scanned for theme files, user config first.
pub fn theme_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    // Honor an explicit XDG override before the platform default.
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            dirs.push(PathBuf::from(xdg).join("promptline").join("themes"));
        }
    }
    if dirs.is_empty() {
        if let Some(project) = ProjectDirs::from("", "", "promptline") {
            dirs.push(project.config_dir().join("themes"));
        }
    }

    dirs.push(PathBuf::from(SYSTEM_THEME_DIR));
    dirs
}

/// All `*.toml` files in the theme directories, sorted for deterministic
/// registration order (system themes first so user themes win conflicts).
pub fn discover_theme_files() -> Vec<PathBuf> {
    let mut user_files = Vec::new();
    let mut system_files = Vec::new();

    for (idx, dir) in theme_dirs().into_iter().enumerate() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                if idx == 0 {
                    user_files.push(path);
                } else {
                    system_files.push(path);
                }
            }
        }
    }

    user_files.sort();
    system_files.sort();
    system_files.extend(user_files);
    system_files
}

/// Load and convert one theme file.
pub fn load_theme_file(path: &Path) -> anyhow::Result<Theme> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read theme file {}", path.display()))?;
    let fallback_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    parse_theme(fallback_name, &contents)
        .with_context(|| format!("failed to parse theme file {}", path.display()))
}

/// Parse theme TOML; `fallback_name` is used when `[theme] name` is absent.
pub fn parse_theme(fallback_name: &str, contents: &str) -> anyhow::Result<Theme> {
    let file: ThemeFile = toml::from_str(contents)?;

    let mut colors = Palette::default();
    for (name, spec) in &file.colors {
        match Color::parse_spec(spec) {
            Some(color) => {
                if !colors.set(name, color) {
                    log::warn!("unknown palette entry {:?} in theme colors", name);
                }
            }
            None => log::warn!("unparseable color {:?} for palette entry {:?}", spec, name),
        }
    }

    let mut syntax = HashMap::new();
    for (name, spec) in &file.syntax {
        match Color::parse_spec(spec) {
            Some(color) => {
                syntax.insert(name.clone(), color);
            }
            None => log::warn!("unparseable color {:?} for syntax entry {:?}", spec, name),
        }
    }

    let defaults = Symbols::default();
    let symbols = Symbols {
        prompt_char: file.symbols.prompt_char.unwrap_or(defaults.prompt_char),
        root_char: file.symbols.root_char.unwrap_or(defaults.root_char),
        branch_glyph: file.symbols.branch_glyph.unwrap_or(defaults.branch_glyph),
        separator_left: file.symbols.separator_left.unwrap_or_default(),
        separator_right: file.symbols.separator_right.unwrap_or_default(),
    };

    let style = match file.layout.style.as_deref() {
        None | Some("plain") => PromptStyle::Plain,
        Some("powerline") => PromptStyle::Powerline,
        Some(other) => anyhow::bail!("unknown layout style {:?}", other),
    };

    let layout = Layout {
        style,
        ps1_format: file.layout.ps1.unwrap_or_default(),
        ps2_format: file.layout.ps2.unwrap_or_else(|| "> ".to_string()),
        rprompt_format: file.layout.rprompt.unwrap_or_default(),
        enable_transient: file.layout.enable_transient,
        transient_format: file.layout.transient.unwrap_or_default(),
        newline_before_prompt: file.layout.newline_before_prompt,
    };

    let mut segment_overrides = Vec::new();
    for (name, section) in file.segments.overrides {
        segment_overrides.push(SegmentOverride {
            name,
            fg_color: section.fg_color.as_deref().and_then(Color::parse_spec),
            bg_color: section.bg_color.as_deref().and_then(Color::parse_spec),
            show: section.show,
            truncation_length: section.truncation_length,
            format: section.format,
        });
    }
    segment_overrides.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Theme {
        name: file.theme.name.unwrap_or_else(|| fallback_name.to_string()),
        description: file.theme.description.unwrap_or_default(),
        category: file.theme.category.unwrap_or_else(|| "user".to_string()),
        colors,
        symbols,
        layout,
        enabled_segments: file.segments.enabled,
        segment_overrides,
        syntax,
    })
}
