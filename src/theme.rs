//! Themes: named bundles of colors, symbols, layout, and enabled segments.
//!
//! Themes are immutable once registered. The registry hands out `Arc`
//! references and hot reload swaps whole entries, so a render in progress
//! always sees one coherent theme: never a mix of old and new fields.

pub mod loader;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::color::Color;
use crate::error::PromptError;
use crate::segment::SegmentRegistry;

/// Named palette entries every theme provides.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub text: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub git_clean: Color,
    pub git_dirty: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::basic(4),
            secondary: Color::basic(6),
            text: Color::none(),
            success: Color::basic(2),
            warning: Color::basic(3),
            error: Color::basic(1),
            git_clean: Color::basic(2),
            git_dirty: Color::basic(3),
        }
    }
}

impl Palette {
    /// Look a palette color up by its name (as used in `${color:text}`
    /// template syntax and theme files).
    pub fn lookup(&self, name: &str) -> Option<Color> {
        match name {
            "primary" => Some(self.primary),
            "secondary" => Some(self.secondary),
            "text" => Some(self.text),
            "success" => Some(self.success),
            "warning" => Some(self.warning),
            "error" => Some(self.error),
            "git_clean" => Some(self.git_clean),
            "git_dirty" => Some(self.git_dirty),
            _ => None,
        }
    }

    /// Set a palette entry by name. Unknown names are reported back.
    fn set(&mut self, name: &str, color: Color) -> bool {
        match name {
            "primary" => self.primary = color,
            "secondary" => self.secondary = color,
            "text" => self.text = color,
            "success" => self.success = color,
            "warning" => self.warning = color,
            "error" => self.error = color,
            "git_clean" => self.git_clean = color,
            "git_dirty" => self.git_dirty = color,
            _ => return false,
        }
        true
    }
}

/// Glyphs a theme renders with.
#[derive(Debug, Clone)]
pub struct Symbols {
    pub prompt_char: String,
    pub root_char: String,
    pub branch_glyph: String,
    /// Left-to-right powerline separator; empty selects U+E0B0.
    pub separator_left: String,
    /// Right-to-left powerline separator; empty selects U+E0B2.
    pub separator_right: String,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            prompt_char: "$".to_string(),
            root_char: "#".to_string(),
            branch_glyph: String::new(),
            separator_left: String::new(),
            separator_right: String::new(),
        }
    }
}

/// How the prompt is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// Two-pass template + escape expansion of the format strings.
    #[default]
    Plain,
    /// Colored segment blocks with arrow separators.
    Powerline,
}

/// Format strings and layout switches.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub style: PromptStyle,
    pub ps1_format: String,
    pub ps2_format: String,
    pub rprompt_format: String,
    pub enable_transient: bool,
    pub transient_format: String,
    pub newline_before_prompt: bool,
}

/// Per-segment theme overrides.
#[derive(Debug, Clone, Default)]
pub struct SegmentOverride {
    pub name: String,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
    pub show: Option<bool>,
    pub truncation_length: Option<usize>,
    pub format: Option<String>,
}

/// An immutable theme.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub category: String,
    pub colors: Palette,
    pub symbols: Symbols,
    pub layout: Layout,
    /// Segment membership and order for powerline rendering.
    pub enabled_segments: Vec<String>,
    pub segment_overrides: Vec<SegmentOverride>,
    /// Syntax-highlighting colors from the theme file, passed through to the
    /// editor's highlighter.
    pub syntax: HashMap<String, Color>,
}

impl Theme {
    pub fn segment_override(&self, name: &str) -> Option<&SegmentOverride> {
        self.segment_overrides.iter().find(|o| o.name == name)
    }

    /// Check that every enabled segment resolves in the registry.
    pub fn validate(&self, segments: &SegmentRegistry) -> Result<(), PromptError> {
        for name in &self.enabled_segments {
            if !segments.contains(name) {
                log::warn!("theme {:?} enables unknown segment {:?}", self.name, name);
                return Err(PromptError::InvalidParameter(
                    "theme enables unregistered segment",
                ));
            }
        }
        Ok(())
    }

    /// The standard two-line-free default: identity, cwd, git branch, symbol.
    pub fn builtin_default() -> Theme {
        Theme {
            name: "default".to_string(),
            description: "Colored user@host, directory, and git branch".to_string(),
            category: "standard".to_string(),
            colors: Palette::default(),
            symbols: Symbols::default(),
            layout: Layout {
                style: PromptStyle::Plain,
                ps1_format:
                    "%F{green}%n@%m%f:%F{blue}%~%f${?git: (}${git.branch}${?git:)} ${symbol} "
                        .to_string(),
                ps2_format: "> ".to_string(),
                rprompt_format: String::new(),
                enable_transient: false,
                transient_format: String::new(),
                newline_before_prompt: false,
            },
            enabled_segments: vec![
                "user".to_string(),
                "directory".to_string(),
                "git".to_string(),
                "symbol".to_string(),
            ],
            segment_overrides: Vec::new(),
            syntax: HashMap::new(),
        }
    }

    /// Bare directory-and-symbol prompt, no color.
    pub fn builtin_minimal() -> Theme {
        Theme {
            name: "minimal".to_string(),
            description: "Just the directory and a prompt character".to_string(),
            category: "standard".to_string(),
            colors: Palette::default(),
            symbols: Symbols::default(),
            layout: Layout {
                style: PromptStyle::Plain,
                ps1_format: "%~ ${symbol} ".to_string(),
                ps2_format: "> ".to_string(),
                rprompt_format: String::new(),
                enable_transient: false,
                transient_format: String::new(),
                newline_before_prompt: false,
            },
            enabled_segments: vec!["directory".to_string(), "symbol".to_string()],
            segment_overrides: Vec::new(),
            syntax: HashMap::new(),
        }
    }

    /// Segment blocks joined by arrows.
    pub fn builtin_powerline() -> Theme {
        Theme {
            name: "powerline".to_string(),
            description: "Colored blocks with arrow separators".to_string(),
            category: "fancy".to_string(),
            colors: Palette {
                text: Color::rgb(255, 255, 255).bold(),
                ..Palette::default()
            },
            symbols: Symbols {
                branch_glyph: "\u{e0a0}".to_string(),
                ..Symbols::default()
            },
            layout: Layout {
                style: PromptStyle::Powerline,
                ps1_format: String::new(),
                ps2_format: "> ".to_string(),
                rprompt_format: String::new(),
                enable_transient: false,
                transient_format: String::new(),
                newline_before_prompt: false,
            },
            enabled_segments: vec![
                "user".to_string(),
                "directory".to_string(),
                "git".to_string(),
                "status".to_string(),
            ],
            segment_overrides: Vec::new(),
            syntax: HashMap::new(),
        }
    }
}

/// Where a registered theme came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSource {
    BuiltIn,
    User(PathBuf),
}

impl std::fmt::Display for ThemeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeSource::BuiltIn => write!(f, "built-in"),
            ThemeSource::User(path) => write!(f, "{}", path.display()),
        }
    }
}

struct Registered {
    theme: Arc<Theme>,
    source: ThemeSource,
}

/// Name-keyed theme store with a single active theme.
pub struct ThemeRegistry {
    themes: RwLock<HashMap<String, Registered>>,
    active: RwLock<Arc<Theme>>,
}

impl ThemeRegistry {
    /// A registry holding the built-in themes, with `default` active.
    pub fn with_builtins() -> Self {
        let default = Arc::new(Theme::builtin_default());
        let mut themes = HashMap::new();
        themes.insert(
            "default".to_string(),
            Registered {
                theme: Arc::clone(&default),
                source: ThemeSource::BuiltIn,
            },
        );
        for theme in [Theme::builtin_minimal(), Theme::builtin_powerline()] {
            themes.insert(
                theme.name.clone(),
                Registered {
                    theme: Arc::new(theme),
                    source: ThemeSource::BuiltIn,
                },
            );
        }
        Self {
            themes: RwLock::new(themes),
            active: RwLock::new(default),
        }
    }

    /// Register or replace a theme. User themes override built-ins by name;
    /// if the replaced theme is active, the active reference is swapped too.
    pub fn register(&self, theme: Theme, source: ThemeSource) {
        let name = theme.name.clone();
        let theme = Arc::new(theme);

        let mut themes = self.themes.write().unwrap();
        themes.insert(
            name.clone(),
            Registered {
                theme: Arc::clone(&theme),
                source,
            },
        );
        drop(themes);

        let mut active = self.active.write().unwrap();
        if active.name == name {
            *active = theme;
        }
    }

    /// Make a registered theme the active one.
    pub fn set_active(&self, name: &str) -> Result<Arc<Theme>, PromptError> {
        let themes = self.themes.read().unwrap();
        let registered = themes
            .get(name)
            .ok_or(PromptError::InvalidParameter("unknown theme name"))?;
        let theme = Arc::clone(&registered.theme);
        drop(themes);

        *self.active.write().unwrap() = Arc::clone(&theme);
        Ok(theme)
    }

    /// The active theme. Cheap to call; the returned `Arc` stays coherent
    /// even if a reload swaps the registry entry mid-render.
    pub fn active(&self) -> Arc<Theme> {
        Arc::clone(&self.active.read().unwrap())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Theme>> {
        self.themes
            .read()
            .unwrap()
            .get(name)
            .map(|r| Arc::clone(&r.theme))
    }

    /// Registered themes as `(name, source)`, sorted by name.
    pub fn list(&self) -> Vec<(String, ThemeSource)> {
        let themes = self.themes.read().unwrap();
        let mut out: Vec<(String, ThemeSource)> = themes
            .iter()
            .map(|(name, r)| (name.clone(), r.source.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Discover and register user theme files, validating enabled segments.
    pub fn load_user_themes(&self, segments: &SegmentRegistry) {
        for path in loader::discover_theme_files() {
            match loader::load_theme_file(&path) {
                Ok(theme) => {
                    if theme.validate(segments).is_ok() {
                        self.register(theme, ThemeSource::User(path));
                    }
                }
                Err(e) => {
                    log::warn!("skipping theme file {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Re-run user theme discovery; entries swap atomically and the active
    /// theme follows its name.
    pub fn reload(&self, segments: &SegmentRegistry) {
        self.load_user_themes(segments);
    }
}
