//! Theme system for highlighted output
//!
//! Provides YAML-based themes with compile-time embedded built-ins and
//! user-defined themes from the config directory.
//!
//! Theme loading priority:
//! 1. User config: `~/.config/streamlight/themes/{id}.yaml`
//! 2. Embedded: Built-in themes compiled into binary

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize, Serializer};

use crate::syntax::{HighlightId, HIGHLIGHT_NAMES};

// Embed theme YAML files at compile time
pub const GITHUB_DARK_YAML: &str = include_str!("../themes/github-dark.yaml");
pub const GITHUB_LIGHT_YAML: &str = include_str!("../themes/github-light.yaml");
pub const DEFAULT_DARK_YAML: &str = include_str!("../themes/default-dark.yaml");

/// Theme used when a request names none
pub const FALLBACK_THEME: &str = "github-dark";

/// A built-in theme entry
pub struct BuiltinTheme {
    /// Stable identifier (e.g. "github-dark")
    pub id: &'static str,
    /// Embedded YAML content
    pub yaml: &'static str,
}

/// Registry of all built-in themes
pub const BUILTIN_THEMES: &[BuiltinTheme] = &[
    BuiltinTheme {
        id: "github-dark",
        yaml: GITHUB_DARK_YAML,
    },
    BuiltinTheme {
        id: "github-light",
        yaml: GITHUB_LIGHT_YAML,
    },
    BuiltinTheme {
        id: "default-dark",
        yaml: DEFAULT_DARK_YAML,
    },
];

/// Where the theme came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeSource {
    /// User-defined theme in ~/.config/streamlight/themes/
    User,
    /// Built-in theme embedded in binary
    Builtin,
}

/// Information about an available theme
#[derive(Debug, Clone)]
pub struct ThemeInfo {
    pub id: String,
    pub name: String,
    pub source: ThemeSource,
}

/// Load a theme from a YAML file
pub fn from_file(id: &str, path: &Path) -> Result<Theme, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read theme file {}: {}", path.display(), e))?;
    Theme::from_yaml(id, &content)
}

/// Theme ids are bare file stems: ASCII letters, digits, `-` and `_`
pub fn is_valid_theme_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Load theme by id with priority: user → builtin
pub fn load_theme(id: &str) -> Result<Theme, String> {
    if !is_valid_theme_id(id) {
        return Err(format!("Invalid theme id: {:?}", id));
    }

    if let Some(user_dir) = crate::config_paths::themes_dir() {
        let user_path = user_dir.join(format!("{}.yaml", id));
        if user_path.exists() {
            tracing::info!("Loading user theme from {}", user_path.display());
            return from_file(id, &user_path);
        }
    }

    tracing::debug!("Loading builtin theme: {}", id);
    Theme::from_builtin(id)
}

/// List all available themes, user themes shadowing builtins with the same id
pub fn list_available_themes() -> Vec<ThemeInfo> {
    let mut themes = Vec::new();
    let mut seen_ids = HashSet::new();

    if let Some(user_dir) = crate::config_paths::themes_dir() {
        if let Ok(entries) = std::fs::read_dir(&user_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
                {
                    continue;
                }
                let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|id| is_valid_theme_id(id))
                else {
                    continue;
                };
                if seen_ids.insert(id.to_string()) {
                    let name = from_file(id, &path)
                        .map(|theme| theme.name)
                        .unwrap_or_else(|_| id.to_string());
                    themes.push(ThemeInfo {
                        id: id.to_string(),
                        name,
                        source: ThemeSource::User,
                    });
                }
            }
        }
    }

    for builtin in BUILTIN_THEMES {
        if seen_ids.insert(builtin.id.to_string()) {
            let name = Theme::from_builtin(builtin.id)
                .map(|theme| theme.name)
                .unwrap_or_else(|_| builtin.id.to_string());
            themes.push(ThemeInfo {
                id: builtin.id.to_string(),
                name,
                source: ThemeSource::Builtin,
            });
        }
    }

    themes
}

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGB values (alpha defaults to 255)
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a new color from RGBA values
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse from "#RRGGBB" or "#RRGGBBAA" hex string
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            let digits = s
                .get(range)
                .ok_or_else(|| format!("Invalid color format: {}", s))?;
            u8::from_str_radix(digits, 16).map_err(|e| e.to_string())
        };
        match s.len() {
            6 => Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => Err(format!("Invalid color format: {}", s)),
        }
    }

    /// CSS hex notation, alpha only when not opaque
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Raw theme data as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeData {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub block: BlockColorsData,
    /// Capture name → hex color
    #[serde(default)]
    pub syntax: BTreeMap<String, String>,
}

/// Code block colors (raw strings from YAML)
#[derive(Debug, Clone, Deserialize)]
pub struct BlockColorsData {
    pub background: String,
    pub foreground: String,
}

/// Resolved theme with parsed colors
#[derive(Debug, Clone)]
pub struct Theme {
    /// Identifier the theme was loaded under
    pub id: String,
    /// Display name from YAML
    pub name: String,
    pub background: Color,
    pub foreground: Color,
    /// Resolved color per HighlightId (parents already applied)
    syntax: Vec<Option<Color>>,
}

impl Theme {
    /// Load theme from YAML string
    pub fn from_yaml(id: &str, yaml: &str) -> Result<Self, String> {
        let data: ThemeData =
            serde_yaml::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))?;
        Self::from_data(id, data)
    }

    /// Load a built-in theme by id
    pub fn from_builtin(id: &str) -> Result<Self, String> {
        let entry = BUILTIN_THEMES
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("Unknown theme id: {}", id))?;
        Theme::from_yaml(entry.id, entry.yaml)
    }

    /// Convert raw theme data to resolved theme
    pub fn from_data(id: &str, data: ThemeData) -> Result<Self, String> {
        let mut explicit = BTreeMap::new();
        for (scope, hex) in &data.syntax {
            explicit.insert(scope.as_str(), Color::from_hex(hex)?);
        }

        // "keyword.return" falls back to "keyword" when not styled itself
        let syntax = HIGHLIGHT_NAMES
            .iter()
            .map(|name| {
                let mut current = *name;
                loop {
                    if let Some(color) = explicit.get(current) {
                        return Some(*color);
                    }
                    let dot = current.rfind('.')?;
                    current = &current[..dot];
                }
            })
            .collect();

        Ok(Theme {
            id: id.to_string(),
            name: data.name,
            background: Color::from_hex(&data.block.background)?,
            foreground: Color::from_hex(&data.block.foreground)?,
            syntax,
        })
    }

    /// Color for a highlight, `None` when the theme leaves it unstyled
    pub fn color_for(&self, highlight: HighlightId) -> Option<Color> {
        self.syntax.get(highlight as usize).copied().flatten()
    }

    /// Color for a capture name, falling back to the foreground
    pub fn color_for_scope(&self, scope: Option<&str>) -> Color {
        scope
            .and_then(crate::syntax::highlight_id_for_name)
            .and_then(|id| self.color_for(id))
            .unwrap_or(self.foreground)
    }

    /// Fallback theme, YAML-backed with a Rust fallback
    pub fn github_dark() -> Self {
        match Theme::from_builtin(FALLBACK_THEME) {
            Ok(theme) => theme,
            Err(_) => Theme {
                id: FALLBACK_THEME.to_string(),
                name: "GitHub Dark".to_string(),
                background: Color::rgb(0x24, 0x29, 0x2E),
                foreground: Color::rgb(0xE1, 0xE4, 0xE8),
                syntax: vec![None; HIGHLIGHT_NAMES.len()],
            },
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::github_dark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::highlight_id_for_name;

    #[test]
    fn test_builtins_parse() {
        for builtin in BUILTIN_THEMES {
            let theme = Theme::from_builtin(builtin.id)
                .unwrap_or_else(|e| panic!("{} failed: {}", builtin.id, e));
            assert_eq!(theme.id, builtin.id);
        }
    }

    #[test]
    fn test_parent_scope_fallback() {
        let theme = Theme::github_dark();
        let keyword = theme.color_for(highlight_id_for_name("keyword").unwrap());
        let ret = theme.color_for(highlight_id_for_name("keyword.return").unwrap());
        assert!(keyword.is_some());
        assert_eq!(keyword, ret);
    }

    #[test]
    fn test_child_scope_overrides_parent() {
        let theme = Theme::from_builtin("default-dark").unwrap();
        let keyword = theme.color_for(highlight_id_for_name("keyword").unwrap());
        let ret = theme.color_for(highlight_id_for_name("keyword.return").unwrap());
        assert_eq!(ret, Some(Color::rgb(0xC5, 0x86, 0xC0)));
        assert_ne!(keyword, ret);
    }

    #[test]
    fn test_unstyled_scope_uses_foreground() {
        let theme = Theme::github_dark();
        assert_eq!(theme.color_for_scope(None), theme.foreground);
        assert_eq!(theme.color_for_scope(Some("nonexistent")), theme.foreground);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let yaml = r##"
version: 1
name: Broken
block:
  background: "#12"
  foreground: "#FFFFFF"
"##;
        assert!(Theme::from_yaml("broken", yaml).is_err());
    }

    #[test]
    fn test_non_ascii_color_is_an_error() {
        assert!(Color::from_hex("#aééb").is_err());
        assert!(Color::from_hex("#ééééaa").is_err());
    }

    #[test]
    fn test_theme_id_validation() {
        assert!(is_valid_theme_id("github-dark"));
        assert!(is_valid_theme_id("my_theme2"));
        assert!(!is_valid_theme_id(""));
        assert!(!is_valid_theme_id("../etc/leak"));
        assert!(!is_valid_theme_id("./github-dark"));
        assert!(!is_valid_theme_id("a\\b"));
        assert!(!is_valid_theme_id("dark.yaml"));
    }

    #[test]
    fn test_load_theme_rejects_paths() {
        let err = load_theme("../../outside/leak").unwrap_err();
        assert!(err.contains("Invalid theme id"));
        assert!(load_theme("github-light").is_ok());
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Color::rgb(0x24, 0x29, 0x2E).to_hex(), "#24292e");
        assert_eq!(Color::rgba(0, 0, 0, 0x80).to_hex(), "#00000080");
    }
}
