use streamlight::syntax::highlight_id_for_name;
use streamlight::theme::{
    list_available_themes, Color, Theme, ThemeSource, BUILTIN_THEMES, DEFAULT_DARK_YAML,
    FALLBACK_THEME, GITHUB_DARK_YAML, GITHUB_LIGHT_YAML,
};

#[test]
fn test_color_from_hex_6() {
    let color = Color::from_hex("#1E1E1E").unwrap();
    assert_eq!(color.r, 0x1E);
    assert_eq!(color.g, 0x1E);
    assert_eq!(color.b, 0x1E);
    assert_eq!(color.a, 255);
}

#[test]
fn test_color_from_hex_8() {
    let color = Color::from_hex("#1E1E1E80").unwrap();
    assert_eq!(color.a, 0x80);
    assert_eq!(color.to_hex(), "#1e1e1e80");
}

#[test]
fn test_color_serializes_as_hex() {
    let json = serde_json::to_string(&Color::rgb(0xFF, 0x7B, 0x72)).unwrap();
    assert_eq!(json, "\"#ff7b72\"");
}

#[test]
fn test_default_theme() {
    let theme = Theme::default();
    assert_eq!(theme.id, FALLBACK_THEME);
    assert_eq!(theme.name, "GitHub Dark");
}

#[test]
fn test_default_dark_yaml_parses() {
    let theme = Theme::from_yaml("default-dark", DEFAULT_DARK_YAML).unwrap();
    assert_eq!(theme.name, "Default Dark");
    assert_eq!(theme.background.r, 0x1E);
}

#[test]
fn test_parse_github_dark() {
    let theme = Theme::from_yaml("github-dark", GITHUB_DARK_YAML).unwrap();
    assert_eq!(theme.name, "GitHub Dark");
    assert_eq!(theme.background, Color::rgb(0x24, 0x29, 0x2E));
}

#[test]
fn test_parse_github_light() {
    let theme = Theme::from_yaml("github-light", GITHUB_LIGHT_YAML).unwrap();
    assert_eq!(theme.name, "GitHub Light");
    assert_eq!(theme.background.r, 0xFF);
}

#[test]
fn test_from_builtin() {
    let theme = Theme::from_builtin("github-light").unwrap();
    assert_eq!(theme.id, "github-light");

    let result = Theme::from_builtin("nonexistent");
    assert!(result.is_err());
}

#[test]
fn test_all_builtin_themes_parse() {
    for builtin in BUILTIN_THEMES {
        let theme = Theme::from_yaml(builtin.id, builtin.yaml)
            .unwrap_or_else(|e| panic!("Failed to parse theme '{}': {}", builtin.id, e));
        assert!(
            !theme.name.is_empty(),
            "Theme '{}' has empty name",
            builtin.id
        );
        let keyword = highlight_id_for_name("keyword").unwrap();
        assert!(
            theme.color_for(keyword).is_some(),
            "Theme '{}' leaves keywords unstyled",
            builtin.id
        );
    }
}

#[test]
fn test_builtins_are_listed() {
    let themes = list_available_themes();
    for builtin in BUILTIN_THEMES {
        assert!(
            themes.iter().any(|info| info.id == builtin.id),
            "missing {}",
            builtin.id
        );
    }
    // User themes shadow builtins, so every id appears once
    let builtin_count = themes
        .iter()
        .filter(|info| info.source == ThemeSource::Builtin)
        .count();
    assert!(builtin_count <= BUILTIN_THEMES.len());
}
