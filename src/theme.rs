//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Tile and UI colours, loadable from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile colours (index 0..=5): red, blue, green, yellow, purple, orange.
    pub tile: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, time).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Selection ring around the picked tile.
    pub selection: Color,
    /// Blink colour for cells about to be removed.
    pub highlight: Color,
    /// Inactive / secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic_default()
    }
}

impl Theme {
    /// Hardcoded defaults: the classic bright tile palette on a dark board.
    pub fn classic_default() -> Self {
        Self {
            tile: [
                Color::Rgb(255, 100, 100), // red
                Color::Rgb(100, 150, 255), // blue
                Color::Rgb(100, 255, 100), // green
                Color::Rgb(255, 255, 100), // yellow
                Color::Rgb(255, 100, 255), // purple
                Color::Rgb(255, 165, 0),   // orange
            ],
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0x3F, 0x44, 0x4F),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            selection: Color::White,
            highlight: Color::White,
            inactive_fg: Color::Rgb(0x5C, 0x63, 0x70),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or
    /// `theme[key]='value'`. Falls back to the classic defaults when the
    /// path is None or the file is missing.
    /// `palette` selects the colour variant: Normal, HighContrast, or
    /// Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map)?;
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::classic_default();
        t.apply_palette(palette);
        t
    }

    /// Override tile colours for high-contrast or colorblind variants.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.tile = [
                    Color::Rgb(0xFF, 0x00, 0x00), // red
                    Color::Rgb(0x00, 0x88, 0xFF), // blue
                    Color::Rgb(0x00, 0xFF, 0x00), // green
                    Color::Rgb(0xFF, 0xFF, 0x00), // yellow
                    Color::Rgb(0xFF, 0x00, 0xFF), // purple
                    Color::Rgb(0xFF, 0x88, 0x00), // orange
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito-leaning set: distinguishable without red/green.
                self.tile = [
                    Color::Rgb(0xCC, 0x33, 0x11), // red
                    Color::Rgb(0x00, 0x77, 0xBB), // blue
                    Color::Rgb(0x00, 0x99, 0x88), // teal for green
                    Color::Rgb(0xBB, 0xBB, 0x00), // yellow
                    Color::Rgb(0xEE, 0x33, 0x77), // magenta for purple
                    Color::Rgb(0xEE, 0x77, 0x33), // orange
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let defaults = Self::classic_default();
        let get = |key: &str, fallback: Color| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
                .unwrap_or(fallback)
        };
        Ok(Self {
            tile: [
                get("tile_red", defaults.tile[0]),
                get("tile_blue", defaults.tile[1]),
                get("tile_green", defaults.tile[2]),
                get("tile_yellow", defaults.tile[3]),
                get("tile_purple", defaults.tile[4]),
                get("tile_orange", defaults.tile[5]),
            ],
            bg: get("meter_bg", defaults.bg),
            div_line: get("div_line", defaults.div_line),
            main_fg: get("main_fg", defaults.main_fg),
            title: get("title", defaults.title),
            selection: get("selected_fg", defaults.selection),
            highlight: get("hi_fg", defaults.highlight),
            inactive_fg: get("inactive_fg", defaults.inactive_fg),
        })
    }

    /// Tile colour for colour index (0..6).
    #[inline]
    pub fn tile_color(&self, index: u8) -> Color {
        self.tile[(index as usize) % 6]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let (r, g, b) = if s.len() == 6 {
        let r =
            u8::from_str_radix(&s[0..2], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let g =
            u8::from_str_radix(&s[2..4], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let b =
            u8::from_str_radix(&s[4..6], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let g = u8::from_str_radix(&s[1..2], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let b = u8::from_str_radix(&s[2..3], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        (r, g, b)
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}
