use std::fmt;

use serde::{Deserialize, Serialize};

/// 8-bit RGB color. Serialized as a lowercase `#rrggbb` string so the scene
/// document can hand it straight to the browser viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named colors the interpreter may emit. Anything outside this list falls back
/// to the caller's default.
const PALETTE: &[(&str, Color)] = &[
    ("black", Color::rgb(0, 0, 0)),
    ("white", Color::rgb(255, 255, 255)),
    ("gray", Color::NEUTRAL_GRAY),
    ("grey", Color::NEUTRAL_GRAY),
    ("charcoal", Color::rgb(54, 69, 79)),
    ("navy", Color::rgb(0, 0, 128)),
    ("blue", Color::rgb(0, 0, 255)),
    ("royal", Color::rgb(65, 105, 225)),
    ("sky", Color::rgb(135, 206, 235)),
    ("red", Color::rgb(255, 0, 0)),
    ("maroon", Color::rgb(128, 0, 0)),
    ("burgundy", Color::rgb(128, 0, 32)),
    ("green", Color::rgb(0, 128, 0)),
    ("olive", Color::rgb(128, 128, 0)),
    ("forest", Color::rgb(34, 139, 34)),
    ("khaki", Color::rgb(195, 176, 145)),
    ("beige", Color::rgb(245, 245, 220)),
    ("tan", Color::rgb(210, 180, 140)),
    ("brown", Color::rgb(139, 69, 19)),
    ("orange", Color::rgb(255, 165, 0)),
    ("yellow", Color::rgb(255, 255, 0)),
    ("pink", Color::rgb(255, 192, 203)),
    ("purple", Color::rgb(128, 0, 128)),
];

impl Color {
    pub const NEUTRAL_GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb`, `#rrggbb` (the `#` is optional) or a palette name.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(color) = Self::from_name(s) {
            return Some(color);
        }
        Self::from_hex(s)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        PALETTE
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, color)| *color)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            // Bare three-letter words ("bad", "ace") are names, not shorthand hex.
            3 if hex.trim().starts_with('#') => {
                let mut channels = digits.chars().filter_map(|c| c.to_digit(16));
                let mut next = || channels.next().map(|d| u8::try_from(d * 17).unwrap_or(0));
                Some(Self::rgb(next()?, next()?, next()?))
            }
            6 => {
                let channel = |i: usize| {
                    digits
                        .get(i..i + 2)
                        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                };
                Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::NEUTRAL_GRAY
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::parse(&s).ok_or_else(|| format!("not a color: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(Color::parse("Navy"), Some(Color::rgb(0, 0, 128)));
        assert_eq!(Color::parse("  GREY "), Some(Color::NEUTRAL_GRAY));
    }

    #[test]
    fn hex_forms() {
        assert_eq!(Color::parse("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse("FF8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::parse("#f80"), Some(Color::rgb(255, 136, 0)));
        assert_eq!(Color::parse("#ff80"), None);
        assert_eq!(Color::parse("ace"), None);
        assert_eq!(Color::parse("#gg0000"), None);
    }

    #[test]
    fn unknown_name_is_unrecognized() {
        assert_eq!(Color::parse("sunset shimmer"), None);
        assert_eq!(Color::parse(" Navy "), Some(Color::rgb(0, 0, 128)));
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(0, 0, 128)).unwrap();
        assert_eq!(json, "\"#000080\"");
        let back: Color = serde_json::from_str("\"navy\"").unwrap();
        assert_eq!(back, Color::rgb(0, 0, 128));
    }

    #[test]
    fn default_is_neutral_gray() {
        assert_eq!(Color::default().to_hex(), "#808080");
    }
}
