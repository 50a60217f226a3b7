//! Hexadecimal color encoding.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::{CodecError, Decoded};

/// An RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    /// Opaque black.
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    /// Create a color from all four channels.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Create a color from 8-bit channels.
    pub fn from_bytes([r, g, b, a]: [u8; 4]) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Quantize each channel to 8 bits.
    pub fn to_bytes(&self) -> [u8; 4] {
        [
            quantize(self.r),
            quantize(self.g),
            quantize(self.b),
            quantize(self.a),
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_color(self))
    }
}

fn quantize(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Pattern: optional `#`, six hex digits, optional two alpha digits.
fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#?([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})([0-9A-Fa-f]{2})?$")
            .unwrap()
    })
}

/// Encode a color as `#RRGGBB`, or `#RRGGBBAA` when it is not fully opaque.
///
/// # Example
///
/// ```
/// use contentpack::codec::{encode_color, Color};
///
/// assert_eq!(encode_color(&Color::rgb(1.0, 0.5, 0.0)), "#FF8000");
/// assert_eq!(encode_color(&Color::rgba(0.0, 0.0, 0.0, 0.0)), "#00000000");
/// ```
pub fn encode_color(color: &Color) -> String {
    let [r, g, b, a] = color.to_bytes();
    if a == u8::MAX {
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    } else {
        format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}

/// Parse a hex color. Case-insensitive; a missing alpha pair means opaque.
pub fn parse_color(text: &str) -> Result<Color, CodecError> {
    let trimmed = text.trim();
    let captures = color_pattern()
        .captures(trimmed)
        .ok_or_else(|| CodecError::InvalidColor(text.to_string()))?;

    let channel = |index: usize| {
        captures
            .get(index)
            .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
    };

    match (channel(1), channel(2), channel(3)) {
        (Some(r), Some(g), Some(b)) => {
            let a = channel(4).unwrap_or(u8::MAX);
            Ok(Color::from_bytes([r, g, b, a]))
        }
        _ => Err(CodecError::InvalidColor(text.to_string())),
    }
}

/// Decode a color, keeping `prior` when the text is malformed.
pub fn decode_color_or(text: &str, prior: Color) -> Decoded<Color> {
    match parse_color(text) {
        Ok(color) => Decoded::parsed(color),
        Err(e) => Decoded::kept(prior, e),
    }
}
