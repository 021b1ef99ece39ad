//! Deterministic display colours derived from text.

use sha2::{Digest, Sha256};
use std::fmt;

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colour {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Colour {
    /// Build from components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Derive a colour from `text`.
    ///
    /// The first two bytes of the SHA-256 digest (little endian) select a
    /// fully saturated hue, dimmed to 80% brightness.
    pub fn from_text(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let hue = f64::from(u16::from_le_bytes([digest[0], digest[1]])) / f64::from(u16::MAX);

        let (r, g, b) = hue_to_rgb(hue);
        Self {
            r: quantize(r * 0.8),
            g: quantize(g * 0.8),
            b: quantize(b * 0.8),
        }
    }

    /// Parse `"r g b"`, the persisted form.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.split_whitespace().map(|p| p.parse::<u8>());
        let r = parts.next()?.ok()?;
        let g = parts.next()?.ok()?;
        let b = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { r, g, b })
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

/// HSV to RGB with saturation and value fixed at 1.
fn hue_to_rgb(hue: f64) -> (f64, f64, f64) {
    let h = (hue.clamp(0.0, 1.0) * 6.0) % 6.0;
    let x = 1.0 - ((h % 2.0) - 1.0).abs();
    match h as u8 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    }
}

fn quantize(component: f64) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0).round() as u8
}
