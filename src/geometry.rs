//! Shared geometric and color primitives used across capture, editor and export.
//!
//! Every point, size and rectangle carries a zero-sized tag naming the
//! coordinate space it was measured in, so a viewport rectangle cannot be
//! handed to the compositor where a page-relative one is expected.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait CoordinateSpace: fmt::Debug + Clone + Copy + PartialEq + Default {
    const NAME: &'static str;
}

/// Raw pointer/selection coordinates, origin top-left of the browser viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport;

/// The fixed-size placement preview surface, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preview;

/// Pixels relative to the rendered page's top-left corner at the active render scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRelative;

/// Native PDF user space: points, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdfPoints;

impl CoordinateSpace for Viewport {
    const NAME: &'static str = "viewport";
}

impl CoordinateSpace for Preview {
    const NAME: &'static str = "preview";
}

impl CoordinateSpace for PageRelative {
    const NAME: &'static str = "page-relative";
}

impl CoordinateSpace for PdfPoints {
    const NAME: &'static str = "pdf-point";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point<S> {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size<S: CoordinateSpace> {
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Size<S> {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            space: PhantomData,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Rect<S> {
    /// Builds a rectangle; negative or non-finite extents collapse to zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: non_negative(width),
            height: non_negative(height),
            space: PhantomData,
        }
    }

    pub fn from_origin_size(origin: Point<S>, size: Size<S>) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub const fn origin(&self) -> Point<S> {
        Point::new(self.x, self.y)
    }

    pub const fn size(&self) -> Size<S> {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest rectangle covering both inputs.
    pub fn union(&self, other: &Self) -> Self {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Keeps the rectangle inside `bounds`, shrinking it first if it is larger.
    pub fn clamped_within(&self, bounds: Size<S>) -> Self {
        let width = self.width.min(non_negative(bounds.width));
        let height = self.height.min(non_negative(bounds.height));
        let x = self.x.clamp(0.0, (bounds.width - width).max(0.0));
        let y = self.y.clamp(0.0, (bounds.height - height).max(0.0));
        Self::new(x, y, width, height)
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

impl<S: CoordinateSpace> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[x={:.2} y={:.2} w={:.2} h={:.2}]",
            S::NAME,
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color must be six hex digits, got {0:?}")]
    InvalidLength(String),
    #[error("color contains non-hex digits: {0:?}")]
    InvalidDigit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const GOLD: Color = Color::new(0xFF, 0xD7, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() != 6 {
            return Err(ColorParseError::InvalidLength(value.to_string()));
        }
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ColorParseError::InvalidDigit(value.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Channels as 0..=1 floats, the form PDF color operators take.
    pub fn unit_rgb(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::GOLD
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_new_collapses_negative_and_nan_extents() {
        let rect = Rect::<Viewport>::new(4.0, 5.0, -3.0, f64::NAN);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.height, 0.0);
        assert!(rect.is_empty());
    }

    #[test]
    fn rect_union_covers_both_inputs() {
        let a = Rect::<Viewport>::new(10.0, 20.0, 30.0, 10.0);
        let b = Rect::<Viewport>::new(5.0, 25.0, 10.0, 20.0);
        let union = a.union(&b);
        assert_eq!(union, Rect::new(5.0, 20.0, 35.0, 25.0));
    }

    #[test]
    fn rect_clamped_within_keeps_box_inside_bounds() {
        let bounds = Size::<Preview>::new(300.0, 200.0);
        let rect = Rect::<Preview>::new(280.0, -10.0, 50.0, 40.0).clamped_within(bounds);
        assert_eq!(rect, Rect::new(250.0, 0.0, 50.0, 40.0));

        let oversized = Rect::<Preview>::new(10.0, 10.0, 400.0, 40.0).clamped_within(bounds);
        assert_eq!(oversized, Rect::new(0.0, 10.0, 300.0, 40.0));
    }

    #[test]
    fn size_is_degenerate_for_zero_or_infinite_dimensions() {
        assert!(Size::<Preview>::new(0.0, 10.0).is_degenerate());
        assert!(Size::<Preview>::new(10.0, f64::INFINITY).is_degenerate());
        assert!(!Size::<Preview>::new(10.0, 10.0).is_degenerate());
    }

    #[test]
    fn color_parses_hex_with_or_without_hash() {
        assert_eq!(Color::from_hex("#FFD700"), Ok(Color::GOLD));
        assert_eq!(Color::from_hex("ffd700"), Ok(Color::GOLD));
        assert_eq!(Color::GOLD.to_hex(), "#FFD700");
    }

    #[test]
    fn color_rejects_short_and_non_hex_input() {
        assert!(matches!(
            Color::from_hex("#FFF"),
            Err(ColorParseError::InvalidLength(_))
        ));
        assert!(matches!(
            Color::from_hex("#GG0000"),
            Err(ColorParseError::InvalidDigit(_))
        ));
    }

    #[test]
    fn color_unit_rgb_matches_pdf_channel_range() {
        let [r, g, b] = Color::GOLD.unit_rgb();
        assert_eq!(r, 1.0);
        assert!((g - 0.843).abs() < 0.001);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn color_round_trips_through_json_as_hex_string() {
        let json = serde_json::to_string(&Color::new(0x12, 0x34, 0x56)).expect("serialize");
        assert_eq!(json, "\"#123456\"");
        let parsed: Color = serde_json::from_str("\"#FFD700\"").expect("deserialize");
        assert_eq!(parsed, Color::GOLD);
    }
}
