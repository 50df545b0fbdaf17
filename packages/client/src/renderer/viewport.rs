//! Mapping between CSS pixels, backing-store pixels and normalized
//! canvas coordinates.

use hiroba_shared::position::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub css_width: f64,
    pub css_height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// A non-positive or non-finite pixel ratio is treated as 1.
    pub fn new(css_width: f64, css_height: f64, device_pixel_ratio: f64) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            css_width: css_width.max(0.0),
            css_height: css_height.max(0.0),
            device_pixel_ratio,
        }
    }

    /// Size of the backing store in device pixels.
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.css_width * self.device_pixel_ratio).round() as u32,
            (self.css_height * self.device_pixel_ratio).round() as u32,
        )
    }

    /// CSS-pixel point → clamped canvas position.
    pub fn normalize(&self, css_x: f64, css_y: f64) -> Position {
        let x = if self.css_width > 0.0 { css_x / self.css_width } else { 0.0 };
        let y = if self.css_height > 0.0 { css_y / self.css_height } else { 0.0 };
        Position::clamped(x, y)
    }

    pub fn to_css(&self, position: Position) -> (f64, f64) {
        (position.x * self.css_width, position.y * self.css_height)
    }
}
