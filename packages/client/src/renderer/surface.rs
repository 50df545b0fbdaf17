//! Drawing surface abstraction.
//!
//! Coordinates handed to the surface are CSS pixels; the surface applies the
//! scale it was given in [`Surface::set_scale`].

/// One avatar, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarSprite {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub opacity: f64,
    pub is_self: bool,
}

/// A speech bubble anchored above the avatar at (`x`, `y`).
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleSprite {
    pub x: f64,
    pub y: f64,
    pub lines: Vec<String>,
    pub opacity: f64,
}

#[cfg_attr(test, mockall::automock)]
pub trait Surface: Send {
    /// Resize the backing store, in device pixels.
    fn resize(&mut self, width: u32, height: u32);
    fn set_scale(&mut self, scale: f64);
    fn set_image_smoothing(&mut self, enabled: bool);
    fn clear(&mut self);
    fn draw_avatar(&mut self, sprite: &AvatarSprite);
    fn draw_bubble(&mut self, bubble: &BubbleSprite);
    /// Called once per frame after all drawing.
    fn present(&mut self);
}
