//! Character-grid [`Surface`] for terminals.
//!
//! One CSS pixel is one cell. `@` marks the local avatar, `o` everyone else
//! (`.` while still fading in); names sit to the right of the glyph and
//! bubbles are stacked above it.

use std::sync::{Arc, Mutex, PoisonError};

use super::surface::{AvatarSprite, BubbleSprite, Surface};

/// Shared view of the most recently presented frame.
#[derive(Debug, Clone, Default)]
pub struct FrameHandle(Arc<Mutex<String>>);

impl FrameHandle {
    pub fn latest(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, frame: String) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = frame;
    }
}

const NAME_LABEL_CHARS: usize = 16;

pub struct TextSurface {
    cols: usize,
    rows: usize,
    scale: f64,
    cells: Vec<Vec<char>>,
    frame: FrameHandle,
}

impl TextSurface {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            scale: 1.0,
            cells: vec![vec![' '; cols]; rows],
            frame: FrameHandle::default(),
        }
    }

    pub fn frame_handle(&self) -> FrameHandle {
        self.frame.clone()
    }

    fn cell_of(&self, x: f64, y: f64) -> (usize, usize) {
        let clamp = |v: f64, len: usize| -> usize {
            if len == 0 || !v.is_finite() || v <= 0.0 {
                0
            } else {
                (v.floor() as usize).min(len - 1)
            }
        };
        (clamp(x * self.scale, self.cols), clamp(y * self.scale, self.rows))
    }

    fn put_str(&mut self, col: usize, row: usize, text: &str) {
        let Some(line) = self.cells.get_mut(row) else {
            return;
        };
        for (cell, ch) in line.iter_mut().skip(col).zip(text.chars()) {
            *cell = ch;
        }
    }
}

impl Surface for TextSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.cols = width as usize;
        self.rows = height as usize;
        self.cells = vec![vec![' '; self.cols]; self.rows];
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    // Cells have no sub-pixel blending to turn off.
    fn set_image_smoothing(&mut self, _enabled: bool) {}

    fn clear(&mut self) {
        for line in &mut self.cells {
            line.fill(' ');
        }
    }

    fn draw_avatar(&mut self, sprite: &AvatarSprite) {
        let (col, row) = self.cell_of(sprite.x, sprite.y);
        let glyph = if sprite.is_self {
            '@'
        } else if sprite.opacity < 0.5 {
            '.'
        } else {
            'o'
        };
        self.put_str(col, row, &glyph.to_string());
        let label: String = sprite.name.chars().take(NAME_LABEL_CHARS).collect();
        self.put_str(col + 2, row, &label);
    }

    fn draw_bubble(&mut self, bubble: &BubbleSprite) {
        if bubble.opacity <= 0.0 {
            return;
        }
        let (col, row) = self.cell_of(bubble.x, bubble.y);
        for (i, line) in bubble.lines.iter().rev().enumerate() {
            let Some(target_row) = row.checked_sub(i + 1) else {
                break;
            };
            self.put_str(col, target_row, line);
        }
    }

    fn present(&mut self) {
        let frame = self
            .cells
            .iter()
            .map(|line| line.iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.frame.publish(frame);
    }
}
