//! Interpolated renderer.
//!
//! Holds the visual state of every known participant and draws it onto a
//! [`Surface`] once per frame: positions ease toward their targets, new
//! avatars fade in, and chat bubbles hold then fade out.

mod avatar;
mod surface;
mod text_surface;
mod viewport;
mod wrap;

use std::collections::HashMap;

use hiroba_shared::position::Position;

pub use avatar::{Avatar, BUBBLE_HOLD, ChatBubble, EASE_FACTOR, FADE_IN_STEP};
#[cfg(test)]
pub use surface::MockSurface;
pub use surface::{AvatarSprite, BubbleSprite, Surface};
pub use text_surface::{FrameHandle, TextSurface};
pub use viewport::Viewport;
pub use wrap::{BUBBLE_WRAP_WIDTH, wrap_text};

pub struct Renderer {
    viewport: Viewport,
    avatars: HashMap<String, Avatar>,
}

impl Renderer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            avatars: HashMap::new(),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Forget every avatar (a fresh `welcome` reseeds the scene).
    pub fn clear(&mut self) {
        self.avatars.clear();
    }

    /// Adds an avatar, or retargets and renames an existing one.
    pub fn upsert(&mut self, id: &str, name: &str, position: Position, is_self: bool) {
        match self.avatars.get_mut(id) {
            Some(avatar) => {
                avatar.name = name.to_string();
                avatar.is_self = is_self;
                avatar.set_target(position);
            }
            None => {
                self.avatars
                    .insert(id.to_string(), Avatar::new(id, name, position, is_self));
            }
        }
    }

    pub fn set_target(&mut self, id: &str, position: Position) -> bool {
        match self.avatars.get_mut(id) {
            Some(avatar) => {
                avatar.set_target(position);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.avatars.remove(id).is_some()
    }

    pub fn show_chat(&mut self, id: &str, text: &str, now_millis: i64) -> bool {
        match self.avatars.get_mut(id) {
            Some(avatar) => {
                avatar.show_chat(text, now_millis);
                true
            }
            None => false,
        }
    }

    pub fn avatar(&self, id: &str) -> Option<&Avatar> {
        self.avatars.get(id)
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }

    /// Advance every avatar by one frame.
    pub fn step(&mut self, now_millis: i64) {
        for avatar in self.avatars.values_mut() {
            avatar.step(now_millis);
        }
    }

    /// Back to front: ascending current `y`, ties by id.
    pub fn draw_order(&self) -> Vec<&Avatar> {
        let mut ordered: Vec<&Avatar> = self.avatars.values().collect();
        ordered.sort_by(|a, b| {
            a.current
                .y
                .total_cmp(&b.current.y)
                .then_with(|| a.id.cmp(&b.id))
        });
        ordered
    }

    /// Draws one frame. Bubbles go in a second pass so no avatar covers them.
    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.clear();
        let ordered = self.draw_order();

        for avatar in &ordered {
            let (x, y) = self.viewport.to_css(avatar.current);
            surface.draw_avatar(&AvatarSprite {
                id: avatar.id.clone(),
                name: avatar.name.clone(),
                x,
                y,
                opacity: avatar.opacity,
                is_self: avatar.is_self,
            });
        }

        for avatar in &ordered {
            let Some(bubble) = &avatar.bubble else {
                continue;
            };
            let (x, y) = self.viewport.to_css(avatar.current);
            surface.draw_bubble(&BubbleSprite {
                x,
                y,
                lines: bubble.lines.clone(),
                opacity: bubble.opacity,
            });
        }

        surface.present();
    }

    /// Adopt a new viewport and reconfigure the surface for it.
    pub fn resize(&mut self, viewport: Viewport, surface: &mut dyn Surface) {
        self.viewport = viewport;
        let (width, height) = viewport.backing_size();
        surface.resize(width, height);
        surface.set_scale(viewport.device_pixel_ratio);
        // pixel-art avatars
        surface.set_image_smoothing(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{Sequence, predicate::eq};

    fn renderer() -> Renderer {
        Renderer::new(Viewport::new(100.0, 100.0, 1.0))
    }

    #[test]
    fn test_draw_order_sorts_by_y_then_id() {
        // テスト項目: 描画順は y の昇順、同じ y なら id 順
        // given (前提条件):
        let mut renderer = renderer();
        renderer.upsert("c", "C", Position { x: 0.1, y: 0.9 }, false);
        renderer.upsert("b", "B", Position { x: 0.2, y: 0.3 }, false);
        renderer.upsert("a", "A", Position { x: 0.3, y: 0.3 }, true);

        // when (操作):
        let order: Vec<&str> = renderer
            .draw_order()
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();

        // then (期待する結果):
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_upsert_existing_retargets_without_teleport() {
        // テスト項目: 既存アバターへの upsert は瞬間移動せず目標だけ変わる
        // given (前提条件):
        let mut renderer = renderer();
        renderer.upsert("a", "A", Position { x: 0.1, y: 0.1 }, false);

        // when (操作):
        renderer.upsert("a", "A2", Position { x: 0.9, y: 0.9 }, false);

        // then (期待する結果):
        let avatar = renderer.avatar("a").unwrap();
        assert_eq!(avatar.name, "A2");
        assert_eq!(avatar.current, Position { x: 0.1, y: 0.1 });
        assert_eq!(avatar.target, Position { x: 0.9, y: 0.9 });
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        // テスト項目: 未知の id への操作は false を返す
        // given (前提条件):
        let mut renderer = renderer();

        // when (操作) / then (期待する結果):
        assert!(!renderer.set_target("ghost", Position::default()));
        assert!(!renderer.show_chat("ghost", "boo", 0));
        assert!(!renderer.remove("ghost"));
        assert!(renderer.is_empty());
    }

    #[test]
    fn test_draw_emits_avatars_then_bubbles() {
        // テスト項目: アバターを奥から順に描き、その後に吹き出し、最後に present
        // given (前提条件):
        let mut renderer = renderer();
        renderer.upsert("front", "Front", Position { x: 0.5, y: 0.75 }, false);
        renderer.upsert("back", "Back", Position { x: 0.25, y: 0.25 }, true);
        renderer.show_chat("front", "hi", 0);

        let mut surface = MockSurface::new();
        let mut seq = Sequence::new();
        surface
            .expect_clear()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_draw_avatar()
            .withf(|s| s.id == "back" && s.is_self && s.x == 25.0 && s.y == 25.0)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_draw_avatar()
            .withf(|s| s.id == "front" && !s.is_self)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_draw_bubble()
            .withf(|b| b.lines == vec!["hi".to_string()] && b.x == 50.0 && b.y == 75.0)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_present()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        // when (操作):
        renderer.draw(&mut surface);

        // then (期待する結果): MockSurface の期待値で検証される
    }

    #[test]
    fn test_resize_scales_surface_and_disables_smoothing() {
        // テスト項目: resize は dpr 倍のサイズに変更し、スケールを設定し、スムージングを切る
        // given (前提条件):
        let mut renderer = renderer();
        let mut surface = MockSurface::new();
        surface
            .expect_resize()
            .with(eq(1600), eq(900))
            .times(1)
            .return_const(());
        surface
            .expect_set_scale()
            .with(eq(2.0))
            .times(1)
            .return_const(());
        surface
            .expect_set_image_smoothing()
            .with(eq(false))
            .times(1)
            .return_const(());

        // when (操作):
        renderer.resize(Viewport::new(800.0, 450.0, 2.0), &mut surface);

        // then (期待する結果):
        assert_eq!(renderer.viewport().css_width, 800.0);
    }

    #[test]
    fn test_step_advances_every_avatar() {
        // テスト項目: step で全アバターがフェードインする
        // given (前提条件):
        let mut renderer = renderer();
        renderer.upsert("a", "A", Position::default(), false);
        renderer.upsert("b", "B", Position::default(), false);

        // when (操作):
        renderer.step(0);

        // then (期待する結果):
        assert!(renderer.draw_order().iter().all(|a| a.opacity > 0.0));
    }
}
