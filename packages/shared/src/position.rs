//! Normalized canvas coordinates.

use serde::{Deserialize, Serialize};

/// Clamp a coordinate into `[0, 1]`. Non-finite input maps to `0`.
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// A point on the shared canvas, each axis normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Build a position, clamping both axes into range.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp01(x),
            y: clamp01(y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01_keeps_values_in_range() {
        // テスト項目: 範囲内の値はそのまま返される
        // given (前提条件):
        let values = [0.0, 0.25, 1.0];

        // when (操作):
        let clamped: Vec<f64> = values.iter().map(|v| clamp01(*v)).collect();

        // then (期待する結果):
        assert_eq!(clamped, vec![0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_clamp01_clamps_out_of_range_values() {
        // テスト項目: 範囲外の値は [0, 1] に丸められる
        // given (前提条件):

        // when (操作):
        let low = clamp01(-3.5);
        let high = clamp01(42.0);
        let inf = clamp01(f64::INFINITY);
        let nan = clamp01(f64::NAN);

        // then (期待する結果):
        assert_eq!(low, 0.0);
        assert_eq!(high, 1.0);
        assert_eq!(inf, 1.0);
        assert_eq!(nan, 0.0);
    }

    #[test]
    fn test_position_clamped() {
        // テスト項目: Position::clamped は両軸を丸める
        // given (前提条件):

        // when (操作):
        let pos = Position::clamped(1.5, -0.2);

        // then (期待する結果):
        assert_eq!(pos, Position { x: 1.0, y: 0.0 });
    }
}
