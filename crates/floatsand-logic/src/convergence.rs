//! Exponential smoothing and counter helpers shared by every state.
//!
//! All "progress" quantities in the behavior state machine move toward a
//! target by a fixed fraction of the remaining distance each frame, and are
//! considered arrived once within [`TARGET_EPSILON`].

/// Distance below which a converging quantity counts as arrived.
pub const TARGET_EPSILON: f32 = 0.01;

/// Move `current` toward `target` by `rate` of the remaining distance.
pub fn converge(current: f32, target: f32, rate: f32) -> f32 {
    current + (target - current) * rate
}

/// Whether a converging quantity is close enough to its target.
pub fn is_at_target(current: f32, target: f32) -> bool {
    (target - current).abs() < TARGET_EPSILON
}

/// Step a frame counter by ±1, never dropping below zero.
pub fn step_counter(counter: f32, increment: bool) -> f32 {
    let delta = if increment { 1.0 } else { -1.0 };
    (counter + delta).max(0.0)
}

/// Whether `a` and `b` differ by less than `tolerance`.
pub fn are_almost_equal(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() < tolerance
}

/// GLSL-style step: 1 when `x >= edge`, else 0.
pub fn step(edge: f32, x: f32) -> f32 {
    if x >= edge {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Number of frames for a quantity starting at 0 to reach `threshold`.
    fn frames_to_reach(rate: f32, threshold: f32) -> u32 {
        let mut value = 0.0;
        let mut frames = 0;
        while value < threshold {
            value = converge(value, 1.0, rate);
            frames += 1;
            assert!(frames < 10_000);
        }
        frames
    }

    #[test]
    fn test_converge_distance_shrinks_geometrically() {
        let mut value = 0.0f32;
        for n in 1..=10 {
            value = converge(value, 1.0, 0.2);
            let expected = 1.0 - 0.8f32.powi(n);
            assert!((value - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_converge_frame_counts() {
        assert_eq!(frames_to_reach(0.1, 0.95), 29);
        assert_eq!(frames_to_reach(0.12, 0.99), 37);
        assert_eq!(frames_to_reach(0.35, 0.99), 11);
    }

    #[test]
    fn test_is_at_target() {
        assert!(is_at_target(0.995, 1.0));
        assert!(!is_at_target(0.98, 1.0));
        assert!(is_at_target(0.0, 0.0));
    }

    #[test]
    fn test_step_counter_clamps_at_zero() {
        assert_eq!(step_counter(0.0, false), 0.0);
        assert_eq!(step_counter(2.0, true), 3.0);
        assert_eq!(step_counter(2.0, false), 1.0);
    }

    #[test]
    fn test_step() {
        assert_eq!(step(2.0, 1.9), 0.0);
        assert_eq!(step(2.0, 2.0), 1.0);
    }
}
