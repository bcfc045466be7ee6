use crate::error::{WipeError, WipeResult};

/// Per-frame animation constants, immutable once computed.
///
/// `big_delta` is the alpha step for the pixel nearest the moving edge of
/// the transition band; `little_delta` for the pixel farthest from it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationSettings {
    pub target_frame_interval: f64, // ms per logical frame
    pub big_delta: u16,
    pub little_delta: u16,
}

/// Convert configured fade durations and a target frame rate into integer
/// per-step alpha increments.
///
/// The edge pixel must reach full opacity within the fast duration, the
/// trailing pixel within the slow one. Frame counts and deltas are clamped
/// to at least 1 so a duration shorter than one frame still advances.
pub fn calculate_animation_settings(
    pixel_fade_intervals: [f64; 2],
    frames_per_second: u32,
) -> WipeResult<AnimationSettings> {
    let [fast_ms, slow_ms] = pixel_fade_intervals;
    if frames_per_second == 0 {
        return Err(WipeError::validation("frames_per_second must be > 0"));
    }
    for ms in [fast_ms, slow_ms] {
        if !ms.is_finite() || ms <= 0.0 {
            return Err(WipeError::validation(
                "pixel fade intervals must be finite and > 0 ms",
            ));
        }
    }

    let target_frame_interval = 1000.0 / f64::from(frames_per_second);
    Ok(AnimationSettings {
        target_frame_interval,
        big_delta: delta_for(fast_ms, target_frame_interval),
        little_delta: delta_for(slow_ms, target_frame_interval),
    })
}

fn delta_for(duration_ms: f64, frame_interval: f64) -> u16 {
    let frames = ((duration_ms / frame_interval).round() as u32).max(1);
    ((255.0 / f64::from(frames)).round() as u16).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_settings_match() {
        let s = calculate_animation_settings([60.0, 340.0], 50).unwrap();
        assert_eq!(s.target_frame_interval, 20.0);
        assert_eq!(s.big_delta, 85);
        assert_eq!(s.little_delta, 15);
    }

    #[test]
    fn big_delta_dominates_when_fast_is_faster() {
        for (fast, slow, fps) in [(100.0, 100.0, 30), (16.0, 4000.0, 60), (1.0, 10_000.0, 24)] {
            let s = calculate_animation_settings([fast, slow], fps).unwrap();
            assert!(s.big_delta >= s.little_delta, "{fast}/{slow}@{fps}");
            assert!(s.big_delta >= 1);
            assert!(s.little_delta >= 1);
        }
    }

    #[test]
    fn sub_frame_durations_still_advance() {
        // One 30fps frame is ~33ms; a 5ms fade must not divide by zero.
        let s = calculate_animation_settings([5.0, 10_000_000.0], 30).unwrap();
        assert_eq!(s.big_delta, 255);
        assert_eq!(s.little_delta, 1);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(calculate_animation_settings([60.0, 340.0], 0).is_err());
        assert!(calculate_animation_settings([0.0, 340.0], 30).is_err());
        assert!(calculate_animation_settings([60.0, f64::NAN], 30).is_err());
    }
}
