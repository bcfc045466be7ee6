use crate::{
    core::Canvas,
    error::{WipeError, WipeResult},
    fit::FitMode,
    scroll::parse_scroll_length,
    shuffle::WipeDirection,
};

/// Full wipe configuration, immutable for the lifetime of a session.
/// A configuration change means tearing the session down and rebuilding.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WipeConfig {
    pub wipe_direction: WipeDirection,
    /// How the source image is scaled onto the canvas.
    pub image_fit: FitMode,
    /// 0 = strict wipe order, 1 = randomization bounded only by image size.
    pub shuffle_ratio: f64,
    /// Scrollable length, e.g. `4x` (container heights) or `1200px`.
    pub scroll_length: String,
    /// Tear the session down after the first completed reveal.
    pub disable_after_wipe: bool,
    /// Fixed shuffle seed; fresh entropy when absent.
    pub seed: Option<u64>,
    pub options: WipeOptions,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WipeOptions {
    pub boxes_per_view: f64,
    /// [fast, slow] fade durations in ms.
    pub pixel_fade_intervals: [f64; 2],
    pub frames_per_second: u32,
    pub observer_thresholds: Vec<f64>,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            wipe_direction: WipeDirection::Down,
            image_fit: FitMode::Cover,
            shuffle_ratio: 0.1,
            scroll_length: "4x".to_string(),
            disable_after_wipe: false,
            seed: None,
            options: WipeOptions::default(),
        }
    }
}

impl Default for WipeOptions {
    fn default() -> Self {
        Self {
            boxes_per_view: 2.5,
            pixel_fade_intervals: [200.0, 500.0],
            frames_per_second: 30,
            observer_thresholds: vec![0.0, 0.5, 1.0],
        }
    }
}

impl WipeConfig {
    pub fn validate(&self) -> WipeResult<()> {
        if !(0.0..=1.0).contains(&self.shuffle_ratio) {
            return Err(WipeError::validation("shuffle_ratio must be within [0,1]"));
        }
        // Syntax check only; the real resolution happens against the
        // measured container height.
        parse_scroll_length(&self.scroll_length, 1.0)?;
        self.options.validate()
    }

    /// Maximum reveal-order displacement window for a measured canvas.
    pub fn shuffle_offset(&self, canvas: Canvas) -> usize {
        (self.shuffle_ratio * canvas.total_pixels() as f64).round() as usize
    }
}

impl WipeOptions {
    pub fn validate(&self) -> WipeResult<()> {
        if !(self.boxes_per_view.is_finite() && self.boxes_per_view > 0.0) {
            return Err(WipeError::validation("boxes_per_view must be > 0"));
        }
        for ms in self.pixel_fade_intervals {
            if !ms.is_finite() || ms <= 0.0 {
                return Err(WipeError::validation(
                    "pixel_fade_intervals must be finite and > 0 ms",
                ));
            }
        }
        if self.frames_per_second == 0 {
            return Err(WipeError::validation("frames_per_second must be > 0"));
        }
        if self
            .observer_thresholds
            .iter()
            .any(|t| !(0.0..=1.0).contains(t))
        {
            return Err(WipeError::validation(
                "observer_thresholds must be within [0,1]",
            ));
        }
        Ok(())
    }
}
