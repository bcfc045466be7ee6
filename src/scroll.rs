use crate::error::{WipeError, WipeResult};

/// Stable key identifying an observed element: the two boundary sentinels
/// or one of the scroll boxes (addressed by hex index, as the host encodes
/// them).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollKey {
    Top,
    Bottom,
    Box(usize),
}

impl std::str::FromStr for ScrollKey {
    type Err = WipeError;

    fn from_str(s: &str) -> WipeResult<Self> {
        match s {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => usize::from_str_radix(other, 16)
                .map(Self::Box)
                .map_err(|_| {
                    WipeError::validation(format!("unrecognized scroll key '{other}'"))
                }),
        }
    }
}

/// One viewport-intersection sample for one observed element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    pub key: ScrollKey,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct BoxState {
    is_intersecting: bool,
    intersection_ratio: f64,
}

/// Fixed geometry of the scrollable region: `box_count` boxes of
/// `box_height` each, plus one container height of slack.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScrollGeometry {
    pub box_height: f64,
    pub box_count: usize,
    pub container_height: f64,
}

impl ScrollGeometry {
    pub fn measure(
        scroll_length: &str,
        boxes_per_view: f64,
        container_height: f64,
    ) -> WipeResult<Self> {
        if !(boxes_per_view.is_finite() && boxes_per_view > 0.0) {
            return Err(WipeError::validation("boxes_per_view must be > 0"));
        }
        if !(container_height.is_finite() && container_height > 0.0) {
            return Err(WipeError::validation("container height must be > 0"));
        }

        let base_scroll_height = parse_scroll_length(scroll_length, container_height)?;
        let box_height = (container_height / boxes_per_view).round();
        if box_height < 1.0 {
            return Err(WipeError::validation(
                "boxes_per_view leaves boxes under one pixel tall",
            ));
        }
        let box_count = (base_scroll_height / box_height).ceil() as usize;
        if box_count == 0 {
            return Err(WipeError::validation(
                "scroll length resolves to less than one box",
            ));
        }

        Ok(Self {
            box_height,
            box_count,
            container_height,
        })
    }

    pub fn total_scroll_height(&self) -> f64 {
        self.box_height * self.box_count as f64 + self.container_height
    }
}

/// Parse a scroll length like `2.5x` (multiples of the container height)
/// or `1200px` into pixels.
pub fn parse_scroll_length(raw: &str, container_height: f64) -> WipeResult<f64> {
    let s = raw.trim();
    let digits_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (value_str, unit) = s.split_at(digits_end);

    if value_str.is_empty() || unit.is_empty() {
        return Err(WipeError::InvalidLength(raw.to_string()));
    }
    let value: f64 = value_str
        .parse()
        .map_err(|_| WipeError::InvalidLength(raw.to_string()))?;

    match unit {
        "x" => Ok(value * container_height),
        "px" => Ok(value),
        _ => Err(WipeError::InvalidUnit {
            raw: raw.to_string(),
            unit: unit.to_string(),
        }),
    }
}

/// Reducer over intersection samples: folds each observation batch into
/// the per-box state and the boundary flags, and derives a continuous
/// progress value in [0,1].
///
/// Intersection ratios alone cannot tell "just entered" from "just exited"
/// at the two physical ends of the region; the sentinel flags break those
/// ties, which is why the four cases are evaluated in strict priority
/// order.
pub struct ScrollProgressAggregator {
    is_near_beginning: bool,
    is_near_end: bool,
    boxes: Vec<BoxState>,
    geometry: ScrollGeometry,
    last_emitted: Option<f64>,
}

impl ScrollProgressAggregator {
    pub fn new(geometry: ScrollGeometry) -> Self {
        Self {
            is_near_beginning: true,
            is_near_end: false,
            boxes: vec![BoxState::default(); geometry.box_count],
            geometry,
            last_emitted: None,
        }
    }

    /// Fold one observation batch. Returns the new progress value, or
    /// `None` when it matches the previously emitted one (no redundant
    /// retargets downstream).
    pub fn observe(&mut self, entries: &[IntersectionEntry]) -> WipeResult<Option<f64>> {
        for entry in entries {
            match entry.key {
                ScrollKey::Top => self.is_near_beginning = entry.is_intersecting,
                ScrollKey::Bottom => self.is_near_end = entry.is_intersecting,
                ScrollKey::Box(index) => {
                    let state = self.boxes.get_mut(index).ok_or_else(|| {
                        WipeError::validation(format!(
                            "scroll key references box {index} of {}",
                            self.geometry.box_count
                        ))
                    })?;
                    state.is_intersecting = entry.is_intersecting;
                    state.intersection_ratio = entry.intersection_ratio;
                }
            }
        }

        let first_visible = self.boxes.iter().position(|b| b.is_intersecting);
        let last_visible = self.boxes.iter().rposition(|b| b.is_intersecting);
        let box_height = self.geometry.box_height;
        let total = self.geometry.total_scroll_height();

        let progress = if self.is_near_beginning && first_visible.is_none() {
            tracing::debug!("at top");
            0.0
        } else if !self.is_near_end {
            let Some(last) = last_visible else {
                // No box visible away from both sentinels: a sample hole.
                // Hold the previous value rather than invent one.
                return Ok(None);
            };
            let y_offset =
                last as f64 * box_height + self.boxes[last].intersection_ratio * box_height;
            tracing::debug!(y_offset, "in the middle");
            y_offset / total
        } else if let Some(first) = first_visible {
            let y_remaining = (self.geometry.box_count - first - 1) as f64 * box_height
                + self.boxes[first].intersection_ratio * box_height;
            tracing::debug!(y_remaining, "near the bottom");
            (total - y_remaining) / total
        } else {
            tracing::debug!("at bottom");
            1.0
        };

        if self.last_emitted == Some(progress) {
            return Ok(None);
        }
        self.last_emitted = Some(progress);
        Ok(Some(progress))
    }

    pub fn progress(&self) -> Option<f64> {
        self.last_emitted
    }
}
