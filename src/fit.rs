use crate::{
    core::IntRect,
    error::{WipeError, WipeResult},
};

/// How the source image is scaled onto the canvas before the wipe runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    Cover,
    Contain,
    Fit,
    None,
}

impl std::str::FromStr for FitMode {
    type Err = WipeError;

    fn from_str(s: &str) -> WipeResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            "fit" => Ok(Self::Fit),
            "none" => Ok(Self::None),
            other => Err(WipeError::InvalidMode(other.to_string())),
        }
    }
}

/// Source and destination rects for drawing the image onto the canvas.
/// Content is centered on any axis that is cropped or letterboxed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DrawRects {
    pub source: IntRect,
    pub dest: IntRect,
}

impl DrawRects {
    /// [sx, sy, sw, sh, dx, dy, dw, dh]
    pub fn to_array(self) -> [u32; 8] {
        [
            self.source.x,
            self.source.y,
            self.source.width,
            self.source.height,
            self.dest.x,
            self.dest.y,
            self.dest.width,
            self.dest.height,
        ]
    }
}

pub fn calculate_image_dims(
    image_width: u32,
    image_height: u32,
    canvas_width: u32,
    canvas_height: u32,
    mode: FitMode,
) -> WipeResult<DrawRects> {
    if image_width == 0 || image_height == 0 {
        return Err(WipeError::validation("image width/height must be > 0"));
    }
    if canvas_width == 0 || canvas_height == 0 {
        return Err(WipeError::validation("canvas width/height must be > 0"));
    }

    let image_aspect = f64::from(image_width) / f64::from(image_height);
    let canvas_aspect = f64::from(canvas_width) / f64::from(canvas_height);
    let is_wider_than_canvas = image_aspect > canvas_aspect;

    let mut source = IntRect::new(0, 0, image_width, image_height);
    let mut dest = IntRect::new(0, 0, canvas_width, canvas_height);

    match mode {
        FitMode::Cover => {
            // Crop the longer source axis; the destination is the full canvas.
            if is_wider_than_canvas {
                source.width = round(f64::from(source.height) * canvas_aspect);
                source.x = round(f64::from(image_width - source.width) / 2.0);
            } else {
                source.height = round(f64::from(source.width) / canvas_aspect);
                source.y = round(f64::from(image_height - source.height) / 2.0);
            }
        }
        FitMode::Contain => {
            // Shrink one destination axis; the source stays whole.
            if is_wider_than_canvas {
                dest.height = round(f64::from(dest.width) / image_aspect);
                dest.y = round(f64::from(canvas_height - dest.height) / 2.0);
            } else {
                dest.width = round(f64::from(dest.height) * image_aspect);
                dest.x = round(f64::from(canvas_width - dest.width) / 2.0);
            }
        }
        FitMode::Fit => {}
        FitMode::None => {
            // No scaling: crop centered where the image overflows the canvas,
            // center in the destination where it fits.
            if image_width > canvas_width {
                source.x = round(f64::from(image_width - canvas_width) / 2.0);
                source.width = canvas_width;
                dest.width = canvas_width;
            } else {
                dest.x = round(f64::from(canvas_width - image_width) / 2.0);
                dest.width = image_width;
            }
            if image_height > canvas_height {
                source.y = round(f64::from(image_height - canvas_height) / 2.0);
                source.height = canvas_height;
                dest.height = canvas_height;
            } else {
                dest.y = round(f64::from(canvas_height - image_height) / 2.0);
                dest.height = image_height;
            }
        }
    }

    Ok(DrawRects { source, dest })
}

fn round(v: f64) -> u32 {
    v.round() as u32
}
