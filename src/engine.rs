use crate::{
    core::{Canvas, FrameRgba, IntRect},
    error::{WipeError, WipeResult},
    fit::DrawRects,
    surface::WipeSurface,
    timing::AnimationSettings,
};

/// What a single engine step did. `Converged { completed: true }` means a
/// forward sweep just left every pixel opaque; the caller owns the
/// completion callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// No frame was pending.
    Idle,
    /// Less than one logical frame of wall time elapsed; nothing advanced,
    /// the pending frame was re-scheduled.
    Throttled,
    /// Advanced and rendered; another frame is pending.
    Running,
    /// The sweep reached its target and the frame loop exited.
    Converged { completed: bool },
}

/// The single scheduled animation step. `retarget` replaces this wholesale,
/// so at most one step is ever in flight.
#[derive(Clone, Copy, Debug)]
struct PendingFrame {
    target_last_pixel: usize,
    prev_timestamp: Option<f64>,
    was_forward: bool,
}

/// Stateful reveal engine: owns the alpha-animated destination buffer and
/// the offscreen frame, and advances the active window toward the most
/// recently requested target on each `step`.
pub struct PixelRevealEngine {
    canvas: Canvas,
    settings: AnimationSettings,
    /// Alpha-animated RGBA8 image data (the scaled source with alpha 0).
    dest: Vec<u8>,
    /// Second buffer; receives only the dirty rect, then is presented whole.
    offscreen: FrameRgba,
    /// Destination fit rect, the only region `dest` ever paints.
    dirty: IntRect,
    order: Vec<u32>,
    total_pixels: usize,
    /// Index into `order` of the last leading fully-opaque pixel, -1 if none.
    last_opaque_pixel: i64,
    /// One past the last leading pixel with alpha > 0.
    last_pixel: usize,
    target_last_pixel: usize,
    pending: Option<PendingFrame>,
}

impl PixelRevealEngine {
    pub fn new(
        canvas: Canvas,
        source: &image::RgbaImage,
        rects: DrawRects,
        order: Vec<u32>,
        settings: AnimationSettings,
    ) -> WipeResult<Self> {
        let total_pixels = canvas.total_pixels();
        validate_order(&order, total_pixels)?;

        let source_rect = rects
            .source
            .clipped_to(source.width(), source.height());
        let dirty = rects.dest.clipped_to(canvas.width, canvas.height);
        if source_rect.is_empty() || dirty.is_empty() {
            return Err(WipeError::validation(
                "image draw rects do not overlap the canvas",
            ));
        }

        let mut dest = vec![0u8; total_pixels * 4];
        draw_rgb_nearest(source, source_rect, &mut dest, canvas.width, dirty);

        Ok(Self {
            canvas,
            settings,
            dest,
            offscreen: FrameRgba::transparent(canvas.width, canvas.height),
            dirty,
            order,
            total_pixels,
            last_opaque_pixel: -1,
            last_pixel: 0,
            target_last_pixel: 0,
            pending: None,
        })
    }

    /// Point the animation at a new scroll progress value. Cancels any
    /// pending step and schedules a fresh one; the next `step` advances
    /// exactly one logical frame and resolves the sweep direction anew.
    pub fn retarget(&mut self, progress: f64) {
        let target = (progress * self.total_pixels as f64).round() as usize;
        let target = target.min(self.total_pixels);
        tracing::trace!(target, "retarget");
        self.pending = Some(PendingFrame {
            target_last_pixel: target,
            prev_timestamp: None,
            was_forward: false,
        });
    }

    /// Advance the animation. Invoked by the host once per display frame
    /// with a monotonic wall-clock timestamp in milliseconds.
    pub fn step(
        &mut self,
        timestamp_ms: f64,
        surface: &mut dyn WipeSurface,
    ) -> WipeResult<StepOutcome> {
        let Some(pending) = self.pending.take() else {
            return Ok(StepOutcome::Idle);
        };

        // The first step after a retarget advances exactly once; later
        // steps are paced against wall time so fast hardware never
        // over-advances and slow hardware catches up in bigger strides.
        let steps = match pending.prev_timestamp {
            None => 1,
            Some(prev) => {
                let elapsed = timestamp_ms - prev;
                (elapsed / self.settings.target_frame_interval).floor().max(0.0) as u64
            }
        };
        if steps == 0 {
            self.pending = Some(pending);
            return Ok(StepOutcome::Throttled);
        }

        let forward = if pending.target_last_pixel != self.target_last_pixel {
            pending.target_last_pixel > self.target_last_pixel
        } else {
            pending.was_forward
        };
        self.target_last_pixel = pending.target_last_pixel;

        let has_more = if forward {
            self.sweep_forward(steps)
        } else {
            self.sweep_backward(steps)
        };
        self.render(surface)?;

        if has_more {
            self.pending = Some(PendingFrame {
                target_last_pixel: self.target_last_pixel,
                prev_timestamp: Some(timestamp_ms),
                was_forward: forward,
            });
            return Ok(StepOutcome::Running);
        }

        let completed = self.last_opaque_pixel == self.total_pixels as i64 - 1;
        if completed {
            tracing::debug!("forward sweep fully completed");
        }
        Ok(StepOutcome::Converged { completed })
    }

    pub fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    pub fn total_pixels(&self) -> usize {
        self.total_pixels
    }

    /// Alpha of the canvas pixel at row-major index `pixel`.
    pub fn alpha_at(&self, pixel: usize) -> u8 {
        self.dest[pixel * 4 + 3]
    }

    /// Fade every reveal position in [last_opaque_pixel, target) toward
    /// opaque, with the newest edge of the band getting `big_delta` and the
    /// trailing edge `little_delta`.
    fn sweep_forward(&mut self, steps: u64) -> bool {
        let target = self.target_last_pixel as i64;
        let band_start = self.last_opaque_pixel;
        let band_width = (target - band_start) as f64;

        let mut new_last_opaque = self.last_opaque_pixel;
        let mut i = band_start.max(0);
        while i < target {
            let alpha_index = self.order[i as usize] as usize * 4 + 3;
            let fraction = 1.0 - (i - band_start) as f64 / band_width;
            let delta = self.interp_delta(fraction);
            let alpha = (u64::from(self.dest[alpha_index]) + steps * delta).min(255) as u8;
            self.dest[alpha_index] = alpha;
            if alpha == 255 {
                new_last_opaque = i;
            }
            i += 1;
        }

        self.last_opaque_pixel = new_last_opaque;
        self.last_pixel = self.target_last_pixel;
        self.last_opaque_pixel != target - 1
    }

    /// Mirror of the forward sweep: fade [target, last_pixel) back toward
    /// transparent, iterating from the top so the new high-water mark falls
    /// out of the last assignment.
    fn sweep_backward(&mut self, steps: u64) -> bool {
        let target = self.target_last_pixel;
        let band_width = (self.last_pixel as i64 - target as i64) as f64;

        let mut new_last_pixel = self.last_pixel;
        for i in (target..self.last_pixel).rev() {
            let alpha_index = self.order[i] as usize * 4 + 3;
            let fraction = (i - target) as f64 / band_width;
            let delta = self.interp_delta(fraction);
            let alpha = (i64::from(self.dest[alpha_index]) - (steps * delta) as i64).max(0) as u8;
            self.dest[alpha_index] = alpha;
            if alpha == 0 {
                new_last_pixel = i;
            }
        }

        self.last_opaque_pixel = target as i64 - 1;
        self.last_pixel = new_last_pixel;
        self.last_pixel != target
    }

    /// Linear interpolation between little_delta (fraction 0) and big_delta
    /// (fraction 1), rounded to an integer step.
    fn interp_delta(&self, fraction: f64) -> u64 {
        let little = f64::from(self.settings.little_delta);
        let big = f64::from(self.settings.big_delta);
        (little + (fraction * (big - little)).round()).max(0.0) as u64
    }

    fn render(&mut self, surface: &mut dyn WipeSurface) -> WipeResult<()> {
        let stride = self.canvas.width as usize * 4;
        let r = self.dirty;
        for row in r.y..r.y + r.height {
            let start = row as usize * stride + r.x as usize * 4;
            let end = start + r.width as usize * 4;
            self.offscreen.data[start..end].copy_from_slice(&self.dest[start..end]);
        }
        surface.present(&self.offscreen)
    }
}

fn validate_order(order: &[u32], total_pixels: usize) -> WipeResult<()> {
    if order.len() != total_pixels {
        return Err(WipeError::validation(format!(
            "reveal order has {} entries for {} pixels",
            order.len(),
            total_pixels
        )));
    }
    let mut seen = vec![false; total_pixels];
    for &idx in order {
        let slot = seen
            .get_mut(idx as usize)
            .ok_or_else(|| WipeError::validation("reveal order index out of range"))?;
        if *slot {
            return Err(WipeError::validation("reveal order repeats a pixel index"));
        }
        *slot = true;
    }
    Ok(())
}

/// Nearest-neighbour draw of `source_rect` into `dest_rect`, writing RGB
/// only — alpha starts at 0 everywhere, that is the whole point.
fn draw_rgb_nearest(
    source: &image::RgbaImage,
    source_rect: IntRect,
    dest: &mut [u8],
    dest_width: u32,
    dest_rect: IntRect,
) {
    let stride = dest_width as usize * 4;
    for dy in 0..dest_rect.height {
        let sy = source_rect.y + (u64::from(dy) * u64::from(source_rect.height)
            / u64::from(dest_rect.height)) as u32;
        for dx in 0..dest_rect.width {
            let sx = source_rect.x + (u64::from(dx) * u64::from(source_rect.width)
                / u64::from(dest_rect.width)) as u32;
            let px = source.get_pixel(
                sx.min(source.width() - 1),
                sy.min(source.height() - 1),
            );
            let offset = (dest_rect.y + dy) as usize * stride + (dest_rect.x + dx) as usize * 4;
            dest[offset] = px[0];
            dest[offset + 1] = px[1];
            dest[offset + 2] = px[2];
        }
    }
}
