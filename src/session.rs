use rand::{SeedableRng, rngs::StdRng};

use crate::{
    core::Canvas,
    engine::{PixelRevealEngine, StepOutcome},
    error::{WipeError, WipeResult},
    fit::calculate_image_dims,
    model::WipeConfig,
    scroll::{IntersectionEntry, ScrollGeometry, ScrollProgressAggregator},
    shuffle::create_shuffled_indices,
    surface::WipeSurface,
    timing::calculate_animation_settings,
};

/// Externally visible lifecycle phase of a [`WipeSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Measured,
    Active,
    Disabled,
}

#[derive(Clone, Copy)]
struct Measured {
    canvas: Canvas,
    shuffle_offset: usize,
    geometry: ScrollGeometry,
}

struct Active<S> {
    measured: Measured,
    engine: PixelRevealEngine,
    aggregator: ScrollProgressAggregator,
    display: S,
}

enum State<S> {
    Uninitialized,
    Measured(Measured),
    Active(Box<Active<S>>),
    Disabled,
}

/// Orchestrates one wipe: a state machine over
/// Uninitialized → Measured → Active → Disabled with guarded transitions.
///
/// The collaborator measures the container, then injects the decoded
/// source image and the display surface once both exist; from then on it
/// forwards intersection batches and display-frame ticks. Detaching or
/// disabling drops the engine, which discards any pending animation step,
/// so no callback can ever run against a torn-down buffer.
pub struct WipeSession<S: WipeSurface> {
    config: WipeConfig,
    state: State<S>,
    on_after_wipe: Option<Box<dyn FnMut()>>,
}

impl<S: WipeSurface> WipeSession<S> {
    pub fn new(config: WipeConfig) -> WipeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Uninitialized,
            on_after_wipe: None,
        })
    }

    /// Register the callback fired once per fully completed reveal.
    pub fn with_after_wipe(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_after_wipe = Some(Box::new(callback));
        self
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            State::Uninitialized => SessionPhase::Uninitialized,
            State::Measured(_) => SessionPhase::Measured,
            State::Active(_) => SessionPhase::Active,
            State::Disabled => SessionPhase::Disabled,
        }
    }

    /// Record the measured container size. Only the first non-empty
    /// measurement counts; later ones are ignored, a configuration change
    /// is a new session.
    #[tracing::instrument(skip(self))]
    pub fn measure(&mut self, width: u32, height: u32) -> WipeResult<()> {
        if !matches!(self.state, State::Uninitialized) || width == 0 || height == 0 {
            tracing::debug!("measurement ignored");
            return Ok(());
        }

        let canvas = Canvas::new(width, height)?;
        let geometry = ScrollGeometry::measure(
            &self.config.scroll_length,
            self.config.options.boxes_per_view,
            f64::from(height),
        )?;
        self.state = State::Measured(Measured {
            canvas,
            shuffle_offset: self.config.shuffle_offset(canvas),
            geometry,
        });
        Ok(())
    }

    /// Inject the decoded source image and the display surface, computing
    /// every per-lifetime artifact (fit rects, reveal order, timing) and
    /// bringing the engine up.
    #[tracing::instrument(skip_all)]
    pub fn attach_surfaces(&mut self, image: &image::RgbaImage, display: S) -> WipeResult<()> {
        // A failure below must leave the session in Measured, so only copy
        // the measurement out; the state is replaced on success.
        let measured = match &self.state {
            State::Measured(measured) => *measured,
            other => {
                return Err(WipeError::validation(format!(
                    "cannot attach surfaces while {}",
                    phase_name(other)
                )));
            }
        };

        let canvas = measured.canvas;
        let rects = calculate_image_dims(
            image.width(),
            image.height(),
            canvas.width,
            canvas.height,
            self.config.image_fit,
        )?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let order = create_shuffled_indices(
            canvas.total_pixels(),
            canvas.width as usize,
            self.config.wipe_direction,
            measured.shuffle_offset,
            &mut rng,
        );

        let settings = calculate_animation_settings(
            self.config.options.pixel_fade_intervals,
            self.config.options.frames_per_second,
        )?;

        let engine = PixelRevealEngine::new(canvas, image, rects, order, settings)?;
        let aggregator = ScrollProgressAggregator::new(measured.geometry);
        self.state = State::Active(Box::new(Active {
            measured,
            engine,
            aggregator,
            display,
        }));
        Ok(())
    }

    /// Forward one intersection batch; a changed progress value retargets
    /// the engine. Quietly ignored outside the Active phase so a straggler
    /// observation after teardown cannot touch freed state.
    pub fn observe(&mut self, entries: &[IntersectionEntry]) -> WipeResult<()> {
        let State::Active(active) = &mut self.state else {
            return Ok(());
        };
        if let Some(progress) = active.aggregator.observe(entries)? {
            active.engine.retarget(progress);
        }
        Ok(())
    }

    /// Drive the engine one display frame. Fires the after-wipe callback
    /// on a fully completed forward sweep and, when configured, disables
    /// the session afterwards.
    pub fn tick(&mut self, timestamp_ms: f64) -> WipeResult<StepOutcome> {
        let State::Active(active) = &mut self.state else {
            return Ok(StepOutcome::Idle);
        };

        let outcome = active.engine.step(timestamp_ms, &mut active.display)?;
        if outcome == (StepOutcome::Converged { completed: true }) {
            if let Some(callback) = self.on_after_wipe.as_mut() {
                callback();
            }
            if self.config.disable_after_wipe {
                self.disable();
            }
        }
        Ok(outcome)
    }

    /// Drop the engine and the display surface, returning to Measured.
    /// Any pending animation step goes with them.
    pub fn detach_surfaces(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Uninitialized);
        self.state = match state {
            State::Active(active) => State::Measured(active.measured),
            other => other,
        };
    }

    /// Terminal: releases the engine, the surface and the observation
    /// state. Later observe/tick calls become no-ops.
    pub fn disable(&mut self) {
        tracing::debug!("session disabled");
        self.state = State::Disabled;
    }

    /// Scroll geometry derived from the measurement, once one exists.
    pub fn geometry(&self) -> Option<ScrollGeometry> {
        match &self.state {
            State::Measured(measured) => Some(measured.geometry),
            State::Active(active) => Some(active.measured.geometry),
            _ => None,
        }
    }

    /// Most recent scroll progress, when active.
    pub fn progress(&self) -> Option<f64> {
        match &self.state {
            State::Active(active) => active.aggregator.progress(),
            _ => None,
        }
    }

    pub fn display(&self) -> Option<&S> {
        match &self.state {
            State::Active(active) => Some(&active.display),
            _ => None,
        }
    }

    pub fn is_animating(&self) -> bool {
        matches!(&self.state, State::Active(active) if active.engine.is_animating())
    }
}

fn phase_name<S>(state: &State<S>) -> &'static str {
    match state {
        State::Uninitialized => "unmeasured",
        State::Measured(_) => "measured",
        State::Active(_) => "already attached",
        State::Disabled => "disabled",
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{
        scroll::ScrollKey,
        surface::BufferSurface,
    };

    fn test_config() -> WipeConfig {
        WipeConfig {
            scroll_length: "2x".to_string(),
            shuffle_ratio: 0.0,
            seed: Some(11),
            options: crate::model::WipeOptions {
                boxes_per_view: 2.0,
                pixel_fade_intervals: [40.0, 100.0],
                frames_per_second: 50,
                ..Default::default()
            },
            ..WipeConfig::default()
        }
    }

    fn checker(width: u32, height: u32) -> image::RgbaImage {
        image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([((x + y) * 40) as u8, 120, 200, 255])
        })
    }

    fn entry(key: ScrollKey, is_intersecting: bool, ratio: f64) -> IntersectionEntry {
        IntersectionEntry {
            key,
            is_intersecting,
            intersection_ratio: ratio,
        }
    }

    fn drive_to_convergence(session: &mut WipeSession<BufferSurface>, start_ms: f64) -> f64 {
        let mut now = start_ms;
        for _ in 0..10_000 {
            match session.tick(now).unwrap() {
                StepOutcome::Running | StepOutcome::Throttled => now += 20.0,
                _ => return now,
            }
        }
        panic!("session did not converge");
    }

    #[test]
    fn lifecycle_runs_a_full_reveal_and_fires_the_callback_once() {
        let completions = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&completions);
        let mut session = WipeSession::new(test_config())
            .unwrap()
            .with_after_wipe(move || seen.set(seen.get() + 1));

        assert_eq!(session.phase(), SessionPhase::Uninitialized);
        session.measure(4, 4).unwrap();
        assert_eq!(session.phase(), SessionPhase::Measured);
        session
            .attach_surfaces(&checker(4, 4), BufferSurface::new(4, 4))
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);

        // Scroll straight past the bottom sentinel.
        session
            .observe(&[
                entry(ScrollKey::Top, false, 0.0),
                entry(ScrollKey::Bottom, true, 1.0),
            ])
            .unwrap();
        assert!(session.is_animating());
        let now = drive_to_convergence(&mut session, 0.0);

        assert_eq!(completions.get(), 1);
        assert_eq!(session.progress(), Some(1.0));
        let frame = session.display().unwrap().frame();
        assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));

        // Re-delivering the same batch changes nothing and cannot re-fire.
        session
            .observe(&[entry(ScrollKey::Bottom, true, 1.0)])
            .unwrap();
        assert_eq!(session.tick(now + 20.0).unwrap(), StepOutcome::Idle);
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn attach_requires_a_measurement_first() {
        let mut session: WipeSession<BufferSurface> = WipeSession::new(test_config()).unwrap();
        let err = session.attach_surfaces(&checker(4, 4), BufferSurface::new(4, 4));
        assert!(err.is_err());
    }

    #[test]
    fn only_the_first_nonempty_measurement_counts() {
        let mut session: WipeSession<BufferSurface> = WipeSession::new(test_config()).unwrap();
        session.measure(0, 7).unwrap();
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
        session.measure(4, 4).unwrap();
        session.measure(90, 90).unwrap();
        session
            .attach_surfaces(&checker(4, 4), BufferSurface::new(4, 4))
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn disable_after_wipe_tears_the_session_down() {
        let mut config = test_config();
        config.disable_after_wipe = true;
        let mut session = WipeSession::new(config).unwrap().with_after_wipe(|| {});
        session.measure(2, 2).unwrap();
        session
            .attach_surfaces(&checker(2, 2), BufferSurface::new(2, 2))
            .unwrap();

        session
            .observe(&[
                entry(ScrollKey::Top, false, 0.0),
                entry(ScrollKey::Bottom, true, 1.0),
            ])
            .unwrap();
        drive_to_convergence(&mut session, 0.0);
        assert_eq!(session.phase(), SessionPhase::Disabled);

        // Straggler callbacks are inert now.
        session
            .observe(&[entry(ScrollKey::Top, true, 1.0)])
            .unwrap();
        assert_eq!(session.tick(99_999.0).unwrap(), StepOutcome::Idle);
    }

    #[test]
    fn detach_returns_to_measured_and_discards_the_pending_step() {
        let mut session = WipeSession::new(test_config()).unwrap();
        session.measure(2, 2).unwrap();
        session
            .attach_surfaces(&checker(2, 2), BufferSurface::new(2, 2))
            .unwrap();
        session
            .observe(&[
                entry(ScrollKey::Top, false, 0.0),
                entry(ScrollKey::Bottom, true, 1.0),
            ])
            .unwrap();
        assert!(session.is_animating());

        session.detach_surfaces();
        assert_eq!(session.phase(), SessionPhase::Measured);
        assert!(!session.is_animating());
        assert_eq!(session.tick(0.0).unwrap(), StepOutcome::Idle);

        // Surfaces can be re-injected after a detach.
        session
            .attach_surfaces(&checker(2, 2), BufferSurface::new(2, 2))
            .unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
    }
}
