use crate::{core::FrameRgba, error::{WipeError, WipeResult}};

/// A visible display surface the engine presents frames onto.
///
/// Presentation has copy semantics: the incoming frame replaces whatever
/// was previously visible, including its transparent pixels. Blending
/// would accumulate alpha across frames and break reversal.
pub trait WipeSurface {
    fn present(&mut self, frame: &FrameRgba) -> WipeResult<()>;
}

/// In-memory surface backed by an owned frame, for tests and offline
/// rendering.
#[derive(Debug)]
pub struct BufferSurface {
    frame: FrameRgba,
    presented: u64,
}

impl BufferSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: FrameRgba::transparent(width, height),
            presented: 0,
        }
    }

    pub fn frame(&self) -> &FrameRgba {
        &self.frame
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl WipeSurface for BufferSurface {
    fn present(&mut self, frame: &FrameRgba) -> WipeResult<()> {
        if frame.width != self.frame.width || frame.height != self.frame.height {
            return Err(WipeError::validation(format!(
                "presented frame is {}x{}, surface is {}x{}",
                frame.width, frame.height, self.frame.width, self.frame.height
            )));
        }
        self.frame.data.copy_from_slice(&frame.data);
        self.presented += 1;
        Ok(())
    }
}
