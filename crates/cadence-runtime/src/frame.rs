//! Per-frame timing snapshot and the host loop callback

use std::ops::ControlFlow;
use std::time::Duration;

/// Timing values for one frame, handed to the host's renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Host frame counter, wraps at the configured limit
    pub index: u32,
    /// Seconds since the previous frame
    pub delta_time: f32,
    /// Frames counted in the last closed frame-rate window
    pub frame_rate: u32,
    /// Time since the runtime started
    pub elapsed: Duration,
}

/// Work the host does once per frame after input and triggers are processed
///
/// Typically this renders. Returning `ControlFlow::Break` ends the loop.
pub trait FrameHandler {
    fn frame(&mut self, frame: &FrameInfo) -> ControlFlow<()>;

    /// Called once after the loop ends, before the runtime shuts down
    fn shutdown(&mut self) {}
}

impl<F> FrameHandler for F
where
    F: FnMut(&FrameInfo) -> ControlFlow<()>,
{
    fn frame(&mut self, frame: &FrameInfo) -> ControlFlow<()> {
        self(frame)
    }
}
