//! Cadence Runtime - Input dispatch and trigger scheduling for a frame loop
//!
//! Provides the per-frame building blocks a host loop drives:
//! - `FrameClock` - delta time, elapsed time and measured frame rate
//! - `TimerService` - one background worker running delayed, cancelable tasks
//! - `InputRegistry` - key bindings with press/hold/release semantics and a pause gate
//! - `TriggerScheduler` - named handlers re-fired at per-trigger frequencies
//! - `KeyEventQueue` - buffer for key events from a platform thread
//! - `Runtime` - owns all of the above and runs them in frame order
//!
//! ```no_run
//! use cadence_core::RuntimeConfig;
//! use cadence_runtime::{FrameInfo, Runtime};
//! use std::ops::ControlFlow;
//!
//! let mut runtime = Runtime::init(RuntimeConfig::default())?;
//! runtime.input().press(87, |dt: f32| println!("moving forward for {dt}s"));
//! runtime.triggers().add("spawn", 2, |_fired: bool| println!("spawn wave"));
//!
//! runtime.run(&mut |frame: &FrameInfo| {
//!     // render here
//!     if frame.elapsed.as_secs() < 10 {
//!         ControlFlow::Continue(())
//!     } else {
//!         ControlFlow::Break(())
//!     }
//! });
//! # Ok::<(), cadence_core::CadenceError>(())
//! ```

mod clock;
mod frame;
mod guard;
mod input;
mod key_queue;
mod runtime;
mod timer;
mod trigger;

pub use clock::FrameClock;
pub use frame::{FrameHandler, FrameInfo};
pub use input::{BindingHandle, InputRegistry, KeyBinding};
pub use key_queue::KeyEventQueue;
pub use runtime::Runtime;
pub use timer::{TimerHandle, TimerService};
pub use trigger::{TriggerHandle, TriggerScheduler};
