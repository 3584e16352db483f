//! The runtime context: owns the components and drives them once per frame

use crate::clock::FrameClock;
use crate::frame::{FrameHandler, FrameInfo};
use crate::input::InputRegistry;
use crate::key_queue::KeyEventQueue;
use crate::timer::{TimerHandle, TimerService};
use crate::trigger::TriggerScheduler;
use cadence_core::{Edge, KeyCode, KeyEvent, Result, RuntimeConfig, Triggerable};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Explicitly constructed owner of the clock, timer worker, trigger table
/// and input registry.
///
/// Each call to [`Runtime::frame`] runs, in order: clock tick, trigger
/// evaluation, held-input handlers, then dispatch of queued key events.
pub struct Runtime {
    config: RuntimeConfig,
    clock: FrameClock,
    timers: Arc<TimerService>,
    triggers: Arc<TriggerScheduler>,
    input: Arc<InputRegistry>,
    key_events: KeyEventQueue,
    frame_index: u32,
    shut_down: bool,
}

impl Runtime {
    /// Validate the config, start the timer worker and capture the start time
    pub fn init(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let timers = Arc::new(TimerService::start(&config.timer)?);
        let triggers = Arc::new(TriggerScheduler::new(timers.clone()));
        let clock = FrameClock::new(&config.clock);
        log::info!(
            "Runtime initialized (timer queue {}, frame index wraps at {})",
            config.timer.queue_capacity,
            config.frame_index_wrap
        );

        Ok(Self {
            config,
            clock,
            timers,
            triggers,
            input: Arc::new(InputRegistry::new()),
            key_events: KeyEventQueue::new(),
            frame_index: 0,
            shut_down: false,
        })
    }

    /// Run one frame using the current wall-clock time
    pub fn frame(&mut self) -> FrameInfo {
        self.frame_at(Instant::now())
    }

    /// Run one frame as if the current time were `now`
    pub fn frame_at(&mut self, now: Instant) -> FrameInfo {
        self.frame_index = if self.frame_index >= self.config.frame_index_wrap {
            0
        } else {
            self.frame_index + 1
        };

        self.clock.tick_at(now);
        self.triggers.tick(self.frame_index, &self.clock);
        self.input.tick(self.clock.delta_time());
        for event in self.key_events.drain() {
            self.input.dispatch(event.key, event.edge);
        }

        self.frame_info()
    }

    /// Drive frames until `handler` breaks, then shut down
    pub fn run<H: FrameHandler>(&mut self, handler: &mut H) {
        loop {
            let info = self.frame();
            if let ControlFlow::Break(()) = handler.frame(&info) {
                break;
            }
        }
        handler.shutdown();
        self.shutdown();
    }

    /// Cancel outstanding triggers and stop the timer worker. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.triggers.clean();
        self.timers.shutdown();
        log::info!("Runtime shut down");
    }

    /// Deliver a key event immediately (main thread only)
    pub fn dispatch(&self, key: KeyCode, edge: Edge) {
        self.input.dispatch(key, edge);
    }

    /// Queue a key event for the next frame
    pub fn push_key_event(&self, event: KeyEvent) {
        self.key_events.push(event);
    }

    /// Sender for a platform input thread; events are dispatched next frame
    pub fn key_sender(&self) -> flume::Sender<KeyEvent> {
        self.key_events.sender()
    }

    /// Invoke `handler` once on the timer worker after `delay`
    pub fn set_timeout<H>(&self, delay: Duration, handler: H) -> Result<TimerHandle>
    where
        H: Triggerable + 'static,
    {
        self.timers.set_timeout(delay, Arc::new(handler))
    }

    pub fn input(&self) -> &Arc<InputRegistry> {
        &self.input
    }

    pub fn triggers(&self) -> &Arc<TriggerScheduler> {
        &self.triggers
    }

    pub fn timers(&self) -> &Arc<TimerService> {
        &self.timers
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn delta_time(&self) -> f32 {
        self.clock.delta_time()
    }

    pub fn frame_rate(&self) -> u32 {
        self.clock.frame_rate()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn frame_info(&self) -> FrameInfo {
        FrameInfo {
            index: self.frame_index,
            delta_time: self.clock.delta_time(),
            frame_rate: self.clock.frame_rate(),
            elapsed: self.clock.now(),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{BindingContext, CadenceError};
    use std::sync::atomic::{AtomicU32, Ordering};

    const WAIT: Duration = Duration::from_secs(2);
    const KEY_A: KeyCode = 65;

    fn runtime() -> Runtime {
        Runtime::init(RuntimeConfig::default()).expect("runtime should start")
    }

    #[test]
    fn frame_index_wraps_after_limit() {
        let mut config = RuntimeConfig::default();
        config.frame_index_wrap = 3;
        let mut runtime = Runtime::init(config).unwrap();

        let indices: Vec<u32> = (0..6).map(|_| runtime.frame().index).collect();
        assert_eq!(indices, vec![1, 2, 3, 0, 1, 2]);
    }

    #[test]
    fn frame_reports_clock_values() {
        let mut runtime = runtime();
        let start = runtime.clock().start();

        let info = runtime.frame_at(start + Duration::from_millis(20));
        assert_eq!(info.elapsed, Duration::from_millis(20));
        assert!((info.delta_time - 0.02).abs() < 1e-4);
        assert_eq!(info.frame_rate, 60);
        assert_eq!(runtime.delta_time(), info.delta_time);
    }

    #[test]
    fn queued_events_dispatch_after_held_handlers() {
        let mut runtime = runtime();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        runtime.input().press(KEY_A, move |_dt: f32| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        runtime.key_sender().send(KeyEvent::press(KEY_A)).unwrap();
        runtime.frame();
        // The press landed after this frame's input tick
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.input().active_len(), 1);

        runtime.frame();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        runtime.push_key_event(KeyEvent::release(KEY_A));
        runtime.frame();
        runtime.frame();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn release_handler_sees_previous_frame_delta() {
        let mut runtime = runtime();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = seen.clone();
        runtime
            .input()
            .release(KEY_A, move |dt: f32| s.lock().unwrap().push(dt));

        let start = runtime.clock().start();
        runtime.frame_at(start + Duration::from_millis(50));
        runtime.dispatch(KEY_A, Edge::Release);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!((seen[0] - 0.05).abs() < 1e-4);
    }

    #[test]
    fn triggers_fire_through_runtime() {
        let mut runtime = runtime();
        let (tx, rx) = flume::unbounded();
        runtime.triggers().add_one_shot("spawn", 100, move |fired: bool| {
            let _ = tx.send(fired);
        });

        runtime.frame();
        assert!(!runtime.triggers().contains("spawn"));
        assert!(rx.recv_timeout(WAIT).unwrap());
    }

    #[test]
    fn trigger_handler_can_bind_input_from_worker() {
        let mut runtime = runtime();
        let input = runtime.input().clone();
        let (tx, rx) = flume::unbounded::<()>();
        runtime.triggers().add_one_shot("unlock", 100, move |_fired: bool| {
            input.press_in(KEY_A, "unlocked", |_dt: f32| {});
            let _ = tx.send(());
        });

        runtime.frame();
        rx.recv_timeout(WAIT).unwrap();
        assert_eq!(runtime.input().binding_count(), 1);
        assert_eq!(
            runtime
                .input()
                .unbind_context(&BindingContext::named("unlocked")),
            1
        );
    }

    #[test]
    fn set_timeout_runs_once() {
        let runtime = runtime();
        let (tx, rx) = flume::unbounded();
        runtime
            .set_timeout(Duration::from_millis(10), move |fired: bool| {
                let _ = tx.send(fired);
            })
            .unwrap();
        assert!(rx.recv_timeout(WAIT).unwrap());
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn run_stops_on_break_and_shuts_down() {
        struct Frames {
            seen: u32,
            shut_down: bool,
        }
        impl FrameHandler for Frames {
            fn frame(&mut self, _frame: &FrameInfo) -> ControlFlow<()> {
                self.seen += 1;
                if self.seen == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
            fn shutdown(&mut self) {
                self.shut_down = true;
            }
        }

        let mut runtime = runtime();
        runtime.triggers().add("repeat", 1, |_fired: bool| {});
        let mut handler = Frames {
            seen: 0,
            shut_down: false,
        };
        runtime.run(&mut handler);

        assert_eq!(handler.seen, 5);
        assert!(handler.shut_down);
        assert!(runtime.is_shut_down());
        assert!(runtime.triggers().is_empty());
        assert!(!runtime.timers().is_running());
    }

    #[test]
    fn closures_drive_run() {
        let mut runtime = runtime();
        let mut frames = 0;
        runtime.run(&mut |_frame: &FrameInfo| {
            frames += 1;
            if frames < 3 {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
        assert_eq!(frames, 3);
    }

    #[test]
    fn timeouts_fail_after_shutdown() {
        let mut runtime = runtime();
        runtime.shutdown();
        runtime.shutdown();

        let result = runtime.set_timeout(Duration::ZERO, |_fired: bool| {});
        assert!(matches!(result, Err(CadenceError::TimerShutDown)));
    }

    #[test]
    fn invalid_config_is_fatal_at_init() {
        let mut config = RuntimeConfig::default();
        config.timer.queue_capacity = 0;
        assert!(matches!(
            Runtime::init(config),
            Err(CadenceError::InvalidConfig { .. })
        ));
    }
}
