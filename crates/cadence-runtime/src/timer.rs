//! Deferred task execution on a single background worker
//!
//! Submissions travel over a bounded channel to one worker thread, which
//! keeps them in a deadline-ordered heap and runs each once its delay has
//! elapsed. Every submission gets a [`TimerHandle`] whose cancel token is
//! checked by the worker right before the task starts.

use crate::guard::run_guarded;
use cadence_core::{CadenceError, IdAllocator, Result, TimerConfig, TimerId, Triggerable};
use flume::{RecvTimeoutError, TrySendError};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

/// Cancelable reference to a submitted task.
///
/// Cancelling only wins while the task is still waiting; once the worker
/// has started it, [`TimerHandle::cancel`] returns false and the task runs
/// to completion.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    id: TimerId,
    state: Arc<AtomicU8>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Prevent the task from running. Returns true if it had not started yet.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_ok()
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(AtomicOrdering::Acquire) == PENDING
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(AtomicOrdering::Acquire) == CANCELLED
    }

    /// True once the task has run (whether or not it panicked)
    pub fn is_finished(&self) -> bool {
        self.state.load(AtomicOrdering::Acquire) == DONE
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

struct ScheduledTask {
    id: TimerId,
    deadline: Instant,
    state: Arc<AtomicU8>,
    task: Task,
}

impl ScheduledTask {
    fn run(self) {
        if self
            .state
            .compare_exchange(PENDING, RUNNING, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_err()
        {
            log::trace!("Timer task {} was cancelled before it ran", self.id);
            return;
        }
        if let Err(msg) = run_guarded(self.task) {
            log::error!("Timer task {} panicked: {msg}", self.id);
        }
        self.state.store(DONE, AtomicOrdering::Release);
    }

    fn cancel(&self) {
        let _ = self.state.compare_exchange(
            PENDING,
            CANCELLED,
            AtomicOrdering::AcqRel,
            AtomicOrdering::Acquire,
        );
    }
}

// BinaryHeap is a max-heap; reverse so the earliest deadline sits on top.
// Equal deadlines run in submission order.
impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScheduledTask {}

enum Command {
    Schedule(ScheduledTask),
    Shutdown,
}

struct Worker {
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

/// The shared timer worker
pub struct TimerService {
    sender: flume::Sender<Command>,
    stopping: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
    ids: IdAllocator,
    capacity: usize,
}

impl TimerService {
    /// Spawn the worker thread
    pub fn start(config: &TimerConfig) -> Result<Self> {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = flume::bounded(capacity);
        let stopping = Arc::new(AtomicBool::new(false));
        let worker_stopping = stopping.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_worker(receiver, worker_stopping))
            .map_err(CadenceError::TimerSpawn)?;
        let thread_id = handle.thread().id();
        log::debug!("Timer worker '{}' started", config.thread_name);

        Ok(Self {
            sender,
            stopping,
            worker: Mutex::new(Some(Worker { handle, thread_id })),
            ids: IdAllocator::new(),
            capacity,
        })
    }

    /// Run `task` once on the worker after `delay`.
    ///
    /// Fails without side effects when the queue is full, the worker has
    /// shut down, or `delay` cannot be represented as a deadline.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> Result<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.stopping.load(AtomicOrdering::Acquire) {
            return Err(CadenceError::TimerShutDown);
        }
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or(CadenceError::TimerDelayOutOfRange { delay })?;
        let id = TimerId::next(&self.ids);
        let state = Arc::new(AtomicU8::new(PENDING));
        let scheduled = ScheduledTask {
            id,
            deadline,
            state: state.clone(),
            task: Box::new(task),
        };

        match self.sender.try_send(Command::Schedule(scheduled)) {
            Ok(()) => Ok(TimerHandle { id, state }),
            Err(TrySendError::Full(_)) => Err(CadenceError::TimerQueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(CadenceError::TimerShutDown),
        }
    }

    /// Invoke `handler` with `fired = true` after `delay`
    pub fn set_timeout(
        &self,
        delay: Duration,
        handler: Arc<dyn Triggerable>,
    ) -> Result<TimerHandle> {
        self.schedule(delay, move || handler.invoke(true))
    }

    /// Whether the worker thread is still accepting work
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the worker. Tasks that have not started are cancelled.
    ///
    /// Blocks until the worker exits, unless called from a task running on
    /// the worker itself. Calling it more than once is harmless.
    pub fn shutdown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return;
        };

        self.stopping.store(true, AtomicOrdering::Release);
        // Only a wake-up; with a full queue the worker sees the flag on its next message
        let _ = self.sender.try_send(Command::Shutdown);

        if worker.thread_id == thread::current().id() {
            log::debug!("Timer worker shut down from inside a task; not joining");
            return;
        }
        if worker.handle.join().is_err() {
            log::error!("Timer worker exited with a panic");
        }
        log::debug!("Timer worker stopped");
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(receiver: flume::Receiver<Command>, stopping: Arc<AtomicBool>) {
    let mut queue: BinaryHeap<ScheduledTask> = BinaryHeap::new();

    loop {
        if stopping.load(AtomicOrdering::Acquire) {
            break;
        }
        let command = match queue.peek() {
            Some(next) => {
                let now = Instant::now();
                if next.deadline <= now {
                    if let Some(task) = queue.pop() {
                        task.run();
                    }
                    continue;
                }
                match receiver.recv_deadline(next.deadline) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Schedule(task) => queue.push(task),
            Command::Shutdown => break,
        }
    }

    for task in queue.drain() {
        task.cancel();
    }
    // Submissions that raced the shutdown never got a chance to run
    for command in receiver.drain() {
        if let Command::Schedule(task) = command {
            task.cancel();
        }
    }
}
