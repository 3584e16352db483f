//! Queue for raw key events coming from the platform layer

use cadence_core::KeyEvent;

/// Buffers key events until the frame loop drains them.
///
/// The platform side may live on another thread; it gets a cloned sender
/// and pushes events in arrival order.
pub struct KeyEventQueue {
    sender: flume::Sender<KeyEvent>,
    receiver: flume::Receiver<KeyEvent>,
}

impl Default for KeyEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Push an event onto the queue
    pub fn push(&self, event: KeyEvent) {
        // The queue owns a receiver, so the channel cannot be disconnected here
        let _ = self.sender.send(event);
    }

    /// A sender for the platform input thread
    pub fn sender(&self) -> flume::Sender<KeyEvent> {
        self.sender.clone()
    }

    /// Take every queued event, oldest first
    pub fn drain(&self) -> Vec<KeyEvent> {
        self.receiver.drain().collect()
    }

    /// Check if there are pending events
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain() {
        let queue = KeyEventQueue::new();
        assert!(queue.is_empty());

        queue.push(KeyEvent::press(65));
        queue.push(KeyEvent::release(65));
        assert_eq!(queue.len(), 2);

        let events = queue.drain();
        assert_eq!(events, vec![KeyEvent::press(65), KeyEvent::release(65)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_clears() {
        let queue = KeyEventQueue::new();
        queue.push(KeyEvent::press(32));

        let _ = queue.drain();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn sender_works_from_another_thread() {
        let queue = KeyEventQueue::new();
        let sender = queue.sender();
        std::thread::spawn(move || {
            for key in 0..5 {
                sender.send(KeyEvent::press(key)).unwrap();
            }
        })
        .join()
        .unwrap();

        let keys: Vec<_> = queue.drain().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3, 4]);
    }
}
