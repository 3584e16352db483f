//! Key binding registry and event dispatch
//!
//! Bindings are registered per key with an edge. Press bindings become
//! "active" when their key goes down and are re-invoked every frame by
//! [`InputRegistry::tick`] until the key comes back up. Release bindings fire
//! once, synchronously, when the key is released.

use crate::guard::run_guarded;
use cadence_core::{BindingContext, BindingId, Edge, IdAllocator, KeyCode, Pressable};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A registered handler for one edge of one key.
///
/// Two bindings are equal when key, edge and context match, regardless of
/// handler. The active set never holds two equal bindings.
pub struct KeyBinding {
    id: BindingId,
    key: KeyCode,
    edge: Edge,
    handler: Arc<dyn Pressable>,
    ignores_pause: bool,
    context: BindingContext,
}

impl KeyBinding {
    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn key(&self) -> KeyCode {
        self.key
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Application keys keep working while input is paused
    pub fn ignores_pause(&self) -> bool {
        self.ignores_pause
    }

    pub fn context(&self) -> &BindingContext {
        &self.context
    }

    fn invoke(&self, delta_time: f32) {
        if let Err(msg) = run_guarded(|| self.handler.invoke(delta_time)) {
            log::error!(
                "Input handler for key {} ({:?}, context {}) panicked: {msg}",
                self.key,
                self.edge,
                self.context
            );
        }
    }
}

impl PartialEq for KeyBinding {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.edge == other.edge && self.context == other.context
    }
}

impl Eq for KeyBinding {}

impl fmt::Debug for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBinding")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("edge", &self.edge)
            .field("ignores_pause", &self.ignores_pause)
            .field("context", &self.context)
            .finish()
    }
}

/// Returned by the bind calls; identifies one binding for later removal or queries
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BindingHandle {
    id: BindingId,
    key: KeyCode,
    edge: Edge,
    context: BindingContext,
}

impl BindingHandle {
    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn key(&self) -> KeyCode {
        self.key
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn context(&self) -> &BindingContext {
        &self.context
    }
}

struct RegistryState {
    /// Key -> bindings in registration order
    bindings: HashMap<KeyCode, Vec<Arc<KeyBinding>>>,
    /// Press bindings whose key is held, in the order they became active
    active: Vec<Arc<KeyBinding>>,
    paused: bool,
    /// Delta time of the most recent tick, handed to release handlers
    last_delta: f32,
}

/// Owns every key binding and the set of currently held bindings.
///
/// All methods take `&self`; the registry can be shared with trigger handlers
/// running on the timer worker. Handlers are always invoked with the internal
/// lock released, so they may bind or unbind freely.
pub struct InputRegistry {
    state: Mutex<RegistryState>,
    ids: IdAllocator,
}

impl Default for InputRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                bindings: HashMap::new(),
                active: Vec::new(),
                paused: false,
                last_delta: 0.0,
            }),
            ids: IdAllocator::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for `edge` of `key`.
    ///
    /// Without a context the binding gets an anonymous one of its own.
    pub fn bind<H>(
        &self,
        key: KeyCode,
        edge: Edge,
        handler: H,
        ignores_pause: bool,
        context: Option<BindingContext>,
    ) -> BindingHandle
    where
        H: Pressable + 'static,
    {
        let id = BindingId::next(&self.ids);
        let context = context.unwrap_or(BindingContext::Anonymous(id.raw()));
        let binding = Arc::new(KeyBinding {
            id,
            key,
            edge,
            handler: Arc::new(handler),
            ignores_pause,
            context: context.clone(),
        });

        self.state().bindings.entry(key).or_default().push(binding);
        log::trace!("Bound key {key} ({edge:?}) in context {context}");

        BindingHandle {
            id,
            key,
            edge,
            context,
        }
    }

    /// Held-key binding
    pub fn press<H: Pressable + 'static>(&self, key: KeyCode, handler: H) -> BindingHandle {
        self.bind(key, Edge::Press, handler, false, None)
    }

    pub fn press_in<H: Pressable + 'static>(
        &self,
        key: KeyCode,
        context: impl Into<BindingContext>,
        handler: H,
    ) -> BindingHandle {
        self.bind(key, Edge::Press, handler, false, Some(context.into()))
    }

    /// Fire-once-on-release binding
    pub fn release<H: Pressable + 'static>(&self, key: KeyCode, handler: H) -> BindingHandle {
        self.bind(key, Edge::Release, handler, false, None)
    }

    pub fn release_in<H: Pressable + 'static>(
        &self,
        key: KeyCode,
        context: impl Into<BindingContext>,
        handler: H,
    ) -> BindingHandle {
        self.bind(key, Edge::Release, handler, false, Some(context.into()))
    }

    /// Held-key binding that ignores the pause gate
    pub fn app_press<H: Pressable + 'static>(&self, key: KeyCode, handler: H) -> BindingHandle {
        self.bind(key, Edge::Press, handler, true, None)
    }

    pub fn app_press_in<H: Pressable + 'static>(
        &self,
        key: KeyCode,
        context: impl Into<BindingContext>,
        handler: H,
    ) -> BindingHandle {
        self.bind(key, Edge::Press, handler, true, Some(context.into()))
    }

    /// Release binding that ignores the pause gate
    pub fn app_release<H: Pressable + 'static>(&self, key: KeyCode, handler: H) -> BindingHandle {
        self.bind(key, Edge::Release, handler, true, None)
    }

    pub fn app_release_in<H: Pressable + 'static>(
        &self,
        key: KeyCode,
        context: impl Into<BindingContext>,
        handler: H,
    ) -> BindingHandle {
        self.bind(key, Edge::Release, handler, true, Some(context.into()))
    }

    /// Remove every binding tagged with `context`, held or not.
    ///
    /// Returns how many bindings were removed; unknown contexts remove nothing.
    pub fn unbind_context(&self, context: &BindingContext) -> usize {
        let mut state = self.state();
        let mut removed = 0;

        state.bindings.retain(|_, list| {
            let before = list.len();
            list.retain(|b| &b.context != context);
            removed += before - list.len();
            !list.is_empty()
        });
        state.active.retain(|b| &b.context != context);

        if removed > 0 {
            log::debug!("Unbound {removed} binding(s) in context {context}");
        }
        removed
    }

    /// Remove a single binding. Returns false if it was already gone.
    pub fn unbind(&self, handle: &BindingHandle) -> bool {
        let mut state = self.state();
        let mut found = false;

        if let Some(list) = state.bindings.get_mut(&handle.key) {
            let before = list.len();
            list.retain(|b| b.id != handle.id);
            found = list.len() != before;
            if list.is_empty() {
                state.bindings.remove(&handle.key);
            }
        }
        state.active.retain(|b| b.id != handle.id);
        found
    }

    /// Deliver one raw key event.
    ///
    /// Press bindings for the key join the active set; on release they leave
    /// it, and release bindings fire with the last known delta time. While
    /// paused, only bindings that ignore the pause gate are considered.
    pub fn dispatch(&self, key: KeyCode, edge: Edge) {
        let mut fire = Vec::new();
        let delta = {
            let mut guard = self.state();
            let RegistryState {
                bindings,
                active,
                paused,
                last_delta,
            } = &mut *guard;

            let Some(list) = bindings.get(&key) else {
                return;
            };

            for binding in list {
                if *paused && !binding.ignores_pause {
                    continue;
                }

                if binding.edge == Edge::Press && !active.iter().any(|a| **a == **binding) {
                    active.push(binding.clone());
                }

                if edge == Edge::Release {
                    if binding.edge == Edge::Release {
                        fire.push(binding.clone());
                    } else {
                        active.retain(|a| **a != **binding);
                    }
                }
            }
            *last_delta
        };

        for binding in fire {
            binding.invoke(delta);
        }
    }

    /// Invoke every held binding with this frame's delta time.
    ///
    /// Iterates a snapshot, so handlers that change bindings take effect
    /// from the next tick on.
    pub fn tick(&self, delta_time: f32) {
        let snapshot = {
            let mut state = self.state();
            state.last_delta = delta_time;
            state.active.clone()
        };

        for binding in snapshot {
            binding.invoke(delta_time);
        }
    }

    /// Gate non-application bindings and forget every held key
    pub fn pause(&self) {
        let mut state = self.state();
        state.paused = true;
        state.active.clear();
    }

    /// Lift the pause gate. Keys still physically held must be pressed again.
    pub fn resume(&self) {
        self.state().paused = false;
    }

    // --- Query methods ---

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    /// Is this binding currently held?
    pub fn is_active(&self, handle: &BindingHandle) -> bool {
        self.state().active.iter().any(|b| b.id == handle.id)
    }

    /// Number of held bindings
    pub fn active_len(&self) -> usize {
        self.state().active.len()
    }

    /// Number of registered bindings across all keys
    pub fn binding_count(&self) -> usize {
        self.state().bindings.values().map(Vec::len).sum()
    }

    pub fn last_delta_time(&self) -> f32 {
        self.state().last_delta
    }

    /// Bindings registered for `key`, in registration order
    pub fn bindings(&self, key: KeyCode) -> Vec<Arc<KeyBinding>> {
        self.state().bindings.get(&key).cloned().unwrap_or_default()
    }
}
