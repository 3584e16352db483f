//! Input and handler types shared by the runtime components

use std::fmt;

/// Platform key code (GLFW-style integer key identifiers)
pub type KeyCode = i32;

/// Which transition of a key a binding (or a raw event) refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Key went down. Press bindings are held until the matching release.
    Press,
    /// Key went up. Release bindings fire once on this edge.
    Release,
}

/// A raw key event as delivered by the platform layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub edge: Edge,
}

impl KeyEvent {
    pub fn new(key: KeyCode, edge: Edge) -> Self {
        Self { key, edge }
    }

    pub fn press(key: KeyCode) -> Self {
        Self::new(key, Edge::Press)
    }

    pub fn release(key: KeyCode) -> Self {
        Self::new(key, Edge::Release)
    }
}

/// Groups bindings so they can be removed together.
///
/// Bindings registered without a context get an `Anonymous` tag that no other
/// binding shares, which makes them removable only one at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingContext {
    Anonymous(u64),
    Named(String),
}

impl BindingContext {
    pub fn named(name: impl Into<String>) -> Self {
        BindingContext::Named(name.into())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, BindingContext::Anonymous(_))
    }
}

impl From<&str> for BindingContext {
    fn from(name: &str) -> Self {
        BindingContext::Named(name.to_string())
    }
}

impl From<String> for BindingContext {
    fn from(name: String) -> Self {
        BindingContext::Named(name)
    }
}

impl fmt::Display for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingContext::Anonymous(id) => write!(f, "<anonymous #{id}>"),
            BindingContext::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Handler invoked for a key binding with the current frame's delta time (seconds)
pub trait Pressable: Send + Sync {
    fn invoke(&self, delta_time: f32);
}

impl<F> Pressable for F
where
    F: Fn(f32) + Send + Sync,
{
    fn invoke(&self, delta_time: f32) {
        self(delta_time)
    }
}

/// Handler invoked when a trigger or timeout fires
pub trait Triggerable: Send + Sync {
    fn invoke(&self, fired: bool);
}

impl<F> Triggerable for F
where
    F: Fn(bool) + Send + Sync,
{
    fn invoke(&self, fired: bool) {
        self(fired)
    }
}
