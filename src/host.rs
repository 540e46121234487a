//! The seam between this crate and a component-tree UI framework.
//!
//! The accessors only need three things from the host: a context that descendants can read,
//! a per-component slot whose setter re-renders the component, and effects that run after
//! commit with a cleanup. [`Runtime`](crate::Runtime) is a minimal host implementing this trait.
use std::rc::Rc;

use derive_ex::derive_ex;
use parse_display::Display;

use crate::Subscription;

/// When an effect runs relative to the host's paint.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display(style = "snake_case")]
pub enum EffectTiming {
    /// Synchronously after the component's render is committed, before paint.
    Layout,
    /// After every pending render of the current pass has been committed.
    #[default]
    Passive,
}

/// Render-time services of the host framework, available to a component while it renders.
///
/// Hooks must be called in the same order on every render of a component.
pub trait Host {
    /// Nearest value of type `C` provided by this component or an ancestor.
    fn use_context<C: Clone + 'static>(&mut self) -> Option<C>;

    /// Makes `value` visible to descendants through [`use_context`](Self::use_context).
    ///
    /// Descendants that read `C` re-render when `value` differs from the value this component
    /// provided on its previous render.
    fn provide_context<C: Clone + PartialEq + 'static>(&mut self, value: C);

    /// A per-component value. Calling the setter stores a new value and re-renders the component.
    fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, LocalSetter<T>);

    /// Computes a value on first render and again only when `deps` changes.
    fn use_memo<T: Clone + 'static, D: PartialEq + 'static>(
        &mut self,
        deps: D,
        f: impl FnOnce() -> T,
    ) -> T;

    /// Runs `f` after commit on first render and whenever `deps` changes.
    ///
    /// The returned [`Subscription`] is dropped before the next run and when the component unmounts.
    fn use_effect<D: PartialEq + 'static>(
        &mut self,
        timing: EffectTiming,
        deps: D,
        f: impl FnOnce() -> Subscription + 'static,
    );
}

/// Setter returned by [`Host::use_state`].
#[derive_ex(Clone, bound())]
pub struct LocalSetter<T>(Rc<dyn Fn(T)>);

impl<T> LocalSetter<T> {
    pub fn new(f: impl Fn(T) + 'static) -> Self {
        Self(Rc::new(f))
    }
    pub fn set(&self, value: T) {
        (self.0)(value)
    }
}
impl<T> std::fmt::Debug for LocalSetter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalSetter")
    }
}
