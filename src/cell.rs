use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use derive_ex::derive_ex;
use parse_display::Display;
use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::Subscription;

#[cfg(test)]
mod tests;

/// The next value of a [`ValueCell`]: either a literal value or a function of the previous value.
pub enum Next<T> {
    Value(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}
impl<T> Next<T> {
    /// Creates a `Next` that computes the new value from the previous one.
    pub fn update(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Next::Update(Box::new(f))
    }

    pub fn resolve(self, current: &T) -> T {
        match self {
            Next::Value(value) => value,
            Next::Update(f) => f(current),
        }
    }
}
impl<T> From<T> for Next<T> {
    fn from(value: T) -> Self {
        Next::Value(value)
    }
}
impl<T: std::fmt::Debug> std::fmt::Debug for Next<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Next::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Next::Update(_) => write!(f, "Update(<fn>)"),
        }
    }
}

/// Identity of a [`ValueCell`], unique for the lifetime of the process.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("#{0}")]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        CellId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A value with a set of listeners that are called synchronously every time the value is updated.
///
/// Cloning a `ValueCell` yields another handle to the same value.
#[derive_ex(Clone, bound())]
pub struct ValueCell<T: 'static>(Rc<CellNode<T>>);

type Listener<T> = Rc<dyn Fn(&T)>;

struct CellNode<T: 'static> {
    id: CellId,
    value: RefCell<T>,
    version: Cell<u64>,
    listeners: RefCell<SlabMap<Listener<T>>>,
    // `Some` while a notification pass is running.
    pending: RefCell<Option<VecDeque<T>>>,
}

impl<T: 'static> ValueCell<T> {
    /// Create a new `ValueCell` with the given initial value.
    pub fn new(value: T) -> Self {
        Self(Rc::new(CellNode {
            id: CellId::next(),
            value: RefCell::new(value),
            version: Cell::new(0),
            listeners: RefCell::new(SlabMap::new()),
            pending: RefCell::new(None),
        }))
    }

    pub fn id(&self) -> CellId {
        self.0.id
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of updates applied since construction.
    pub fn version(&self) -> u64 {
        self.0.version.get()
    }

    /// Gets the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.value.borrow().clone()
    }

    /// Calls `f` with a reference to the current value.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.0.value.borrow())
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    /// Registers `f` to be called with the new value after every update.
    ///
    /// `f` is not called with the current value. Dropping the returned [`Subscription`]
    /// (or calling [`Subscription::unsubscribe`]) removes exactly this listener.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        let key = self.0.listeners.borrow_mut().insert(Rc::new(f));
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node| {
            node.listeners.borrow_mut().remove(key);
        })
    }

    /// Replaces the value and notifies every listener registered at the time of the call.
    ///
    /// If `next` is [`Next::Update`], it is called with the current value to compute the new one.
    ///
    /// An update made by a listener of this cell is stored immediately, but its notification
    /// pass starts only after the current pass has reached every listener. All passes finish
    /// before the outermost `update` returns.
    pub fn update(&self, next: impl Into<Next<T>>)
    where
        T: Clone,
    {
        let value = next.into().resolve(&self.0.value.borrow());
        self.0.store(value.clone());
        self.0.notify(value);
    }

    /// Sets the value and notifies the listeners.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        self.update(Next::Value(value))
    }

    /// Computes the new value from the current one and notifies the listeners.
    pub fn update_with(&self, f: impl FnOnce(&T) -> T + 'static)
    where
        T: Clone,
    {
        self.update(Next::update(f))
    }
}

impl<T: 'static> CellNode<T> {
    fn store(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.version.set(self.version.get() + 1);
    }

    fn notify(&self, value: T)
    where
        T: Clone,
    {
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(queue) = &mut *pending {
                queue.push_back(value);
                return;
            }
            *pending = Some(VecDeque::new());
        }
        let _guard = PassGuard(&self.pending);
        let mut value = value;
        loop {
            self.deliver(&value);
            let next = self.pending.borrow_mut().as_mut().and_then(|q| q.pop_front());
            let Some(next) = next else {
                break;
            };
            value = next;
        }
    }
    fn deliver(&self, value: &T) {
        let listeners: Vec<(usize, Listener<T>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(key, l)| (key, l.clone()))
            .collect();
        for (key, l) in listeners {
            if self.is_listening(key, &l) {
                l(value);
            }
        }
    }
    fn is_listening(&self, key: usize, l: &Listener<T>) -> bool {
        self.listeners
            .borrow()
            .get(key)
            .is_some_and(|current| Rc::ptr_eq(current, l))
    }
}

/// Ends the notification pass, even if a listener panics.
struct PassGuard<'a, T>(&'a RefCell<Option<VecDeque<T>>>);

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        self.0.borrow_mut().take();
    }
}

impl<T: Default + 'static> Default for ValueCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
impl<T: std::fmt::Debug> std::fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.value.try_borrow() {
            Ok(value) => std::fmt::Debug::fmt(&*value, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
impl<T> Serialize for ValueCell<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.0.value.try_borrow() {
            Ok(value) => T::serialize(&*value, serializer),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}
impl<'de, T> Deserialize<'de> for ValueCell<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<ValueCell<T>, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        T::deserialize(deserializer).map(ValueCell::new)
    }
}
