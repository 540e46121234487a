use std::{fmt::Debug, rc::Rc};

use derive_ex::derive_ex;

use crate::{
    use_scope, CellId, DebugDirective, EffectTiming, Field, Host, Next, Result, ScopeBinding,
    ValueCell,
};


/// Write accessor for one field of a mounted scope.
///
/// Returned by [`use_setter`] and [`use_field`]. It stays the same value across re-renders of the
/// component as long as the scope's cell and debug directive do not change.
#[derive_ex(Clone, bound())]
pub struct FieldSetter<T: 'static> {
    cell: ValueCell<T>,
    name: Rc<str>,
    debug: Option<DebugDirective>,
}

impl<T: Clone + Debug + 'static> FieldSetter<T> {
    fn new(cell: ValueCell<T>, name: &str, debug: Option<DebugDirective>) -> Self {
        Self {
            cell,
            name: name.into(),
            debug,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn cell(&self) -> &ValueCell<T> {
        &self.cell
    }

    /// Stores the next value and synchronously notifies every reader of the field.
    ///
    /// The scope's debug directive sees the resolved value before it is stored.
    pub fn update(&self, next: impl Into<Next<T>>) {
        let next = next.into();
        let value = self.cell.with(|current| next.resolve(current));
        if let Some(debug) = &self.debug {
            debug.trace(&self.name, &value);
        }
        self.cell.set(value);
    }

    pub fn set(&self, value: T) {
        self.update(Next::Value(value))
    }
    pub fn update_with(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.update(Next::update(f))
    }

    /// Returns `true` if both setters write to the same cell with the same directive.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.cell.ptr_eq(&other.cell) && self.debug == other.debug
    }
}
impl<T: Debug> Debug for FieldSetter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSetter")
            .field("name", &self.name)
            .field("value", &self.cell)
            .finish()
    }
}

#[derive(Clone)]
struct Snapshot<T> {
    cell: CellId,
    version: u64,
    value: T,
}
impl<T: Clone + 'static> Snapshot<T> {
    fn of(cell: &ValueCell<T>) -> Self {
        Self {
            cell: cell.id(),
            version: cell.version(),
            value: cell.get(),
        }
    }
}

/// Mirrors `cell` into component state and re-renders the component when the cell is updated.
///
/// The subscription is taken in a layout effect and released when the component unmounts or
/// starts reading a different cell. Updates that land between render and subscription are
/// picked up when subscribing.
fn use_cell_value<T: Clone + 'static>(cx: &mut impl Host, cell: &ValueCell<T>) -> T {
    let (local, set_local) = cx.use_state(|| Snapshot::of(cell));
    let rendered = if local.cell == cell.id() {
        local
    } else {
        Snapshot::of(cell)
    };
    let version = rendered.version;
    let cell = cell.clone();
    cx.use_effect(EffectTiming::Layout, cell.id(), move || {
        let s = cell.subscribe({
            let cell = cell.clone();
            let set_local = set_local.clone();
            move |value| {
                set_local.set(Snapshot {
                    cell: cell.id(),
                    version: cell.version(),
                    value: value.clone(),
                })
            }
        });
        if cell.version() != version {
            set_local.set(Snapshot::of(&cell));
        }
        s
    });
    rendered.value
}

fn use_field_setter<T: Clone + Debug + 'static>(
    cx: &mut impl Host,
    scope: &ScopeBinding,
    field: &Field<T>,
    cell: ValueCell<T>,
) -> FieldSetter<T> {
    let debug = scope.debug().cloned();
    cx.use_memo((cell.id(), debug.clone()), || {
        FieldSetter::new(cell, field.name(), debug)
    })
}

fn resolve<T: 'static>(cx: &mut impl Host, field: &Field<T>) -> Result<(ScopeBinding, ValueCell<T>)> {
    let scope = use_scope(cx, field.schema_id());
    let cell = scope.resolve(field)?;
    Ok((scope, cell))
}

fn unwrap_usage<T>(r: Result<T>) -> T {
    match r {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

/// Reads `field` and subscribes the component to it. Also returns a setter.
pub fn try_use_field<T: Clone + Debug + 'static>(
    cx: &mut impl Host,
    field: &Field<T>,
) -> Result<(T, FieldSetter<T>)> {
    let (scope, cell) = resolve(cx, field)?;
    let value = use_cell_value(cx, &cell);
    let setter = use_field_setter(cx, &scope, field, cell);
    Ok((value, setter))
}

/// Reads `field` and subscribes the component to it.
pub fn try_use_value<T: Clone + Debug + 'static>(cx: &mut impl Host, field: &Field<T>) -> Result<T> {
    let (_, cell) = resolve(cx, field)?;
    Ok(use_cell_value(cx, &cell))
}

/// Returns a setter for `field` without subscribing the component to it.
pub fn try_use_setter<T: Clone + Debug + 'static>(
    cx: &mut impl Host,
    field: &Field<T>,
) -> Result<FieldSetter<T>> {
    let (scope, cell) = resolve(cx, field)?;
    Ok(use_field_setter(cx, &scope, field, cell))
}

/// Combined accessor: the current value of `field` and its setter.
///
/// Panics if no scope boundary for the field's schema is above the component.
pub fn use_field<T: Clone + Debug + 'static>(cx: &mut impl Host, field: &Field<T>) -> (T, FieldSetter<T>) {
    unwrap_usage(try_use_field(cx, field))
}

/// Read accessor. Panics if no scope boundary for the field's schema is above the component.
pub fn use_value<T: Clone + Debug + 'static>(cx: &mut impl Host, field: &Field<T>) -> T {
    unwrap_usage(try_use_value(cx, field))
}

/// Write accessor. Panics if no scope boundary for the field's schema is above the component.
pub fn use_setter<T: Clone + Debug + 'static>(cx: &mut impl Host, field: &Field<T>) -> FieldSetter<T> {
    unwrap_usage(try_use_setter(cx, field))
}

impl<T: Clone + Debug + 'static> Field<T> {
    /// See [`use_field`].
    pub fn use_field(&self, cx: &mut impl Host) -> (T, FieldSetter<T>) {
        use_field(cx, self)
    }
    /// See [`use_value`].
    pub fn use_value(&self, cx: &mut impl Host) -> T {
        use_value(cx, self)
    }
    /// See [`use_setter`].
    pub fn use_setter(&self, cx: &mut impl Host) -> FieldSetter<T> {
        use_setter(cx, self)
    }
}
