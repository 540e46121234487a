use std::rc::Rc;

use crate::{CellRegistry, DebugDirective, Error, Field, Host, Result, Schema, SchemaId, ValueCell};


/// The registry and debug directive of one mounted scope boundary.
///
/// [`ScopeBinding::detached`] is the state seen by components with no boundary above them.
#[derive(Clone, Default)]
pub struct ScopeBinding {
    registry: Option<Rc<CellRegistry>>,
    debug: Option<DebugDirective>,
}

impl ScopeBinding {
    pub fn new(registry: CellRegistry, debug: Option<DebugDirective>) -> Self {
        Self::from_rc(Rc::new(registry), debug)
    }
    fn from_rc(registry: Rc<CellRegistry>, debug: Option<DebugDirective>) -> Self {
        Self {
            registry: Some(registry),
            debug,
        }
    }

    /// The "no active scope" state.
    pub fn detached() -> Self {
        Self::default()
    }
    pub fn is_detached(&self) -> bool {
        self.registry.is_none()
    }

    pub fn registry(&self) -> Option<&CellRegistry> {
        self.registry.as_deref()
    }
    pub fn debug(&self) -> Option<&DebugDirective> {
        self.debug.as_ref()
    }
    pub fn schema_id(&self) -> Option<SchemaId> {
        self.registry.as_ref().map(|r| r.schema().id())
    }

    /// Returns the cell for `field`, or [`Error::OutsideProvider`] if this binding is detached.
    pub fn resolve<T: 'static>(&self, field: &Field<T>) -> Result<ValueCell<T>> {
        match &self.registry {
            Some(registry) => registry.try_cell(field),
            None => Err(Error::OutsideProvider {
                hook: field.hook_name(),
            }),
        }
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.registry, &other.registry) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
impl PartialEq for ScopeBinding {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) && self.debug == other.debug
    }
}
impl std::fmt::Debug for ScopeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeBinding")
            .field("registry", &self.registry)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Every binding visible from a component, innermost last.
#[derive(Clone, Default, PartialEq)]
struct Scopes(Rc<Vec<ScopeBinding>>);

impl Scopes {
    fn find(&self, schema: SchemaId) -> Option<&ScopeBinding> {
        self.0
            .iter()
            .rev()
            .find(|b| b.schema_id() == Some(schema))
    }
    fn push(&self, binding: ScopeBinding) -> Self {
        let mut bindings: Vec<_> = self.0.iter().cloned().collect();
        bindings.push(binding);
        Scopes(Rc::new(bindings))
    }
}

/// Renders a scope boundary for `schema`.
///
/// The first render of the component builds a [`CellRegistry`]; later renders reuse it. The
/// binding shadows any binding of the same schema provided by an ancestor. Cells are dropped
/// with the component, so a remounted boundary starts again from the initial values.
pub fn provide_scope(
    cx: &mut impl Host,
    schema: &Schema,
    debug: Option<DebugDirective>,
) -> ScopeBinding {
    let registry = cx.use_memo(schema.id(), || Rc::new(CellRegistry::new(schema)));
    let binding = ScopeBinding::from_rc(registry, debug);
    let scopes = cx.use_context::<Scopes>().unwrap_or_default();
    cx.provide_context(scopes.push(binding.clone()));
    binding
}

/// The nearest binding for `schema`, or [`ScopeBinding::detached`] if there is none.
pub fn use_scope(cx: &mut impl Host, schema: SchemaId) -> ScopeBinding {
    cx.use_context::<Scopes>()
        .and_then(|scopes| scopes.find(schema).cloned())
        .unwrap_or_default()
}

impl Schema {
    /// Renders a scope boundary for this schema. See [`provide_scope`].
    pub fn provide(&self, cx: &mut impl Host, debug: Option<DebugDirective>) -> ScopeBinding {
        provide_scope(cx, self, debug)
    }
}
