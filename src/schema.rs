use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use derive_ex::derive_ex;
use parse_display::Display;

use crate::{Error, Result, ValueCell};


/// Identity of a [`Schema`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("schema {0}")]
pub struct SchemaId(u64);

impl SchemaId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        SchemaId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A typed key naming one field of a [`Schema`].
#[derive_ex(Clone, bound())]
pub struct Field<T> {
    schema: SchemaId,
    name: Rc<str>,
    display_name: Rc<str>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    fn new(schema: SchemaId, name: Rc<str>, display_name: Rc<str>) -> Self {
        Self {
            schema,
            name,
            display_name,
            _phantom: PhantomData,
        }
    }

    /// The schema this field was declared in.
    pub fn schema_id(&self) -> SchemaId {
        self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field name with its first character upper-cased (`counter` -> `Counter`).
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Name of the combined accessor (`counter` -> `useCounter`).
    pub fn hook_name(&self) -> String {
        format!("use{}", self.display_name)
    }

    /// Name of the write-only accessor (`counter` -> `useSetCounter`).
    pub fn setter_hook_name(&self) -> String {
        format!("useSet{}", self.display_name)
    }
}
impl<T> Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field({}: {})", self.name, type_name::<T>())
    }
}
impl<T> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.name == other.name
    }
}
impl<T> Eq for Field<T> {}

pub(crate) struct FieldDef {
    pub name: Rc<str>,
    pub display_name: Rc<str>,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub create: Box<dyn Fn() -> Box<dyn Any>>,
}

/// The fixed mapping from field name to initial value.
///
/// A `Schema` is built once at setup time. Every scope boundary mounted with it
/// gets its own set of cells seeded from these initial values.
#[derive_ex(Clone)]
pub struct Schema(Rc<SchemaData>);

struct SchemaData {
    id: SchemaId,
    fields: Vec<FieldDef>,
    index: HashMap<Rc<str>, usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn id(&self) -> SchemaId {
        self.0.id
    }

    pub fn len(&self) -> usize {
        self.0.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.fields.is_empty()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.index.contains_key(name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.fields.iter().map(|f| &*f.name)
    }

    /// Looks up a field by name.
    pub fn field<T: 'static>(&self, name: &str) -> Result<Field<T>> {
        let def = &self.0.fields[self.index_of(name)?];
        check_type::<T>(def)?;
        Ok(Field::new(self.0.id, def.name.clone(), def.display_name.clone()))
    }

    pub(crate) fn defs(&self) -> &[FieldDef] {
        &self.0.fields
    }
    pub(crate) fn index_of(&self, name: &str) -> Result<usize> {
        self.0
            .index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownField {
                name: name.to_string(),
            })
    }
}
impl Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.0.fields.iter().map(|d| (&d.name, d.type_name)))
            .finish()
    }
}

pub(crate) fn check_type<T: 'static>(def: &FieldDef) -> Result<()> {
    if def.type_id == TypeId::of::<T>() {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            name: def.name.to_string(),
            actual: def.type_name,
            requested: type_name::<T>(),
        })
    }
}

/// Builder for [`Schema`].
#[derive_ex(Default)]
#[default(Self::new())]
pub struct SchemaBuilder {
    id: SchemaId,
    fields: Vec<FieldDef>,
    index: HashMap<Rc<str>, usize>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            id: SchemaId::next(),
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declares a field and returns its key.
    ///
    /// Panic if `name` is not identifier-safe or is already declared.
    pub fn field<T>(&mut self, name: &str, initial: T) -> Field<T>
    where
        T: Clone + Debug + 'static,
    {
        match self.try_field(name, initial) {
            Ok(field) => field,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_field<T>(&mut self, name: &str, initial: T) -> Result<Field<T>>
    where
        T: Clone + Debug + 'static,
    {
        if !is_identifier(name) {
            return Err(Error::InvalidFieldName {
                name: name.to_string(),
            });
        }
        if self.index.contains_key(name) {
            return Err(Error::DuplicateField {
                name: name.to_string(),
            });
        }
        let name: Rc<str> = name.into();
        let display_name: Rc<str> = upper_first(&name).into();
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push(FieldDef {
            name: name.clone(),
            display_name: display_name.clone(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            create: Box::new(move || -> Box<dyn Any> { Box::new(ValueCell::new(initial.clone())) }),
        });
        Ok(Field::new(self.id, name, display_name))
    }

    pub fn build(self) -> Schema {
        Schema(Rc::new(SchemaData {
            id: self.id,
            fields: self.fields,
            index: self.index,
        }))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A struct of initial values that can be turned into a [`Schema`] and its typed keys.
///
/// Implement it with `#[derive(Fields)]`.
pub trait Fields {
    type Keys;

    /// Declares one field per struct field, seeded with its current value.
    fn into_keys(self) -> Self::Keys;
}
