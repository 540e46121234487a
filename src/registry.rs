use std::{any::Any, fmt::Debug};

use crate::{schema::check_type, Error, Field, Result, Schema, ValueCell};


/// One fresh [`ValueCell`] per field of a [`Schema`], seeded with the field's initial value.
///
/// The set of fields is fixed at construction.
pub struct CellRegistry {
    schema: Schema,
    cells: Vec<Box<dyn Any>>,
}

impl CellRegistry {
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            cells: schema.defs().iter().map(|def| (def.create)()).collect(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema.names()
    }

    /// Returns the cell for `field`.
    ///
    /// Panic if `field` is not part of this registry's schema.
    pub fn cell<T: 'static>(&self, field: &Field<T>) -> ValueCell<T> {
        match self.try_cell(field) {
            Ok(cell) => cell,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_cell<T: 'static>(&self, field: &Field<T>) -> Result<ValueCell<T>> {
        self.cell_by_name(field.name())
    }

    pub fn cell_by_name<T: 'static>(&self, name: &str) -> Result<ValueCell<T>> {
        let index = self.schema.index_of(name)?;
        let def = &self.schema.defs()[index];
        check_type::<T>(def)?;
        self.cells[index]
            .downcast_ref::<ValueCell<T>>()
            .cloned()
            .ok_or_else(|| Error::UnknownField {
                name: def.name.to_string(),
            })
    }
}
impl Debug for CellRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellRegistry")
            .field("fields", &self.schema)
            .finish()
    }
}
