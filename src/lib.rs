extern crate self as sigfield;

mod accessor;
mod cell;
mod debug;
mod error;
mod host;
mod registry;
mod runtime;
mod schema;
mod scope;
mod subscription;

pub use accessor::*;
pub use cell::*;
pub use debug::*;
pub use error::*;
pub use host::*;
pub use registry::*;
pub use runtime::*;
pub use schema::*;
pub use scope::*;
pub use subscription::*;

/// Derives [`Fields`] for a struct of initial values.
///
/// For `struct AppState { counter: i32 }` this generates `AppStateFields` with a
/// `counter: Field<i32>` key, `schema()`, `provide()`, and the accessors
/// `use_counter` (value and setter), `use_counter_value` and `use_set_counter`.
pub use sigfield_macros::Fields;
