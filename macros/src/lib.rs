use proc_macro::TokenStream;
use syn_utils::into_macro_output;

#[macro_use]
mod syn_utils;

mod fields_impl;

/// Derives `sigfield::Fields` for a struct of initial values.
///
/// A struct `AppState` gets a companion `AppStateFields` holding the schema and one
/// `sigfield::Field<T>` key per field, plus three accessors per field `name`:
///
/// | Method                | Returns                       |
/// |-----------------------|-------------------------------|
/// | `use_name(cx)`        | `(T, FieldSetter<T>)`         |
/// | `use_name_value(cx)`  | `T`                           |
/// | `use_set_name(cx)`    | `FieldSetter<T>`              |
///
/// The same accessors are also grouped by direction: `fields.getters().use_name(cx)` returns
/// `T` and `fields.setters().use_name(cx)` returns `FieldSetter<T>`.
///
/// Two fields whose accessor names would collide (`counter` and `counter_value`) are rejected.
///
/// # Examples
///
/// ```ignore
/// #[derive(Fields)]
/// struct AppState {
///     counter: i32,
///     name: String,
/// }
///
/// let fields = AppState { counter: 0, name: String::new() }.into_keys();
/// ```
#[proc_macro_derive(Fields)]
pub fn derive_fields(input: TokenStream) -> TokenStream {
    into_macro_output(fields_impl::derive_fields(input.into()))
}
