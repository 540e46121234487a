use thiserror::Error;

/// Misuse of a [`Schema`](crate::Schema) or of its accessors.
///
/// These are programmer errors. The panicking entry points (`use_field`, `CellRegistry::cell`, ...)
/// panic with this error's message; the `try_` variants return it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("`{hook}` must be used in a descendant of the scope boundary")]
    OutsideProvider { hook: String },

    #[error("unknown field `{name}`")]
    UnknownField { name: String },

    #[error("field `{name}` holds `{actual}`, not `{requested}`")]
    TypeMismatch {
        name: String,
        actual: &'static str,
        requested: &'static str,
    },

    #[error("field `{name}` is declared more than once")]
    DuplicateField { name: String },

    #[error("`{name}` is not a valid field name")]
    InvalidFieldName { name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
