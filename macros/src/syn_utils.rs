use proc_macro2::TokenStream;
use syn::{spanned::Spanned, Data, DeriveInput, Fields, FieldsNamed, Result};

macro_rules! bail {
    ($span:expr, $fmt:literal $(,)?) => {
        return ::std::result::Result::Err(::syn::Error::new($span, ::std::format!($fmt)))
    };
    ($span:expr, $fmt:literal, $($arg:tt)*) => {
        return ::std::result::Result::Err(::syn::Error::new($span, ::std::format!($fmt, $($arg)*)))
    };
}

pub fn into_macro_output(input: Result<TokenStream>) -> proc_macro::TokenStream {
    match input {
        Ok(s) => s,
        Err(e) => e.to_compile_error(),
    }
    .into()
}

/// The named fields of a non-generic struct.
pub fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a FieldsNamed> {
    if !input.generics.params.is_empty() {
        bail!(
            input.generics.span(),
            "`#[derive({})]` does not support generic types",
            derive
        );
    }
    let Data::Struct(data) = &input.data else {
        bail!(
            input.ident.span(),
            "`#[derive({})]` supports only structs",
            derive
        );
    };
    let Fields::Named(fields) = &data.fields else {
        bail!(
            data.fields.span(),
            "`#[derive({})]` supports only structs with named fields",
            derive
        );
    };
    Ok(fields)
}
