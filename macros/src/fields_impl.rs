use std::collections::HashMap;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{ext::IdentExt, parse2, spanned::Spanned, DeriveInput, Result};

use crate::syn_utils::named_fields;

pub fn derive_fields(input: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let fields = named_fields(&input, "Fields")?;

    let c = quote!(::sigfield);
    let vis = &input.vis;
    let ident = &input.ident;
    let keys = format_ident!("{}Fields", ident);
    let getters = format_ident!("{}Getters", ident);
    let setters = format_ident!("{}Setters", ident);
    let b = quote!(_sigfield_builder);
    let schema = quote!(_sigfield_schema);

    let mut key_fields = Vec::new();
    let mut lets = Vec::new();
    let mut names = Vec::new();
    let mut methods = Vec::new();
    let mut getter_methods = Vec::new();
    let mut setter_methods = Vec::new();
    let mut generated = HashMap::new();
    for f in &fields.named {
        let Some(name) = &f.ident else {
            bail!(f.span(), "field must be named");
        };
        let ty = &f.ty;
        let name_str = name.unraw().to_string();
        let use_field = format_ident!("use_{}", name_str);
        let use_value = format_ident!("use_{}_value", name_str);
        let use_setter = format_ident!("use_set_{}", name_str);
        for method in [&use_field, &use_value, &use_setter] {
            if let Some(other) = generated.insert(method.to_string(), name_str.clone()) {
                bail!(
                    name.span(),
                    "fields `{}` and `{}` both generate the method `{}`",
                    other,
                    name_str,
                    method
                );
            }
        }

        key_fields.push(quote!(#vis #name: #c::Field<#ty>));
        lets.push(quote!(let #name = #b.field(#name_str, self.#name);));
        names.push(name);
        methods.push(quote! {
            #vis fn #use_field(&self, cx: &mut impl #c::Host) -> (#ty, #c::FieldSetter<#ty>) {
                #c::use_field(cx, &self.#name)
            }
            #vis fn #use_value(&self, cx: &mut impl #c::Host) -> #ty {
                #c::use_value(cx, &self.#name)
            }
            #vis fn #use_setter(&self, cx: &mut impl #c::Host) -> #c::FieldSetter<#ty> {
                #c::use_setter(cx, &self.#name)
            }
        });
        getter_methods.push(quote! {
            #vis fn #use_field(&self, cx: &mut impl #c::Host) -> #ty {
                #c::use_value(cx, &self.0.#name)
            }
        });
        setter_methods.push(quote! {
            #vis fn #use_field(&self, cx: &mut impl #c::Host) -> #c::FieldSetter<#ty> {
                #c::use_setter(cx, &self.0.#name)
            }
        });
    }

    Ok(quote! {
        #[derive(::std::clone::Clone, ::std::fmt::Debug)]
        #vis struct #keys {
            #schema: #c::Schema,
            #(#key_fields,)*
        }

        #[allow(dead_code)]
        impl #keys {
            #vis fn schema(&self) -> &#c::Schema {
                &self.#schema
            }
            #vis fn provide(
                &self,
                cx: &mut impl #c::Host,
                debug: ::std::option::Option<#c::DebugDirective>,
            ) -> #c::ScopeBinding {
                #c::provide_scope(cx, &self.#schema, debug)
            }
            /// Read accessors only.
            #vis fn getters(&self) -> #getters<'_> {
                #getters(self)
            }
            /// Write accessors only.
            #vis fn setters(&self) -> #setters<'_> {
                #setters(self)
            }
            #(#methods)*
        }

        #[derive(::std::clone::Clone, ::std::marker::Copy)]
        #vis struct #getters<'a>(&'a #keys);

        #[allow(dead_code)]
        impl #getters<'_> {
            #(#getter_methods)*
        }

        #[derive(::std::clone::Clone, ::std::marker::Copy)]
        #vis struct #setters<'a>(&'a #keys);

        #[allow(dead_code)]
        impl #setters<'_> {
            #(#setter_methods)*
        }

        impl #c::Fields for #ident {
            type Keys = #keys;
            fn into_keys(self) -> Self::Keys {
                let mut #b = #c::Schema::builder();
                #(#lets)*
                #keys {
                    #schema: #b.build(),
                    #(#names,)*
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::derive_fields;

    fn error_of(input: proc_macro2::TokenStream) -> String {
        match derive_fields(input) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn value_accessor_collision() {
        let e = error_of(quote! {
            struct S {
                counter: i32,
                counter_value: i32,
            }
        });
        assert_eq!(
            e,
            "fields `counter` and `counter_value` both generate the method `use_counter_value`"
        );
    }

    #[test]
    fn setter_accessor_collision() {
        let e = error_of(quote! {
            struct S {
                set_counter: i32,
                counter: i32,
            }
        });
        assert_eq!(
            e,
            "fields `set_counter` and `counter` both generate the method `use_set_counter`"
        );
    }

    #[test]
    fn distinct_fields_expand() {
        let r = derive_fields(quote! {
            struct S {
                counter: i32,
                name: String,
            }
        });
        assert!(r.is_ok());
    }

    #[test]
    fn tuple_struct_is_rejected() {
        let e = error_of(quote!(struct S(i32);));
        assert_eq!(e, "`#[derive(Fields)]` supports only structs with named fields");
    }
}
