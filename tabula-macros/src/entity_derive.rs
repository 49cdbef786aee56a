use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

use crate::crate_path::tabula_data_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Extract `#[entity(table = "...")]` from the struct, if present.
fn extract_table(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    table = Some(lit.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `table` in #[entity(table = \"...\")]"))
                }
            })?;
        }
    }
    Ok(table)
}

/// Parsed field-level `#[entity(...)]` attributes.
#[derive(Default)]
struct FieldAttrs {
    column: Option<String>,
    key: bool,
    skip: bool,
}

fn extract_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();
    for attr in attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    result.column = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("key") {
                    result.key = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `column`, `key`, or `skip` in #[entity(...)]"))
                }
            })?;
        }
    }
    Ok(result)
}

struct FieldInfo {
    ident: syn::Ident,
    ty: syn::Type,
    /// Field name as seen by the mapping (raw identifiers unprefixed).
    name: String,
    attrs: FieldAttrs,
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let krate = tabula_data_path();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Entity)] does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Entity)] only works on structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Entity)] only works on structs",
            ))
        }
    };

    let mut infos = Vec::new();
    for field in fields {
        let attrs = extract_field_attrs(&field.attrs)?;
        if attrs.skip {
            if attrs.key || attrs.column.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "`skip` cannot be combined with `key` or `column`",
                ));
            }
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let raw = ident.to_string();
        let name = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
        infos.push(FieldInfo {
            ident,
            ty: field.ty.clone(),
            name,
            attrs,
        });
    }

    let keys = infos.iter().filter(|f| f.attrs.key).count();
    if keys > 1 {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Entity)] allows at most one #[entity(key)] field",
        ));
    }

    let shape_name = name.to_string();
    let table = match extract_table(input)? {
        Some(table) => quote! { .table(#table) },
        None => quote! {},
    };

    let field_defs = infos.iter().map(|f| {
        let field_name = &f.name;
        let column = f.attrs.column.as_ref().map(|c| quote! { .column(#c) });
        let key = f.attrs.key.then(|| quote! { .key() });
        quote! { #krate::FieldDef::new(#field_name) #column #key }
    });

    let assign_arms = infos.iter().map(|f| {
        let field_name = &f.name;
        let ident = &f.ident;
        let ty = &f.ty;
        quote! {
            #field_name => {
                self.#ident = <#ty as #krate::FromValue>::from_value(value)?;
            }
        }
    });

    let value_entries = infos.iter().map(|f| {
        let field_name = &f.name;
        let ident = &f.ident;
        quote! {
            (#field_name, #krate::Value::from(::core::clone::Clone::clone(&self.#ident)))
        }
    });

    Ok(quote! {
        impl #krate::Entity for #name {
            fn shape() -> #krate::Shape {
                const FIELDS: &[#krate::FieldDef] = &[ #(#field_defs),* ];
                #krate::Shape::new(#shape_name, FIELDS) #table
            }

            fn assign(
                &mut self,
                field: &str,
                value: &#krate::Value,
            ) -> ::core::result::Result<(), #krate::AssignError> {
                match field {
                    #(#assign_arms)*
                    other => {
                        return ::core::result::Result::Err(
                            #krate::AssignError::UnknownField(::std::string::ToString::to_string(other)),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }

            fn values(&self) -> ::std::vec::Vec<(&'static str, #krate::Value)> {
                ::std::vec![ #(#value_entries),* ]
            }
        }
    })
}
