//! Procedural macros for acton-pages
//!
//! - `#[derive(FieldSet)]` describes a reusable group of fields (a base struct)
//! - `#[derive(Entity)]` describes a concrete entity type
//!
//! Both generate a static field descriptor table plus by-name accessors, so
//! page composition never needs runtime reflection.
//!
//! # Attributes
//!
//! Struct level, `#[entity(...)]`:
//! - `key = "..."` entity type key (`Entity` only, defaults to the struct name)
//! - `view_name = "..."` view name; when absent it is taken from the first
//!   embedded field set that declares one
//!
//! Field level, `#[field(...)]`:
//! - `label = "..."`, `required`, `read_only`, `hidden`, `max_length = N`,
//!   `data_provider = "..."` display hints
//! - `id` marks the `Option<EntityId>` identity field (implies `read_only`)
//! - `non_deletable` marks the `bool` flag that blocks deletion
//! - `embed` embeds another `FieldSet`, whose fields follow this struct's own
//! - `skip` excludes the field from the table

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    ext::IdentExt, parse_macro_input, Data, DeriveInput, Fields, Ident, LitInt, LitStr, Type,
};

/// Derive `acton_pages::FieldSet` for a struct with named fields
#[proc_macro_derive(FieldSet, attributes(entity, field))]
pub fn derive_field_set(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_field_set(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derive `acton_pages::FieldSet` and `acton_pages::EntityType`
#[proc_macro_derive(Entity, attributes(entity, field))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_field_set(&input)
        .and_then(|field_set| {
            let entity_type = expand_entity_type(&input)?;
            Ok(quote! {
                #field_set
                #entity_type
            })
        })
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct EntityAttrs {
    key: Option<LitStr>,
    view_name: Option<LitStr>,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Default)]
struct FieldAttrs {
    label: Option<LitStr>,
    data_provider: Option<LitStr>,
    max_length: Option<usize>,
    required: bool,
    read_only: bool,
    hidden: bool,
    skip: bool,
    embed: bool,
    id: bool,
    non_deletable: bool,
}

struct DeclaredField<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    attrs: FieldAttrs,
}

fn parse_entity_attrs(input: &DeriveInput) -> syn::Result<EntityAttrs> {
    let mut attrs = EntityAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                attrs.key = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("view_name") {
                attrs.view_name = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("expected `key` or `view_name`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("field") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let path = &meta.path;
            if path.is_ident("label") {
                attrs.label = Some(meta.value()?.parse()?);
            } else if path.is_ident("data_provider") {
                attrs.data_provider = Some(meta.value()?.parse()?);
            } else if path.is_ident("max_length") {
                let limit: LitInt = meta.value()?.parse()?;
                attrs.max_length = Some(limit.base10_parse()?);
            } else if path.is_ident("required") {
                attrs.required = true;
            } else if path.is_ident("read_only") {
                attrs.read_only = true;
            } else if path.is_ident("hidden") {
                attrs.hidden = true;
            } else if path.is_ident("skip") {
                attrs.skip = true;
            } else if path.is_ident("embed") {
                attrs.embed = true;
            } else if path.is_ident("id") {
                attrs.id = true;
            } else if path.is_ident("non_deletable") {
                attrs.non_deletable = true;
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn optional_str(lit: Option<&LitStr>) -> TokenStream2 {
    lit.map_or_else(
        || quote!(::core::option::Option::None),
        |lit| quote!(::core::option::Option::Some(#lit)),
    )
}

fn field_model(field: &DeclaredField<'_>) -> TokenStream2 {
    let name = &field.name;
    let ty = field.ty;
    let label = optional_str(field.attrs.label.as_ref());
    let data_provider = optional_str(field.attrs.data_provider.as_ref());
    let max_length = field.attrs.max_length.map_or_else(
        || quote!(::core::option::Option::None),
        |limit| quote!(::core::option::Option::Some(#limit)),
    );
    let required = field.attrs.required;
    let read_only = field.attrs.read_only || field.attrs.id;
    let hidden = field.attrs.hidden;

    quote! {
        ::acton_pages::FieldModel {
            name: #name,
            label: #label,
            semantic: <#ty as ::acton_pages::FieldValueType>::SEMANTIC,
            required: #required,
            read_only: #read_only,
            hidden: #hidden,
            max_length: #max_length,
            data_provider: #data_provider,
            reference_target: <#ty as ::acton_pages::FieldValueType>::REFERENCE_TARGET,
            nullable: <#ty as ::acton_pages::FieldValueType>::NULLABLE,
        }
    }
}

#[allow(clippy::too_many_lines)]
fn expand_field_set(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "entity field sets cannot be generic",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "field sets can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "field sets require named fields",
        ));
    };

    let entity_attrs = parse_entity_attrs(input)?;
    let ident = &input.ident;

    let mut declared = Vec::new();
    let mut embedded: Vec<(&Ident, &Type)> = Vec::new();
    let mut id_field = None;
    let mut flag_field = None;

    for field in &named.named {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        if attrs.embed {
            embedded.push((field_ident, &field.ty));
            continue;
        }
        if attrs.id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(field_ident, "duplicate `id` field"));
            }
            id_field = Some(field_ident);
        }
        if attrs.non_deletable {
            flag_field = Some(field_ident);
        }
        declared.push(DeclaredField {
            ident: field_ident,
            name: field_ident.unraw().to_string(),
            ty: &field.ty,
            attrs,
        });
    }

    let models = declared.iter().map(field_model);
    let names: Vec<&String> = declared.iter().map(|field| &field.name).collect();
    let idents: Vec<&Ident> = declared.iter().map(|field| field.ident).collect();
    let embed_idents: Vec<&Ident> = embedded.iter().map(|(ident, _)| *ident).collect();
    let embed_types: Vec<&Type> = embedded.iter().map(|(_, ty)| *ty).collect();

    let view_name = entity_attrs.view_name.as_ref().map_or_else(
        || {
            embed_types
                .iter()
                .rev()
                .fold(quote!(::core::option::Option::None), |fallback, ty| {
                    quote! {
                        match <#ty as ::acton_pages::FieldSet>::VIEW_NAME {
                            ::core::option::Option::Some(view) => ::core::option::Option::Some(view),
                            ::core::option::Option::None => #fallback,
                        }
                    }
                })
        },
        |view| quote!(::core::option::Option::Some(#view)),
    );

    let first_embed = embed_idents.first();
    let (get_id, set_id) = match (id_field, first_embed) {
        (Some(id), _) => (
            quote!(self.#id),
            quote!(self.#id = ::core::option::Option::Some(id);),
        ),
        (None, Some(base)) => (
            quote!(::acton_pages::FieldSet::entity_id(&self.#base)),
            quote!(::acton_pages::FieldSet::set_entity_id(&mut self.#base, id);),
        ),
        (None, None) => (quote!(::core::option::Option::None), quote!(let _ = id;)),
    };
    let non_deletable = flag_field.map_or_else(
        || {
            quote! {
                false #(|| ::acton_pages::FieldSet::non_deletable(&self.#embed_idents))*
            }
        },
        |flag| quote!(self.#flag),
    );

    Ok(quote! {
        #[automatically_derived]
        #[allow(unused_variables, clippy::match_single_binding, clippy::needless_return)]
        impl ::acton_pages::FieldSet for #ident {
            const VIEW_NAME: ::core::option::Option<&'static str> = #view_name;

            fn collect_fields(out: &mut ::std::vec::Vec<&'static ::acton_pages::FieldModel>) {
                static FIELDS: &[::acton_pages::FieldModel] = &[#(#models),*];
                out.extend(FIELDS.iter());
                #(<#embed_types as ::acton_pages::FieldSet>::collect_fields(out);)*
            }

            fn owns_field(name: &str) -> bool {
                const OWN: &[&str] = &[#(#names),*];
                OWN.contains(&name)
                    #(|| <#embed_types as ::acton_pages::FieldSet>::owns_field(name))*
            }

            fn read_field(&self, name: &str) -> ::core::option::Option<::acton_pages::FieldValue> {
                match name {
                    #(#names => ::core::option::Option::Some(
                        ::acton_pages::FieldValueType::to_field_value(&self.#idents)
                    ),)*
                    _ => {
                        #(if <#embed_types as ::acton_pages::FieldSet>::owns_field(name) {
                            return ::acton_pages::FieldSet::read_field(&self.#embed_idents, name);
                        })*
                        ::core::option::Option::None
                    }
                }
            }

            fn write_field(
                &mut self,
                name: &str,
                value: ::acton_pages::FieldValue,
            ) -> ::core::result::Result<(), ::acton_pages::BindError> {
                match name {
                    #(#names => {
                        self.#idents = ::acton_pages::FieldValueType::from_field_value(value)
                            .map_err(|source| ::acton_pages::BindError::Convert {
                                field: ::std::string::ToString::to_string(#names),
                                source,
                            })?;
                        ::core::result::Result::Ok(())
                    })*
                    _ => {
                        #(if <#embed_types as ::acton_pages::FieldSet>::owns_field(name) {
                            return ::acton_pages::FieldSet::write_field(
                                &mut self.#embed_idents,
                                name,
                                value,
                            );
                        })*
                        ::core::result::Result::Err(::acton_pages::BindError::UnknownField(
                            ::std::string::ToString::to_string(name),
                        ))
                    }
                }
            }

            fn entity_id(&self) -> ::core::option::Option<::acton_pages::EntityId> {
                #get_id
            }

            fn set_entity_id(&mut self, id: ::acton_pages::EntityId) {
                #set_id
            }

            fn non_deletable(&self) -> bool {
                #non_deletable
            }
        }
    })
}

fn expand_entity_type(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let entity_attrs = parse_entity_attrs(input)?;
    let ident = &input.ident;
    let key = entity_attrs
        .key
        .map_or_else(|| ident.unraw().to_string(), |key| key.value());
    if key.trim().is_empty() {
        return Err(syn::Error::new_spanned(ident, "entity key cannot be empty"));
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::acton_pages::EntityType for #ident {
            const ENTITY_KEY: &'static str = #key;
        }
    })
}
