//! Implementation of #[derive(Document)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, LitStr};

use crate::util::{ident_str, named_fields, serde_keys};

/// Fields playing a metadata role.
#[derive(Default)]
struct Roles<'a> {
    /// Untagged field named `id`.
    canonical_id: Option<&'a Field>,
    /// `#[document(id)]` carrier.
    id: Option<&'a Field>,
    created_at: Option<&'a Field>,
    updated_at: Option<&'a Field>,
    score: Option<&'a Field>,
    base: Option<&'a Field>,
}

pub fn derive_document_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(input, "Document")?;
    let index = parse_index(input)?;
    let roles = collect_roles(fields.iter())?;

    let index_name = index.map(|index| {
        quote! {
            fn index_name() -> ::std::borrow::Cow<'static, str> {
                ::std::borrow::Cow::Borrowed(#index)
            }
        }
    });

    let (document_id, set_document_id, id_fields) = match (roles.canonical_id, roles.id, roles.base) {
        // Canonical `id` first, the tagged carrier when it is unset
        (Some(canonical), Some(carrier), _) => {
            let canonical_ident = &canonical.ident;
            let carrier_ident = &carrier.ident;
            let mut keys = body_keys(canonical)?;
            keys.extend(body_keys(carrier)?);
            (
                quote! {
                    ::docstore::models::DocumentId::to_document_id(&self.#canonical_ident)
                        .or_else(|| ::docstore::models::DocumentId::to_document_id(&self.#carrier_ident))
                },
                quote! {
                    if ::docstore::models::DocumentId::to_document_id(&self.#canonical_ident).is_none()
                        && ::docstore::models::DocumentId::to_document_id(&self.#carrier_ident).is_some()
                    {
                        ::docstore::models::DocumentId::assign_document_id(&mut self.#carrier_ident, id)
                    } else {
                        ::docstore::models::DocumentId::assign_document_id(&mut self.#canonical_ident, id)
                    }
                },
                id_fields_fn(&keys),
            )
        }
        (Some(field), None, _) | (None, Some(field), _) => {
            let ident = &field.ident;
            (
                quote! { ::docstore::models::DocumentId::to_document_id(&self.#ident) },
                quote! { ::docstore::models::DocumentId::assign_document_id(&mut self.#ident, id) },
                id_fields_fn(&body_keys(field)?),
            )
        }
        (None, None, Some(base)) => {
            let ident = &base.ident;
            let ty = &base.ty;
            (
                quote! { ::docstore::models::Document::document_id(&self.#ident) },
                quote! { ::docstore::models::Document::set_document_id(&mut self.#ident, id) },
                quote! {
                    fn id_fields() -> &'static [&'static str] {
                        <#ty as ::docstore::models::Document>::id_fields()
                    }
                },
            )
        }
        (None, None, None) => {
            return Err(syn::Error::new_spanned(
                input,
                "Document needs an `id` field, a `#[document(id)]` field or a `#[document(base)]` field",
            ))
        }
    };

    let stamp_created = match (roles.created_at, roles.base) {
        (Some(field), _) => {
            let ident = &field.ident;
            Some(quote! {
                fn stamp_created(&mut self, now: ::docstore::chrono::DateTime<::docstore::chrono::Utc>) {
                    if ::docstore::models::Timestamp::is_unset(&self.#ident) {
                        ::docstore::models::Timestamp::set(&mut self.#ident, now);
                    }
                }
            })
        }
        (None, Some(base)) => {
            let ident = &base.ident;
            Some(quote! {
                fn stamp_created(&mut self, now: ::docstore::chrono::DateTime<::docstore::chrono::Utc>) {
                    ::docstore::models::Document::stamp_created(&mut self.#ident, now);
                }
            })
        }
        (None, None) => None,
    };

    let (stamp_updated, updated_at_field) = match (roles.updated_at, roles.base) {
        (Some(field), _) => {
            let ident = &field.ident;
            let key = serde_keys(field)?.serialize;
            (
                Some(quote! {
                    fn stamp_updated(&mut self, now: ::docstore::chrono::DateTime<::docstore::chrono::Utc>) {
                        ::docstore::models::Timestamp::set(&mut self.#ident, now);
                    }
                }),
                Some(quote! {
                    fn updated_at_field() -> &'static str {
                        #key
                    }
                }),
            )
        }
        (None, Some(base)) => {
            let ident = &base.ident;
            let ty = &base.ty;
            (
                Some(quote! {
                    fn stamp_updated(&mut self, now: ::docstore::chrono::DateTime<::docstore::chrono::Utc>) {
                        ::docstore::models::Document::stamp_updated(&mut self.#ident, now);
                    }
                }),
                Some(quote! {
                    fn updated_at_field() -> &'static str {
                        <#ty as ::docstore::models::Document>::updated_at_field()
                    }
                }),
            )
        }
        (None, None) => (None, None),
    };

    let set_score = match (roles.score, roles.base) {
        (Some(field), _) => {
            let ident = &field.ident;
            Some(quote! {
                fn set_score(&mut self, score: f64) {
                    self.#ident = ::core::convert::Into::into(score);
                }
            })
        }
        (None, Some(base)) => {
            let ident = &base.ident;
            Some(quote! {
                fn set_score(&mut self, score: f64) {
                    ::docstore::models::Document::set_score(&mut self.#ident, score);
                }
            })
        }
        (None, None) => None,
    };

    Ok(quote! {
        impl #impl_generics ::docstore::models::Document for #name #ty_generics #where_clause {
            #index_name

            fn document_id(&self) -> ::core::option::Option<::std::string::String> {
                #document_id
            }

            fn set_document_id(&mut self, id: &str) -> bool {
                #set_document_id
            }

            #stamp_created
            #stamp_updated
            #set_score
            #updated_at_field
            #id_fields
        }
    })
}

/// `#[document(index = "...")]` on the struct.
fn parse_index(input: &DeriveInput) -> syn::Result<Option<LitStr>> {
    let mut index = None;
    for attr in &input.attrs {
        if attr.path().is_ident("document") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("index") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(meta.error("index name must not be empty"));
                    }
                    index = Some(value);
                    Ok(())
                } else {
                    Err(meta.error("expected `index = \"...\"`"))
                }
            })?;
        }
    }
    Ok(index)
}

/// Explicit `#[document(...)]` roles first, then conventional field names
/// (`id`, `created_at`, `updated_at`) for roles still unassigned.
fn collect_roles<'a>(fields: impl Iterator<Item = &'a Field> + Clone) -> syn::Result<Roles<'a>> {
    let mut roles = Roles::default();
    let mut tagged = Vec::new();

    for field in fields.clone() {
        for attr in &field.attrs {
            if !attr.path().is_ident("document") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                let slot = if meta.path.is_ident("id") {
                    &mut roles.id
                } else if meta.path.is_ident("created_at") {
                    &mut roles.created_at
                } else if meta.path.is_ident("updated_at") {
                    &mut roles.updated_at
                } else if meta.path.is_ident("score") {
                    &mut roles.score
                } else if meta.path.is_ident("base") {
                    &mut roles.base
                } else {
                    return Err(meta.error(
                        "expected one of `id`, `created_at`, `updated_at`, `score`, `base`",
                    ));
                };
                if slot.is_some() {
                    return Err(meta.error("role is already assigned to another field"));
                }
                *slot = Some(field);
                Ok(())
            })?;
            tagged.push(field);
        }
    }

    for field in fields {
        if tagged.iter().any(|t| std::ptr::eq(*t, field)) {
            continue;
        }
        let slot = match ident_str(field).as_str() {
            "id" => &mut roles.canonical_id,
            "created_at" => &mut roles.created_at,
            "updated_at" => &mut roles.updated_at,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(field);
        }
    }

    Ok(roles)
}

/// Body keys of a field as a `Vec<String>`, for quoting.
fn body_keys(field: &Field) -> syn::Result<Vec<String>> {
    Ok(serde_keys(field)?.all().into_iter().map(str::to_string).collect())
}

fn id_fields_fn(keys: &[String]) -> TokenStream2 {
    quote! {
        fn id_fields() -> &'static [&'static str] {
            &[#(#keys),*]
        }
    }
}
