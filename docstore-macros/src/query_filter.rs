//! Implementation of #[derive(QueryFilter)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Ident, LitStr};

use crate::util::named_fields;

/// Accepted `kind` strings and the `QueryKind` variant each maps to.
const KINDS: &[(&str, &str)] = &[
    ("EQ", "Eq"),
    ("NEQ", "Neq"),
    ("GT", "Gt"),
    ("GTE", "Gte"),
    ("LT", "Lt"),
    ("LTE", "Lte"),
    ("LIKE", "Like"),
    ("LIKE_LEFT", "LikeLeft"),
    ("LIKE_RIGHT", "LikeRight"),
    ("NOT_LIKE", "NotLike"),
    ("IN", "In"),
    ("NOT_IN", "NotIn"),
    ("IS_NULL", "IsNull"),
    ("IS_NOT_NULL", "IsNotNull"),
    ("BETWEEN", "Between"),
];

struct Condition {
    variant: Ident,
    target: String,
}

pub fn derive_query_filter_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = named_fields(input, "QueryFilter")?;

    let mut conditions = Vec::new();
    for field in fields {
        let Some(condition) = parse_condition(field)? else {
            continue;
        };
        let ident = &field.ident;
        let Condition { variant, target } = condition;
        conditions.push(quote! {
            ::docstore::query::FilterCondition::new(
                ::docstore::query::QueryKind::#variant,
                #target,
                &self.#ident,
            )
        });
    }

    Ok(quote! {
        impl #impl_generics ::docstore::query::QueryFilter for #name #ty_generics #where_clause {
            fn conditions(&self) -> ::std::vec::Vec<::docstore::query::FilterCondition<'_>> {
                ::std::vec![#(#conditions),*]
            }
        }
    })
}

/// Reads `#[query(kind = "...", field = "...")]`; fields without it are
/// not part of the filter.
fn parse_condition(field: &Field) -> syn::Result<Option<Condition>> {
    let mut kind: Option<LitStr> = None;
    let mut target: Option<LitStr> = None;
    let mut seen = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        seen = true;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("kind") || meta.path.is_ident("type") {
                kind = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("field") {
                target = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("expected `kind = \"...\"` or `field = \"...\"`"))
            }
        })?;
    }

    if !seen {
        return Ok(None);
    }

    let Some(kind) = kind else {
        return Err(syn::Error::new_spanned(
            field,
            "#[query] needs a `kind`, e.g. #[query(kind = \"EQ\")]",
        ));
    };

    let Some((_, variant)) = KINDS.iter().find(|(name, _)| *name == kind.value()) else {
        let valid: Vec<&str> = KINDS.iter().map(|(name, _)| *name).collect();
        return Err(syn::Error::new(
            kind.span(),
            format!(
                "unknown query kind `{}`; expected one of {}",
                kind.value(),
                valid.join(", ")
            ),
        ));
    };

    let target = match target {
        Some(lit) => lit.value(),
        None => field
            .ident
            .as_ref()
            .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
            .unwrap_or_default(),
    };

    Ok(Some(Condition {
        variant: Ident::new(variant, Span::call_site()),
        target,
    }))
}
