//! Helpers shared by the derives.

use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::token::{self, Comma};
use syn::{Data, DeriveInput, Expr, Field, Fields, LitStr, Token};

/// Named fields of a struct, or an error naming the derive.
pub fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> syn::Result<&'a Punctuated<Field, Comma>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{} can only be derived for structs with named fields", derive),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{} can only be derived for structs", derive),
        )),
    }
}

/// Keys a field is written and read under in the serialized body.
pub struct SerdeKeys {
    pub serialize: String,
    pub deserialize: String,
}

impl SerdeKeys {
    /// Distinct keys, serialize name first.
    pub fn all(&self) -> Vec<&str> {
        if self.serialize == self.deserialize {
            vec![self.serialize.as_str()]
        } else {
            vec![self.serialize.as_str(), self.deserialize.as_str()]
        }
    }
}

/// Resolves `#[serde(rename = "...")]` and
/// `#[serde(rename(serialize = "...", deserialize = "..."))]`, falling back to
/// the field name. Other serde options are skipped.
pub fn serde_keys(field: &Field) -> syn::Result<SerdeKeys> {
    let name = ident_str(field);
    let mut serialize = None;
    let mut deserialize = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename") {
                return skip_meta(&meta);
            }
            if meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                serialize = Some(value.value());
                deserialize = Some(value.value());
                return Ok(());
            }
            meta.parse_nested_meta(|inner| {
                let value: LitStr = inner.value()?.parse()?;
                if inner.path.is_ident("serialize") {
                    serialize = Some(value.value());
                } else if inner.path.is_ident("deserialize") {
                    deserialize = Some(value.value());
                }
                Ok(())
            })
        })?;
    }

    Ok(SerdeKeys {
        serialize: serialize.unwrap_or_else(|| name.clone()),
        deserialize: deserialize.unwrap_or(name),
    })
}

fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

/// Field name without a raw-identifier prefix.
pub fn ident_str(field: &Field) -> String {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
        .unwrap_or_default()
}
