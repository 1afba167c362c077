use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::quote;
use syn::{DeriveInput, LitInt, LitStr};

const PROPAGATIONS: [(&str, &str); 6] = [
    ("REQUIRES", "Requires"),
    ("REQUIRES_NEW", "RequiresNew"),
    ("MANDATORY", "Mandatory"),
    ("SUPPORTED", "Supported"),
    ("NOT_SUPPORTED", "NotSupported"),
    ("NEVER", "Never"),
];

pub(crate) fn generate_transactional(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let mut propagation = Ident::new("Requires", Span::call_site());
    let mut timeout: u32 = 0;
    let mut rollback_for: Vec<String> = Vec::new();
    let mut no_rollback_for: Vec<String> = Vec::new();

    for attr in &ast.attrs {
        if !attr.path().is_ident("transactional") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("propagation") {
                let s: LitStr = meta.value()?.parse()?;
                propagation = parse_propagation(&s)?;
                Ok(())
            } else if meta.path.is_ident("timeout") {
                let lit: LitInt = meta.value()?.parse()?;
                timeout = lit.base10_parse()?;
                Ok(())
            } else if meta.path.is_ident("rollback_for") {
                let s: LitStr = meta.value()?.parse()?;
                rollback_for.extend(split_tags(&s.value()));
                Ok(())
            } else if meta.path.is_ident("no_rollback_for") {
                let s: LitStr = meta.value()?.parse()?;
                no_rollback_for.extend(split_tags(&s.value()));
                Ok(())
            } else {
                Err(meta.error(
                    "unsupported transactional key, expected one of: propagation, timeout, rollback_for, no_rollback_for",
                ))
            }
        })?;
    }

    let rollback_for = rollback_for.iter().map(|tag| {
        quote!(txflow::errors::ErrorKind::from_tag(#tag))
    });
    let no_rollback_for = no_rollback_for.iter().map(|tag| {
        quote!(txflow::errors::ErrorKind::from_tag(#tag))
    });

    let gen = quote! {
        impl #impl_generics txflow::propagation::Transactional for #name #ty_generics #where_clause {
            fn transaction_attributes(&self) -> txflow::propagation::TransactionAttributes {
                txflow::propagation::TransactionAttributes::new(
                    txflow::propagation::Propagation::#propagation,
                )
                .with_timeout(#timeout)
                .with_rollback_for(::std::vec::Vec::<txflow::errors::ErrorKind>::from([#(#rollback_for),*]))
                .with_no_rollback_for(::std::vec::Vec::<txflow::errors::ErrorKind>::from([#(#no_rollback_for),*]))
            }
        }
    };

    Ok(TokenStream::from(gen))
}

fn parse_propagation(lit: &LitStr) -> syn::Result<Ident> {
    let normalized = lit.value().trim().to_ascii_uppercase().replace(['-', ' '], "_");
    PROPAGATIONS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, variant)| Ident::new(variant, lit.span()))
        .ok_or_else(|| {
            syn::Error::new(
                lit.span(),
                format!(
                    "unknown propagation '{}', expected one of: requires, requires_new, mandatory, supported, not_supported, never",
                    lit.value()
                ),
            )
        })
}

fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
