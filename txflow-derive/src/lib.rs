//! Derive macros for txflow.
//!
//! `#[derive(Transactional)]` implements `txflow::propagation::Transactional`
//! from a `#[transactional(...)]` attribute:
//!
//! ```ignore
//! #[derive(Transactional)]
//! #[transactional(
//!     propagation = "requires_new",
//!     timeout = 30,
//!     rollback_for = "Validation, Conflict",
//!     no_rollback_for = "NotFound"
//! )]
//! struct PlaceOrder;
//! ```
//!
//! Every key is optional. Without the attribute the type gets the default
//! attributes (`REQUIRES`, manager default timeout, roll back on any error).
//! Rollback lists are comma separated error kind tags; built-in kind names
//! such as `SystemError` resolve to their variant, any other tag to
//! `ErrorKind::Application`.

extern crate proc_macro;
mod transactional;

use crate::transactional::generate_transactional;
use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

#[proc_macro_derive(Transactional, attributes(transactional))]
pub fn derive_transactional(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    if let Data::Union(_) = ast.data {
        let error = syn::Error::new_spanned(
            &ast,
            "Cannot derive Transactional for unions. Use a struct or an enum.",
        );
        return error.to_compile_error().into();
    }

    match generate_transactional(&ast) {
        Ok(token_stream) => token_stream,
        Err(e) => e.to_compile_error().into(),
    }
}
