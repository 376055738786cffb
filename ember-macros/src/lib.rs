//! Attribute macros for the Ember runtime.
//!
//! - `#[ember::main]` turns `async fn main` into a synchronous entry point.
//! - `#[ember::test]` turns an `async fn` into a `#[test]`.
//!
//! Both accept an optional `event_capacity = N` argument that is forwarded
//! to `RuntimeBuilder::event_capacity`.

mod args;
use args::RuntimeArgs;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Error, ItemFn, parse_macro_input};

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RuntimeArgs);
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    if sig.asyncness.is_none() {
        return Error::new_spanned(
            sig.fn_token,
            "#[ember::main] must be used on an async function",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return Error::new_spanned(&sig.ident, "#[ember::main] must be used on fn main")
            .to_compile_error()
            .into();
    }

    let builder = builder(&args);
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn main() #output {
            #builder
                .block_on(async move #block)
                .expect("runtime shut down before main completed")
        }
    }
    .into()
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RuntimeArgs);
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    if sig.asyncness.is_none() {
        return Error::new_spanned(
            sig.fn_token,
            "#[ember::test] must be used on an async function",
        )
        .to_compile_error()
        .into();
    }

    if !sig.inputs.is_empty() {
        return Error::new_spanned(&sig.inputs, "#[ember::test] functions take no arguments")
            .to_compile_error()
            .into();
    }

    let name = &sig.ident;
    let output = &sig.output;
    let builder = builder(&args);

    quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() #output {
            #builder
                .block_on(async move #block)
                .expect("runtime shut down before the test completed")
        }
    }
    .into()
}

fn builder(args: &RuntimeArgs) -> proc_macro2::TokenStream {
    let capacity = args
        .event_capacity
        .map(|n| quote!(.event_capacity(#n)));

    quote! {
        ::ember::RuntimeBuilder::new()
            #capacity
            .build()
            .expect("failed to build runtime")
    }
}
