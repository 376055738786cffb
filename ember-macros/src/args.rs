use syn::parse::{Parse, ParseStream};
use syn::{Error, Ident, LitInt, Result, Token};

/// Arguments accepted by `#[ember::main]` and `#[ember::test]`.
///
/// Only `event_capacity = N` is recognized. When absent the runtime
/// builder default is used.
pub(crate) struct RuntimeArgs {
    pub(crate) event_capacity: Option<usize>,
}

impl Parse for RuntimeArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self {
                event_capacity: None,
            });
        }

        let ident: Ident = input.parse()?;

        if ident != "event_capacity" {
            return Err(Error::new_spanned(ident, "expected `event_capacity`"));
        }

        input.parse::<Token![=]>()?;

        let value: LitInt = input.parse()?;
        let event_capacity = value.base10_parse::<usize>()?;

        if event_capacity == 0 {
            return Err(Error::new_spanned(
                value,
                "event_capacity must be greater than 0",
            ));
        }

        if !input.is_empty() {
            return Err(input.error("unexpected tokens after `event_capacity`"));
        }

        Ok(Self {
            event_capacity: Some(event_capacity),
        })
    }
}
