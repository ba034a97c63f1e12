//! `#[derive(Inputs)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::descriptor::descriptor_body;
use crate::parse::{PortMember, PortStruct};

/// Expands `#[derive(Inputs)]` into an `InputPort` implementation.
pub fn expand_inputs(input: &DeriveInput) -> syn::Result<TokenStream> {
    let port = PortStruct::parse(input, "req")?;
    if port.container.error_payload.is_some() {
        return Err(syn::Error::new(
            input.ident.span(),
            "error_payload is only valid on #[derive(Outputs)]",
        ));
    }

    let ident = &port.ident;
    let descriptor = descriptor_body(&port);
    let initializers = port.members.iter().map(field_initializer);

    Ok(quote! {
        impl ::portico::codec::InputPort for #ident {
            fn descriptor() -> &'static ::portico::core::PortDescriptor {
                #descriptor
            }

            fn populate(
                port: &::portico::core::Port,
                decoder: &::portico::codec::RequestDecoder<'_>,
            ) -> ::portico::codec::CodecResult<Self> {
                let _ = (&port, &decoder);
                ::core::result::Result::Ok(Self {
                    #(#initializers),*
                })
            }
        }
    })
}

fn field_initializer(member: &PortMember) -> TokenStream {
    let ident = &member.ident;
    let ty = &member.ty;
    let name = &member.name;

    let Some(attrs) = member.binding() else {
        return quote! { #ident: ::core::default::Default::default() };
    };

    let convert = if attrs.group() == "body" {
        quote! {
            <#ty as ::portico::codec::FromRequestBody>::from_content(
                field,
                decoder.decode_content(field)?,
            )?
        }
    } else {
        quote! {
            <#ty as ::portico::codec::FromPortValue>::from_port_value(
                field,
                decoder.decode(field)?,
            )?
        }
    };

    quote! {
        #ident: {
            let field = port.field(#name).ok_or_else(|| {
                ::portico::codec::CodecError::conversion(#name, "field is not bound by the port")
            })?;
            #convert
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_expand_inputs() {
        let input: DeriveInput = parse_quote! {
            struct GetDeviceInputs {
                #[req("path=deviceId")]
                device_id: String,
                #[req("body")]
                body: Device,
                #[req("-")]
                cached: Option<String>,
            }
        };
        let tokens = expand_inputs(&input).unwrap().to_string();
        assert!(tokens.contains("InputPort for GetDeviceInputs"));
        assert!(tokens.contains("FromRequestBody"));
        assert!(tokens.contains("FromPortValue"));
        assert!(tokens.contains("cached : :: core :: default :: Default :: default ()"));
    }

    #[test]
    fn test_error_payload_rejected_on_inputs() {
        let input: DeriveInput = parse_quote! {
            #[req(error_payload = ErrorDto)]
            struct Inputs {
                #[req("query")]
                limit: u32,
            }
        };
        assert!(expand_inputs(&input).is_err());
    }

    #[test]
    fn test_tuple_struct_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Inputs(String);
        };
        assert!(expand_inputs(&input).is_err());
    }
}
