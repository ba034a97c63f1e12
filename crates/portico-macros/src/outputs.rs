//! `#[derive(Outputs)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::descriptor::descriptor_body;
use crate::parse::PortStruct;

/// Expands `#[derive(Outputs)]` into `OutputPort` and `ResponsePort`
/// implementations.
pub fn expand_outputs(input: &DeriveInput) -> syn::Result<TokenStream> {
    let port = PortStruct::parse(input, "resp")?;
    let ident = &port.ident;
    let descriptor = descriptor_body(&port);

    let arms = port.bound().map(|(member, attrs)| {
        let field = &member.ident;
        let name = &member.name;
        let extract = match attrs.group() {
            "body" => quote! { ::portico::codec::ExtractedValue::body(&self.#field) },
            "paging" => quote! { ::portico::codec::ExtractedValue::paging(&self.#field) },
            _ => quote! { ::portico::codec::IntoPortValue::to_port_value(&self.#field) },
        };
        quote! { #name => #extract, }
    });

    let error_payload = port.container.error_payload.as_ref().map(|payload| {
        quote! {
            fn error_payload() -> ::core::option::Option<::portico::endpoint::ErrorBodyStrategy> {
                ::core::option::Option::Some(
                    <#payload as ::portico::endpoint::ErrorPayload>::error_strategy(),
                )
            }
        }
    });

    Ok(quote! {
        impl ::portico::codec::OutputPort for #ident {
            fn descriptor() -> &'static ::portico::core::PortDescriptor {
                #descriptor
            }

            fn extract(
                &self,
                field: &::portico::core::PortField,
            ) -> ::portico::codec::CodecResult<::portico::codec::ExtractedValue> {
                match field.name.as_str() {
                    #(#arms)*
                    _ => ::core::result::Result::Ok(::portico::codec::ExtractedValue::Absent),
                }
            }
        }

        impl ::portico::endpoint::ResponsePort for #ident {
            #error_payload
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_expand_outputs() {
        let input: DeriveInput = parse_quote! {
            #[resp(error_payload = ErrorDto)]
            struct ListDevicesOutputs {
                #[resp("code")]
                code: u16,
                #[resp("header,success")]
                location: Option<String>,
                #[resp("paging")]
                paging: PagingResponse,
                #[resp("body")]
                body: Vec<Device>,
            }
        };
        let tokens = expand_outputs(&input).unwrap().to_string();
        assert!(tokens.contains("OutputPort for ListDevicesOutputs"));
        assert!(tokens.contains("ResponsePort for ListDevicesOutputs"));
        assert!(tokens.contains("ExtractedValue :: paging (& self . paging)"));
        assert!(tokens.contains("ExtractedValue :: body (& self . body)"));
        assert!(tokens.contains("< ErrorDto as :: portico :: endpoint :: ErrorPayload >"));
    }

    #[test]
    fn test_expand_outputs_without_error_payload() {
        let input: DeriveInput = parse_quote! {
            struct Empty;
        };
        let tokens = expand_outputs(&input).unwrap().to_string();
        assert!(!tokens.contains("error_payload"));
    }

    #[test]
    fn test_enum_rejected() {
        let input: DeriveInput = parse_quote! {
            enum Outputs { A }
        };
        assert!(expand_outputs(&input).is_err());
    }
}
