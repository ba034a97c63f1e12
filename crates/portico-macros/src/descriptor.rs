//! Static field descriptor generation shared by both derives.

use proc_macro2::TokenStream;
use quote::quote;

use crate::parse::{is_option, FieldAttrs, PortMember, PortStruct};

/// Generates the body of `descriptor()`: a static descriptor array and the
/// `PortDescriptor` pointing at it.
pub fn descriptor_body(port: &PortStruct) -> TokenStream {
    let type_name = port.ident.to_string();
    let entries: Vec<TokenStream> = port
        .bound()
        .map(|(member, attrs)| field_descriptor(member, attrs))
        .collect();
    let count = entries.len();

    quote! {
        static FIELDS: [::portico::core::FieldDescriptor; #count] = [#(#entries),*];
        static DESCRIPTOR: ::portico::core::PortDescriptor = ::portico::core::PortDescriptor {
            type_name: #type_name,
            fields: &FIELDS,
        };
        &DESCRIPTOR
    }
}

fn field_descriptor(member: &PortMember, attrs: &FieldAttrs) -> TokenStream {
    let name = &member.name;
    let tag = &attrs.tag;
    let ty = &member.ty;
    let declared = |key: &str| attrs.tags.iter().any(|(k, _)| k == key);

    let mut tags = Vec::new();

    // Body and paging types are serde types, not port field types.
    let (shape, optional) = match attrs.group() {
        "body" => {
            let optional = is_option(ty);
            (quote!(::portico::core::FieldShape::Content), quote!(#optional))
        }
        "paging" => {
            let optional = is_option(ty);
            (quote!(::portico::core::FieldShape::Object), quote!(#optional))
        }
        _ => {
            if !declared("type") {
                tags.push(quote!(("type", <#ty as ::portico::codec::PortFieldType>::SCHEMA_TYPE)));
            }
            if !declared("items") {
                tags.push(
                    quote!(("items", <#ty as ::portico::codec::PortFieldType>::ITEMS_SCHEMA_TYPE)),
                );
            }
            (
                quote!(<#ty as ::portico::codec::PortFieldType>::SHAPE),
                quote!(<#ty as ::portico::codec::PortFieldType>::OPTIONAL),
            )
        }
    };

    tags.extend(attrs.tags.iter().map(|(key, value)| quote!((#key, #value))));

    let descriptor = quote! {
        ::portico::core::FieldDescriptor::new(#name, #tag, #shape, #optional)
    };

    if tags.is_empty() {
        return descriptor;
    }

    quote! { #descriptor.with_tags(&[#(#tags),*]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::{parse_quote, DeriveInput};

    #[test]
    fn test_declared_type_wins() {
        let input: DeriveInput = parse_quote! {
            struct Inputs {
                #[req("query", type = "integer")]
                limit: String,
            }
        };
        let port = PortStruct::parse(&input, "req").unwrap();
        let tokens = descriptor_body(&port).to_string();
        assert!(!tokens.contains(":: SCHEMA_TYPE"));
        assert!(tokens.contains("ITEMS_SCHEMA_TYPE"));
        assert!(tokens.contains("(\"type\" , \"integer\")"));
    }

    #[test]
    fn test_descriptor_skips_unbound_fields() {
        let input: DeriveInput = parse_quote! {
            struct Inputs {
                #[req("path=deviceId")]
                device_id: String,
                #[req("query", description = "Rows")]
                limit: Option<u32>,
                #[req("body")]
                body: Option<Device>,
                local: String,
            }
        };
        let port = PortStruct::parse(&input, "req").unwrap();
        let tokens = descriptor_body(&port).to_string();

        assert!(tokens.contains("FieldDescriptor ; 3usize"));
        assert!(tokens.contains("\"path=deviceId\""));
        assert!(tokens.contains("with_tags"));
        assert!(tokens.contains("FieldShape :: Content , true"));
        assert!(tokens.contains("(\"type\" , < String as :: portico :: codec :: PortFieldType > :: SCHEMA_TYPE)"));
        assert!(!tokens.contains("\"local\""));
    }
}
