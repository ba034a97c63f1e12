//! Parsing of port structs and their `#[req(...)]` / `#[resp(...)]`
//! attributes.
//!
//! A field attribute starts with its binding tag string, optionally followed
//! by supplemental `key = value` attributes:
//!
//! ```text
//! #[req("query,style=deepObject", description = "Color filter", minimum = 0)]
//! ```
//!
//! A bare key (`#[req("header", deprecated)]`) stands for `key = "true"`.

use syn::{
    ext::IdentExt,
    parse::{Parse, ParseStream},
    spanned::Spanned,
    Attribute, Data, DeriveInput, Fields, Ident, Lit, LitStr, Token, Type,
};

/// Parsed field attribute.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Primary `group[=peer][,option[=value]]*` tag.
    pub tag: String,
    /// Supplemental attributes, in declaration order.
    pub tags: Vec<(String, String)>,
}

impl FieldAttrs {
    /// Returns the group named by the binding tag.
    pub fn group(&self) -> &str {
        let binding = self.tag.split(',').next().unwrap_or_default().trim();
        binding.split_once('=').map_or(binding, |(group, _)| group)
    }

    /// Returns true when the field is excluded from the port.
    pub fn is_skipped(&self) -> bool {
        self.group() == "-"
    }
}

impl Parse for FieldAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Self::default();
        let mut first = true;

        while !input.is_empty() {
            if input.peek(LitStr) {
                let lit: LitStr = input.parse()?;
                if !first {
                    return Err(syn::Error::new(
                        lit.span(),
                        "the binding tag must come before other attributes",
                    ));
                }
                attrs.tag = lit.value();
            } else {
                let key = Ident::parse_any(input)?.unraw().to_string();
                let value = if input.peek(Token![=]) {
                    input.parse::<Token![=]>()?;
                    literal_text(input)?
                } else {
                    "true".to_string()
                };
                attrs.tags.push((key, value));
            }

            first = false;
            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(attrs)
    }
}

/// Reads a literal value as text. A leading `-` is kept for numbers.
fn literal_text(input: ParseStream) -> syn::Result<String> {
    let negative = if input.peek(Token![-]) {
        input.parse::<Token![-]>()?;
        true
    } else {
        false
    };

    let lit: Lit = input.parse()?;
    let text = match &lit {
        Lit::Str(s) if !negative => s.value(),
        Lit::Int(i) => i.base10_digits().to_string(),
        Lit::Float(f) => f.base10_digits().to_string(),
        Lit::Bool(b) if !negative => b.value.to_string(),
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "expected a string, number or boolean literal",
            ))
        }
    };

    Ok(if negative { format!("-{text}") } else { text })
}

/// Struct level `#[resp(...)]` options.
#[derive(Default)]
pub struct ContainerAttrs {
    /// Type declared with `error_payload = T`.
    pub error_payload: Option<Type>,
}

impl Parse for ContainerAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Self::default();

        while !input.is_empty() {
            let key = Ident::parse_any(input)?;
            input.parse::<Token![=]>()?;
            match key.to_string().as_str() {
                "error_payload" => attrs.error_payload = Some(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown attribute: {other}"),
                    ))
                }
            }

            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }

        Ok(attrs)
    }
}

/// One struct field and its binding.
pub struct PortMember {
    /// Field identifier as written.
    pub ident: Ident,
    /// Field name used in descriptors, without a raw prefix.
    pub name: String,
    /// Field type.
    pub ty: Type,
    /// Binding, `None` when the field is not part of the port.
    pub attrs: Option<FieldAttrs>,
}

impl PortMember {
    /// Returns the binding when the field is bound.
    pub fn binding(&self) -> Option<&FieldAttrs> {
        self.attrs.as_ref().filter(|attrs| !attrs.is_skipped())
    }
}

/// A parsed port struct.
pub struct PortStruct {
    /// Struct identifier.
    pub ident: Ident,
    /// Fields in declaration order.
    pub members: Vec<PortMember>,
    /// Struct level options.
    pub container: ContainerAttrs,
}

impl PortStruct {
    /// Parses a derive input, reading field attributes named `attr_name`.
    pub fn parse(input: &DeriveInput, attr_name: &str) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "port structs cannot be generic",
            ));
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => &named.named,
                Fields::Unit => {
                    return Ok(Self {
                        ident: input.ident.clone(),
                        members: Vec::new(),
                        container: container_attrs(&input.attrs, attr_name)?,
                    })
                }
                Fields::Unnamed(_) => {
                    return Err(syn::Error::new(
                        input.ident.span(),
                        "port structs must have named fields",
                    ))
                }
            },
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "ports can only be derived for structs",
                ))
            }
        };

        let mut members = Vec::with_capacity(fields.len());
        for field in fields {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
            let attrs = field_attrs(&field.attrs, attr_name)?;
            members.push(PortMember {
                name: ident.unraw().to_string(),
                ident,
                ty: field.ty.clone(),
                attrs,
            });
        }

        Ok(Self {
            ident: input.ident.clone(),
            members,
            container: container_attrs(&input.attrs, attr_name)?,
        })
    }

    /// Iterates over the bound fields.
    pub fn bound(&self) -> impl Iterator<Item = (&PortMember, &FieldAttrs)> {
        self.members
            .iter()
            .filter_map(|member| member.binding().map(|attrs| (member, attrs)))
    }
}

fn field_attrs(attrs: &[Attribute], attr_name: &str) -> syn::Result<Option<FieldAttrs>> {
    let mut found: Option<FieldAttrs> = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(attr_name)) {
        if found.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                format!("duplicate #[{attr_name}] attribute"),
            ));
        }
        let parsed: FieldAttrs = attr.parse_args()?;
        if parsed.tag.trim().is_empty() {
            return Err(syn::Error::new(
                attr.span(),
                format!("#[{attr_name}] needs a binding tag such as \"query\" or \"-\""),
            ));
        }
        found = Some(parsed);
    }
    Ok(found)
}

fn container_attrs(attrs: &[Attribute], attr_name: &str) -> syn::Result<ContainerAttrs> {
    let mut container = ContainerAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(attr_name)) {
        let parsed: ContainerAttrs = attr.parse_args()?;
        if parsed.error_payload.is_some() {
            container.error_payload = parsed.error_payload;
        }
    }
    Ok(container)
}

/// Returns true when `ty` is written as `Option<...>`.
pub fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_parse_tag_and_supplemental_attributes() {
        let attrs: FieldAttrs =
            parse_quote!("query,style=deepObject", description = "Color", minimum = -5, deprecated);
        assert_eq!(attrs.tag, "query,style=deepObject");
        assert_eq!(attrs.group(), "query");
        assert_eq!(
            attrs.tags,
            vec![
                ("description".to_string(), "Color".to_string()),
                ("minimum".to_string(), "-5".to_string()),
                ("deprecated".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_keys() {
        let attrs: FieldAttrs = parse_quote!("query", enum = "a,b", const = "a", default = 3);
        assert_eq!(attrs.tags[0], ("enum".to_string(), "a,b".to_string()));
        assert_eq!(attrs.tags[1], ("const".to_string(), "a".to_string()));
        assert_eq!(attrs.tags[2], ("default".to_string(), "3".to_string()));
    }

    #[test]
    fn test_group_with_peer() {
        let attrs: FieldAttrs = parse_quote!("path=deviceId");
        assert_eq!(attrs.group(), "path");
        assert!(!attrs.is_skipped());

        let skipped: FieldAttrs = parse_quote!("-");
        assert!(skipped.is_skipped());
    }

    #[test]
    fn test_tag_must_come_first() {
        let result = syn::parse2::<FieldAttrs>(quote::quote!(required, "query"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_port_struct() {
        let input: DeriveInput = parse_quote! {
            #[resp(error_payload = ErrorDto)]
            struct Outputs {
                #[resp("code")]
                code: u16,
                #[resp("body")]
                body: Option<Device>,
                cache: String,
                #[resp("-")]
                ignored: String,
            }
        };
        let port = PortStruct::parse(&input, "resp").unwrap();
        assert_eq!(port.members.len(), 4);
        assert_eq!(port.bound().count(), 2);
        assert!(port.container.error_payload.is_some());
        assert!(is_option(&port.members[1].ty));
        assert!(!is_option(&port.members[0].ty));
    }

    #[test]
    fn test_generic_struct_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Inputs<T> {
                #[req("body")]
                body: T,
            }
        };
        assert!(PortStruct::parse(&input, "req").is_err());
    }

    #[test]
    fn test_unknown_container_attribute() {
        let input: DeriveInput = parse_quote! {
            #[resp(payload = ErrorDto)]
            struct Outputs;
        };
        assert!(PortStruct::parse(&input, "resp").is_err());
    }
}
