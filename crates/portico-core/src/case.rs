//! Identifier case helpers used when deriving wire names from field names.
//!
//! Field names arrive in Rust `snake_case`; wire names are either
//! `lowerCamel` (query, cookie, path, form, body) or canonical MIME header
//! case (`Request-Id`).

/// Splits an identifier into lower-case words.
///
/// Word boundaries are `_`, `-`, and a lower-to-upper case transition.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Converts an identifier to `kebab-case`.
///
/// ```
/// use portico_core::case::to_kebab_case;
///
/// assert_eq!(to_kebab_case("request_id"), "request-id");
/// assert_eq!(to_kebab_case("RequestId"), "request-id");
/// ```
pub fn to_kebab_case(name: &str) -> String {
    words(name).join("-")
}

/// Converts an identifier to `lowerCamelCase`.
///
/// ```
/// use portico_core::case::to_lower_camel_case;
///
/// assert_eq!(to_lower_camel_case("page_size"), "pageSize");
/// assert_eq!(to_lower_camel_case("id"), "id");
/// ```
pub fn to_lower_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in words(name).iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// Returns the canonical MIME header form of `key`.
///
/// The first letter and any letter following a hyphen are upper-cased, the
/// rest lower-cased. Keys containing a space or non-token byte are returned
/// unchanged.
///
/// ```
/// use portico_core::case::canonical_header_key;
///
/// assert_eq!(canonical_header_key("x-request-id"), "X-Request-Id");
/// assert_eq!(canonical_header_key("CONTENT-TYPE"), "Content-Type");
/// ```
pub fn canonical_header_key(key: &str) -> String {
    if !key.bytes().all(is_token_byte) {
        return key.to_string();
    }

    let mut upper = true;
    key.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_from_snake_and_camel() {
        assert_eq!(to_kebab_case("x_correlation_id"), "x-correlation-id");
        assert_eq!(to_kebab_case("contentLength"), "content-length");
        assert_eq!(to_kebab_case("etag"), "etag");
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(to_lower_camel_case("tenant_id"), "tenantId");
        assert_eq!(to_lower_camel_case("sort_by_field"), "sortByField");
        assert_eq!(to_lower_camel_case("filter"), "filter");
    }

    #[test]
    fn test_canonical_header_key() {
        assert_eq!(canonical_header_key("etag"), "Etag");
        assert_eq!(canonical_header_key("request-id"), "Request-Id");
        assert_eq!(canonical_header_key("bad key"), "bad key");
    }

    #[test]
    fn test_header_peer_from_field_name() {
        let peer = canonical_header_key(&to_kebab_case("request_id"));
        assert_eq!(peer, "Request-Id");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_snake_names_survive_camel_round_trip(
                name in "[a-z][a-z0-9]{0,6}(_[a-z][a-z0-9]{0,6}){0,3}"
            ) {
                let kebab = name.replace('_', "-");
                prop_assert_eq!(to_kebab_case(&name), kebab.clone());
                prop_assert_eq!(to_kebab_case(&to_lower_camel_case(&name)), kebab);
            }
        }
    }
}
