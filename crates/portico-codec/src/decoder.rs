//! Request decoding by location, style and explode.
//!
//! The decoder implements the OpenAPI 3 parameter serialization matrix:
//!
//! | Group  | Default style | Styles decoded | Explode |
//! |--------|---------------|----------------|---------|
//! | header | simple | simple | ignored for arrays (always CSV) |
//! | path   | simple | simple | ignored for arrays |
//! | query  | form   | form, spaceDelimited, pipeDelimited, deepObject | form: multiple `k=v` entries |
//! | cookie | form   | form | multiple same-named cookies |
//! | form   | n/a    | style ignored | CSV vs. multi-value |
//!
//! Values come back raw (strings, string lists, string maps); conversion to
//! typed values happens in [`crate::convert`].

use crate::content::{Content, MEDIA_TYPE_JSON};
use crate::form::UploadedFile;
use crate::source::RequestDataSource;
use crate::{CodecError, CodecResult};
use portico_core::{FieldGroup, FieldShape, FieldStyle, Pojo, PortField};
use serde_json::Value;
use std::cmp::Ordering;

/// Decodes raw field values from a [`RequestDataSource`].
pub struct RequestDecoder<'a> {
    source: &'a dyn RequestDataSource,
    default_content_type: String,
    default_encoding: String,
}

impl<'a> RequestDecoder<'a> {
    /// Creates a decoder defaulting body content to JSON with no encoding.
    pub fn new(source: &'a dyn RequestDataSource) -> Self {
        Self {
            source,
            default_content_type: MEDIA_TYPE_JSON.to_string(),
            default_encoding: String::new(),
        }
    }

    /// Overrides the body defaults used when the request omits
    /// `Content-Type` or `Content-Encoding`.
    #[must_use]
    pub fn with_defaults(
        mut self,
        content_type: impl Into<String>,
        encoding: impl Into<String>,
    ) -> Self {
        self.default_content_type = content_type.into();
        self.default_encoding = encoding.into();
        self
    }

    /// Returns the underlying data source.
    #[must_use]
    pub fn source(&self) -> &'a dyn RequestDataSource {
        self.source
    }

    // Values with non-ASCII bytes are kept; invalid UTF-8 is replaced.
    fn header_values(&self, name: &str) -> Vec<String> {
        self.source
            .headers()
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect()
    }

    fn cookie_values(&self, name: &str, first_only: bool) -> Vec<String> {
        let matching = self
            .source
            .cookies()
            .iter()
            .filter(|cookie| cookie.name == name)
            .map(|cookie| cookie.value.clone());
        if first_only {
            matching.take(1).collect()
        } else {
            matching.collect()
        }
    }

    fn form_values(&self, name: &str) -> CodecResult<Vec<String>> {
        Ok(self.source.form()?.values(name).to_vec())
    }

    /// Decodes a single value; absent data yields `None`.
    pub fn decode_primitive(&self, field: &PortField) -> CodecResult<Option<String>> {
        let name = field.peer.as_str();
        let specified = field.specified_style();

        let style = match field.group {
            FieldGroup::Header => {
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(first(self.header_values(name)));
                }
                style
            }
            FieldGroup::Path => {
                let Some(value) = self.source.path_parameters().get(name) else {
                    return Ok(None);
                };
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(Some(value.to_string()));
                }
                style
            }
            FieldGroup::Query => {
                let Some(values) = self.source.query().get(name) else {
                    return Ok(None);
                };
                let style = specified.unwrap_or(FieldStyle::Form);
                if matches!(
                    style,
                    FieldStyle::Form | FieldStyle::SpaceDelimited | FieldStyle::PipeDelimited
                ) {
                    return Ok(values.first().cloned());
                }
                style
            }
            FieldGroup::Cookie => {
                let values = self.cookie_values(name, true);
                let style = specified.unwrap_or(FieldStyle::Form);
                if style == FieldStyle::Form {
                    return Ok(first(values));
                }
                style
            }
            FieldGroup::Form => return Ok(first(self.form_values(name)?)),
            group => return Err(CodecError::UnknownFieldSource(group)),
        };

        Err(CodecError::UnsupportedStyle(style.to_string()))
    }

    /// Decodes a list of values; absent data yields an empty list.
    pub fn decode_array(&self, field: &PortField) -> CodecResult<Vec<String>> {
        let name = field.peer.as_str();
        let specified = field.specified_style();
        let explode = field.explode();

        let style = match field.group {
            FieldGroup::Header => {
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(form_array(&self.header_values(name), false));
                }
                style
            }
            FieldGroup::Path => {
                let Some(value) = self.source.path_parameters().get(name) else {
                    return Ok(Vec::new());
                };
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(form_array(&[value.to_string()], false));
                }
                style
            }
            FieldGroup::Query => {
                let Some(values) = self.source.query().get(name) else {
                    return Ok(Vec::new());
                };
                let style = specified.unwrap_or(FieldStyle::Form);
                match style {
                    FieldStyle::Form => return Ok(form_array(values, explode)),
                    FieldStyle::SpaceDelimited => return Ok(separated_array(values, " ")),
                    FieldStyle::PipeDelimited => return Ok(separated_array(values, "|")),
                    other => other,
                }
            }
            FieldGroup::Cookie => {
                let values = self.cookie_values(name, false);
                let style = specified.unwrap_or(FieldStyle::Form);
                if style == FieldStyle::Form {
                    return Ok(form_array(&values, explode));
                }
                style
            }
            FieldGroup::Form => return Ok(form_array(&self.form_values(name)?, explode)),
            group => return Err(CodecError::UnknownFieldSource(group)),
        };

        Err(CodecError::UnsupportedStyle(style.to_string()))
    }

    /// Decodes a string keyed map; absent data yields `None`.
    pub fn decode_object(&self, field: &PortField) -> CodecResult<Option<Pojo>> {
        let name = field.peer.as_str();
        let specified = field.specified_style();
        let explode = field.explode();

        let style = match field.group {
            FieldGroup::Header => {
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(separated_object(&self.header_values(name), ",", explode));
                }
                style
            }
            FieldGroup::Path => {
                let Some(value) = self.source.path_parameters().get(name) else {
                    return Ok(None);
                };
                let style = specified.unwrap_or(FieldStyle::Simple);
                if style == FieldStyle::Simple {
                    return Ok(separated_object(&[value.to_string()], ",", explode));
                }
                style
            }
            FieldGroup::Query => {
                let query = self.source.query();
                let style = specified.unwrap_or(FieldStyle::Form);

                if style == FieldStyle::DeepObject {
                    let prefix = format!("{name}[");
                    let pairs: Vec<(String, String)> = query
                        .iter()
                        .filter(|(key, _)| key.starts_with(&prefix))
                        .filter_map(|(key, values)| {
                            values
                                .first()
                                .map(|value| (key[name.len()..].to_string(), value.clone()))
                        })
                        .collect();
                    return Ok(deep_object(pairs));
                }

                if style == FieldStyle::Form && explode {
                    let pairs = query
                        .iter()
                        .filter_map(|(key, values)| {
                            values.first().map(|value| (key.clone(), value.clone()))
                        })
                        .collect();
                    return Ok(pairs_object(pairs));
                }

                let Some(values) = query.get(name) else {
                    return Ok(None);
                };
                match style {
                    FieldStyle::Form => return Ok(separated_object(values, ",", explode)),
                    FieldStyle::SpaceDelimited => return Ok(separated_object(values, " ", explode)),
                    FieldStyle::PipeDelimited => return Ok(separated_object(values, "|", explode)),
                    other => other,
                }
            }
            FieldGroup::Cookie => {
                let style = specified.unwrap_or(FieldStyle::Form);
                if style == FieldStyle::Form && explode {
                    let pairs = self
                        .source
                        .cookies()
                        .iter()
                        .map(|cookie| (cookie.name.clone(), cookie.value.clone()))
                        .collect();
                    return Ok(pairs_object(pairs));
                }
                if style == FieldStyle::Form {
                    return Ok(separated_object(&self.cookie_values(name, false), ",", explode));
                }
                style
            }
            FieldGroup::Form => {
                let values = self.form_values(name)?;
                let Some(value) = values.first() else {
                    return Ok(None);
                };
                return serde_json::from_str::<Pojo>(value)
                    .map(Some)
                    .map_err(CodecError::from);
            }
            group => return Err(CodecError::UnknownFieldSource(group)),
        };

        Err(CodecError::UnsupportedStyle(style.to_string()))
    }

    /// Decodes the first uploaded file for the field.
    pub fn decode_file(&self, field: &PortField) -> CodecResult<Option<UploadedFile>> {
        let mut files = self.decode_file_array(field)?;
        if files.is_empty() {
            if field.optional {
                return Ok(None);
            }
            return Err(CodecError::MissingRequiredFile(field.peer.clone()));
        }
        Ok(Some(files.swap_remove(0)))
    }

    /// Decodes every uploaded file for the field.
    pub fn decode_file_array(&self, field: &PortField) -> CodecResult<Vec<UploadedFile>> {
        Ok(self.source.form()?.files(&field.peer).to_vec())
    }

    /// Returns the request body with its content options.
    pub fn decode_content(&self, field: &PortField) -> CodecResult<Content> {
        match field.group {
            FieldGroup::Body => {
                let options = self
                    .source
                    .body_content_options(&self.default_content_type, &self.default_encoding);
                Ok(Content::from_bytes(options, self.source.body()))
            }
            group => Err(CodecError::IncompatibleGroup {
                shape: field.shape,
                group,
            }),
        }
    }

    /// Free-form values are not decoded from HTTP requests.
    pub fn decode_any(&self, _field: &PortField) -> CodecResult<Option<Value>> {
        Err(CodecError::NotImplemented(
            "Any types not supported by rest ops".to_string(),
        ))
    }

    /// Decodes according to the field shape; `method` fields yield the
    /// request method.
    pub fn decode(&self, field: &PortField) -> CodecResult<DecodedValue> {
        if field.group == FieldGroup::Method {
            return Ok(DecodedValue::Primitive(Some(
                self.source.method().as_str().to_string(),
            )));
        }

        Ok(match field.shape {
            FieldShape::Primitive => DecodedValue::Primitive(self.decode_primitive(field)?),
            FieldShape::Array => DecodedValue::Array(self.decode_array(field)?),
            FieldShape::Object => DecodedValue::Object(self.decode_object(field)?),
            FieldShape::File => DecodedValue::File(self.decode_file(field)?),
            FieldShape::FileArray => DecodedValue::FileArray(self.decode_file_array(field)?),
            FieldShape::Content => DecodedValue::Content(self.decode_content(field)?),
            FieldShape::Any => DecodedValue::Any(self.decode_any(field)?),
            FieldShape::Unknown => {
                return Err(CodecError::NotImplemented(format!(
                    "cannot decode field {:?} of unknown shape",
                    field.name
                )))
            }
        })
    }
}

/// A raw decoded value, one variant per field shape.
#[derive(Debug, Clone)]
pub enum DecodedValue {
    /// Primitive value.
    Primitive(Option<String>),
    /// Array value.
    Array(Vec<String>),
    /// Object value.
    Object(Option<Pojo>),
    /// Single file.
    File(Option<UploadedFile>),
    /// File list.
    FileArray(Vec<UploadedFile>),
    /// Body content.
    Content(Content),
    /// Free-form value.
    Any(Option<Value>),
}

impl DecodedValue {
    /// Returns true when the request carried no data for the field.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Primitive(value) => value.is_none(),
            Self::Array(values) => values.is_empty(),
            Self::Object(value) => value.is_none(),
            Self::File(value) => value.is_none(),
            Self::FileArray(values) => values.is_empty(),
            Self::Content(content) => !content.is_present(),
            Self::Any(value) => value.is_none(),
        }
    }
}

fn first(values: Vec<String>) -> Option<String> {
    values.into_iter().next()
}

fn separated_array(values: &[String], separator: &str) -> Vec<String> {
    values
        .first()
        .map(|value| value.split(separator).map(str::to_string).collect())
        .unwrap_or_default()
}

fn form_array(values: &[String], explode: bool) -> Vec<String> {
    if explode {
        values.to_vec()
    } else {
        separated_array(values, ",")
    }
}

/// `R=100,G=200` (explode) or `R,100,G,200` (no explode).
fn separated_object(values: &[String], separator: &str, explode: bool) -> Option<Pojo> {
    let value = values.first()?;
    let mut result = Pojo::new();

    if explode {
        for pair in value.split(',') {
            let parts: Vec<&str> = pair.split('=').collect();
            if parts.len() != 2 || parts[0].is_empty() {
                continue;
            }
            result.insert(parts[0].to_string(), Value::String(parts[1].to_string()));
        }
    } else {
        let mut key = "";
        for (i, part) in value.split(separator).enumerate() {
            if i % 2 == 0 {
                key = part;
                continue;
            }
            if key.is_empty() {
                continue;
            }
            result.insert(key.to_string(), Value::String(part.to_string()));
        }
    }

    Some(result)
}

fn pairs_object(pairs: Vec<(String, String)>) -> Option<Pojo> {
    if pairs.is_empty() {
        return None;
    }
    Some(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

/// Splits `[a][b]` into `["a", "b"]`.
fn deep_object_path(key: &str) -> Vec<String> {
    key.split("][")
        .map(|part| {
            let part = part.strip_prefix('[').unwrap_or(part);
            part.strip_suffix(']').unwrap_or(part).to_string()
        })
        .collect()
}

/// Segment-wise lexicographic order, shorter path first on a shared prefix.
fn compare_paths(left: &[String], right: &[String]) -> Ordering {
    left.iter()
        .zip(right)
        .map(|(l, r)| l.cmp(r))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| left.len().cmp(&right.len()))
}

/// Rebuilds a nested object from `[a][b]=v` pairs, independent of arrival order.
fn deep_object(pairs: Vec<(String, String)>) -> Option<Pojo> {
    if pairs.is_empty() {
        return None;
    }

    let mut paths: Vec<(Vec<String>, String)> = pairs
        .into_iter()
        .map(|(key, value)| (deep_object_path(&key), value))
        .collect();
    paths.sort_by(|(left, _), (right, _)| compare_paths(left, right));

    let mut result = Pojo::new();
    for (path, value) in paths {
        insert_path(&mut result, &path, value);
    }
    Some(result)
}

fn insert_path(target: &mut Pojo, path: &[String], value: String) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut here = target;
    for segment in parents {
        let entry = here
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Pojo::new()));
        if !entry.is_object() {
            *entry = Value::Object(Pojo::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        here = next;
    }
    here.insert(last.clone(), Value::String(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::MultipartConfig;
    use crate::source::HttpRequestDataSource;
    use bytes::Bytes;
    use http::{header, HeaderMap, HeaderValue, Method, Uri};
    use portico_core::PathParams;
    use serde_json::json;

    fn source_with(uri: &str, headers: HeaderMap, params: PathParams) -> HttpRequestDataSource {
        HttpRequestDataSource::new(
            Method::GET,
            uri.parse::<Uri>().unwrap(),
            headers,
            Bytes::new(),
            params,
            MultipartConfig::default(),
        )
    }

    fn query_source(uri: &str) -> HttpRequestDataSource {
        source_with(uri, HeaderMap::new(), PathParams::new())
    }

    fn field(group: FieldGroup, shape: FieldShape, peer: &str) -> PortField {
        PortField::new(peer, peer, group, shape, true)
    }

    #[test]
    fn test_header_non_ascii_values_kept() {
        let mut headers = HeaderMap::new();
        headers.append("x-label", HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());
        headers.append("x-legacy", HeaderValue::from_bytes(b"caf\xe9").unwrap());
        let source = source_with("/x", headers, PathParams::new());
        let decoder = RequestDecoder::new(&source);

        let label = field(FieldGroup::Header, FieldShape::Primitive, "X-Label");
        assert_eq!(decoder.decode_primitive(&label).unwrap(), Some("café".into()));

        let legacy = field(FieldGroup::Header, FieldShape::Primitive, "X-Legacy");
        assert_eq!(
            decoder.decode_primitive(&legacy).unwrap(),
            Some("caf\u{fffd}".into())
        );
    }

    #[test]
    fn test_query_primitive_first_value() {
        let source = query_source("/x?limit=10&limit=20");
        let decoder = RequestDecoder::new(&source);
        let limit = field(FieldGroup::Query, FieldShape::Primitive, "limit");
        assert_eq!(decoder.decode_primitive(&limit).unwrap(), Some("10".into()));

        let missing = field(FieldGroup::Query, FieldShape::Primitive, "offset");
        assert_eq!(decoder.decode_primitive(&missing).unwrap(), None);
    }

    #[test]
    fn test_query_array_styles() {
        let source = query_source("/x?csv=blue,black,brown&multi=blue&multi=black&sp=a%20b&pipe=a|b");
        let decoder = RequestDecoder::new(&source);

        let csv = field(FieldGroup::Query, FieldShape::Array, "csv");
        assert_eq!(decoder.decode_array(&csv).unwrap(), vec!["blue", "black", "brown"]);

        let multi = field(FieldGroup::Query, FieldShape::Array, "multi").with_option("explode", "true");
        assert_eq!(decoder.decode_array(&multi).unwrap(), vec!["blue", "black"]);

        let sp = field(FieldGroup::Query, FieldShape::Array, "sp").with_option("style", "spaceDelimited");
        assert_eq!(decoder.decode_array(&sp).unwrap(), vec!["a", "b"]);

        let pipe = field(FieldGroup::Query, FieldShape::Array, "pipe").with_option("style", "pipeDelimited");
        assert_eq!(decoder.decode_array(&pipe).unwrap(), vec!["a", "b"]);

        let deep = field(FieldGroup::Query, FieldShape::Array, "csv").with_option("style", "deepObject");
        assert!(matches!(
            decoder.decode_array(&deep),
            Err(CodecError::UnsupportedStyle(style)) if style == "deepObject"
        ));
    }

    #[test]
    fn test_header_array_always_csv() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tags", HeaderValue::from_static("a,b,c"));
        let source = source_with("/x", headers, PathParams::new());
        let decoder = RequestDecoder::new(&source);

        let tags = field(FieldGroup::Header, FieldShape::Array, "X-Tags").with_option("explode", "true");
        assert_eq!(decoder.decode_array(&tags).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_header_object_explode_and_plain() {
        let mut headers = HeaderMap::new();
        headers.insert("x-exploded", HeaderValue::from_static("R=100,G=200,=1,bad"));
        headers.insert("x-plain", HeaderValue::from_static("R,100,G,200"));
        let source = source_with("/x", headers, PathParams::new());
        let decoder = RequestDecoder::new(&source);

        let exploded = field(FieldGroup::Header, FieldShape::Object, "X-Exploded")
            .with_option("explode", "true");
        assert_eq!(
            Value::Object(decoder.decode_object(&exploded).unwrap().unwrap()),
            json!({"R": "100", "G": "200"})
        );

        let plain = field(FieldGroup::Header, FieldShape::Object, "X-Plain");
        assert_eq!(
            Value::Object(decoder.decode_object(&plain).unwrap().unwrap()),
            json!({"R": "100", "G": "200"})
        );
    }

    #[test]
    fn test_path_styles() {
        let params: PathParams = [("id", "42")].into_iter().collect();
        let source = source_with("/x", HeaderMap::new(), params);
        let decoder = RequestDecoder::new(&source);

        let id = field(FieldGroup::Path, FieldShape::Primitive, "id");
        assert_eq!(decoder.decode_primitive(&id).unwrap(), Some("42".into()));

        for style in ["matrix", "label"] {
            let styled = id.clone().with_option("style", style);
            assert!(matches!(
                decoder.decode_primitive(&styled),
                Err(CodecError::UnsupportedStyle(s)) if s == style
            ));
        }

        let absent = field(FieldGroup::Path, FieldShape::Primitive, "other");
        assert_eq!(decoder.decode_primitive(&absent).unwrap(), None);
    }

    #[test]
    fn test_cookie_values() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("tag=a; theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("tag=b"));
        let source = source_with("/x", headers, PathParams::new());
        let decoder = RequestDecoder::new(&source);

        let tag = field(FieldGroup::Cookie, FieldShape::Primitive, "tag");
        assert_eq!(decoder.decode_primitive(&tag).unwrap(), Some("a".into()));

        let tags = field(FieldGroup::Cookie, FieldShape::Array, "tag").with_option("explode", "true");
        assert_eq!(decoder.decode_array(&tags).unwrap(), vec!["a", "b"]);

        let all = field(FieldGroup::Cookie, FieldShape::Object, "all").with_option("explode", "true");
        assert_eq!(
            Value::Object(decoder.decode_object(&all).unwrap().unwrap()),
            json!({"tag": "b", "theme": "dark"})
        );

        let simple = tag.clone().with_option("style", "simple");
        assert!(matches!(
            decoder.decode_primitive(&simple),
            Err(CodecError::UnsupportedStyle(_))
        ));
    }

    #[test]
    fn test_deep_object_any_order() {
        let forward = query_source("/x?color[R]=100&color[G]=200&color[B]=150&other=1");
        let reverse = query_source("/x?color[B]=150&color[G]=200&color[R]=100");
        let color = field(FieldGroup::Query, FieldShape::Object, "color").with_option("style", "deepObject");

        for source in [&forward, &reverse] {
            let decoded = RequestDecoder::new(source).decode_object(&color).unwrap().unwrap();
            assert_eq!(
                Value::Object(decoded),
                json!({"R": "100", "G": "200", "B": "150"})
            );
        }
    }

    #[test]
    fn test_deep_object_nested() {
        let source = query_source("/x?f[a][b]=1&f[a]=scalar&f[c]=2");
        let f = field(FieldGroup::Query, FieldShape::Object, "f").with_option("style", "deepObject");
        let decoded = RequestDecoder::new(&source).decode_object(&f).unwrap().unwrap();
        assert_eq!(Value::Object(decoded), json!({"a": {"b": "1"}, "c": "2"}));
    }

    #[test]
    fn test_deep_object_absent() {
        let source = query_source("/x?g[a]=1");
        let f = field(FieldGroup::Query, FieldShape::Object, "f").with_option("style", "deepObject");
        assert!(RequestDecoder::new(&source).decode_object(&f).unwrap().is_none());
    }

    #[test]
    fn test_query_form_explode_object_collects_all_pairs() {
        let source = query_source("/x?R=100&G=200");
        let obj = field(FieldGroup::Query, FieldShape::Object, "color").with_option("explode", "true");
        let decoded = RequestDecoder::new(&source).decode_object(&obj).unwrap().unwrap();
        assert_eq!(Value::Object(decoded), json!({"R": "100", "G": "200"}));
    }

    #[test]
    fn test_unknown_group_and_any() {
        let source = query_source("/x");
        let decoder = RequestDecoder::new(&source);
        let paging = field(FieldGroup::Paging, FieldShape::Primitive, "p");
        assert!(matches!(
            decoder.decode_primitive(&paging),
            Err(CodecError::UnknownFieldSource(FieldGroup::Paging))
        ));
        assert!(matches!(
            decoder.decode_any(&paging),
            Err(CodecError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_content_only_from_body() {
        let source = query_source("/x");
        let decoder = RequestDecoder::new(&source);
        let body = field(FieldGroup::Body, FieldShape::Content, "body");
        let content = decoder.decode_content(&body).unwrap();
        assert!(!content.is_present());
        assert_eq!(content.mime_type(), MEDIA_TYPE_JSON);

        let query = field(FieldGroup::Query, FieldShape::Content, "q");
        let err = decoder.decode_content(&query).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot retrieve \"content\" value from field group \"query\""
        );
    }

    #[test]
    fn test_missing_required_file() {
        let source = query_source("/x");
        let decoder = RequestDecoder::new(&source);
        let mut avatar = field(FieldGroup::Form, FieldShape::File, "avatar");
        assert!(decoder.decode_file(&avatar).unwrap().is_none());

        avatar.optional = false;
        assert!(matches!(
            decoder.decode_file(&avatar),
            Err(CodecError::MissingRequiredFile(name)) if name == "avatar"
        ));
    }

    #[test]
    fn test_compare_paths() {
        let p = |parts: &[&str]| parts.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        assert_eq!(compare_paths(&p(&["a"]), &p(&["a", "b"])), Ordering::Less);
        assert_eq!(compare_paths(&p(&["b"]), &p(&["a", "z"])), Ordering::Greater);
        assert_eq!(compare_paths(&p(&["a", "b"]), &p(&["a", "b"])), Ordering::Equal);
    }
}
