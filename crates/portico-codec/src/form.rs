//! Form bodies: urlencoded values, multipart values and uploaded files.

use crate::{CodecError, CodecResult};
use bytes::Bytes;
use indexmap::IndexMap;
use std::io;

/// Default maximum form body size (10 MiB).
pub const DEFAULT_MAX_FORM_BYTES: usize = 10 * 1024 * 1024;

/// Default maximum number of multipart parts.
pub const DEFAULT_MAX_FORM_FIELDS: usize = 100;

/// Ordered multi-map of string values.
pub type MultiValues = IndexMap<String, Vec<String>>;

/// Limits applied while parsing form bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum size of one part in bytes.
    pub max_field_size: usize,
    /// Maximum number of parts.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_FORM_BYTES,
            max_field_size: DEFAULT_MAX_FORM_BYTES,
            max_fields: DEFAULT_MAX_FORM_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Creates the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum total body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the maximum part size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Sets the maximum number of parts.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// A file uploaded through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field name.
    pub name: Option<String>,
    /// Client supplied file name.
    pub file_name: Option<String>,
    /// Declared media type.
    pub content_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

impl UploadedFile {
    /// Creates an uploaded file.
    #[must_use]
    pub fn new(
        name: Option<String>,
        file_name: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    ) -> Self {
        Self {
            name,
            file_name,
            content_type,
            data,
        }
    }

    /// Returns the client supplied file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Returns the declared media type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true for an empty upload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the content as UTF-8 text.
    pub fn text(&self) -> CodecResult<String> {
        String::from_utf8(self.data.to_vec())
            .map_err(|e| CodecError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

/// Parsed form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    /// Text values by field name.
    pub values: MultiValues,
    /// Uploaded files by field name.
    pub files: IndexMap<String, Vec<UploadedFile>>,
}

impl FormData {
    /// Returns all values for `name`.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns all files for `name`.
    #[must_use]
    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map_or(&[], Vec::as_slice)
    }

    /// Appends values that are not already form values (query fallbacks).
    pub fn append_values(&mut self, extra: &MultiValues) {
        for (name, values) in extra {
            self.values
                .entry(name.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
}

/// Parses `a=1&b=2&a=3` into an ordered multi-map.
pub fn parse_urlencoded(input: &[u8]) -> CodecResult<MultiValues> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(input).map_err(|e| CodecError::Form(e.to_string()))?;

    let mut values = MultiValues::new();
    for (name, value) in pairs {
        values.entry(name).or_default().push(value);
    }
    Ok(values)
}

/// Parses a `multipart/form-data` body.
///
/// Parts with a file name become [`UploadedFile`]s, the rest text values.
pub async fn parse_multipart(
    content_type: &str,
    body: Bytes,
    config: &MultipartConfig,
) -> CodecResult<FormData> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| CodecError::Form("missing or invalid multipart boundary".to_string()))?;

    if body.len() > config.max_body_size {
        return Err(CodecError::Form(format!(
            "payload too large: max {} bytes, got {} bytes",
            config.max_body_size,
            body.len()
        )));
    }

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut form = FormData::default();
    let mut count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CodecError::Form(format!("multipart parse error: {e}")))?
    {
        count += 1;
        if count > config.max_fields {
            return Err(CodecError::Form(format!(
                "too many fields (max {})",
                config.max_fields
            )));
        }

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let part_type = field.content_type().map(ToString::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| CodecError::Form(format!("failed to read field: {e}")))?;

        if data.len() > config.max_field_size {
            return Err(CodecError::Form(format!(
                "field {name:?} too large: max {} bytes, got {} bytes",
                config.max_field_size,
                data.len()
            )));
        }

        if file_name.is_some() {
            let file = UploadedFile::new(Some(name.clone()), file_name, part_type, data);
            form.files.entry(name).or_default().push(file);
        } else {
            let text = String::from_utf8(data.to_vec())
                .map_err(|e| CodecError::Form(format!("field {name:?} is not valid UTF-8: {e}")))?;
            form.values.entry(name).or_default().push(text);
        }
    }

    Ok(form)
}
