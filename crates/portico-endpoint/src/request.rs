//! Request side of an endpoint: parameters, body and input binding.

use crate::endpoint::InputBinding;
use portico_codec::{MEDIA_TYPE_FORM_URLENCODED, MEDIA_TYPE_JSON, MEDIA_TYPE_MULTIPART_FORM};
use portico_core::{FieldGroup, FieldShape, Port, PortError, PortField};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Custom validation run on populated inputs.
pub type PortValidator = Arc<dyn Fn(&(dyn Any + Send)) -> anyhow::Result<()> + Send + Sync>;

/// Request description of an endpoint.
#[derive(Clone, Default)]
pub struct EndpointRequest {
    /// Reflected input port.
    pub port: Option<Arc<Port>>,
    /// Free text description.
    pub description: String,
    /// Header, cookie, path and query parameters.
    pub parameters: Vec<EndpointRequestParameter>,
    /// Body or form.
    pub body: EndpointRequestBody,
    /// Custom validation of populated inputs.
    pub validator: Option<PortValidator>,
    pub(crate) binding: Option<InputBinding>,
}

impl EndpointRequest {
    /// Creates an empty request description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, parameter: EndpointRequestParameter) -> Self {
        match self
            .parameters
            .iter_mut()
            .find(|existing| existing.name == parameter.name)
        {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
        self
    }

    /// Applies `patch` to the parameter named `name`, if present.
    #[must_use]
    pub fn patch_parameter(
        mut self,
        name: &str,
        patch: impl FnOnce(EndpointRequestParameter) -> EndpointRequestParameter,
    ) -> Self {
        if let Some(index) = self.parameters.iter().position(|p| p.name == name) {
            let parameter = self.parameters.remove(index);
            self.parameters.insert(index, patch(parameter));
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: EndpointRequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: PortValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Reflects the input port and derives parameters and body from its fields.
    pub fn with_inputs(mut self, binding: InputBinding) -> Result<Self, PortError> {
        let port = binding.port()?;
        for field in port.fields() {
            self = self.with_port_field(field);
        }
        self.port = Some(port);
        self.binding = Some(binding);
        Ok(self)
    }

    fn with_port_field(mut self, field: &PortField) -> Self {
        match field.group {
            FieldGroup::Body => {
                self.body = EndpointRequestBody::from_port_field(field);
                self
            }
            FieldGroup::Form => {
                self.body = self
                    .body
                    .with_form_field(EndpointRequestBodyFormField::from_port_field(field));
                self
            }
            FieldGroup::Method => self,
            _ => self.with_parameter(EndpointRequestParameter::from_port_field(field)),
        }
    }

    /// Media types accepted by the request.
    #[must_use]
    pub fn consumes(&self) -> Vec<String> {
        vec![self.body.mime.clone()]
    }

    /// Returns true when the request declares a body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.mime.is_empty()
    }
}

impl fmt::Debug for EndpointRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRequest")
            .field("port", &self.port.as_ref().map(|port| port.type_name()))
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A header, cookie, path or query parameter.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequestParameter {
    /// Wire name.
    pub name: String,
    /// Location: `header`, `cookie`, `path`, `query`.
    pub location: String,
    /// Free text description.
    pub description: Option<String>,
    /// Whether the parameter must be present.
    pub required: Option<bool>,
    /// Whether the parameter is deprecated.
    pub deprecated: Option<bool>,
    /// Serialization style.
    pub style: Option<String>,
    /// Serialization explode flag.
    pub explode: Option<bool>,
    /// Example value.
    pub example: Option<String>,
    /// Field the parameter was reflected from.
    pub port_field: Option<PortField>,
}

impl EndpointRequestParameter {
    /// Creates a parameter at `location`.
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    /// Derives a parameter from an input field.
    ///
    /// Path parameters are required by definition, so only non-path fields
    /// record `required`.
    pub fn from_port_field(field: &PortField) -> Self {
        let mut parameter = Self::new(field.peer.clone(), field.group.as_str());
        if field.group != FieldGroup::Path && !field.optional {
            parameter.required = Some(true);
        }
        parameter.description = field.option("description").map(str::to_string);
        parameter.deprecated = field.bool_option("deprecated");
        parameter.example = field.option("example").map(str::to_string);
        parameter.style = field
            .specified_style()
            .or_else(|| field.group.default_style())
            .map(|style| style.to_string());
        parameter.explode = Some(
            field
                .bool_option("explode")
                .unwrap_or(field.group == FieldGroup::Form),
        );
        parameter.port_field = Some(field.clone());
        parameter
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets `required`.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Sets `deprecated`.
    #[must_use]
    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = Some(deprecated);
        self
    }

    /// Sets the style.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Sets `explode`.
    #[must_use]
    pub fn with_explode(mut self, explode: bool) -> Self {
        self.explode = Some(explode);
        self
    }

    /// Sets the example.
    #[must_use]
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// A required path parameter.
pub fn path_parameter(name: &str, description: &str) -> EndpointRequestParameter {
    EndpointRequestParameter::new(name, "path")
        .with_description(description)
        .with_required(true)
}

/// A query parameter.
pub fn query_parameter(name: &str, description: &str) -> EndpointRequestParameter {
    EndpointRequestParameter::new(name, "query").with_description(description)
}

/// A header parameter.
pub fn header_parameter(name: &str, description: &str) -> EndpointRequestParameter {
    EndpointRequestParameter::new(name, "header").with_description(description)
}

/// A cookie parameter.
pub fn cookie_parameter(name: &str, description: &str) -> EndpointRequestParameter {
    EndpointRequestParameter::new(name, "cookie").with_description(description)
}

/// Request body description.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequestBody {
    /// Free text description.
    pub description: String,
    /// Whether a body must be sent.
    pub required: bool,
    /// Media type; empty when the request has no body.
    pub mime: String,
    /// Form fields of a form body.
    pub form_fields: Vec<EndpointRequestBodyFormField>,
    /// Body field the description was reflected from.
    pub port_field: Option<PortField>,
}

impl EndpointRequestBody {
    /// Derives a content body from a body field.
    ///
    /// The media type comes from the `mime` option, defaulting to JSON.
    pub fn from_port_field(field: &PortField) -> Self {
        Self {
            description: field.option("description").unwrap_or_default().to_string(),
            required: !field.optional,
            mime: field
                .option("mime")
                .filter(|mime| !mime.is_empty())
                .unwrap_or(MEDIA_TYPE_JSON)
                .to_string(),
            form_fields: Vec::new(),
            port_field: Some(field.clone()),
        }
    }

    /// Adds a form field, switching the body to a form media type.
    ///
    /// File fields force `multipart/form-data`; otherwise an unset media type
    /// becomes `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn with_form_field(mut self, field: EndpointRequestBodyFormField) -> Self {
        self.required = true;
        if field.is_file() {
            self.mime = MEDIA_TYPE_MULTIPART_FORM.to_string();
        } else if self.mime.is_empty() {
            self.mime = MEDIA_TYPE_FORM_URLENCODED.to_string();
        }
        self.form_fields.push(field);
        self
    }

    /// Returns true when the body is a form.
    #[must_use]
    pub fn has_form_fields(&self) -> bool {
        !self.form_fields.is_empty()
    }
}

/// One field of a form body.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequestBodyFormField {
    /// Wire name.
    pub name: String,
    /// Whether the field must be present.
    pub required: bool,
    /// Free text description.
    pub description: Option<String>,
    /// Serialization explode flag.
    pub explode: Option<bool>,
    /// Field the form field was reflected from.
    pub port_field: Option<PortField>,
}

impl EndpointRequestBodyFormField {
    /// Derives a form field from an input field.
    pub fn from_port_field(field: &PortField) -> Self {
        Self {
            name: field.peer.clone(),
            required: !field.optional,
            description: field.option("description").map(str::to_string),
            explode: field.bool_option("explode"),
            port_field: Some(field.clone()),
        }
    }

    /// Returns true for file and file array fields.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.port_field.as_ref().is_some_and(|field| {
            matches!(field.shape, FieldShape::File | FieldShape::FileArray)
        })
    }

    /// The equivalent `form` location parameter.
    #[must_use]
    pub fn parameter(&self) -> EndpointRequestParameter {
        EndpointRequestParameter {
            name: self.name.clone(),
            location: "form".to_string(),
            description: self.description.clone(),
            required: Some(self.required),
            explode: Some(self.explode.unwrap_or(true)),
            port_field: self.port_field.clone(),
            ..EndpointRequestParameter::default()
        }
    }
}
