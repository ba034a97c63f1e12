//! Port reflection.
//!
//! The derive macros emit a static [`PortDescriptor`] for each port struct.
//! [`PortReflector`] turns that descriptor into a validated [`Port`]:
//! it parses each field's binding tag, applies group rules (accepted shapes
//! and cardinality) and runs post-processing. [`HttpPortReflector`] carries
//! the HTTP rule set for request and response ports.
//!
//! Reflection happens once per type; [`PortCache`] keeps the result for the
//! life of the process.

use crate::case::{canonical_header_key, to_kebab_case, to_lower_camel_case};
use crate::{
    FieldDescriptor, FieldGroup, FieldShape, Port, PortDescriptor, PortDirection, PortError,
    PortField,
};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

/// How many fields a group may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    /// Minimum number of fields.
    pub min: usize,
    /// Maximum number of fields, `None` for unbounded.
    pub max: Option<usize>,
}

impl Cardinality {
    /// At most one field.
    #[must_use]
    pub const fn zero_to_one() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }

    /// Any number of fields.
    #[must_use]
    pub const fn zero_to_many() -> Self {
        Self { min: 0, max: None }
    }

    fn admits(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

/// Rule applied to every field of one group.
#[derive(Debug, Clone)]
pub struct FieldGroupRule {
    /// Number of fields the group accepts.
    pub cardinality: Cardinality,
    /// Shapes the group accepts.
    pub allowed_shapes: Vec<FieldShape>,
}

impl FieldGroupRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(cardinality: Cardinality, allowed_shapes: &[FieldShape]) -> Self {
        Self {
            cardinality,
            allowed_shapes: allowed_shapes.to_vec(),
        }
    }
}

/// Per-field hook run after tag parsing.
pub type FieldPostProcessor = fn(&mut PortField, &FieldDescriptor);

type SharedPostProcessor = Arc<dyn Fn(&mut PortField, &FieldDescriptor) + Send + Sync>;

static POST_PROCESSOR: OnceLock<RwLock<Option<SharedPostProcessor>>> = OnceLock::new();

fn registered_post_processor() -> Option<SharedPostProcessor> {
    POST_PROCESSOR
        .get_or_init(|| RwLock::new(None))
        .read()
        .clone()
}

/// Installs a process-wide hook run on every HTTP port field before the
/// built-in HTTP rules.
///
/// Used to attach baggage (schemas, documentation) without the reflector
/// depending on the subsystem that produces it. Registering again replaces
/// the previous hook.
pub fn register_field_post_processor<F>(hook: F)
where
    F: Fn(&mut PortField, &FieldDescriptor) + Send + Sync + 'static,
{
    *POST_PROCESSOR.get_or_init(|| RwLock::new(None)).write() = Some(Arc::new(hook));
}

/// Turns a [`PortDescriptor`] into a [`Port`] under a set of group rules.
#[derive(Debug, Clone)]
pub struct PortReflector {
    direction: PortDirection,
    groups: BTreeMap<FieldGroup, FieldGroupRule>,
    post_processor: Option<FieldPostProcessor>,
}

impl PortReflector {
    /// Creates a reflector accepting no groups.
    #[must_use]
    pub fn new(direction: PortDirection) -> Self {
        Self {
            direction,
            groups: BTreeMap::new(),
            post_processor: None,
        }
    }

    /// Accepts `group` under `rule`.
    #[must_use]
    pub fn with_group(mut self, group: FieldGroup, rule: FieldGroupRule) -> Self {
        self.groups.insert(group, rule);
        self
    }

    /// Sets the per-field post-processor.
    #[must_use]
    pub fn with_post_processor(mut self, post_processor: FieldPostProcessor) -> Self {
        self.post_processor = Some(post_processor);
        self
    }

    fn group_names(&self) -> String {
        self.groups
            .keys()
            .map(FieldGroup::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Reflects every tagged field of `descriptor`.
    pub fn reflect(&self, descriptor: &PortDescriptor) -> Result<Port, PortError> {
        let mut fields = Vec::with_capacity(descriptor.fields.len());
        let mut counts: BTreeMap<FieldGroup, usize> = BTreeMap::new();

        for (index, field_descriptor) in descriptor.fields.iter().enumerate() {
            let Some(mut field) = self.reflect_field(field_descriptor)? else {
                continue;
            };
            field.index = index;
            *counts.entry(field.group).or_default() += 1;
            fields.push(field);
        }

        for (group, rule) in &self.groups {
            let found = counts.get(group).copied().unwrap_or(0);
            if !rule.cardinality.admits(found) {
                return Err(PortError::Cardinality {
                    group: *group,
                    max: rule.cardinality.max.unwrap_or(usize::MAX),
                    found,
                });
            }
        }

        tracing::trace!(
            port = descriptor.type_name,
            direction = %self.direction,
            fields = fields.len(),
            "reflected port"
        );

        Ok(Port::new(self.direction, descriptor.type_name, fields))
    }

    fn reflect_field(&self, descriptor: &FieldDescriptor) -> Result<Option<PortField>, PortError> {
        let mut parts = descriptor.tag.split(',');
        let binding = parts.next().unwrap_or_default().trim();
        if binding.is_empty() || binding == "-" {
            return Ok(None);
        }

        let (group_name, peer) = match binding.split_once('=') {
            Some((group, peer)) => (group, peer),
            None => (binding, ""),
        };

        let unknown_group = || PortError::UnknownGroup {
            field: descriptor.name.to_string(),
            group: group_name.to_string(),
            allowed: self.group_names(),
        };
        let group: FieldGroup = group_name.parse().map_err(|_| unknown_group())?;
        let Some(rule) = self.groups.get(&group) else {
            return Err(unknown_group());
        };

        let mut field = PortField::new(
            descriptor.name,
            peer,
            group,
            descriptor.shape,
            descriptor.optional,
        );

        for option in parts.map(str::trim).filter(|option| !option.is_empty()) {
            apply_primary_option(&mut field, option);
        }
        apply_supplemental_tags(&mut field, descriptor.tags);

        if let Some(post_processor) = self.post_processor {
            post_processor(&mut field, descriptor);
        }

        if field.peer.is_empty() {
            field.peer = to_lower_camel_case(&field.name);
        }

        if !rule.allowed_shapes.contains(&field.shape) {
            return Err(PortError::DisallowedShape {
                field: field.name,
                group,
                shape: field.shape,
            });
        }

        if group.default_style().is_none() && field.option("style").is_some() {
            return Err(PortError::StyleNotAllowed {
                field: field.name,
                group,
            });
        }

        Ok(Some(field))
    }
}

fn apply_primary_option(field: &mut PortField, option: &str) {
    let (mut name, mut value) = match option.split_once('=') {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (option.to_string(), "true".to_string()),
    };

    if name == "optional" {
        field.optional = value == "true";
        name = "required".to_string();
        value = (!field.optional).to_string();
    } else if name == "required" {
        field.optional = value != "true";
    }

    field.options.insert(name, value);
}

fn apply_supplemental_tags(field: &mut PortField, tags: &[(&str, &str)]) {
    let ordered = tags
        .iter()
        .filter(|(key, _)| *key == "required")
        .chain(tags.iter().filter(|(key, _)| *key == "optional"))
        .chain(
            tags.iter()
                .filter(|(key, _)| *key != "required" && *key != "optional"),
        );

    for (key, value) in ordered {
        match *key {
            "required" => field.optional = *value != "true",
            "optional" => field.optional = *value == "true",
            _ => {}
        }
        field.options.insert((*key).to_string(), (*value).to_string());
    }
}

/// HTTP rule sets for request and response ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpPortReflector;

impl HttpPortReflector {
    /// Returns the reflector for request ports.
    ///
    /// | group  | cardinality | shapes |
    /// |--------|-------------|--------|
    /// | method | 0..1 | primitive |
    /// | header | 0..n | primitive, array, object |
    /// | cookie | 0..n | primitive |
    /// | path   | 0..n | primitive |
    /// | query  | 0..n | primitive, array, object |
    /// | form   | 0..n | primitive, array, object, file, file-array |
    /// | body   | 0..n | content |
    #[must_use]
    pub fn input_reflector() -> PortReflector {
        use FieldShape::{Array, Content, File, FileArray, Object, Primitive};

        PortReflector::new(PortDirection::In)
            .with_group(
                FieldGroup::Method,
                FieldGroupRule::new(Cardinality::zero_to_one(), &[Primitive]),
            )
            .with_group(
                FieldGroup::Header,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Primitive, Array, Object]),
            )
            .with_group(
                FieldGroup::Cookie,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Primitive]),
            )
            .with_group(
                FieldGroup::Path,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Primitive]),
            )
            .with_group(
                FieldGroup::Query,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Primitive, Array, Object]),
            )
            .with_group(
                FieldGroup::Form,
                FieldGroupRule::new(
                    Cardinality::zero_to_many(),
                    &[Primitive, Array, Object, File, FileArray],
                ),
            )
            .with_group(
                FieldGroup::Body,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Content]),
            )
            .with_post_processor(post_process_http_field)
    }

    /// Returns the reflector for response ports.
    ///
    /// | group  | cardinality | shapes |
    /// |--------|-------------|--------|
    /// | code   | 0..1 | primitive |
    /// | header | 0..n | primitive, array, object |
    /// | body   | 0..n | content |
    /// | paging | 0..1 | object |
    #[must_use]
    pub fn output_reflector() -> PortReflector {
        use FieldShape::{Array, Content, Object, Primitive};

        PortReflector::new(PortDirection::Out)
            .with_group(
                FieldGroup::Code,
                FieldGroupRule::new(Cardinality::zero_to_one(), &[Primitive]),
            )
            .with_group(
                FieldGroup::Header,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Primitive, Array, Object]),
            )
            .with_group(
                FieldGroup::Body,
                FieldGroupRule::new(Cardinality::zero_to_many(), &[Content]),
            )
            .with_group(
                FieldGroup::Paging,
                FieldGroupRule::new(Cardinality::zero_to_one(), &[Object]),
            )
            .with_post_processor(post_process_http_field)
    }

    /// Reflects a request port.
    pub fn reflect_input_port(descriptor: &PortDescriptor) -> Result<Port, PortError> {
        Self::input_reflector().reflect(descriptor)
    }

    /// Reflects a response port.
    pub fn reflect_output_port(descriptor: &PortDescriptor) -> Result<Port, PortError> {
        Self::output_reflector().reflect(descriptor)
    }
}

fn post_process_http_field(field: &mut PortField, descriptor: &FieldDescriptor) {
    if let Some(hook) = registered_post_processor() {
        hook(field, descriptor);
    }

    match field.group {
        FieldGroup::Path => {
            field.optional = false;
            field.options.insert("required".to_string(), "true".to_string());
            field.options.remove("optional");
        }
        FieldGroup::Header => {
            field.peer = canonical_header_key(&to_kebab_case(&field.name));
        }
        FieldGroup::Body if field.shape != FieldShape::Unknown => {
            field.shape = FieldShape::Content;
        }
        _ => {}
    }
}

/// Reflected ports keyed by Rust type and direction.
#[derive(Debug, Default)]
pub struct PortCache {
    ports: RwLock<HashMap<(TypeId, bool), Arc<Port>>>,
}

static PORT_CACHE: OnceLock<PortCache> = OnceLock::new();

impl PortCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide cache.
    pub fn global() -> &'static PortCache {
        PORT_CACHE.get_or_init(PortCache::new)
    }

    /// Returns the cached port for `T`, reflecting it on first use.
    pub fn get_or_reflect<T: 'static>(
        &self,
        direction: PortDirection,
        descriptor: &PortDescriptor,
    ) -> Result<Arc<Port>, PortError> {
        let key = (TypeId::of::<T>(), direction == PortDirection::In);
        if let Some(port) = self.ports.read().get(&key) {
            return Ok(Arc::clone(port));
        }

        let port = match direction {
            PortDirection::In => HttpPortReflector::reflect_input_port(descriptor)?,
            PortDirection::Out => HttpPortReflector::reflect_output_port(descriptor)?,
        };

        let mut ports = self.ports.write();
        let port = ports.entry(key).or_insert_with(|| Arc::new(port));
        Ok(Arc::clone(port))
    }

    /// Returns the number of cached ports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("tenant_id", "path", FieldShape::Primitive, true),
        FieldDescriptor::new("request_id", "header,optional", FieldShape::Primitive, true),
        FieldDescriptor::new(
            "filter",
            "query=f,style=deepObject,explode",
            FieldShape::Object,
            true,
        ),
        FieldDescriptor::new("page_size", "query", FieldShape::Primitive, false)
            .with_tags(&[("optional", "true"), ("description", "Rows per page")]),
        FieldDescriptor::new("payload", "body", FieldShape::Object, false),
        FieldDescriptor::new("internal", "-", FieldShape::Primitive, false),
    ];

    const REQUEST: PortDescriptor = PortDescriptor {
        type_name: "ListDevicesRequest",
        fields: REQUEST_FIELDS,
    };

    #[test]
    fn test_reflect_input_port() {
        let port = HttpPortReflector::reflect_input_port(&REQUEST).unwrap();
        assert_eq!(port.fields().len(), 5);
        assert_eq!(port.direction(), PortDirection::In);

        let tenant = port.field("tenant_id").unwrap();
        assert!(!tenant.optional);
        assert_eq!(tenant.option("required"), Some("true"));
        assert_eq!(tenant.peer, "tenantId");

        let request_id = port.field("request_id").unwrap();
        assert_eq!(request_id.peer, "Request-Id");
        assert!(request_id.optional);
        assert_eq!(request_id.option("required"), Some("false"));

        let filter = port.field("filter").unwrap();
        assert_eq!(filter.peer, "f");
        assert_eq!(filter.option("style"), Some("deepObject"));
        assert!(filter.explode());

        let page_size = port.field("page_size").unwrap();
        assert!(page_size.optional);
        assert_eq!(page_size.option("description"), Some("Rows per page"));

        let payload = port.field("payload").unwrap();
        assert_eq!(payload.shape, FieldShape::Content);
        assert!(port.field("internal").is_none());
    }

    #[test]
    fn test_unknown_group_rejected() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new(
            "x",
            "paging",
            FieldShape::Object,
            false,
        )];
        let descriptor = PortDescriptor {
            type_name: "Bad",
            fields: FIELDS,
        };
        let err = HttpPortReflector::reflect_input_port(&descriptor).unwrap_err();
        assert!(matches!(err, PortError::UnknownGroup { .. }));
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_disallowed_shape_rejected() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new(
            "ids",
            "path",
            FieldShape::Array,
            false,
        )];
        let descriptor = PortDescriptor {
            type_name: "Bad",
            fields: FIELDS,
        };
        let err = HttpPortReflector::reflect_input_port(&descriptor).unwrap_err();
        assert_eq!(
            err,
            PortError::DisallowedShape {
                field: "ids".into(),
                group: FieldGroup::Path,
                shape: FieldShape::Array,
            }
        );
    }

    #[test]
    fn test_cardinality_enforced() {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::new("a", "code", FieldShape::Primitive, true),
            FieldDescriptor::new("b", "code", FieldShape::Primitive, true),
        ];
        let descriptor = PortDescriptor {
            type_name: "Bad",
            fields: FIELDS,
        };
        let err = HttpPortReflector::reflect_output_port(&descriptor).unwrap_err();
        assert_eq!(
            err,
            PortError::Cardinality {
                group: FieldGroup::Code,
                max: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn test_body_style_rejected() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new(
            "body",
            "body,style=form",
            FieldShape::Content,
            false,
        )];
        let descriptor = PortDescriptor {
            type_name: "Bad",
            fields: FIELDS,
        };
        assert!(matches!(
            HttpPortReflector::reflect_output_port(&descriptor),
            Err(PortError::StyleNotAllowed { .. })
        ));
    }

    #[test]
    fn test_required_option_overrides_type_optionality() {
        const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::new(
            "q",
            "query,required",
            FieldShape::Primitive,
            true,
        )];
        let descriptor = PortDescriptor {
            type_name: "Q",
            fields: FIELDS,
        };
        let port = HttpPortReflector::reflect_input_port(&descriptor).unwrap();
        assert!(!port.fields()[0].optional);
    }

    #[test]
    fn test_port_cache_reflects_once() {
        struct Marker;
        let cache = PortCache::new();
        let first = cache
            .get_or_reflect::<Marker>(PortDirection::In, &REQUEST)
            .unwrap();
        let second = cache
            .get_or_reflect::<Marker>(PortDirection::In, &REQUEST)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
