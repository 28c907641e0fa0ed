//! Model definitions handed over by the front end.

use crate::{AstResult, Expr, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== MODEL ====================

/// A parsed model: every entity, source and endpoint of one compilation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub sources: Vec<SourceDef>,
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model serialized by a front end.
    pub fn from_json(json: &str) -> AstResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the model to pretty-printed JSON.
    pub fn to_json(&self) -> AstResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn source(&self, name: &str) -> Option<&SourceDef> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointDef> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

// ==================== ENTITY ====================

/// Entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<ParentRef>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub span: Span,
}

impl EntityDef {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Position of an attribute in declaration order.
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// True if any attribute carries an expression.
    pub fn has_expressions(&self) -> bool {
        self.attributes.iter().any(AttributeDef::is_computed)
    }

    /// True if any attribute is populated from a request parameter.
    pub fn has_decorators(&self) -> bool {
        self.attributes.iter().any(|a| a.decorator.is_some())
    }

    pub fn parent_names(&self) -> impl Iterator<Item = &str> {
        self.parents.iter().map(|p| p.name.as_str())
    }
}

/// Reference to a parent entity, optionally aliased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub span: Span,
}

/// Attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub expr: Option<Expr>,
    #[serde(default)]
    pub decorator: Option<Decorator>,
    #[serde(default)]
    pub span: Span,
}

impl AttributeDef {
    pub fn is_computed(&self) -> bool {
        self.expr.is_some()
    }
}

/// Populates an attribute from a request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    pub location: ParamLocation,
    pub param: String,
}

/// Where a request parameter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

// ==================== SCHEMA ====================

/// Request/response payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    /// Direct entity reference.
    Entity(String),
    /// Inline array.
    Array(ItemType),
}

impl Schema {
    pub fn entity(name: impl Into<String>) -> Self {
        Schema::Entity(name.into())
    }

    pub fn array_of(entity: impl Into<String>) -> Self {
        Schema::Array(ItemType::Entity(entity.into()))
    }

    pub fn array_of_primitive(type_name: impl Into<String>) -> Self {
        Schema::Array(ItemType::Primitive(type_name.into()))
    }

    /// The entity this schema carries, if any.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            Schema::Entity(name) | Schema::Array(ItemType::Entity(name)) => Some(name),
            Schema::Array(ItemType::Primitive(_)) => None,
        }
    }
}

/// Array element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Primitive(String),
    Entity(String),
}

// ==================== SOURCE ====================

/// HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// GET, HEAD and OPTIONS must never cause writes.
    pub fn is_safe(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Options)
    }

    pub fn is_read(&self) -> bool {
        self.is_safe()
    }

    pub fn is_write(&self) -> bool {
        !self.is_safe()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External data provider/consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub span: Span,
}

impl SourceDef {
    /// The entity this source produces.
    pub fn provides(&self) -> Option<&str> {
        match &self.kind {
            SourceKind::Rest(rest) => rest.response.as_ref().and_then(Schema::entity_name),
            SourceKind::Stream(stream) if stream.has(StreamOp::Subscribe) => {
                stream.subscribe.as_ref().and_then(Schema::entity_name)
            }
            SourceKind::Stream(_) => None,
        }
    }

    /// The entity this source accepts as payload.
    pub fn consumes(&self) -> Option<&str> {
        match &self.kind {
            SourceKind::Rest(rest) => rest.request.as_ref().and_then(Schema::entity_name),
            SourceKind::Stream(stream) if stream.has(StreamOp::Publish) => {
                stream.publish.as_ref().and_then(Schema::entity_name)
            }
            SourceKind::Stream(_) => None,
        }
    }

    /// Fetching from this source has no side effects.
    pub fn is_read(&self) -> bool {
        match &self.kind {
            SourceKind::Rest(rest) => rest.method.is_read(),
            SourceKind::Stream(stream) => !stream.has(StreamOp::Publish),
        }
    }

    /// Calling this source mutates external state.
    pub fn is_write(&self) -> bool {
        !self.is_read()
    }

    /// Url or channel name.
    pub fn address(&self) -> &str {
        match &self.kind {
            SourceKind::Rest(rest) => &rest.url,
            SourceKind::Stream(stream) => &stream.channel,
        }
    }

    /// Method name as emitted into descriptors.
    pub fn method_name(&self) -> &'static str {
        match &self.kind {
            SourceKind::Rest(rest) => rest.method.as_str(),
            SourceKind::Stream(stream) if stream.has(StreamOp::Publish) => "PUBLISH",
            SourceKind::Stream(_) => "SUBSCRIBE",
        }
    }

    pub fn params(&self) -> &[SourceParam] {
        match &self.kind {
            SourceKind::Rest(rest) => &rest.params,
            SourceKind::Stream(_) => &[],
        }
    }

    pub fn headers(&self) -> &[Header] {
        match &self.kind {
            SourceKind::Rest(rest) => &rest.headers,
            SourceKind::Stream(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Rest(RestSource),
    Stream(StreamSource),
}

/// REST source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestSource {
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub params: Vec<SourceParam>,
    #[serde(default)]
    pub request: Option<Schema>,
    #[serde(default)]
    pub response: Option<Schema>,
}

/// Static request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Path/query/header parameter of a source call.
/// The value is restricted to `Entity.attribute` or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceParam {
    pub name: String,
    pub location: ParamLocation,
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
}

/// Streaming source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSource {
    pub channel: String,
    pub operations: Vec<StreamOp>,
    #[serde(default)]
    pub publish: Option<Schema>,
    #[serde(default)]
    pub subscribe: Option<Schema>,
}

impl StreamSource {
    pub fn has(&self, op: StreamOp) -> bool {
        self.operations.contains(&op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamOp {
    Publish,
    Subscribe,
}

// ==================== ENDPOINT ====================

/// Internally exposed API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDef {
    pub name: String,
    pub kind: EndpointKind,
    #[serde(default)]
    pub request: Option<Schema>,
    #[serde(default)]
    pub responses: Vec<ResponseDef>,
    #[serde(default)]
    pub errors: Vec<ErrorDef>,
    #[serde(default)]
    pub span: Span,
}

impl EndpointDef {
    /// HTTP method, None for duplex channels.
    pub fn method(&self) -> Option<HttpMethod> {
        match &self.kind {
            EndpointKind::Rest { method, .. } => Some(*method),
            EndpointKind::Duplex { .. } => None,
        }
    }

    pub fn request_entity(&self) -> Option<&str> {
        self.request.as_ref().and_then(Schema::entity_name)
    }

    /// Response entities in declaration order, without duplicates.
    pub fn response_entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for response in &self.responses {
            if let Some(name) = response.schema.entity_name() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Guard and error conditions in declaration order.
    pub fn conditions(&self) -> impl Iterator<Item = &Expr> {
        self.responses
            .iter()
            .filter_map(|r| r.condition.as_ref())
            .chain(self.errors.iter().map(|e| &e.condition))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Rest { method: HttpMethod, path: String },
    Duplex { channel: String },
}

/// One response variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDef {
    pub status: u16,
    pub schema: Schema,
    #[serde(default)]
    pub condition: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Declared error raised when its condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDef {
    pub status: u16,
    pub message: String,
    pub condition: Expr,
    #[serde(default)]
    pub span: Span,
}
