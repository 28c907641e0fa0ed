//! Fluent construction of models, for front ends and tests.
//!
//! Validation (duplicate names, unknown references, cycles) is left to the
//! graph builder so that a model loaded from JSON and a model built here go
//! through the same checks.

use crate::{
    AttributeDef, Decorator, EndpointDef, EndpointKind, EntityDef, ErrorDef, Expr, Header,
    HttpMethod, Model, ParamLocation, ParentRef, ResponseDef, RestSource, Schema, SourceDef,
    SourceKind, SourceParam, Span, StreamOp, StreamSource,
};

/// Builder for constructing a Model.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity definition.
    pub fn entity(&mut self, name: impl Into<String>) -> EntityBuilder<'_> {
        EntityBuilder {
            builder: self,
            def: EntityDef {
                name: name.into(),
                parents: Vec::new(),
                attributes: Vec::new(),
                span: Span::default(),
            },
        }
    }

    /// Add a REST source definition.
    pub fn rest_source(
        &mut self,
        name: impl Into<String>,
        method: HttpMethod,
        url: impl Into<String>,
    ) -> RestSourceBuilder<'_> {
        RestSourceBuilder {
            builder: self,
            name: name.into(),
            rest: RestSource {
                url: url.into(),
                method,
                headers: Vec::new(),
                params: Vec::new(),
                request: None,
                response: None,
            },
        }
    }

    /// Add a streaming source definition.
    pub fn stream_source(
        &mut self,
        name: impl Into<String>,
        channel: impl Into<String>,
    ) -> StreamSourceBuilder<'_> {
        StreamSourceBuilder {
            builder: self,
            name: name.into(),
            stream: StreamSource {
                channel: channel.into(),
                operations: Vec::new(),
                publish: None,
                subscribe: None,
            },
        }
    }

    /// Add a REST endpoint definition.
    pub fn endpoint(
        &mut self,
        name: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
    ) -> EndpointBuilder<'_> {
        self.endpoint_of(
            name.into(),
            EndpointKind::Rest {
                method,
                path: path.into(),
            },
        )
    }

    /// Add a duplex (websocket) endpoint definition.
    pub fn duplex(
        &mut self,
        name: impl Into<String>,
        channel: impl Into<String>,
    ) -> EndpointBuilder<'_> {
        self.endpoint_of(
            name.into(),
            EndpointKind::Duplex {
                channel: channel.into(),
            },
        )
    }

    fn endpoint_of(&mut self, name: String, kind: EndpointKind) -> EndpointBuilder<'_> {
        EndpointBuilder {
            builder: self,
            def: EndpointDef {
                name,
                kind,
                request: None,
                responses: Vec::new(),
                errors: Vec::new(),
                span: Span::default(),
            },
        }
    }

    /// Build the Model.
    pub fn build(self) -> Model {
        self.model
    }
}

/// Builder for an entity definition.
pub struct EntityBuilder<'a> {
    builder: &'a mut ModelBuilder,
    def: EntityDef,
}

impl<'a> EntityBuilder<'a> {
    /// Add a parent entity by name.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.def.parents.push(ParentRef {
            name: parent.into(),
            alias: None,
            span: Span::default(),
        });
        self
    }

    /// Add a parent entity referenced in expressions through an alias.
    pub fn extends_as(mut self, parent: impl Into<String>, alias: impl Into<String>) -> Self {
        self.def.parents.push(ParentRef {
            name: parent.into(),
            alias: Some(alias.into()),
            span: Span::default(),
        });
        self
    }

    /// Add a plain attribute.
    pub fn attr(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.push(name.into(), type_name.into(), None, None)
    }

    /// Add a computed attribute.
    pub fn computed(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        expr: Expr,
    ) -> Self {
        self.push(name.into(), type_name.into(), Some(expr), None)
    }

    /// Add an attribute populated from a request parameter.
    pub fn param(
        self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        location: ParamLocation,
        param: impl Into<String>,
    ) -> Self {
        let decorator = Decorator {
            location,
            param: param.into(),
        };
        self.push(name.into(), type_name.into(), None, Some(decorator))
    }

    /// Attach a source location to the entity.
    pub fn at(mut self, span: Span) -> Self {
        self.def.span = span;
        self
    }

    fn push(
        mut self,
        name: String,
        type_name: String,
        expr: Option<Expr>,
        decorator: Option<Decorator>,
    ) -> Self {
        self.def.attributes.push(AttributeDef {
            name,
            type_name,
            expr,
            decorator,
            span: Span::default(),
        });
        self
    }

    /// Finish building this entity.
    pub fn done(self) {
        self.builder.model.entities.push(self.def);
    }
}

/// Builder for a REST source definition.
pub struct RestSourceBuilder<'a> {
    builder: &'a mut ModelBuilder,
    name: String,
    rest: RestSource,
}

impl<'a> RestSourceBuilder<'a> {
    /// Set the request payload schema.
    pub fn request(mut self, schema: Schema) -> Self {
        self.rest.request = Some(schema);
        self
    }

    /// Set the response payload schema.
    pub fn response(mut self, schema: Schema) -> Self {
        self.rest.response = Some(schema);
        self
    }

    /// Add a static header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.rest.headers.push(Header {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a path/query/header parameter.
    pub fn param(mut self, name: impl Into<String>, location: ParamLocation, value: Expr) -> Self {
        self.rest.params.push(SourceParam {
            name: name.into(),
            location,
            value,
            span: Span::default(),
        });
        self
    }

    /// Finish building this source.
    pub fn done(self) {
        self.builder.model.sources.push(SourceDef {
            name: self.name,
            kind: SourceKind::Rest(self.rest),
            span: Span::default(),
        });
    }
}

/// Builder for a streaming source definition.
pub struct StreamSourceBuilder<'a> {
    builder: &'a mut ModelBuilder,
    name: String,
    stream: StreamSource,
}

impl<'a> StreamSourceBuilder<'a> {
    /// Enable the publish operation with its payload schema.
    pub fn publish(mut self, schema: Schema) -> Self {
        self.stream.operations.push(StreamOp::Publish);
        self.stream.publish = Some(schema);
        self
    }

    /// Enable the subscribe operation with its payload schema.
    pub fn subscribe(mut self, schema: Schema) -> Self {
        self.stream.operations.push(StreamOp::Subscribe);
        self.stream.subscribe = Some(schema);
        self
    }

    /// Finish building this source.
    pub fn done(self) {
        self.builder.model.sources.push(SourceDef {
            name: self.name,
            kind: SourceKind::Stream(self.stream),
            span: Span::default(),
        });
    }
}

/// Builder for an endpoint definition.
pub struct EndpointBuilder<'a> {
    builder: &'a mut ModelBuilder,
    def: EndpointDef,
}

impl<'a> EndpointBuilder<'a> {
    /// Set the request schema.
    pub fn request(mut self, schema: Schema) -> Self {
        self.def.request = Some(schema);
        self
    }

    /// Add an unconditional response.
    pub fn response(mut self, status: u16, schema: Schema) -> Self {
        self.def.responses.push(ResponseDef {
            status,
            schema,
            condition: None,
            span: Span::default(),
        });
        self
    }

    /// Add a response guarded by a condition.
    pub fn response_when(mut self, status: u16, schema: Schema, condition: Expr) -> Self {
        self.def.responses.push(ResponseDef {
            status,
            schema,
            condition: Some(condition),
            span: Span::default(),
        });
        self
    }

    /// Add a declared error.
    pub fn error(mut self, status: u16, message: impl Into<String>, condition: Expr) -> Self {
        self.def.errors.push(ErrorDef {
            status,
            message: message.into(),
            condition,
            span: Span::default(),
        });
        self
    }

    /// Finish building this endpoint.
    pub fn done(self) {
        self.builder.model.endpoints.push(self.def);
    }
}
