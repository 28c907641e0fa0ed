//! Endpoint flows, source descriptors and plan diagnostics.

use keel_graph::{endpoint_local_subgraph, to_dot, NodeKind};
use keel_tests::prelude::*;

mod read_write {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn scenario() -> Scenario {
        Scenario::new("place order")
            .model(fixtures::shop().build())
            .step("place_order", |a| {
                a.flow(FlowKind::ReadWrite)
                    .reads(&["products"])
                    .writes(&["create_order"])
                    .terminal("Order")
                    .chain(ChainPhase::PreWrite, &["OrderRequest", "Product", "Order"])
                    .chain(ChainPhase::Response, &["Receipt", "OrderRequest"])
                    .origin(ChainPhase::PreWrite, "OrderRequest", Origin::Request)
                    .origin(ChainPhase::PreWrite, "Order", Origin::Inline)
                    .expression("Order", "total", "Product['price'] * OrderRequest['qty']")
                    .sources(&["products", "create_order"])
            })
    }

    #[test]
    fn test_place_order() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_source_descriptors() {
        let plan = compile(&fixtures::shop().build()).unwrap();
        let endpoint = plan.endpoint("place_order").unwrap();

        let products = endpoint.source("products").unwrap();
        assert_eq!(products.role, SourceRole::Read);
        assert_eq!(products.method, "GET");
        assert_eq!(products.address, "https://shop/products/{OrderRequest.sku}");
        assert_eq!(products.params.len(), 1);
        assert_eq!(products.params[0].name, "OrderRequest.sku");
        assert_eq!(products.params[0].location, ParamLocation::Path);
        assert_eq!(products.params[0].code, "OrderRequest['sku']");

        let create = endpoint.source("create_order").unwrap();
        assert_eq!(create.role, SourceRole::Write);
        assert_eq!(create.entity, "Order");
        assert_eq!(create.alias, "order");
        assert_eq!(create.method, "POST");
    }

    #[test]
    fn test_error_conditions_compiled() {
        let plan = compile(&fixtures::shop().build()).unwrap();
        let endpoint = plan.endpoint("place_order").unwrap();

        assert_eq!(endpoint.errors.len(), 1);
        assert_eq!(endpoint.errors[0].status, 409);
        assert_eq!(endpoint.errors[0].condition, "OrderRequest['qty'] <= 0");
        assert_eq!(endpoint.responses[0].entity.as_deref(), Some("Receipt"));
        assert_eq!(endpoint.responses[0].condition, None);
    }
}

mod streams {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn scenario() -> Scenario {
        Scenario::new("duplex watch")
            .model(fixtures::ticker())
            .step("watch", |a| {
                a.flow(FlowKind::ReadWrite)
                    .reads(&["ticks"])
                    .writes(&["alerts"])
                    .terminal("Alert")
                    .chain(ChainPhase::PreWrite, &["Tick", "Alert"])
                    .expression("Alert", "high", "Tick['price'] > 100")
                    .check(|plan| plan.method.is_none())
            })
    }

    #[test]
    fn test_duplex_endpoint_skips_http_policy() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_stream_descriptors() {
        let plan = compile(&fixtures::ticker()).unwrap();
        let watch = plan.endpoint("watch").unwrap();

        let ticks = watch.source("ticks").unwrap();
        assert_eq!(ticks.method, "SUBSCRIBE");
        assert_eq!(ticks.address, "market.ticks");

        let alerts = watch.source("alerts").unwrap();
        assert_eq!(alerts.method, "PUBLISH");
        assert_eq!(alerts.entity, "Alert");
        assert_eq!(
            alerts.attributes,
            vec![("high".to_string(), "Tick['price'] > 100".to_string())]
        );
    }
}

mod terminals {
    use super::*;

    fn submit_model(method: HttpMethod) -> Model {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Input")
            .param("x", "int", ParamLocation::Body, "x")
            .done();
        builder
            .entity("Doubled")
            .extends("Input")
            .computed(
                "y",
                "int",
                Expr::binary(BinaryOp::Mul, Expr::path("Input.x"), Expr::int(2)),
            )
            .done();
        builder
            .endpoint("submit", method, "/submit")
            .request(Schema::entity("Input"))
            .response(200, Schema::entity("Doubled"))
            .done();
        builder.build()
    }

    #[test]
    fn test_post_without_terminal_fails() {
        Scenario::new("post without terminal")
            .model(submit_model(HttpMethod::Post))
            .fails_with("No mutation target found for endpoint 'submit'")
            .run()
            .unwrap();
    }

    #[test]
    fn test_get_may_derive_from_request() {
        Scenario::new("get deriving from request")
            .model(submit_model(HttpMethod::Get))
            .step("submit", |a| {
                a.flow(FlowKind::ComputeOnly)
                    .chain(ChainPhase::Response, &["Input", "Doubled"])
                    .expression("Doubled", "y", "Input['x'] * 2")
            })
            .run()
            .unwrap();
    }
}

mod computed_parents {
    use super::*;
    use pretty_assertions::assert_eq;

    fn accounts() -> Model {
        let mut builder = ModelBuilder::new();
        builder.entity("Account").attr("balance", "float").done();
        builder
            .entity("Summary")
            .extends("Account")
            .computed(
                "rounded",
                "float",
                Expr::call("round", vec![Expr::path("Account.balance")]),
            )
            .done();
        builder
            .entity("Statement")
            .extends("Summary")
            .computed(
                "line",
                "str",
                Expr::call("str", vec![Expr::path("Summary.rounded")]),
            )
            .done();
        builder
            .rest_source("accounts", HttpMethod::Get, "https://bank/account")
            .response(Schema::entity("Account"))
            .done();
        builder
            .endpoint("statement", HttpMethod::Get, "/statement")
            .response(200, Schema::entity("Statement"))
            .done();
        builder
            .endpoint("summary", HttpMethod::Get, "/summary")
            .response(200, Schema::entity("Summary"))
            .done();
        builder.build()
    }

    #[test]
    fn test_parent_produced_by_other_endpoint() {
        Scenario::new("computed parent")
            .model(accounts())
            .step("statement", |a| {
                a.flow(FlowKind::ComputeOnly)
                    .reads(&[])
                    .sources(&[])
                    .chain(ChainPhase::Response, &["Summary", "Statement"])
                    .origin(
                        ChainPhase::Response,
                        "Summary",
                        Origin::ComputedParent {
                            endpoint: "summary".into(),
                        },
                    )
                    .expression("Statement", "line", "str(Summary['rounded'])")
            })
            .step("summary", |a| {
                a.flow(FlowKind::Read)
                    .reads(&["accounts"])
                    .sources(&["accounts"])
                    .chain(ChainPhase::Response, &["Account", "Summary"])
                    .expression("Summary", "rounded", "round(Account['balance'])")
            })
            .run()
            .unwrap();
    }

    #[test]
    fn test_unused_source_reported_in_subgraph() {
        let plan = compile(&accounts()).unwrap();

        let statement = plan.diagnostics.subgraph("statement").unwrap();
        assert_eq!(statement.dropped_sources, vec!["accounts"]);
        assert!(!statement.dot.contains("label=\"accounts\""));

        let summary = plan.diagnostics.subgraph("summary").unwrap();
        assert!(summary.dropped_sources.is_empty());
        assert!(summary.dot.contains("label=\"accounts\", shape=cylinder"));
    }

    #[test]
    fn test_shared_ancestor_still_fetched() {
        // GIVEN a statement that also reads the account directly
        let mut builder = ModelBuilder::new();
        builder.entity("Account").attr("balance", "float").done();
        builder
            .entity("Summary")
            .extends("Account")
            .computed(
                "rounded",
                "float",
                Expr::call("round", vec![Expr::path("Account.balance")]),
            )
            .done();
        builder
            .entity("Statement")
            .extends("Summary")
            .computed("raw", "float", Expr::path("Account.balance"))
            .done();
        builder
            .rest_source("accounts", HttpMethod::Get, "https://bank/account")
            .response(Schema::entity("Account"))
            .done();
        builder
            .endpoint("statement", HttpMethod::Get, "/statement")
            .response(200, Schema::entity("Statement"))
            .done();
        builder
            .endpoint("summary", HttpMethod::Get, "/summary")
            .response(200, Schema::entity("Summary"))
            .done();

        Scenario::new("shared ancestor")
            .model(builder.build())
            .step("statement", |a| {
                a.flow(FlowKind::Read)
                    .reads(&["accounts"])
                    .sources(&["accounts"])
                    .chain(ChainPhase::Response, &["Account", "Summary", "Statement"])
            })
            .run()
            .unwrap();
    }
}

mod abstract_entities {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marker_model() -> Model {
        let mut builder = ModelBuilder::new();
        builder.entity("Marker").done();
        builder
            .entity("Greeting")
            .extends("Marker")
            .computed("text", "str", Expr::string("hi"))
            .done();
        builder
            .endpoint("hello", HttpMethod::Get, "/hello")
            .response(200, Schema::entity("Greeting"))
            .done();
        builder.build()
    }

    #[test]
    fn test_marker_dropped_by_default() {
        let plan = compile(&marker_model()).unwrap();

        assert_eq!(plan.diagnostics.dropped_entities.len(), 1);
        assert_eq!(plan.diagnostics.dropped_entities[0].entity, "Marker");
        assert_eq!(
            plan.endpoints[0]
                .chain(ChainPhase::Response)
                .map(|c| c.entities()),
            Some(vec!["Greeting"])
        );
    }

    #[test]
    fn test_marker_rejected_in_strict_mode() {
        Scenario::new("strict markers")
            .model(marker_model())
            .config(CompilerConfig::new().with_strict_abstract_entities(true))
            .fails_matching(r"Entity 'Marker' needed by 'hello' has no source")
            .run()
            .unwrap();
    }
}

mod diagnostics {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A document updated in place.
    fn documents() -> Model {
        let mut builder = ModelBuilder::new();
        builder.entity("Doc").attr("body", "str").done();
        builder
            .rest_source("update", HttpMethod::Put, "https://docs/update")
            .request(Schema::entity("Doc"))
            .response(Schema::entity("Doc"))
            .done();
        builder.build()
    }

    #[test]
    fn test_cycles_reported() {
        let plan = compile(&documents()).unwrap();

        assert_eq!(
            plan.diagnostics.cycles,
            vec![vec!["Doc".to_string(), "update".into(), "Doc".into()]]
        );
    }

    #[test]
    fn test_cycles_not_collected_when_disabled() {
        let plan = Compiler::new(CompilerConfig::new().with_collect_cycles(false))
            .compile(&documents())
            .unwrap();

        assert!(plan.diagnostics.cycles.is_empty());
    }

    #[test]
    fn test_local_subgraph_renders() {
        let model = fixtures::shop().build();
        let graph = ModelGraph::build(&model).unwrap();
        let endpoint = graph.require(NodeKind::Endpoint, "place_order").unwrap();

        let view = endpoint_local_subgraph(&graph, endpoint, Some(&["create_order"][..]));
        let dot = to_dot(&graph, Some(&view));

        assert_eq!(view.dropped_sources, vec!["products"]);
        assert!(dot.starts_with("digraph model {"));
        assert!(dot.contains("label=\"create_order\", shape=cylinder"));
        assert!(!dot.contains("label=\"products\""));
    }

    #[test]
    fn test_subgraphs_in_diagnostics() {
        let model = fixtures::shop().build();

        let plan = compile(&model).unwrap();
        let quiet = Compiler::new(CompilerConfig::new().with_render_subgraphs(false))
            .compile(&model)
            .unwrap();

        let names: Vec<&str> = plan
            .diagnostics
            .subgraphs
            .iter()
            .map(|s| s.endpoint.as_str())
            .collect();
        assert_eq!(names, vec!["place_order"]);
        let place = plan.diagnostics.subgraph("place_order").unwrap();
        assert!(place.dropped_sources.is_empty());
        assert!(place.dot.contains("label=\"products\", shape=cylinder"));
        assert!(place.dot.contains("label=\"create_order\", shape=cylinder"));
        assert!(quiet.diagnostics.subgraphs.is_empty());
    }

    #[test]
    fn test_plan_json() {
        let plan = compile(&fixtures::shop().build()).unwrap();

        let json = plan.to_json().unwrap();

        assert!(json.contains("\"kind\": \"READ_WRITE\""));
        assert!(json.contains("\"phase\": \"pre_write\""));
        assert!(json.contains("\"role\": \"write\""));
    }
}
