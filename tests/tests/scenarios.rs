//! End-to-end compilation scenarios.
//!
//! Focus areas: inheritance chains, HTTP safety, cycle reporting and
//! lambda compilation.

use keel_core::{record, Value};
use keel_expr::{ExprCompiler, ExprScope, FunctionRegistry, Symbols};
use keel_graph::{ancestors, NodeKind};
use keel_sandbox::{preview, Env};
use keel_tests::prelude::*;

mod derived_entity {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn scenario() -> Scenario {
        Scenario::new("derived entity")
            .model(fixtures::derived())
            .step("totals", |a| {
                a.flow(FlowKind::ComputeOnly)
                    .chain(ChainPhase::Response, &["Base", "Derived"])
                    .origin(ChainPhase::Response, "Base", Origin::PassThrough)
                    .expression("Derived", "total", "Base['a'] + Base['b']")
                    .check(|plan| {
                        plan.chain(ChainPhase::Response)
                            .and_then(|c| c.step("Base"))
                            .is_some_and(|s| s.attributes.is_empty())
                    })
            })
    }

    #[test]
    fn test_derived_entity_chain() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_ancestors_of_derived() {
        let model = fixtures::derived();
        let graph = ModelGraph::build(&model).unwrap();
        let derived = graph.require(NodeKind::Entity, "Derived").unwrap();

        let names: Vec<&str> = ancestors(&graph, derived)
            .unwrap()
            .into_iter()
            .map(|id| graph.name(id))
            .collect();

        assert_eq!(names, vec!["Base"]);
    }

    #[test]
    fn test_chain_for_entity() {
        let chain = Compiler::default()
            .chain_for(&fixtures::derived(), "Derived")
            .unwrap();

        assert_eq!(chain.entities(), vec!["Base", "Derived"]);
        assert_eq!(
            chain.steps[1].expressions().collect::<Vec<_>>(),
            vec![("total", "Base['a'] + Base['b']")]
        );
    }
}

mod http_safety {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn read_scenario() -> Scenario {
        Scenario::new("GET fed by reads")
            .model(fixtures::weather().build())
            .step("report", |a| {
                a.flow(FlowKind::Read)
                    .reads(&["forecasts"])
                    .writes(&[])
                    .chain(ChainPhase::Response, &["City", "Forecast", "Report"])
                    .origin(ChainPhase::Response, "City", Origin::Request)
                    .origin(
                        ChainPhase::Response,
                        "Forecast",
                        Origin::Source {
                            source: "forecasts".into(),
                        },
                    )
                    .expression("Report", "temp_f", "Forecast['temp_c'] * 9 / 5 + 32")
                    .sources(&["forecasts"])
            })
    }

    pub fn unsafe_scenario() -> Scenario {
        let mut builder = fixtures::shop();
        builder
            .endpoint("last_receipt", HttpMethod::Get, "/receipts/last")
            .response(200, Schema::entity("Receipt"))
            .done();
        Scenario::new("GET fed by a POST output")
            .model(builder.build())
            .fails_with("Endpoint 'last_receipt' uses GET but writes to create_order")
    }

    #[test]
    fn test_get_fed_by_reads_is_read() {
        read_scenario().run().unwrap();
    }

    #[test]
    fn test_get_fed_by_post_output_fails() {
        unsafe_scenario().run().unwrap();
    }

    #[test]
    fn test_unsafe_write_error_variant() {
        let mut builder = fixtures::shop();
        builder
            .endpoint("last_receipt", HttpMethod::Head, "/receipts/last")
            .response(200, Schema::entity("Receipt"))
            .done();

        let result = compile(&builder.build());

        match result {
            Err(CompileError::Flow(FlowError::UnsafeWrite {
                endpoint, sources, ..
            })) => {
                assert_eq!(endpoint, "last_receipt");
                assert_eq!(sources, vec!["create_order"]);
            }
            other => panic!("Expected unsafe write, got {:?}", other),
        }
    }
}

mod cycles {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn scenario() -> Scenario {
        Scenario::new("mutual parents")
            .model(fixtures::cyclic_parents())
            .fails_with("A -> B -> A")
    }

    #[test]
    fn test_mutual_parents_fail() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_source_param_reading_child_fails() {
        let mut builder = ModelBuilder::new();
        builder.entity("X").attr("k", "str").done();
        builder.entity("Y").extends("X").done();
        builder
            .rest_source("fetch_x", HttpMethod::Get, "https://api/x/{Y.k}")
            .response(Schema::entity("X"))
            .done();
        builder
            .endpoint("get_y", HttpMethod::Get, "/y")
            .response(200, Schema::entity("Y"))
            .done();

        Scenario::new("fetch reading its own child")
            .model(builder.build())
            .fails_with("X -> fetch_x -> Y -> X")
            .run()
            .unwrap();
    }

    #[test]
    fn test_cycle_error_carries_path() {
        let result = ModelGraph::build(&fixtures::cyclic_parents());

        match result {
            Err(GraphError::Cycle { path, .. }) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("Expected cycle error, got {:?}", other),
        }
    }
}

mod lambdas {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOTAL: &str =
        "sum(fn_map(Basket['items'], lambda i: _get(i, 'price') * _get(i, 'qty')))";

    pub fn scenario() -> Scenario {
        Scenario::new("map with lambda")
            .model(fixtures::basket())
            .step("price_basket", |a| {
                a.flow(FlowKind::ComputeOnly)
                    .chain(ChainPhase::Response, &["Basket"])
                    .origin(ChainPhase::Response, "Basket", Origin::Request)
                    .expression("Basket", "total", TOTAL)
            })
    }

    #[test]
    fn test_map_lambda_compiles_defensively() {
        scenario().run().unwrap();
    }

    #[test]
    fn test_compiled_lambda_previews() {
        // GIVEN the compiled total
        let model = fixtures::basket();
        let registry = FunctionRegistry::standard();
        let compiler = ExprCompiler::new(&registry);
        let symbols = Symbols::from_model(&model);
        let scope = ExprScope::for_attribute(&symbols, "Basket", "total").unwrap();
        let expr = model
            .entity("Basket")
            .and_then(|e| e.attribute("total"))
            .and_then(|a| a.expr.clone())
            .unwrap();
        let code = compiler.compile(&expr, &scope).unwrap();

        // WHEN previewed over two line items
        let items = Value::List(vec![
            record! { "price" => 2i64, "qty" => 3i64 },
            record! { "price" => 5i64, "qty" => 1i64 },
        ]);
        let mut env = Env::new().with("Basket", record! { "items" => items });
        let total = preview(compiler.validator(), &code, &mut env).unwrap();

        // THEN
        assert_eq!(code, TOTAL);
        assert_eq!(total, Value::Int(11));
    }

    #[test]
    fn test_map_arity_is_checked() {
        let mut builder = ModelBuilder::new();
        builder
            .entity("Basket")
            .attr("items", "list")
            .computed("bad", "list", Expr::call("map", vec![Expr::var("items")]))
            .done();

        let chain = Compiler::default().chain_for(&builder.build(), "Basket");

        assert!(matches!(
            chain,
            Err(CompileError::Expr(keel_expr::ExprError::ArityMismatch { .. }))
        ));
    }
}

mod fixtures_from_json {
    use super::*;

    pub fn scenario() -> Scenario {
        Scenario::new("weather fixture")
            .fixture("weather.json")
            .step("forecast", |a| {
                a.flow(FlowKind::Read)
                    .reads(&["forecasts"])
                    .chain(ChainPhase::Response, &["Forecast", "Headline"])
                    .expression("Headline", "title", "fn_upper(Forecast['city'])")
                    .check(|plan| {
                        plan.source("forecasts")
                            .is_some_and(|s| s.alias == "forecast" && s.headers.len() == 1)
                    })
            })
    }

    #[test]
    fn test_weather_fixture() {
        scenario().run().unwrap();
    }
}
