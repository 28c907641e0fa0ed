//! Property tests over generated inheritance graphs.

use keel_graph::{ancestors, EdgeKind, NodeKind};
use keel_tests::prelude::*;
use proptest::prelude::*;

/// Entities `E0..En`; `Ei` may extend any `Ej` with `j < i`, so the parent
/// graph is acyclic. Every entity with parents sums their `v` into `w`, and
/// every third entity is fetched by a GET source. Past `E0`, that source's
/// url reads `v` of an earlier entity picked by `picks`.
fn generated_model(parent_bits: &[Vec<bool>], picks: &[usize]) -> Model {
    let mut builder = ModelBuilder::new();
    for (i, bits) in parent_bits.iter().enumerate() {
        let parents: Vec<String> = (0..i)
            .filter(|j| bits.get(*j).copied().unwrap_or(false))
            .map(|j| format!("E{}", j))
            .collect();
        let mut entity = builder.entity(format!("E{}", i));
        for parent in &parents {
            entity = entity.extends(parent.as_str());
        }
        entity = entity.attr("v", "int");
        let sum = parents
            .iter()
            .map(|p| Expr::path(&format!("{}.v", p)))
            .reduce(|acc, next| Expr::binary(BinaryOp::Add, acc, next));
        if let Some(sum) = sum {
            entity = entity.computed("w", "int", sum);
        }
        entity.done();
    }
    for i in (0..parent_bits.len()).step_by(3) {
        let url = match picks.get(i) {
            Some(pick) if i > 0 => format!("https://api/e{}/{{E{}.v}}", i, pick % i),
            _ => format!("https://api/e{}", i),
        };
        builder
            .rest_source(format!("fetch_e{}", i), HttpMethod::Get, url)
            .response(Schema::entity(format!("E{}", i)))
            .done();
    }
    for i in 0..parent_bits.len() {
        builder
            .endpoint(format!("get_e{}", i), HttpMethod::Get, format!("/e{}", i))
            .response(200, Schema::entity(format!("E{}", i)))
            .done();
    }
    builder.build()
}

fn parent_bits() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), 8), 1..8)
}

fn url_picks() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 8)
}

proptest! {
    #[test]
    fn ancestors_are_unique_and_topologically_ordered(bits in parent_bits(), picks in url_picks()) {
        let model = generated_model(&bits, &picks);
        let graph = ModelGraph::build(&model).unwrap();

        for node in graph.nodes_of(NodeKind::Entity) {
            let order = ancestors(&graph, node.id).unwrap();

            // Each ancestor once, never the entity itself.
            let mut seen = order.clone();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), order.len());
            prop_assert!(!order.contains(&node.id));

            // Every entity comes after its own parents.
            for (i, id) in order.iter().enumerate() {
                for parent in graph.parents(*id) {
                    let position = order.iter().position(|a| *a == parent);
                    prop_assert!(matches!(position, Some(p) if p < i));
                }
            }
        }
    }

    #[test]
    fn chains_place_dependencies_first(bits in parent_bits(), picks in url_picks()) {
        let model = generated_model(&bits, &picks);
        let graph = ModelGraph::build(&model).unwrap();
        let plan = compile(&model).unwrap();

        for endpoint in &plan.endpoints {
            for chain in &endpoint.chains {
                for (i, step) in chain.steps.iter().enumerate() {
                    let Some(id) = graph.entity(&step.entity) else {
                        continue;
                    };
                    for edge in graph.edges_to(id, None) {
                        if !edge.kind.is_entity_dependency() {
                            continue;
                        }
                        if let Some(j) = chain.position(graph.name(edge.from)) {
                            prop_assert!(j < i, "{} read before it is built", graph.name(edge.from));
                        }
                    }

                    // A fetch comes after every entity its url reads.
                    let Origin::Source { source } = &step.origin else {
                        continue;
                    };
                    let Some(source) = graph.source(source) else {
                        continue;
                    };
                    for input in graph.predecessors(source, EdgeKind::ParamDependency) {
                        let position = chain.position(graph.name(input));
                        prop_assert!(
                            matches!(position, Some(j) if j < i),
                            "{} fetched before {}",
                            step.entity,
                            graph.name(input)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn compilation_is_deterministic(bits in parent_bits(), picks in url_picks()) {
        let model = generated_model(&bits, &picks);

        let first = compile(&model).unwrap();
        let second = compile(&model).unwrap();

        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        for endpoint in &first.endpoints {
            // GET endpoints over GET sources only ever read.
            prop_assert!(!endpoint.flow.kind.writes());
            prop_assert!(endpoint.flow.write_targets.is_empty());
            let expected = if endpoint.flow.read_sources.is_empty() {
                FlowKind::ComputeOnly
            } else {
                FlowKind::Read
            };
            prop_assert_eq!(endpoint.flow.kind, expected);
        }
    }

    #[test]
    fn placeholders_reading_descendants_are_cycles(len in 2usize..8, pick in any::<usize>()) {
        // GIVEN a straight line E0 <- E1 <- ... whose root fetch reads a descendant
        let bits: Vec<Vec<bool>> = (0..len)
            .map(|i| (0..8).map(|j| j + 1 == i).collect())
            .collect();
        let reader = 1 + pick % (len - 1);
        let mut model = generated_model(&bits, &[]);
        if let Some(keel_ast::SourceKind::Rest(rest)) =
            model.sources.first_mut().map(|s| &mut s.kind)
        {
            rest.url = format!("https://api/e0/{{E{}.v}}", reader);
        }

        // WHEN
        let result = ModelGraph::build(&model);

        // THEN
        match result {
            Err(GraphError::Cycle { path, .. }) => {
                prop_assert_eq!(path.first().map(String::as_str), Some("E0"));
                prop_assert_eq!(path.get(1).map(String::as_str), Some("fetch_e0"));
                prop_assert_eq!(path.last().map(String::as_str), Some("E0"));
                let reader = format!("E{}", reader);
                prop_assert!(path.contains(&reader));
            }
            other => prop_assert!(false, "Expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn parent_edges_point_at_children(bits in parent_bits(), picks in url_picks()) {
        let model = generated_model(&bits, &picks);
        let graph = ModelGraph::build(&model).unwrap();

        for edge in graph.edges().filter(|e| e.kind == EdgeKind::Parent) {
            let child = model.entity(graph.name(edge.to)).unwrap();
            prop_assert!(child.parent_names().any(|p| p == graph.name(edge.from)));
        }
    }
}
