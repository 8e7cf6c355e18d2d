//! Topology builder tests: selector resolution, ordering, validation, and
//! channel reuse.

mod common;

use common::wants;
use wantgraph::config::WantConfig;
use wantgraph::graphs::{BuildError, GraphBuilder};
use wantgraph::paths::ConnectivityContract;
use wantgraph::registry::WantTypeRegistry;

fn producer(name: &str) -> WantConfig {
    WantConfig::new(name, "sequence").with_label("role", "src")
}

#[test]
fn matched_producers_wire_in_lexicographic_order() {
    // declaration order deliberately scrambled
    let graph = GraphBuilder::new(wants::registry())
        .add_want(producer("b"))
        .add_want(producer("c"))
        .add_want(WantConfig::new("agg", "sink").with_input([("role", "src")]))
        .add_want(producer("a"))
        .build()
        .unwrap();

    let inputs = graph.handle("agg").unwrap().input_producers();
    assert_eq!(inputs, vec!["a", "b", "c"]);
}

#[test]
fn rebuilding_identical_configs_gives_identical_wiring() {
    let build = || {
        GraphBuilder::new(wants::registry())
            .add_want(producer("x"))
            .add_want(producer("y"))
            .add_want(
                WantConfig::new("agg", "sink")
                    .with_input([("role", "src")])
                    .with_input([("role", "mid")]),
            )
            .add_want(WantConfig::new("m", "sequence").with_label("role", "mid"))
            .build()
            .unwrap()
    };
    let first = build();
    let second = build();
    let order = |g: &wantgraph::graphs::Graph| g.handle("agg").unwrap().input_producers();
    assert_eq!(order(&first), order(&second));
    assert_eq!(order(&first), vec!["x", "y", "m"]);
}

#[test]
fn one_channel_per_producer_consumer_pair() {
    // both selectors match the same producer; the channel must be shared,
    // not duplicated
    let graph = GraphBuilder::new(wants::registry())
        .add_want(
            WantConfig::new("gen", "sequence")
                .with_label("role", "src")
                .with_label("stage", "one"),
        )
        .add_want(
            WantConfig::new("agg", "sink")
                .with_input([("role", "src")])
                .with_input([("stage", "one")]),
        )
        .build()
        .unwrap();

    assert_eq!(graph.handle("agg").unwrap().input_producers(), vec!["gen"]);
    assert_eq!(graph.handle("gen").unwrap().output_consumers(), vec!["agg"]);
}

#[test]
fn empty_selector_matches_nothing() {
    let graph = GraphBuilder::new(wants::registry())
        .add_want(producer("gen"))
        .add_want(WantConfig::new("agg", "sink").with_input(Vec::<(&str, &str)>::new()))
        .build()
        .unwrap();
    assert!(graph.handle("agg").unwrap().input_producers().is_empty());
}

#[test]
fn unknown_type_names_the_want() {
    let err = GraphBuilder::new(wants::registry())
        .add_want(WantConfig::new("mystery", "no_such_type"))
        .build()
        .unwrap_err();
    match err {
        BuildError::UnknownWantType { want, type_name } => {
            assert_eq!(want, "mystery");
            assert_eq!(type_name, "no_such_type");
        }
        other => panic!("expected UnknownWantType, got {other:?}"),
    }
}

#[test]
fn duplicate_names_rejected() {
    let err = GraphBuilder::new(wants::registry())
        .add_want(producer("twin"))
        .add_want(producer("twin"))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { name } if name == "twin"));
}

#[test]
fn insufficient_inputs_is_fatal() {
    let mut registry = wants::registry();
    registry.register(
        "needy",
        ConnectivityContract {
            min_inputs: 2,
            ..ConnectivityContract::fan_in()
        },
        |_m, _s| Box::new(wants::Sink),
    );

    let err = GraphBuilder::new(registry)
        .add_want(producer("gen"))
        .add_want(WantConfig::new("agg", "needy").with_input([("role", "src")]))
        .build()
        .unwrap_err();
    match err {
        BuildError::InsufficientInputs {
            want,
            required,
            connected,
        } => {
            assert_eq!(want, "agg");
            assert_eq!(required, 2);
            assert_eq!(connected, 1);
        }
        other => panic!("expected InsufficientInputs, got {other:?}"),
    }
}

#[test]
fn max_outputs_exceeded_is_fatal() {
    let mut registry = wants::registry();
    registry.register(
        "single_out",
        ConnectivityContract {
            max_outputs: Some(1),
            ..ConnectivityContract::source()
        },
        |_m, _s| Box::new(wants::Sequence::new()),
    );

    let err = GraphBuilder::new(registry)
        .add_want(WantConfig::new("gen", "single_out").with_label("role", "src"))
        .add_want(WantConfig::new("a", "sink").with_input([("role", "src")]))
        .add_want(WantConfig::new("b", "sink").with_input([("role", "src")]))
        .build()
        .unwrap_err();
    match err {
        BuildError::TooManyOutputs {
            want,
            limit,
            connected,
        } => {
            assert_eq!(want, "gen");
            assert_eq!(limit, 1);
            assert_eq!(connected, 2);
        }
        other => panic!("expected TooManyOutputs, got {other:?}"),
    }
}

#[test]
fn max_inputs_exceeded_is_fatal() {
    let mut registry = WantTypeRegistry::new();
    registry.register("sequence", ConnectivityContract::source(), |_m, _s| {
        Box::new(wants::Sequence::new())
    });
    registry.register(
        "one_in",
        ConnectivityContract {
            max_inputs: Some(1),
            ..ConnectivityContract::fan_in()
        },
        |_m, _s| Box::new(wants::Sink),
    );

    let err = GraphBuilder::new(registry)
        .add_want(producer("p1"))
        .add_want(producer("p2"))
        .add_want(WantConfig::new("narrow", "one_in").with_input([("role", "src")]))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::TooManyInputs { want, limit: 1, connected: 2 } if want == "narrow"
    ));
}

#[test]
fn attach_channel_grows_and_deduplicates() {
    let mut graph = GraphBuilder::new(wants::registry())
        .add_want(producer("gen"))
        .add_want(WantConfig::new("agg", "sink"))
        .build()
        .unwrap();
    assert!(graph.handle("agg").unwrap().input_producers().is_empty());

    graph.attach_channel("gen", "agg").unwrap();
    // second attach for the same pair reuses the existing channel
    graph.attach_channel("gen", "agg").unwrap();
    assert_eq!(graph.handle("agg").unwrap().input_producers(), vec!["gen"]);
    assert_eq!(graph.handle("gen").unwrap().output_consumers(), vec!["agg"]);
}

#[test]
fn attach_channel_respects_max_inputs() {
    let mut registry = wants::registry();
    registry.register(
        "one_in",
        ConnectivityContract {
            max_inputs: Some(1),
            ..ConnectivityContract::fan_in()
        },
        |_m, _s| Box::new(wants::Sink),
    );

    let mut graph = GraphBuilder::new(registry)
        .add_want(producer("p1"))
        .add_want(producer("p2"))
        .add_want(WantConfig::new("narrow", "one_in").with_input([("role", "missing")]))
        .build()
        .unwrap();

    graph.attach_channel("p1", "narrow").unwrap();
    let err = graph.attach_channel("p2", "narrow").unwrap_err();
    assert!(matches!(err, BuildError::TooManyInputs { .. }));
}

#[test]
fn attach_to_unknown_want_fails() {
    let mut graph = GraphBuilder::new(wants::registry())
        .add_want(producer("gen"))
        .build()
        .unwrap();
    let err = graph.attach_channel("gen", "ghost").unwrap_err();
    assert!(matches!(err, BuildError::UnknownWant { name } if name == "ghost"));
}
