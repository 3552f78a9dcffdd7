//! Property tests for order independence of accumulation and storage planning

use bindgraph_core::{Binding, FrameworkSymbols};
use bindgraph_resolve::prelude::*;
use bindgraph_resolve::{contributor_key, MultibindingAccumulator, MultibindsDeclaration};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const GRAPH: &str = "app.AppGraph";

fn plugin_set(symbols: &FrameworkSymbols) -> TypeKey {
    TypeKey::new(symbols.set_of(TypeRef::simple("app.Plugin")))
}

fn contributor(index: usize) -> TypeKey {
    contributor_key(
        TypeRef::simple("app.Plugin"),
        &CallableId::new(GRAPH, format!("providePlugin{}", index)),
    )
}

/// Contributions, optionally interleaved with a declaration and lookups
#[derive(Debug, Clone)]
enum Step {
    Contribute(usize),
    Declare(bool),
    Materialize,
}

fn steps_strategy() -> impl Strategy<Value = Vec<Step>> {
    (
        prop::collection::btree_set(0usize..12, 0..8),
        prop::collection::vec(any::<bool>(), 0..3),
        0usize..3,
    )
        .prop_flat_map(|(contributors, declarations, lookups)| {
            let steps: Vec<Step> = contributors
                .into_iter()
                .map(Step::Contribute)
                .chain(declarations.into_iter().map(Step::Declare))
                .chain(std::iter::repeat(Step::Materialize).take(lookups))
                .collect();
            Just(steps).prop_shuffle()
        })
}

fn accumulate(steps: &[Step], symbols: &FrameworkSymbols) -> Option<(BTreeSet<TypeKey>, bool)> {
    let collection = plugin_set(symbols);
    let mut accumulator = MultibindingAccumulator::new();
    for step in steps {
        match step {
            Step::Contribute(index) => {
                accumulator.register_contribution(collection.clone(), contributor(*index), symbols)
            }
            Step::Declare(allow_empty) => accumulator.register_declaration(
                collection.clone(),
                MultibindsDeclaration::new(CallableId::new(GRAPH, "plugins"), *allow_empty),
                symbols,
            ),
            Step::Materialize => {
                accumulator.get_or_create(&collection, symbols);
            }
        }
    }
    let binding = accumulator.get_or_create(&collection, symbols)?;
    match binding.as_ref() {
        Binding::Multibinding(multibinding) => Some((
            multibinding.source_bindings.clone(),
            multibinding.allow_empty,
        )),
        _ => None,
    }
}

fn plan_kinds(declaration: &GraphDeclaration) -> Vec<(TypeKey, StorageKind)> {
    let mut ctx = ResolutionContext::new(ResolverConfig::default(), Arc::new(ClassTable::new()));
    let graph = GraphResolver::new(declaration)
        .resolve(&mut ctx)
        .expect("graph resolves");
    StoragePlanner::new(&graph)
        .plan()
        .expect("plan succeeds")
        .iter()
        .map(|(key, planned)| (key.clone(), planned.kind))
        .collect()
}

fn shared_graph_declarations() -> Vec<ProvidedBinding> {
    let provide = |ty: &str, name: &str, deps: &[&str]| {
        ProvidedBinding::new(TypeKey::simple(ty), CallableId::new(GRAPH, name)).with_parameters(
            deps.iter()
                .map(|d| Parameter::new(d.to_lowercase(), ContextualTypeKey::new(TypeKey::simple(*d))))
                .collect(),
        )
    };
    vec![
        provide("String", "provideString", &[]),
        provide("Int", "provideInt", &[]),
        provide("app.A", "provideA", &["String", "Int"]),
        provide("app.B", "provideB", &["String", "app.A"]),
        provide("app.C", "provideC", &["app.B"]),
    ]
}

proptest! {
    #[test]
    fn accumulation_is_order_independent(steps in steps_strategy()) {
        let symbols = FrameworkSymbols::default();
        let expected_sources: BTreeSet<TypeKey> = steps
            .iter()
            .filter_map(|s| match s {
                Step::Contribute(index) => Some(contributor(*index)),
                _ => None,
            })
            .collect();
        let expected_allow_empty = steps.iter().any(|s| matches!(s, Step::Declare(true)));
        let declared = steps.iter().any(|s| matches!(s, Step::Declare(_)));

        match accumulate(&steps, &symbols) {
            Some((sources, allow_empty)) => {
                prop_assert_eq!(sources, expected_sources);
                prop_assert_eq!(allow_empty, expected_allow_empty);
            }
            None => prop_assert!(expected_sources.is_empty() && !declared),
        }
    }

    #[test]
    fn storage_plan_ignores_declaration_order(
        order in Just(shared_graph_declarations()).prop_shuffle()
    ) {
        let reference = shared_graph_declarations()
            .into_iter()
            .fold(GraphDeclaration::new(GRAPH), |d, b| d.provides(b))
            .accessor("c", ContextualTypeKey::new(TypeKey::simple("app.C")));
        let shuffled = order
            .into_iter()
            .fold(GraphDeclaration::new(GRAPH), |d, b| d.provides(b))
            .accessor("c", ContextualTypeKey::new(TypeKey::simple("app.C")));

        prop_assert_eq!(plan_kinds(&shuffled), plan_kinds(&reference));
    }
}
