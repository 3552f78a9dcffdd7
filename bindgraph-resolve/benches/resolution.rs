use bindgraph_core::MultibindingContribution;
use bindgraph_resolve::contributor_key;
use bindgraph_resolve::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

const GRAPH: &str = "bench.BenchGraph";

fn request(name: &str) -> ContextualTypeKey {
    ContextualTypeKey::new(TypeKey::simple(name))
}

/// A chain of injectable classes, each depending on the next
fn deep_classes(depth: usize) -> ClassTable {
    (0..depth).fold(ClassTable::new(), |table, i| {
        let parameters = if i + 1 < depth {
            vec![Parameter::new("next", request(&format!("bench.Node{}", i + 1)))]
        } else {
            Vec::new()
        };
        table.with(ClassInfo::class(format!("bench.Node{}", i)).injectable(parameters))
    })
}

/// Many providers sharing a handful of leaves, all feeding one set
fn wide_declaration(width: usize) -> GraphDeclaration {
    let mut declaration = GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            TypeKey::simple("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .provides(ProvidedBinding::new(
            TypeKey::simple("Int"),
            CallableId::new(GRAPH, "provideInt"),
        ));
    for i in 0..width {
        let callable = CallableId::new(GRAPH, format!("providePlugin{}", i));
        declaration = declaration.provides(
            ProvidedBinding::new(
                contributor_key(TypeRef::simple("bench.Plugin"), &callable),
                callable,
            )
            .with_parameters(vec![
                Parameter::new("name", request("String")),
                Parameter::new("size", request("Int")),
            ])
            .contributing(MultibindingContribution::into_set()),
        );
    }
    declaration.accessor(
        "plugins",
        ContextualTypeKey::new(TypeKey::new(TypeRef::generic(
            "Set",
            [TypeRef::simple("bench.Plugin")],
        ))),
    )
}

fn benchmark_deep_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_graph");
    for depth in [10, 100, 500] {
        let classes = Arc::new(deep_classes(depth));
        let declaration = GraphDeclaration::new(GRAPH).accessor("root", request("bench.Node0"));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut ctx = ResolutionContext::new(ResolverConfig::default(), classes.clone());
                let graph = GraphResolver::new(&declaration)
                    .resolve(&mut ctx)
                    .expect("graph resolves");
                black_box(StoragePlanner::new(&graph).plan().expect("plan succeeds"));
            });
        });
    }
    group.finish();
}

fn benchmark_wide_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_graph");
    for width in [10, 100, 1000] {
        let declaration = wide_declaration(width);
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                let mut ctx =
                    ResolutionContext::new(ResolverConfig::default(), Arc::new(ClassTable::new()));
                let graph = GraphResolver::new(&declaration)
                    .resolve(&mut ctx)
                    .expect("graph resolves");
                black_box(StoragePlanner::new(&graph).plan().expect("plan succeeds"));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_deep_graph, benchmark_wide_graph);
criterion_main!(benches);
