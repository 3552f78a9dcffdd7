//! Integration tests for whole-graph resolution

use bindgraph_core::{BindingKind, FrameworkSymbols, MultibindingContribution};
use bindgraph_resolve::prelude::*;
use bindgraph_resolve::{contributor_key, DiagnosticKind, MultibindsDeclaration};
use std::sync::Arc;

const GRAPH: &str = "app.AppGraph";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn key(name: &str) -> TypeKey {
    TypeKey::simple(name)
}

fn request(name: &str) -> ContextualTypeKey {
    ContextualTypeKey::new(key(name))
}

fn param(name: &str, ty: &str) -> Parameter {
    Parameter::new(name, request(ty))
}

fn context_with(config: ResolverConfig, classes: ClassTable) -> ResolutionContext {
    init_tracing();
    ResolutionContext::new(config, Arc::new(classes))
}

fn context(classes: ClassTable) -> ResolutionContext {
    context_with(ResolverConfig::default(), classes)
}

fn messages(ctx: &ResolutionContext, kind: DiagnosticKind) -> Vec<String> {
    ctx.diagnostics
        .of_kind(kind)
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn test_string_and_char_sequence_scenario() {
    let declaration = GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .binds(AliasBinding::new(
            key("CharSequence"),
            key("String"),
            Some(CallableId::new(GRAPH, "provideCharSequence")),
        ))
        .accessor("charSequence", request("CharSequence"))
        .accessor("string", request("String"));
    let mut ctx = context(ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();

    let char_sequence = graph.find_binding(&key("CharSequence")).unwrap();
    assert_eq!(char_sequence.dependencies(), vec![request("String")]);
    let string = graph.find_binding(&key("String")).unwrap();
    assert_eq!(string.kind(), BindingKind::Provided);
    assert!(string.dependencies().is_empty());
    assert!(!ctx.diagnostics.has_errors());
}

fn cyclic_classes(deferred_first_edge: bool) -> ClassTable {
    let symbols = FrameworkSymbols::default();
    let a_to_b = if deferred_first_edge {
        Parameter::new(
            "b",
            ContextualTypeKey::from_type(
                &symbols.provider_of(TypeRef::simple("app.B")),
                None,
                false,
                &symbols,
            ),
        )
    } else {
        param("b", "app.B")
    };
    ClassTable::new()
        .with(ClassInfo::class("app.A").injectable(vec![a_to_b]))
        .with(ClassInfo::class("app.B").injectable(vec![param("c", "app.C")]))
        .with(ClassInfo::class("app.C").injectable(vec![param("a", "app.A")]))
}

#[test]
fn test_eager_cycle_is_rejected_with_its_chain() {
    let declaration = GraphDeclaration::new(GRAPH).accessor("a", request("app.A"));
    let mut ctx = context(cyclic_classes(false));

    let result = GraphResolver::new(&declaration).resolve(&mut ctx);

    assert!(matches!(
        result,
        Err(ResolveError::ResolutionFailed { error_count: 1, .. })
    ));
    let cycles = messages(&ctx, DiagnosticKind::DependencyCycle);
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].contains("A --> B --> C --> A"), "{}", cycles[0]);
    assert!(cycles[0].contains("is injected at"));
    assert!(cycles[0].trim_end().ends_with("..."));
}

#[test]
fn test_deferred_edge_breaks_cycle() {
    let declaration = GraphDeclaration::new(GRAPH).accessor("a", request("app.A"));
    let mut ctx = context(cyclic_classes(true));

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    assert!(graph.find_binding(&key("app.C")).is_some());
    assert!(!ctx.diagnostics.has_errors());
}

#[test]
fn test_self_cycle_is_rejected() {
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.Node").injectable(vec![param("next", "app.Node")]));
    let declaration = GraphDeclaration::new(GRAPH).accessor("node", request("app.Node"));
    let mut ctx = context(classes);

    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    let cycles = messages(&ctx, DiagnosticKind::DependencyCycle);
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].contains("Node --> Node"));
}

#[test]
fn test_eager_cycle_behind_deferred_path_is_rejected() {
    let symbols = FrameworkSymbols::default();
    let provider_of_b = ContextualTypeKey::from_type(
        &symbols.provider_of(TypeRef::simple("app.B")),
        None,
        false,
        &symbols,
    );
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.A").injectable(vec![
            Parameter::new("b", provider_of_b),
            param("c", "app.C"),
        ]))
        .with(ClassInfo::class("app.C").injectable(vec![param("b", "app.B")]))
        .with(ClassInfo::class("app.B").injectable(vec![param("a", "app.A")]));
    let declaration = GraphDeclaration::new(GRAPH).accessor("a", request("app.A"));
    let mut ctx = context(classes);

    let result = GraphResolver::new(&declaration).resolve(&mut ctx);

    assert!(matches!(
        result,
        Err(ResolveError::ResolutionFailed { error_count: 1, .. })
    ));
    let cycles = messages(&ctx, DiagnosticKind::DependencyCycle);
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].contains("A --> C --> B --> A"), "{}", cycles[0]);
}

#[test]
fn test_eager_cycle_off_the_roots_is_rejected_once() {
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.Entry").injectable(vec![param("x", "app.X")]))
        .with(ClassInfo::class("app.X").injectable(vec![param("y", "app.Y")]))
        .with(ClassInfo::class("app.Y").injectable(vec![param("x", "app.X")]));
    let declaration = GraphDeclaration::new(GRAPH).accessor("entry", request("app.Entry"));
    let mut ctx = context(classes);

    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    let cycles = messages(&ctx, DiagnosticKind::DependencyCycle);
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].contains("X --> Y --> X"), "{}", cycles[0]);
}

fn plugin_set() -> TypeKey {
    TypeKey::new(FrameworkSymbols::default().set_of(TypeRef::simple("app.Plugin")))
}

fn declared_plugins(allow_empty: bool) -> GraphDeclaration {
    GraphDeclaration::new(GRAPH)
        .multibinds(
            plugin_set(),
            MultibindsDeclaration::new(CallableId::new(GRAPH, "plugins"), allow_empty),
        )
        .accessor("plugins", ContextualTypeKey::new(plugin_set()))
}

#[test]
fn test_empty_multibinding_requires_opt_in() {
    let mut ctx = context(ClassTable::new());
    let result = GraphResolver::new(&declared_plugins(false)).resolve(&mut ctx);
    assert!(result.is_err());
    assert_eq!(messages(&ctx, DiagnosticKind::EmptyMultibinding).len(), 1);

    let mut ctx = context(ClassTable::new());
    let graph = GraphResolver::new(&declared_plugins(true))
        .resolve(&mut ctx)
        .unwrap();
    let plugins = graph.find_binding(&plugin_set()).unwrap();
    assert_eq!(plugins.kind(), BindingKind::Multibinding);
    assert!(plugins.dependencies().is_empty());
}

#[test]
fn test_contributions_feed_declared_multibinding() {
    let contributor = contributor_key(
        TypeRef::simple("app.Plugin"),
        &CallableId::new(GRAPH, "provideLogging"),
    );
    let declaration = declared_plugins(false).provides(
        ProvidedBinding::new(contributor.clone(), CallableId::new(GRAPH, "provideLogging"))
            .contributing(MultibindingContribution::into_set()),
    );
    let mut ctx = context(ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    let plugins = graph.find_binding(&plugin_set()).unwrap();
    assert_eq!(plugins.dependencies(), vec![ContextualTypeKey::new(contributor.clone())]);
    assert!(graph.find_binding(&contributor).is_some());
}

#[test]
fn test_missing_binding_reports_trace_and_similar_keys() {
    let declaration = GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .provides(
            ProvidedBinding::new(key("app.Greeter"), CallableId::new(GRAPH, "provideGreeter"))
                .with_parameters(vec![Parameter::new(
                    "name",
                    ContextualTypeKey::new(TypeKey::qualified(
                        TypeRef::simple("String"),
                        Annotation::named("user"),
                    )),
                )]),
        )
        .accessor("greeter", request("app.Greeter"));
    let mut ctx = context(ClassTable::new());

    let result = GraphResolver::new(&declaration).resolve(&mut ctx);

    assert!(result.is_err());
    let missing = messages(&ctx, DiagnosticKind::MissingBinding);
    assert_eq!(missing.len(), 1);
    assert!(missing[0].contains("is injected at"));
    assert!(missing[0].contains("AppGraph.provideGreeter"));
    assert!(missing[0].contains("Similar bindings:\n  - String"), "{}", missing[0]);
}

#[test]
fn test_defaulted_dependency_is_not_missing() {
    let declaration = GraphDeclaration::new(GRAPH)
        .provides(
            ProvidedBinding::new(key("app.Greeter"), CallableId::new(GRAPH, "provideGreeter"))
                .with_parameters(vec![Parameter::new(
                    "name",
                    request("app.Name").with_default(true),
                )]),
        )
        .accessor("greeter", request("app.Greeter"));
    let mut ctx = context(ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    let name = graph.find_binding(&key("app.Name")).unwrap();
    assert_eq!(name.kind(), BindingKind::Absent);
}

#[test]
fn test_absent_binding_does_not_satisfy_later_required_request() {
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.A").injectable(vec![Parameter::new(
            "x",
            request("app.X").with_default(true),
        )]))
        .with(ClassInfo::class("app.B").injectable(vec![param("x", "app.X")]))
        .with(ClassInfo::class("app.C").injectable(vec![param("x", "app.X")]));
    let declaration = GraphDeclaration::new(GRAPH)
        .accessor("a", request("app.A"))
        .accessor("b", request("app.B"))
        .accessor("c", request("app.C"));
    let mut ctx = context(classes);

    let result = GraphResolver::new(&declaration).resolve(&mut ctx);

    assert!(matches!(
        result,
        Err(ResolveError::ResolutionFailed { error_count: 1, .. })
    ));
    let missing = messages(&ctx, DiagnosticKind::MissingBinding);
    assert_eq!(missing.len(), 1);
    assert!(missing[0].contains("Cannot find an injectable constructor or provider for: X"));
    assert!(missing[0].contains("[AppGraph] B"), "{}", missing[0]);
}

#[test]
fn test_required_request_first_then_defaulted_request() {
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.B").injectable(vec![param("x", "app.X")]))
        .with(ClassInfo::class("app.A").injectable(vec![Parameter::new(
            "x",
            request("app.X").with_default(true),
        )]));
    let declaration = GraphDeclaration::new(GRAPH)
        .accessor("b", request("app.B"))
        .accessor("a", request("app.A"));
    let mut ctx = context(classes);

    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    assert_eq!(messages(&ctx, DiagnosticKind::MissingBinding).len(), 1);
}

#[test]
fn test_duplicate_declarations_are_reported() {
    let declaration = GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideOtherString"),
        ))
        .accessor("string", request("String"));
    let mut ctx = context(ClassTable::new());

    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    let duplicates = messages(&ctx, DiagnosticKind::DuplicateBinding);
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].contains("AppGraph.provideString"));
    assert!(duplicates[0].contains("AppGraph.provideOtherString"));
}

#[test]
fn test_scope_mismatch_is_reported() {
    let classes = ClassTable::new().with(
        ClassInfo::class("app.Db")
            .injectable(Vec::new())
            .scoped(Annotation::single_in("AppScope")),
    );
    let declaration = GraphDeclaration::new(GRAPH)
        .scoped(Annotation::single_in("UserScope"))
        .accessor("db", request("app.Db"));
    let mut ctx = context(classes);

    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    assert_eq!(
        messages(&ctx, DiagnosticKind::IncompatiblyScopedBindings).len(),
        1
    );
}

#[test]
fn test_resolution_stops_at_error_limit() {
    let config = ResolverConfig {
        max_errors: 2,
        ..ResolverConfig::default()
    };
    let declaration = GraphDeclaration::new(GRAPH)
        .accessor("a", request("app.MissingA"))
        .accessor("b", request("app.MissingB"))
        .accessor("c", request("app.MissingC"));
    let mut ctx = context_with(config, ClassTable::new());

    let result = GraphResolver::new(&declaration).resolve(&mut ctx);

    match result {
        Err(ResolveError::TooManyErrors { limit, .. }) => assert_eq!(limit, 2),
        other => panic!("expected the error limit, got {:?}", other.map(|g| g.len())),
    }
    assert_eq!(ctx.diagnostics.error_count(), 2);
}

fn graph_with_unused_broken_binding() -> GraphDeclaration {
    GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .provides(
            ProvidedBinding::new(key("app.Unused"), CallableId::new(GRAPH, "provideUnused"))
                .with_parameters(vec![param("missing", "app.Missing")]),
        )
        .accessor("string", request("String"))
}

#[test]
fn test_unused_bindings_are_only_validated_under_full_validation() {
    let declaration = graph_with_unused_broken_binding();

    let mut ctx = context(ClassTable::new());
    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    assert_eq!(graph.pruned(), &[key("app.Unused")]);

    let config = ResolverConfig {
        full_binding_graph_validation: true,
        ..ResolverConfig::default()
    };
    let mut ctx = context_with(config, ClassTable::new());
    assert!(GraphResolver::new(&declaration).resolve(&mut ctx).is_err());
    assert_eq!(messages(&ctx, DiagnosticKind::MissingBinding).len(), 1);
}

#[test]
fn test_shrinking_can_be_disabled() {
    let declaration = GraphDeclaration::new(GRAPH)
        .provides(ProvidedBinding::new(
            key("String"),
            CallableId::new(GRAPH, "provideString"),
        ))
        .provides(ProvidedBinding::new(key("Int"), CallableId::new(GRAPH, "provideInt")));
    let config = ResolverConfig {
        shrink_unused_bindings: false,
        ..ResolverConfig::default()
    };
    let mut ctx = context_with(config, ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    assert!(graph.pruned().is_empty());
}

#[test]
fn test_graph_inputs_and_included_graphs_are_seeded() {
    let declaration = GraphDeclaration::new(GRAPH)
        .bound_instance(key("app.Config"), "config")
        .includes(bindgraph_resolve::IncludedGraph {
            graph_key: key("app.NetworkGraph"),
            accessors: vec![(key("app.HttpClient"), "httpClient".to_string())],
        })
        .provides(
            ProvidedBinding::new(key("app.Api"), CallableId::new(GRAPH, "provideApi"))
                .with_parameters(vec![
                    param("config", "app.Config"),
                    param("client", "app.HttpClient"),
                ]),
        )
        .accessor("api", request("app.Api"));
    let mut ctx = context(ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    assert_eq!(
        graph.find_binding(&key("app.Config")).map(|b| b.kind()),
        Some(BindingKind::BoundInstance)
    );
    let client = graph.find_binding(&key("app.HttpClient")).unwrap();
    assert_eq!(client.kind(), BindingKind::GraphDependency);
    assert_eq!(client.render_short(), "NetworkGraph.httpClient");
}

#[test]
fn test_injector_root_resolves_inherited_members() {
    let symbols = FrameworkSymbols::default();
    let classes = ClassTable::new()
        .with(ClassInfo::class("app.BaseScreen").with_members(vec![param("logger", "app.Logger")]))
        .with(
            ClassInfo::class("app.Screen")
                .extends(TypeRef::simple("app.BaseScreen"))
                .with_members(vec![param("repo", "app.Repo")]),
        )
        .with(ClassInfo::class("app.Logger").injectable(Vec::new()))
        .with(ClassInfo::class("app.Repo").injectable(Vec::new()));
    let injector_key = TypeKey::new(symbols.members_injector_of(TypeRef::simple("app.Screen")));
    let declaration = GraphDeclaration::new(GRAPH)
        .injector("inject", ContextualTypeKey::new(injector_key.clone()));
    let mut ctx = context(classes);

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    let injector = graph.find_binding(&injector_key).unwrap();
    assert_eq!(injector.kind(), BindingKind::MembersInjected);
    assert_eq!(injector.dependencies().len(), 2);
    assert!(graph.find_binding(&key("app.Logger")).is_some());
    assert!(graph.find_binding(&key("app.Repo")).is_some());
}

#[test]
fn test_optional_binding_falls_back_to_absent() {
    let optional = TypeKey::new(TypeRef::generic("Optional", [TypeRef::simple("app.Tracker")]));
    let declaration = GraphDeclaration::new(GRAPH)
        .optional(optional.clone())
        .accessor("tracker", ContextualTypeKey::new(optional.clone()));
    let mut ctx = context(ClassTable::new());

    let graph = GraphResolver::new(&declaration).resolve(&mut ctx).unwrap();
    assert_eq!(
        graph.find_binding(&optional).map(|b| b.kind()),
        Some(BindingKind::CustomWrapper)
    );
    assert_eq!(
        graph.find_binding(&key("app.Tracker")).map(|b| b.kind()),
        Some(BindingKind::Absent)
    );
}
