use super::*;
use crate::class::ClassInfo;
use crate::types::TypeRef;

fn key(name: &str) -> TypeKey {
    TypeKey::simple(name)
}

fn param(name: &str, ty: &str) -> Parameter {
    Parameter::new(name, ContextualTypeKey::new(key(ty)))
}

fn provided(name: &str, ty: &str, parameters: Vec<Parameter>) -> Binding {
    Binding::Provided(
        ProvidedBinding::new(key(ty), CallableId::new("app.AppGraph", name))
            .with_parameters(parameters),
    )
}

fn constructor_injected(class: ClassInfo) -> Binding {
    let factory = class.constructor.clone().expect("injectable class");
    Binding::ConstructorInjected(ConstructorInjectedBinding {
        class: class.id.clone(),
        type_key: TypeKey::new(class.self_type()),
        scope: class.scope.clone(),
        factory,
        injected_members: BTreeSet::new(),
        location: None,
    })
}

#[test]
fn test_provided_dependencies_follow_parameters() {
    let binding = provided(
        "provideCharSequence",
        "CharSequence",
        vec![param("value", "String")],
    );

    assert_eq!(binding.kind(), BindingKind::Provided);
    assert_eq!(binding.dependencies(), vec![ContextualTypeKey::new(key("String"))]);
    assert!(!binding.has_trivial_dependencies());
    assert_eq!(binding.name_hint(), "provideCharSequence");
}

#[test]
fn test_constructor_dependencies_skip_assisted_parameters() {
    let class = ClassInfo::class("app.Greeter").injectable(vec![
        param("repo", "Repo"),
        Parameter::assisted("name", ContextualTypeKey::new(key("String"))),
    ]);
    let binding = constructor_injected(class);

    assert_eq!(binding.dependencies(), vec![ContextualTypeKey::new(key("Repo"))]);
    match &binding {
        Binding::ConstructorInjected(b) => assert!(b.is_assisted()),
        other => panic!("unexpected binding {}", other),
    }
    assert_eq!(binding.name_hint(), "greeter");
}

#[test]
fn test_constructor_dependencies_include_member_injectors() {
    let class = ClassInfo::class("app.Screen").injectable(Vec::new());
    let mut binding = constructor_injected(class);
    let injector_key = ContextualTypeKey::new(TypeKey::new(TypeRef::generic(
        "MembersInjector",
        [TypeRef::simple("app.Screen")],
    )));
    if let Binding::ConstructorInjected(b) = &mut binding {
        b.injected_members.insert(injector_key.clone());
    }

    assert_eq!(binding.dependencies(), vec![injector_key]);
    assert!(!binding.has_trivial_dependencies());
}

#[test]
fn test_trivial_dependencies_by_variant() {
    let leaf = provided("provideString", "String", Vec::new());
    assert!(leaf.has_trivial_dependencies());

    let alias = Binding::Alias(AliasBinding::new(key("CharSequence"), key("String"), None));
    assert!(alias.has_trivial_dependencies());
    assert_eq!(alias.dependencies().len(), 1);

    let object = Binding::ObjectClass(ObjectClassBinding {
        class: ClassId::new("app.Clock"),
        type_key: key("app.Clock"),
        location: None,
    });
    assert!(object.has_trivial_dependencies());

    let empty_set = Binding::Multibinding(MultibindingBinding {
        type_key: TypeKey::new(TypeRef::generic("Set", [TypeRef::simple("Plugin")])),
        collection: CollectionKind::Set,
        allow_empty: true,
        source_bindings: BTreeSet::new(),
        declaration: None,
        location: None,
    });
    assert!(empty_set.has_trivial_dependencies());

    let mut filled = empty_set.clone();
    if let Binding::Multibinding(b) = &mut filled {
        b.source_bindings.insert(key("PluginA"));
    }
    assert!(!filled.has_trivial_dependencies());

    let extension = Binding::GraphExtension(GraphExtensionBinding {
        type_key: key("app.LoggedInGraph"),
        extension: ClassId::new("app.LoggedInGraph"),
        parent_graph: ClassId::new("app.AppGraph"),
        accessor: None,
    });
    assert!(!extension.has_trivial_dependencies());
    assert!(extension.dependencies().is_empty());
}

#[test]
fn test_scope_is_reported_for_scoped_variants_only() {
    let scope = Annotation::single_in("app.AppScope");
    let scoped = Binding::Provided(
        ProvidedBinding::new(key("Db"), CallableId::new("app.AppGraph", "provideDb"))
            .scoped(scope.clone()),
    );
    assert_eq!(scoped.scope(), Some(&scope));
    assert!(scoped.is_scoped());

    let alias = Binding::Alias(AliasBinding::new(key("Store"), key("Db"), None));
    assert!(!alias.is_scoped());
}

#[test]
fn test_contribution_marks_multibinding_members() {
    let contributor = Binding::Provided(
        ProvidedBinding::new(key("PluginA"), CallableId::new("app.Plugins", "providePluginA"))
            .contributing(MultibindingContribution::into_set()),
    );
    assert!(contributor.is_into_multibinding());
    assert_eq!(
        contributor.contribution().map(|c| c.kind),
        Some(ContributionKind::IntoSet)
    );

    let plain = provided("provideString", "String", Vec::new());
    assert!(!plain.is_into_multibinding());
}

#[test]
fn test_render_short_for_traces() {
    let binding = provided("provideString", "String", Vec::new());
    assert_eq!(binding.render_short(), "AppGraph.provideString");

    let dependency = Binding::GraphDependency(GraphDependencyBinding {
        owner_key: key("app.AppGraph"),
        graph: ClassId::new("app.ChildGraph"),
        property_access: PropertyAccess {
            owner_key: key("app.AppGraph"),
            property_name: "dbProvider".to_string(),
            kind: AccessKind::Field,
        },
        type_key: key("app.Db"),
        scope: None,
    });
    assert_eq!(dependency.render_short(), "AppGraph.dbProvider");
    assert_eq!(dependency.name_hint(), "dbProvider");
}
