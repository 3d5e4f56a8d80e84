use apollo_compiler::name;
use apollo_compiler::schema::ExtendedType;
use apollo_type_graph::OperationKind;
use apollo_type_graph::TypeCatalog;
use apollo_type_graph::source::FieldDeclaration;
use apollo_type_graph::source::STRING_TYPE;
use apollo_type_graph::source::TypeDeclaration;
use apollo_type_graph::source::TypeDescriptor;
use pretty_assertions::assert_eq;

use super::test_helpers::build;
use super::test_helpers::pets;
use super::test_helpers::query;
use super::test_helpers::sdl;

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDeclaration::object(name!("Node"))
                .with_field(FieldDeclaration::new(
                    name!("id"),
                    TypeDescriptor::named(STRING_TYPE).id().non_null(),
                ))
                .with_field(FieldDeclaration::new(
                    name!("children"),
                    TypeDescriptor::list_of(TypeDescriptor::named(name!("Node"))),
                )),
        )
        .with(
            TypeDeclaration::object(name!("Author"))
                .with_field(FieldDeclaration::new(
                    name!("name"),
                    TypeDescriptor::named(STRING_TYPE).non_null(),
                ))
                .with_field(FieldDeclaration::new(
                    name!("books"),
                    TypeDescriptor::list_of(TypeDescriptor::named(name!("Book")).non_null())
                        .non_null(),
                )),
        )
        .with(
            TypeDeclaration::object(name!("Book"))
                .with_field(FieldDeclaration::new(
                    name!("title"),
                    TypeDescriptor::named(STRING_TYPE).non_null(),
                ))
                .with_field(FieldDeclaration::new(
                    name!("author"),
                    TypeDescriptor::named(name!("Author")).non_null(),
                )),
        )
}

#[test]
fn self_referencing_type_terminates() {
    let graph = build(
        catalog(),
        vec![query(
            name!("root"),
            TypeDescriptor::named(name!("Node")).non_null(),
        )],
    );

    let Some(ExtendedType::Object(node)) = graph.get_type("Node") else {
        panic!("expected `Node` to be an object type");
    };
    let children = &node.fields["children"];
    assert_eq!(children.ty.to_string(), "[Node]");
    let Some(ExtendedType::Object(element)) = graph.get_type(children.ty.inner_named_type())
    else {
        panic!("expected the element type of `children` to be an object type");
    };
    assert!(element.ptr_eq(node));

    insta::assert_snapshot!(node.to_string(), @r###"
    type Node {
      id: ID!
      children: [Node]
    }
    "###);
}

#[test]
fn mutually_recursive_types_terminate() {
    let graph = build(
        catalog(),
        vec![query(
            name!("authors"),
            TypeDescriptor::list_of(TypeDescriptor::named(name!("Author")).non_null()),
        )],
    );

    let Some(ExtendedType::Object(author)) = graph.get_type("Author") else {
        panic!("expected `Author` to be an object type");
    };
    let Some(ExtendedType::Object(book)) = graph.get_type("Book") else {
        panic!("expected `Book` to be an object type");
    };
    assert_eq!(author.fields["books"].ty.to_string(), "[Book!]!");
    assert_eq!(book.fields["author"].ty.to_string(), "Author!");
    assert!(graph.covariant().is_empty());

    let schema = graph.to_schema().unwrap();
    assert!(schema.types.contains_key("Author"));
    assert!(schema.types.contains_key("Book"));
}

#[test]
fn repeated_descriptors_share_one_type() {
    let graph = build(
        catalog(),
        vec![
            query(name!("node"), TypeDescriptor::named(name!("Node"))),
            query(
                name!("nodes"),
                TypeDescriptor::list_of(
                    TypeDescriptor::named(name!("Node"))
                        .with_description("the same node type")
                        .non_null(),
                ),
            ),
        ],
    );

    let named = graph
        .types()
        .filter(|(name, _)| name.as_str() == "Node")
        .count();
    assert_eq!(named, 1);

    let query_type = graph.root_type_name(apollo_type_graph::OperationKind::Query);
    assert_eq!(query_type.map(|name| name.as_str()), Some("Query"));
    let Some(ExtendedType::Object(root)) = graph.get_type("Query") else {
        panic!("expected a query root type");
    };
    assert_eq!(root.fields["node"].ty.to_string(), "Node");
    assert_eq!(root.fields["nodes"].ty.to_string(), "[Node!]");
}

#[test]
fn builds_are_deterministic() {
    let operations = || {
        vec![
            query(name!("root"), TypeDescriptor::named(name!("Node"))),
            query(
                name!("authors"),
                TypeDescriptor::list_of(TypeDescriptor::named(name!("Author"))),
            ),
        ]
    };
    let first = build(catalog(), operations());
    let second = build(catalog(), operations());
    assert_eq!(sdl(&first), sdl(&second));
    assert_eq!(
        first.types().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
        second.types().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
    );
}

#[test]
fn abstract_types_behind_a_cycle_reach_every_operation() {
    let catalog = pets()
        .with(
            TypeDeclaration::object(name!("Owner"))
                .with_field(FieldDeclaration::new(
                    name!("home"),
                    TypeDescriptor::named(name!("Home")),
                ))
                .with_field(FieldDeclaration::new(
                    name!("pet"),
                    TypeDescriptor::named(name!("Pet")),
                )),
        )
        .with(
            TypeDeclaration::object(name!("Home")).with_field(FieldDeclaration::new(
                name!("owner"),
                TypeDescriptor::named(name!("Owner")),
            )),
        );
    let graph = build(
        catalog,
        vec![
            query(name!("owner"), TypeDescriptor::named(name!("Owner"))),
            query(name!("home"), TypeDescriptor::named(name!("Home"))),
        ],
    );

    let pet = TypeDescriptor::named(name!("Pet"));
    for operation in ["owner", "home"] {
        let built = graph.operation(OperationKind::Query, operation).unwrap();
        assert_eq!(
            built.abstract_types.iter().collect::<Vec<_>>(),
            [&pet],
            "`{operation}` can return a `Pet`"
        );
        assert!(built.value_mapper.polymorphic_types().contains_key("Pet"));
    }
}
