use apollo_compiler::name;
use apollo_compiler::schema::ExtendedType;
use apollo_type_graph::OperationKind;
use apollo_type_graph::TypeCatalog;
use apollo_type_graph::TypeGraphBuilder;
use apollo_type_graph::TypeGraphConfig;
use apollo_type_graph::operation::ArgumentDescriptor;
use apollo_type_graph::source::FieldDeclaration;
use apollo_type_graph::source::INT_TYPE;
use apollo_type_graph::source::STRING_TYPE;
use apollo_type_graph::source::SourceType;
use apollo_type_graph::source::TypeDeclaration;
use apollo_type_graph::source::TypeDescriptor;
use apollo_type_graph::source::TypeParameter;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::test_helpers::build;
use super::test_helpers::build_with;
use super::test_helpers::query;

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            TypeDeclaration::object(name!("Page"))
                .with_type_parameter(TypeParameter::new(name!("T")))
                .with_field(FieldDeclaration::new(
                    name!("items"),
                    TypeDescriptor::list_of(TypeDescriptor::variable(name!("T"))),
                )),
        )
        .with(
            TypeDeclaration::object(name!("Book")).with_field(FieldDeclaration::new(
                name!("title"),
                TypeDescriptor::named(STRING_TYPE).non_null(),
            )),
        )
        .with(
            TypeDeclaration::object(name!("Repository"))
                .with_type_parameter(TypeParameter::new(name!("T"))),
        )
        .with(
            TypeDeclaration::abstract_type(name!("Shape"))
                .with_description("Something with an area")
                .with_field(FieldDeclaration::new(
                    name!("area"),
                    TypeDescriptor::named(INT_TYPE).non_null(),
                )),
        )
        .with(
            TypeDeclaration::object(name!("Square"))
                .with_supertype(SourceType::declared(name!("Shape")))
                .with_field(FieldDeclaration::new(
                    name!("side"),
                    TypeDescriptor::named(INT_TYPE),
                )),
        )
}

fn root_field_type(descriptor: TypeDescriptor) -> String {
    let graph = build(catalog(), vec![query(name!("value"), descriptor)]);
    let built = graph.operation(OperationKind::Query, "value").unwrap();
    built.field.ty.to_string()
}

#[rstest]
#[case::array(TypeDescriptor::array_of(TypeDescriptor::named(STRING_TYPE)), "[String]")]
#[case::list_of_non_null(
    TypeDescriptor::list_of(TypeDescriptor::named(INT_TYPE).non_null()).non_null(),
    "[Int!]!"
)]
#[case::optional_is_always_nullable(
    TypeDescriptor::optional_of(TypeDescriptor::named(STRING_TYPE).non_null()).non_null(),
    "String"
)]
#[case::map(
    TypeDescriptor::map_of(TypeDescriptor::named(STRING_TYPE), TypeDescriptor::named(INT_TYPE)),
    "[MapEntry_String_Int]"
)]
#[case::id(TypeDescriptor::named(INT_TYPE).id().non_null(), "ID!")]
#[case::raw_generic(TypeDescriptor::named(name!("Page")), "Page_JSON")]
#[case::generic(
    TypeDescriptor::generic(name!("Page"), [TypeDescriptor::named(name!("Book"))]),
    "Page_Book"
)]
#[case::renamed(
    TypeDescriptor::generic(name!("Page"), [TypeDescriptor::named(name!("Book"))])
        .with_name(name!("Library")),
    "Library"
)]
fn root_field_types(#[case] descriptor: TypeDescriptor, #[case] expected: &str) {
    assert_eq!(root_field_type(descriptor), expected);
}

#[test]
fn maps_are_exposed_as_entry_lists() {
    let graph = build(
        catalog(),
        vec![query(
            name!("counts"),
            TypeDescriptor::map_of(TypeDescriptor::named(STRING_TYPE), TypeDescriptor::named(INT_TYPE)),
        )],
    );
    let Some(ExtendedType::Object(entry)) = graph.get_type("MapEntry_String_Int") else {
        panic!("expected an entry object type");
    };
    insta::assert_snapshot!(entry.to_string(), @r###"
    type MapEntry_String_Int {
      key: String!
      value: Int
    }
    "###);
}

#[test]
fn raw_generics_are_filled_with_the_filler_type() {
    let graph = build(
        catalog(),
        vec![query(name!("page"), TypeDescriptor::named(name!("Page")))],
    );
    let Some(ExtendedType::Object(page)) = graph.get_type("Page_JSON") else {
        panic!("expected `Page_JSON` to be an object type");
    };
    assert_eq!(page.fields["items"].ty.to_string(), "[JSON]");
    assert!(matches!(graph.get_type("JSON"), Some(ExtendedType::Scalar(_))));
    graph.to_schema().unwrap();
}

#[test]
fn strict_configurations_reject_generic_gaps() {
    let strict = TypeGraphConfig {
        allow_raw_replacement: false,
        allow_unbounded_replacement: false,
        ..Default::default()
    };

    let error = TypeGraphBuilder::new(catalog())
        .with_config(strict.clone())
        .build([query(name!("page"), TypeDescriptor::named(name!("Page")))])
        .unwrap_err();
    insta::assert_snapshot!(error, @"Type `Page` cannot be resolved: raw or incomplete generic types are not allowed");

    let error = TypeGraphBuilder::new(catalog())
        .with_config(strict)
        .build([query(
            name!("page"),
            TypeDescriptor::generic(
                name!("Page"),
                [TypeDescriptor::new(SourceType::Wildcard {
                    lower: Vec::new(),
                    upper: Vec::new(),
                })],
            ),
        )])
        .unwrap_err();
    insta::assert_snapshot!(error, @"Type `?` cannot be resolved: unbounded type variables and wildcards are not allowed");
}

#[test]
fn unknown_source_types_are_rejected() {
    let error = TypeGraphBuilder::new(catalog())
        .build([query(name!("fish"), TypeDescriptor::named(name!("Fish")))])
        .unwrap_err();
    insta::assert_snapshot!(error, @"Source type `Fish` is not declared in the type catalog");
}

#[test]
fn operations_are_resolved_in_their_owner_context() {
    let graph = build(
        catalog(),
        vec![
            query(name!("save"), TypeDescriptor::variable(name!("T")).non_null())
                .with_owner(TypeDescriptor::generic(
                    name!("Repository"),
                    [TypeDescriptor::named(name!("Book"))],
                ))
                .with_argument(ArgumentDescriptor::new(
                    name!("entity"),
                    TypeDescriptor::variable(name!("T")),
                )),
        ],
    );
    let save = graph.operation(OperationKind::Query, "save").unwrap();
    assert_eq!(save.field.ty.to_string(), "Book!");
    assert_eq!(save.field.arguments[0].ty.to_string(), "BookInput");
    assert!(matches!(
        graph.get_type("BookInput"),
        Some(ExtendedType::InputObject(_))
    ));
    assert!(graph.get_type("Repository").is_none());
}

#[test]
fn abstract_declarations_are_objects_unless_configured() {
    let operations = || vec![query(name!("shape"), TypeDescriptor::named(name!("Shape")))];

    let graph = build(catalog(), operations());
    assert!(matches!(graph.get_type("Shape"), Some(ExtendedType::Object(_))));
    let shape = graph.operation(OperationKind::Query, "shape").unwrap();
    assert!(
        shape
            .abstract_types
            .contains(&TypeDescriptor::named(name!("Shape"))),
        "an abstract declaration is abstract whatever it is exposed as"
    );

    let graph = build_with(
        catalog(),
        TypeGraphConfig {
            abstract_types_as_interfaces: true,
            discover_implementations: true,
            ..Default::default()
        },
        operations(),
    );
    let Some(ExtendedType::Interface(shape)) = graph.get_type("Shape") else {
        panic!("expected `Shape` to be an interface type");
    };
    assert!(shape.fields.contains_key("area"));
    let Some(ExtendedType::Object(square)) = graph.get_type("Square") else {
        panic!("expected `Square` to be an object type");
    };
    assert!(
        square
            .implements_interfaces
            .iter()
            .any(|interface| interface.name.as_str() == "Shape")
    );
    graph.to_schema().unwrap();
}
