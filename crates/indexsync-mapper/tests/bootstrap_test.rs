mod common;

use common::*;
use indexsync_core::backend::InMemoryIndexManager;
use indexsync_core::{
    i64_property_mapping, ConfigurationError, FnPropertyHandle, PropertyValue, TypeName,
};
use indexsync_mapper::{
    IndexedTypeBinding, MappingDeclarations, PropertyDeclaration, SearchMapping, TypeDeclaration,
};
use std::sync::Arc;

#[test]
fn library_mapping_bootstraps_resolvers_for_contained_types() {
    let books = InMemoryIndexManager::new("books");
    let mapping = library_mapping(&books);

    assert!(mapping.is_indexed(&TypeName::new("Book")));
    assert!(!mapping.is_indexed(&TypeName::new("Author")));
    assert!(mapping.resolver_for(&TypeName::new("Book")).is_none());

    let author = mapping.resolver_for(&TypeName::new("Author")).unwrap().to_string();
    assert_eq!(
        author.lines().collect::<Vec<_>>(),
        vec![
            "OriginalTypeNode(Author)",
            "  PropertyNode(books collection)",
            "    OriginalTypeNode(Book)",
            "      MarkingNode[name, publisher]",
        ]
    );

    let publisher = mapping.resolver_for(&TypeName::new("Publisher")).unwrap().to_string();
    assert_eq!(
        publisher.lines().collect::<Vec<_>>(),
        vec![
            "OriginalTypeNode(Publisher)",
            "  PropertyNode(authors collection)",
            "    OriginalTypeNode(Author)",
            "      PropertyNode(books collection)",
            "        OriginalTypeNode(Book)",
            "          MarkingNode[name]",
        ]
    );
}

#[test]
fn indexed_type_without_binding_is_rejected() {
    let err = SearchMapping::builder(declarations()).build().err().unwrap();
    assert!(matches!(err, ConfigurationError::MissingIdentifierMapping(ref t) if t.as_str() == "Book"));
}

#[test]
fn binding_a_contained_type_is_rejected() {
    let books = InMemoryIndexManager::new("books");
    let authors = InMemoryIndexManager::new("authors");
    let err = SearchMapping::builder(declarations())
        .bind("Book", book_binding(&books))
        .bind("Author", author_binding(&authors))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::UnexpectedBinding(ref t) if t.as_str() == "Author"));
}

#[test]
fn binding_an_undeclared_type_is_rejected() {
    let books = InMemoryIndexManager::new("books");
    let err = SearchMapping::builder(declarations())
        .bind("Book", book_binding(&books))
        .bind("Magazine", book_binding(&books))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::UnknownType { .. }));
}

#[test]
fn incomplete_binding_names_the_missing_piece() {
    let books = InMemoryIndexManager::new("books");
    let binding: IndexedTypeBinding<i64> = IndexedTypeBinding::new()
        .identifier_mapping(i64_property_mapping(
            TypeName::new("Book"),
            FnPropertyHandle::shared("id", |b: &Book| PropertyValue::scalar(b.id)),
        ))
        .index_manager(Arc::new(books));
    let err = SearchMapping::builder(declarations())
        .bind("Book", binding)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::MissingDocumentPopulator(_)));
}

#[test]
fn dependency_on_an_undeclared_property_is_rejected() {
    let books = InMemoryIndexManager::new("books");
    let declarations = declarations().with_type(
        TypeDeclaration::entity::<()>("Shelf")
            .indexed()
            .depends_on("label"),
    );
    let err = SearchMapping::builder(declarations)
        .bind("Book", book_binding(&books))
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ConfigurationError::UnknownProperty { ref property, .. } if property == "label"
    ));
}

#[test]
fn derived_property_cycle_is_rejected() {
    let books = InMemoryIndexManager::new("books");
    let declarations = MappingDeclarations::new().with_type(
        TypeDeclaration::entity::<Book>("Book")
            .indexed()
            .property(
                PropertyDeclaration::new(FnPropertyHandle::shared("summary", |b: &Book| {
                    PropertyValue::scalar(b.title.read().clone())
                }))
                .derived_from("blurb"),
            )
            .property(
                PropertyDeclaration::new(FnPropertyHandle::shared("blurb", |b: &Book| {
                    PropertyValue::scalar(b.title.read().clone())
                }))
                .derived_from("summary"),
            )
            .depends_on("summary"),
    );
    let err = SearchMapping::builder(declarations)
        .bind("Book", book_binding(&books))
        .build()
        .err()
        .unwrap();
    match err {
        ConfigurationError::CyclicDerivedDependency { cycle, .. } => {
            assert_eq!(cycle, "Book.summary -> Book.blurb -> Book.summary")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn derived_cycle_nobody_reads_still_fails_bootstrap() {
    let books = InMemoryIndexManager::new("books");
    let declarations = MappingDeclarations::new().with_type(
        TypeDeclaration::entity::<Book>("Book")
            .indexed()
            .property(PropertyDeclaration::new(FnPropertyHandle::shared(
                "title",
                |b: &Book| PropertyValue::scalar(b.title.read().clone()),
            )))
            .property(
                PropertyDeclaration::new(FnPropertyHandle::shared("a", |b: &Book| {
                    PropertyValue::scalar(b.id)
                }))
                .derived_from("b"),
            )
            .property(
                PropertyDeclaration::new(FnPropertyHandle::shared("b", |b: &Book| {
                    PropertyValue::scalar(b.id)
                }))
                .derived_from("a"),
            )
            .depends_on("title"),
    );
    let err = SearchMapping::builder(declarations)
        .bind("Book", book_binding(&books))
        .build()
        .err()
        .unwrap();
    match err {
        ConfigurationError::CyclicDerivedDependency { cycle, .. } => {
            assert_eq!(cycle, "Book.a -> Book.b -> Book.a")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_type_declarations_are_rejected() {
    let books = InMemoryIndexManager::new("books");
    let declarations = declarations().with_type(TypeDeclaration::entity::<Publisher>("Publisher"));
    let err = SearchMapping::builder(declarations)
        .bind("Book", book_binding(&books))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::DuplicateType(ref t) if t.as_str() == "Publisher"));
}
