#![allow(dead_code)]

use indexsync_core::backend::{IndexOperation, IndexOperationKind, InMemoryIndexManager};
use indexsync_core::extractors::COLLECTION;
use indexsync_core::{
    i64_property_mapping, ContainerExtractorPath, Document, DocumentPopulator, FnPropertyHandle,
    IndexingConfig, PojoRef, PropertyValue, Result, TypeName,
};
use indexsync_mapper::{
    IndexedTypeBinding, MappingDeclarations, PropertyDeclaration, SearchMapping, TypeDeclaration,
};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

pub struct Book {
    pub id: i64,
    pub title: RwLock<String>,
    pub author: RwLock<Option<Arc<Author>>>,
}

pub struct Author {
    pub id: i64,
    pub name: RwLock<String>,
    pub books: RwLock<Vec<Weak<Book>>>,
    pub publisher: RwLock<Option<Arc<Publisher>>>,
}

pub struct Publisher {
    pub name: RwLock<String>,
    pub authors: RwLock<Vec<Weak<Author>>>,
}

pub fn publisher(name: &str) -> Arc<Publisher> {
    Arc::new(Publisher {
        name: RwLock::new(name.to_string()),
        authors: RwLock::new(Vec::new()),
    })
}

pub fn author(id: i64, name: &str, publisher: Option<&Arc<Publisher>>) -> Arc<Author> {
    let author = Arc::new(Author {
        id,
        name: RwLock::new(name.to_string()),
        books: RwLock::new(Vec::new()),
        publisher: RwLock::new(publisher.cloned()),
    });
    if let Some(publisher) = publisher {
        publisher.authors.write().push(Arc::downgrade(&author));
    }
    author
}

pub fn book(id: i64, title: &str, author: Option<&Arc<Author>>) -> Arc<Book> {
    let book = Arc::new(Book {
        id,
        title: RwLock::new(title.to_string()),
        author: RwLock::new(author.cloned()),
    });
    if let Some(author) = author {
        author.books.write().push(Arc::downgrade(&book));
    }
    book
}

pub fn pojo<T: Send + Sync + 'static>(value: &Arc<T>) -> PojoRef {
    PojoRef::from_arc(value.clone())
}

fn collection() -> ContainerExtractorPath {
    ContainerExtractorPath::builtin(&[COLLECTION]).unwrap()
}

/// Book is indexed and reads its title, its author's name and its
/// publisher's name. Author and Publisher are contained entities only.
pub fn declarations() -> MappingDeclarations {
    library_declarations(false)
}

/// With `index_authors`, Author is indexed too and reads its name and the
/// titles of its books.
pub fn library_declarations(index_authors: bool) -> MappingDeclarations {
    let mut author = author_declaration();
    if index_authors {
        author = author.indexed().depends_on("name").depends_on("books.title");
    }
    MappingDeclarations::new()
        .with_type(
            TypeDeclaration::entity::<Book>("Book")
                .indexed()
                .property(PropertyDeclaration::new(FnPropertyHandle::shared(
                    "title",
                    |b: &Book| PropertyValue::scalar(b.title.read().clone()),
                )))
                .property(
                    PropertyDeclaration::new(FnPropertyHandle::shared("author", |b: &Book| {
                        b.author.read().clone().into()
                    }))
                    .value_type("Author")
                    .inverse_side("books"),
                )
                .depends_on("title")
                .depends_on("author.name")
                .depends_on("author.publisher.name"),
        )
        .with_type(author)
        .with_type(
            TypeDeclaration::entity::<Publisher>("Publisher")
                .property(PropertyDeclaration::new(FnPropertyHandle::shared(
                    "name",
                    |p: &Publisher| PropertyValue::scalar(p.name.read().clone()),
                )))
                .property(
                    PropertyDeclaration::new(FnPropertyHandle::shared(
                        "authors",
                        |p: &Publisher| {
                            PropertyValue::List(
                                p.authors
                                    .read()
                                    .iter()
                                    .filter_map(Weak::upgrade)
                                    .map(|a| PropertyValue::object(&a))
                                    .collect(),
                            )
                        },
                    ))
                    .with_extractors(collection())
                    .value_type("Author")
                    .inverse_side("publisher"),
                ),
        )
}

fn author_declaration() -> TypeDeclaration {
    TypeDeclaration::entity::<Author>("Author")
        .property(PropertyDeclaration::new(FnPropertyHandle::shared(
            "name",
            |a: &Author| PropertyValue::scalar(a.name.read().clone()),
        )))
        .property(
            PropertyDeclaration::new(FnPropertyHandle::shared("books", |a: &Author| {
                PropertyValue::List(
                    a.books
                        .read()
                        .iter()
                        .filter_map(Weak::upgrade)
                        .map(|b| PropertyValue::object(&b))
                        .collect(),
                )
            }))
            .with_extractors(collection())
            .value_type("Book")
            .inverse_side("author"),
        )
        .property(
            PropertyDeclaration::new(FnPropertyHandle::shared("publisher", |a: &Author| {
                a.publisher.read().clone().into()
            }))
            .value_type("Publisher")
            .inverse_side("authors"),
        )
}

pub struct BookPopulator;

impl DocumentPopulator for BookPopulator {
    fn populate(&self, entity: &PojoRef, document: &mut Document) -> Result<()> {
        if let Some(book) = entity.downcast_ref::<Book>() {
            document.insert("title".to_string(), book.title.read().clone().into());
            if let Some(author) = book.author.read().as_ref() {
                document.insert("author".to_string(), author.name.read().clone().into());
            }
        }
        Ok(())
    }
}

pub fn book_binding(index: &InMemoryIndexManager) -> IndexedTypeBinding<i64> {
    IndexedTypeBinding::new()
        .identifier_mapping(i64_property_mapping(
            TypeName::new("Book"),
            FnPropertyHandle::shared("id", |b: &Book| PropertyValue::scalar(b.id)),
        ))
        .populator(Arc::new(BookPopulator))
        .index_manager(Arc::new(index.clone()))
}

pub fn library_mapping(index: &InMemoryIndexManager) -> Arc<SearchMapping> {
    library_mapping_with(index, IndexingConfig::default())
}

pub fn library_mapping_with(index: &InMemoryIndexManager, config: IndexingConfig) -> Arc<SearchMapping> {
    SearchMapping::builder(declarations())
        .bind("Book", book_binding(index))
        .with_config(config)
        .build()
        .unwrap()
}

pub struct AuthorPopulator;

impl DocumentPopulator for AuthorPopulator {
    fn populate(&self, entity: &PojoRef, document: &mut Document) -> Result<()> {
        if let Some(author) = entity.downcast_ref::<Author>() {
            document.insert("name".to_string(), author.name.read().clone().into());
            let titles: Vec<String> = author
                .books
                .read()
                .iter()
                .filter_map(Weak::upgrade)
                .map(|b| b.title.read().clone())
                .collect();
            document.insert("titles".to_string(), titles.into());
        }
        Ok(())
    }
}

pub fn author_binding(index: &InMemoryIndexManager) -> IndexedTypeBinding<i64> {
    IndexedTypeBinding::new()
        .identifier_mapping(i64_property_mapping(
            TypeName::new("Author"),
            FnPropertyHandle::shared("id", |a: &Author| PropertyValue::scalar(a.id)),
        ))
        .populator(Arc::new(AuthorPopulator))
        .index_manager(Arc::new(index.clone()))
}

/// Mapping where both books and authors are indexed.
pub fn catalog_mapping(books: &InMemoryIndexManager, authors: &InMemoryIndexManager) -> Arc<SearchMapping> {
    SearchMapping::builder(library_declarations(true))
        .bind("Book", book_binding(books))
        .bind("Author", author_binding(authors))
        .build()
        .unwrap()
}

/// Applied operations as `(kind, document id)` pairs.
pub fn operations(index: &InMemoryIndexManager) -> Vec<(IndexOperationKind, String)> {
    index
        .operation_log()
        .into_iter()
        .map(|IndexOperation { kind, reference }| (kind, reference.document_id))
        .collect()
}
