use bookkeeper_core::{
    ColumnSchema, Entity, EntityError, FieldMap, Filter, MissingRowPolicy, PrimaryKey, RepoError,
    Repository, SqliteRepository,
};
use rusqlite::types::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
struct Book {
    id: Option<PrimaryKey>,
    title: String,
    author: String,
    year: i64,
    pages: i64,
}

impl Book {
    fn new(title: &str, author: &str, year: i64, pages: i64) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            year,
            pages,
        }
    }
}

impl Entity for Book {
    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id
    }

    fn set_primary_key(&mut self, pk: PrimaryKey) {
        self.id = Some(pk);
    }

    fn field_value(&self, column: &str) -> Option<Value> {
        match column {
            "title" => Some(self.title.clone().into()),
            "author" => Some(self.author.clone().into()),
            "year" => Some(self.year.into()),
            "pages" => Some(self.pages.into()),
            _ => None,
        }
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, EntityError> {
        Ok(Self {
            id: None,
            title: fields.get("title")?,
            author: fields.get("author")?,
            year: fields.get("year")?,
            pages: fields.get("pages")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Measurement {
    id: Option<PrimaryKey>,
    label: String,
    reading: f64,
    note: Option<String>,
    payload: Vec<u8>,
}

impl Entity for Measurement {
    fn primary_key(&self) -> Option<PrimaryKey> {
        self.id
    }

    fn set_primary_key(&mut self, pk: PrimaryKey) {
        self.id = Some(pk);
    }

    fn field_value(&self, column: &str) -> Option<Value> {
        match column {
            "label" => Some(self.label.clone().into()),
            "reading" => Some(self.reading.into()),
            "note" => Some(self.note.clone().into()),
            "payload" => Some(self.payload.clone().into()),
            _ => None,
        }
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, EntityError> {
        Ok(Self {
            id: None,
            label: fields.get("label")?,
            reading: fields.get("reading")?,
            note: fields.get("note")?,
            payload: fields.get("payload")?,
        })
    }
}

fn book_columns() -> ColumnSchema {
    ColumnSchema::from_pairs([
        ("title", "TEXT"),
        ("author", "TEXT"),
        ("year", "INTEGER"),
        ("pages", "INTEGER"),
    ])
    .unwrap()
}

fn books_repo() -> SqliteRepository<Book> {
    SqliteRepository::new(":memory:", "books", book_columns()).unwrap()
}

fn sorted_by_key(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by_key(|book| book.id);
    books
}

#[test]
fn add_assigns_key_and_get_roundtrips() {
    let repo = books_repo();
    let mut book = Book::new("Test Book", "Test Author", 2021, 200);

    let pk = repo.add(&mut book).unwrap();
    assert!(pk > 0);
    assert_eq!(book.id, Some(pk));

    let loaded = repo.get(pk).unwrap().unwrap();
    assert_eq!(loaded, book);
}

#[test]
fn distinct_adds_yield_distinct_keys() {
    let repo = books_repo();
    let mut keys = HashSet::new();
    for index in 0..10 {
        let mut book = Book::new(&format!("Book {index}"), "Author", 2000 + index, 100);
        keys.insert(repo.add(&mut book).unwrap());
    }
    assert_eq!(keys.len(), 10);
}

#[test]
fn get_unknown_key_returns_none() {
    let repo = books_repo();
    let mut book = Book::new("Test Book", "Test Author", 2021, 200);
    let pk = repo.add(&mut book).unwrap();

    assert!(repo.get(pk + 1).unwrap().is_none());
}

#[test]
fn get_all_on_empty_table_returns_empty_vec() {
    let repo = books_repo();
    assert!(repo.get_all(None).unwrap().is_empty());
    assert!(repo
        .get_all(Some(&Filter::new().with("author", "Nobody".to_string())))
        .unwrap()
        .is_empty());
}

#[test]
fn update_overwrites_mutated_field_and_keeps_others() {
    let repo = books_repo();
    let mut book = Book::new("The Lord of the Rings", "J.R.R. Tolkien", 1954, 1178);
    let pk = repo.add(&mut book).unwrap();

    book.title = "The Hobbit".to_string();
    repo.update(&book).unwrap();

    let updated = repo.get(pk).unwrap().unwrap();
    assert_eq!(updated.title, "The Hobbit");
    assert_eq!(updated.author, "J.R.R. Tolkien");
    assert_eq!(updated.year, 1954);
    assert_eq!(updated.pages, 1178);
}

#[test]
fn update_without_key_is_rejected() {
    let repo = books_repo();
    let book = Book::new("Unsaved", "Nobody", 1999, 1);

    let err = repo.update(&book).unwrap_err();
    assert!(matches!(err, RepoError::MissingPrimaryKey));
}

#[test]
fn delete_is_idempotent() {
    let repo = books_repo();
    let mut book = Book::new("Book1", "Author1", 2021, 100);
    let pk = repo.add(&mut book).unwrap();

    repo.delete(pk).unwrap();
    assert!(repo.get(pk).unwrap().is_none());
    assert!(!repo.get_all(None).unwrap().contains(&book));

    repo.delete(pk).unwrap();
}

#[test]
fn missing_rows_are_silent_by_default() {
    let repo = books_repo();
    let mut ghost = Book::new("Ghost", "Nobody", 1900, 1);
    ghost.id = Some(42);

    assert_eq!(repo.missing_row_policy(), MissingRowPolicy::Ignore);
    repo.update(&ghost).unwrap();
    repo.delete(42).unwrap();
    assert!(repo.get_all(None).unwrap().is_empty());
}

#[test]
fn missing_rows_are_reported_under_error_policy() {
    let repo = books_repo().with_missing_row_policy(MissingRowPolicy::Error);
    let mut ghost = Book::new("Ghost", "Nobody", 1900, 1);
    ghost.id = Some(42);

    assert!(matches!(repo.update(&ghost), Err(RepoError::NotFound(42))));
    assert!(matches!(repo.delete(42), Err(RepoError::NotFound(42))));

    let mut real = Book::new("Real", "Somebody", 2000, 10);
    let pk = repo.add(&mut real).unwrap();
    repo.delete(pk).unwrap();
    assert!(matches!(repo.delete(pk), Err(RepoError::NotFound(id)) if id == pk));
}

#[test]
fn filter_and_delete_scenario() {
    let repo = books_repo();
    let mut a = Book::new("A", "X", 2000, 100);
    let mut b = Book::new("B", "X", 2001, 200);
    let mut c = Book::new("C", "Y", 2002, 300);
    repo.add(&mut a).unwrap();
    repo.add(&mut b).unwrap();
    repo.add(&mut c).unwrap();

    let by_x = sorted_by_key(
        repo.get_all(Some(&Filter::new().with("author", "X".to_string())))
            .unwrap(),
    );
    assert_eq!(by_x, vec![a.clone(), b.clone()]);
    assert_eq!(by_x[0].pages, 100);
    assert_eq!(by_x[1].pages, 200);

    repo.delete(b.id.unwrap()).unwrap();
    let remaining = sorted_by_key(repo.get_all(None).unwrap());
    assert_eq!(remaining, vec![a, c]);
}

#[test]
fn filter_conditions_are_combined_with_and() {
    let repo = books_repo();
    for (title, author, year) in [("A", "X", 2000), ("B", "X", 2001), ("C", "Y", 2001)] {
        repo.add(&mut Book::new(title, author, year, 100)).unwrap();
    }

    let filter = Filter::new()
        .with("author", "X".to_string())
        .with("year", 2001_i64);
    let matches = repo.get_all(Some(&filter)).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].title, "B");

    let everything = repo.get_all(Some(&Filter::new())).unwrap();
    assert_eq!(everything.len(), 3);
}

#[test]
fn filter_on_unknown_column_is_rejected() {
    let repo = books_repo();
    let err = repo
        .get_all(Some(&Filter::new().with("publisher", "Penguin".to_string())))
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::UnknownColumn { ref table, ref column } if table == "books" && column == "publisher"
    ));
}

#[test]
fn filter_field_names_ignore_ascii_case() {
    let repo = books_repo();
    let mut a = Book::new("A", "X", 2000, 100);
    repo.add(&mut a).unwrap();
    repo.add(&mut Book::new("B", "Y", 2001, 200)).unwrap();

    let matches = repo
        .get_all(Some(&Filter::new().with("Author", "X".to_string())))
        .unwrap();
    assert_eq!(matches, vec![a]);
}

#[test]
fn entity_without_schema_field_cannot_be_added() {
    let columns = ColumnSchema::from_pairs([
        ("title", "TEXT"),
        ("author", "TEXT"),
        ("year", "INTEGER"),
        ("pages", "INTEGER"),
        ("isbn", "TEXT"),
    ])
    .unwrap();
    let repo: SqliteRepository<Book> =
        SqliteRepository::new(":memory:", "books", columns).unwrap();

    let mut book = Book::new("No ISBN", "Author", 2020, 10);
    let err = repo.add(&mut book).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Entity(EntityError::MissingField(ref field)) if field == "isbn"
    ));
    assert_eq!(book.id, None);
}

#[test]
fn undecodable_row_is_reported_as_entity_error() {
    let repo = books_repo();
    repo.connection()
        .execute(
            "INSERT INTO books (title, author, year, pages) VALUES ('T', 'A', 'unknown', 1);",
            [],
        )
        .unwrap();

    let err = repo.get(1).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Entity(EntityError::Decode { ref field, .. }) if field == "year"
    ));
}

#[test]
fn values_are_bound_not_interpolated() {
    let repo = books_repo();
    let mut book = Book::new("x'); DROP TABLE books; --", "O'Brien", 2000, 1);
    let pk = repo.add(&mut book).unwrap();

    let found = repo
        .get_all(Some(&Filter::new().with("author", "O'Brien".to_string())))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(repo.get(pk).unwrap().unwrap().title, book.title);
}

#[test]
fn nullable_real_and_blob_columns_roundtrip() {
    let columns = ColumnSchema::from_pairs([
        ("label", "TEXT"),
        ("reading", "REAL"),
        ("note", "TEXT"),
        ("payload", "BLOB"),
    ])
    .unwrap();
    let repo: SqliteRepository<Measurement> =
        SqliteRepository::new(":memory:", "measurements", columns).unwrap();

    let mut with_note = Measurement {
        id: None,
        label: "temp".to_string(),
        reading: 21.5,
        note: Some("kitchen".to_string()),
        payload: vec![0, 1, 2, 255],
    };
    let mut without_note = Measurement {
        id: None,
        label: "humidity".to_string(),
        reading: 0.45,
        note: None,
        payload: Vec::new(),
    };
    let first = repo.add(&mut with_note).unwrap();
    let second = repo.add(&mut without_note).unwrap();

    assert_eq!(repo.get(first).unwrap().unwrap(), with_note);
    assert_eq!(repo.get(second).unwrap().unwrap(), without_note);
}

#[test]
fn insert_returns_keyed_copy() {
    let repo = books_repo();
    let stored = repo.insert(Book::new("Owned", "Author", 2010, 50)).unwrap();

    let pk = stored.id.unwrap();
    assert_eq!(repo.get(pk).unwrap().unwrap(), stored);
}

#[test]
fn repository_trait_is_usable_generically() {
    fn store_all<R: Repository<Book>>(repo: &R, books: Vec<Book>) -> Vec<PrimaryKey> {
        books
            .into_iter()
            .map(|book| repo.insert(book).unwrap().id.unwrap())
            .collect()
    }

    let repo = books_repo();
    let keys = store_all(
        &repo,
        vec![
            Book::new("One", "A", 2001, 1),
            Book::new("Two", "B", 2002, 2),
        ],
    );

    assert_eq!(keys.len(), 2);
    assert_eq!(repo.get_all(None).unwrap().len(), 2);
}

#[test]
fn reads_build_fresh_values() {
    let repo = books_repo();
    let mut book = Book::new("Fresh", "Author", 2000, 10);
    let pk = repo.add(&mut book).unwrap();

    let mut first = repo.get(pk).unwrap().unwrap();
    first.title = "changed locally".to_string();

    let second = repo.get(pk).unwrap().unwrap();
    assert_eq!(second.title, "Fresh");
}

fn books_table_connection(setup: &str) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE books (title TEXT, author TEXT, year INTEGER, pages INTEGER);",
    )
    .unwrap();
    conn.execute_batch(setup).unwrap();
    conn
}

#[test]
#[should_panic(expected = "without a generated row id")]
fn insert_swallowed_by_trigger_is_fatal() {
    let conn = books_table_connection(
        "CREATE TRIGGER drop_books BEFORE INSERT ON books BEGIN SELECT RAISE(IGNORE); END;",
    );
    let repo: SqliteRepository<Book> =
        SqliteRepository::from_connection(conn, "books", book_columns()).unwrap();

    let _ = repo.add(&mut Book::new("Lost", "Nobody", 2000, 1));
}

#[test]
#[should_panic(expected = "non-positive row id")]
fn non_positive_generated_row_id_is_fatal() {
    let conn = books_table_connection(
        "INSERT INTO books (rowid, title, author, year, pages) VALUES (-10, 'Old', 'Z', 1900, 1);",
    );
    let repo: SqliteRepository<Book> =
        SqliteRepository::from_connection(conn, "books", book_columns()).unwrap();

    let _ = repo.add(&mut Book::new("Next", "Nobody", 2000, 1));
}
