//! API integration tests
//!
//! The full router runs in-process over in-memory stores and a pinned clock.

use std::{
    collections::HashMap,
    marker::PhantomData,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use catalog_server::{
    api,
    config::{AppConfig, CatalogConfig},
    error::{AppError, AppResult},
    models::{
        book::BookInput, user::UserClaims, Author, Book, BookInstance, Entity, Genre, Language,
        LoanStatus,
    },
    repository::{CrudStore, InstanceStore, Stores},
    services::{clock::FixedClock, Services},
    AppState,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

#[derive(Default)]
struct MemoryInstances {
    rows: Mutex<HashMap<Uuid, BookInstance>>,
}

impl MemoryInstances {
    fn put(&self, instance: BookInstance) {
        self.rows.lock().unwrap().insert(instance.id, instance);
    }

    fn snapshot(&self, id: Uuid) -> BookInstance {
        self.rows.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl InstanceStore for MemoryInstances {
    async fn get(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, instance: &BookInstance) -> AppResult<()> {
        self.put(instance.clone());
        Ok(())
    }

    async fn save(&self, instance: &BookInstance) -> AppResult<()> {
        self.put(instance.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn on_loan(&self, borrower: Option<Uuid>) -> AppResult<Vec<BookInstance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == LoanStatus::OnLoan)
            .filter(|i| borrower.is_none() || i.borrower == borrower)
            .cloned()
            .collect())
    }

    async fn for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn count(&self, status: Option<LoanStatus>) -> AppResult<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .count() as i64)
    }
}

#[derive(Default)]
struct MemoryBooks {
    rows: Mutex<Vec<Book>>,
}

#[async_trait]
impl CrudStore<Book> for MemoryBooks {
    async fn list(&self, limit: Option<i64>, offset: i64) -> AppResult<Vec<Book>> {
        let rows = self.rows.lock().unwrap();
        let limit = limit.unwrap_or(i64::MAX) as usize;
        Ok(rows.iter().skip(offset as usize).take(limit).cloned().collect())
    }

    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.rows.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut rows = self.rows.lock().unwrap();
        let book = Book {
            id: rows.len() as i32 + 1,
            title: input.title.clone(),
            author_id: input.author_id,
            summary: input.summary.clone(),
            isbn: input.isbn.clone(),
            language_id: input.language_id,
            genres: input.genres.clone(),
        };
        rows.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|b| b.id == id).map(|b| {
            b.title = input.title.clone();
            b.isbn = input.isbn.clone();
            b.clone()
        }))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.id != id);
        Ok(rows.len() != before)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

/// Store with no rows for the entities these tests never write
struct EmptyStore<E>(PhantomData<fn() -> E>);

impl<E> EmptyStore<E> {
    fn new() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<E: Entity> CrudStore<E> for EmptyStore<E> {
    async fn list(&self, _limit: Option<i64>, _offset: i64) -> AppResult<Vec<E>> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: E::Id) -> AppResult<Option<E>> {
        Ok(None)
    }

    async fn create(&self, _input: &E::Create) -> AppResult<E> {
        Err(AppError::BadRequest("read-only store".to_string()))
    }

    async fn update(&self, _id: E::Id, _input: &E::Update) -> AppResult<Option<E>> {
        Ok(None)
    }

    async fn delete(&self, _id: E::Id) -> AppResult<bool> {
        Ok(false)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(0)
    }
}

struct TestApp {
    config: AppConfig,
    instances: Arc<MemoryInstances>,
    books: Arc<MemoryBooks>,
    librarian: Uuid,
    reader: Uuid,
}

impl TestApp {
    fn new() -> Self {
        Self {
            config: AppConfig::default(),
            instances: Arc::new(MemoryInstances::default()),
            books: Arc::new(MemoryBooks::default()),
            librarian: Uuid::new_v4(),
            reader: Uuid::new_v4(),
        }
    }

    fn router(&self) -> Router {
        let stores = Stores {
            instances: self.instances.clone(),
            books: self.books.clone(),
            authors: Arc::new(EmptyStore::<Author>::new()),
            genres: Arc::new(EmptyStore::<Genre>::new()),
            languages: Arc::new(EmptyStore::<Language>::new()),
        };
        let services = Services::new(
            stores,
            Arc::new(FixedClock::new(today())),
            &CatalogConfig::default(),
        );

        api::router(AppState {
            config: Arc::new(self.config.clone()),
            services: Arc::new(services),
        })
    }

    fn token(&self, user_id: Uuid, username: &str, permissions: &[&str]) -> String {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: user_id.to_string(),
            user_id,
            username: username.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.config.auth.jwt_secret)
        .unwrap()
    }

    fn librarian_token(&self) -> String {
        self.token(self.librarian, "librarian", &["catalog.can_mark_returned"])
    }

    fn reader_token(&self) -> String {
        self.token(self.reader, "reader", &[])
    }

    fn lent(&self, borrower: Uuid, due_back: NaiveDate) -> Uuid {
        let mut instance = BookInstance::new(1, "Penguin, 1998");
        instance.transition(LoanStatus::Available).unwrap();
        instance.lend(borrower, due_back).unwrap();
        let id = instance.id;
        self.instances.put(instance);
        id
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn renew_uri(id: Uuid) -> String {
    format!("/api/v1/instances/{id}/renew")
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/api/v1/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_reports_catalog_figures() {
    let app = TestApp::new();
    app.lent(app.reader, today());

    let response = app.send(Method::GET, "/api/v1/ready", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["catalog"]["num_instances"], 1);
}

#[tokio::test]
async fn test_catalog_summary_counts_available_copies() {
    let app = TestApp::new();
    app.lent(app.reader, today());
    let mut shelved = BookInstance::new(1, "Folio");
    shelved.transition(LoanStatus::Available).unwrap();
    app.instances.put(shelved);

    let response = app.send(Method::GET, "/api/v1/catalog", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["num_instances"], 2);
    assert_eq!(body["num_instances_available"], 1);
    assert_eq!(body["num_books"], 0);
}

#[tokio::test]
async fn test_renewal_form_defaults_to_three_weeks() {
    let app = TestApp::new();
    let id = app.lent(app.reader, today() + Duration::days(2));

    let response = app
        .send(Method::GET, &renew_uri(id), Some(&app.librarian_token()), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["due_back"], "2024-03-25");
    assert_eq!(body["label"], "Renewal date");
    assert_eq!(body["instance"]["id"], id.to_string());
}

#[tokio::test]
async fn test_renewal_redirects_to_on_loan_list() {
    let app = TestApp::new();
    let id = app.lent(app.reader, today() + Duration::days(2));

    let response = app
        .send(
            Method::POST,
            &renew_uri(id),
            Some(&app.librarian_token()),
            Some(json!({ "due_back": "2024-03-18" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/api/v1/library-books"
    );

    let stored = app.instances.snapshot(id);
    assert_eq!(stored.due_back, NaiveDate::from_ymd_opt(2024, 3, 18));
    assert_eq!(stored.status, LoanStatus::OnLoan);
    assert_eq!(stored.borrower, Some(app.reader));
}

#[tokio::test]
async fn test_renewal_rejects_past_date_with_form_errors() {
    let app = TestApp::new();
    let original_due = today() + Duration::days(2);
    let id = app.lent(app.reader, original_due);

    let response = app
        .send(
            Method::POST,
            &renew_uri(id),
            Some(&app.librarian_token()),
            Some(json!({ "due_back": "2024-03-03" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["due_back"], "2024-03-03");
    assert_eq!(body["errors"]["due_back"][0], "Invalid date - renewal in past");
    assert_eq!(app.instances.snapshot(id).due_back, Some(original_due));
}

#[tokio::test]
async fn test_renewal_rejects_date_beyond_four_weeks() {
    let app = TestApp::new();
    let id = app.lent(app.reader, today());

    let response = app
        .send(
            Method::POST,
            &renew_uri(id),
            Some(&app.librarian_token()),
            Some(json!({ "due_back": "2024-04-02" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["errors"]["due_back"][0],
        "Invalid date - renewal more than 4 weeks ahead"
    );
    assert_eq!(app.instances.snapshot(id).due_back, Some(today()));
}

#[tokio::test]
async fn test_renewal_requires_permission() {
    let app = TestApp::new();
    let id = app.lent(app.reader, today());

    let response = app
        .send(
            Method::POST,
            &renew_uri(id),
            Some(&app.reader_token()),
            Some(json!({ "due_back": "2024-03-18" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.instances.snapshot(id).due_back, Some(today()));

    // Forbidden even for an id that does not exist
    let response = app
        .send(Method::GET, &renew_uri(Uuid::new_v4()), Some(&app.reader_token()), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_renewal_of_unknown_instance_is_not_found() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            &renew_uri(Uuid::new_v4()),
            Some(&app.librarian_token()),
            Some(json!({ "due_back": "2024-03-18" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = TestApp::new();

    for uri in ["/api/v1/mybooks", "/api/v1/library-books"] {
        let response = app.send(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app
        .send(Method::GET, "/api/v1/mybooks", Some("not-a-jwt"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_books_lists_own_loans_soonest_first() {
    let app = TestApp::new();
    let later = app.lent(app.reader, today() + Duration::days(10));
    let sooner = app.lent(app.reader, today() + Duration::days(1));
    app.lent(app.librarian, today());

    let response = app
        .send(Method::GET, "/api/v1/mybooks", Some(&app.reader_token()), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 2);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![sooner.to_string(), later.to_string()]);
}

#[tokio::test]
async fn test_library_books_is_for_librarians() {
    let app = TestApp::new();
    app.lent(app.reader, today());
    app.lent(app.librarian, today() + Duration::days(3));

    let response = app
        .send(Method::GET, "/api/v1/library-books", Some(&app.reader_token()), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(Method::GET, "/api/v1/library-books", Some(&app.librarian_token()), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_loan_lists_are_paginated_by_ten() {
    let app = TestApp::new();
    for n in 0..12 {
        app.lent(app.reader, today() + Duration::days(n));
    }
    let last = app.lent(app.reader, today() + Duration::days(20));

    for uri in ["/api/v1/mybooks", "/api/v1/library-books"] {
        let token = if uri.ends_with("mybooks") {
            app.reader_token()
        } else {
            app.librarian_token()
        };

        let response = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 13);
        assert_eq!(body["per_page"], 10);
        assert_eq!(body["items"].as_array().unwrap().len(), 10);

        let response = app
            .send(Method::GET, &format!("{uri}?page=2"), Some(&token), None)
            .await;
        let body = json_body(response).await;
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2]["id"], last.to_string());
    }
}

#[tokio::test]
async fn test_loan_lists_flag_overdue_copies() {
    let app = TestApp::new();
    let late = app.lent(app.reader, today() - Duration::days(2));
    let on_time = app.lent(app.reader, today());

    let response = app
        .send(Method::GET, "/api/v1/mybooks", Some(&app.reader_token()), None)
        .await;
    let body = json_body(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], late.to_string());
    assert_eq!(items[0]["overdue"], true);
    assert_eq!(items[1]["id"], on_time.to_string());
    assert_eq!(items[1]["overdue"], false);
}

#[tokio::test]
async fn test_out_of_range_page_is_a_bad_request() {
    let app = TestApp::new();

    let response = app
        .send(Method::GET, "/api/v1/books?page=9223372036854775807", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(
            Method::GET,
            "/api/v1/mybooks?page=9223372036854775807",
            Some(&app.reader_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_then_return() {
    let app = TestApp::new();
    let mut instance = BookInstance::new(1, "Vintage");
    instance.transition(LoanStatus::Available).unwrap();
    let id = instance.id;
    app.instances.put(instance);

    let response = app
        .send(
            Method::POST,
            &format!("/api/v1/instances/{id}/checkout"),
            Some(&app.librarian_token()),
            Some(json!({ "borrower": app.reader })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "on_loan");
    assert_eq!(body["due_back"], "2024-03-25");

    let response = app
        .send(
            Method::POST,
            &format!("/api/v1/instances/{id}/return"),
            Some(&app.librarian_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = app.instances.snapshot(id);
    assert_eq!(stored.status, LoanStatus::Available);
    assert_eq!(stored.borrower, None);
    assert_eq!(stored.due_back, None);

    // Returning twice is an invalid transition
    let response = app
        .send(
            Method::POST,
            &format!("/api/v1/instances/{id}/return"),
            Some(&app.librarian_token()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_rest_books_gated_by_permission() {
    let app = TestApp::new();
    let librarian = app.librarian_token();

    let response = app
        .send(
            Method::POST,
            "/api/v1/rest/books",
            Some(&librarian),
            Some(json!({ "title": "Dune", "isbn": "9780441172719" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .send(Method::GET, "/api/v1/rest/books", Some(&librarian), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await[0]["title"], "Dune");

    let response = app
        .send(Method::GET, "/api/v1/rest/books/1", Some(&app.reader_token()), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(Method::GET, "/api/v1/rest/books/99", Some(&librarian), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(Method::DELETE, "/api/v1/rest/books/1", Some(&app.reader_token()), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.books.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_book_listing_is_paginated() {
    let app = TestApp::new();
    let librarian = app.librarian_token();

    for n in 0..12 {
        let response = app
            .send(
                Method::POST,
                "/api/v1/books",
                Some(&librarian),
                Some(json!({ "title": format!("Volume {n}"), "isbn": "9780441172719" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.send(Method::GET, "/api/v1/books?page=2", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], 12);
    assert_eq!(body["page"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let response = app
        .send(
            Method::POST,
            "/api/v1/books",
            Some(&app.reader_token()),
            Some(json!({ "title": "Forbidden", "isbn": "9780441172719" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
