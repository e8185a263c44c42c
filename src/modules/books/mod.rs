pub mod models;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use shelf_authz::AccessControl;
use shelf_http::error::AppError;
use shelf_kernel::{InitCtx, Module};
use shelf_query::{resolve, QuerySpec};
use shelf_store::{BookRecord, NewBook, RecordStore};

use models::BookPayload;

/// Book catalog module: public listings with filter/search/order, token
/// gated writes.
pub struct BooksModule {
    store: Arc<RecordStore>,
    access: Arc<AccessControl>,
}

impl BooksModule {
    pub fn new(store: Arc<RecordStore>, access: Arc<AccessControl>) -> Self {
        Self { store, access }
    }
}

#[derive(Clone)]
struct BooksState {
    store: Arc<RecordStore>,
    access: Arc<AccessControl>,
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let state = BooksState {
            store: self.store.clone(),
            access: self.access.clone(),
        };
        // Each route is registered with and without a trailing slash; the
        // published API paths carry one, and the router treats the two
        // shapes as distinct.
        Router::new()
            .route("/", get(list_books))
            .route("/{id}", get(get_book))
            .route("/{id}/", get(get_book))
            .route("/create", post(create_book))
            .route("/create/", post(create_book))
            .route("/update/{id}", put(update_book))
            .route("/update/{id}/", put(update_book))
            .route("/delete/{id}", delete(delete_book))
            .route("/delete/{id}/", delete(delete_book))
            .with_state(state)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books with filtering, search, and ordering",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "title",
                                "in": "query",
                                "description": "Exact title match",
                                "schema": {"type": "string"}
                            },
                            {
                                "name": "author",
                                "in": "query",
                                "description": "Exact author match",
                                "schema": {"type": "string"}
                            },
                            {
                                "name": "publication_year",
                                "in": "query",
                                "description": "Exact publication year match",
                                "schema": {"type": "integer"}
                            },
                            {
                                "name": "search",
                                "in": "query",
                                "description": "Case-insensitive substring match on title or author. An empty term matches nothing.",
                                "schema": {"type": "string"}
                            },
                            {
                                "name": "ordering",
                                "in": "query",
                                "description": "Sort field: title or publication_year, with optional leading '-' for descending. Defaults to title ascending.",
                                "schema": {"type": "string"}
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Ordered list of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": {"$ref": "#/components/schemas/Book"}
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "Unsupported filter or ordering field",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Retrieve a single book",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer", "format": "int64"}
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Book details",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/create": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "security": [{"bearerAuth": []}],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/BookPayload"}
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid bearer token",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            },
                            "422": {
                                "description": "Payload failed validation",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/update/{id}": {
                    "put": {
                        "summary": "Fully replace a book",
                        "tags": ["Books"],
                        "security": [{"bearerAuth": []}],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer", "format": "int64"}
                            }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/BookPayload"}
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Book"}
                                    }
                                }
                            },
                            "401": {
                                "description": "Missing or invalid bearer token",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                },
                "/delete/{id}": {
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "security": [{"bearerAuth": []}],
                        "parameters": [
                            {
                                "name": "id",
                                "in": "path",
                                "required": true,
                                "schema": {"type": "integer", "format": "int64"}
                            }
                        ],
                        "responses": {
                            "204": {
                                "description": "Book deleted"
                            },
                            "401": {
                                "description": "Missing or invalid bearer token",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            },
                            "404": {
                                "description": "Book not found",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Unique identifier assigned by the store"
                            },
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "publication_year": {
                                "type": "integer",
                                "description": "Year the book was published"
                            }
                        },
                        "required": ["id", "title", "author", "publication_year"]
                    },
                    "BookPayload": {
                        "type": "object",
                        "properties": {
                            "title": {
                                "type": "string",
                                "description": "Title of the book"
                            },
                            "author": {
                                "type": "string",
                                "description": "Author of the book"
                            },
                            "publication_year": {
                                "type": "integer",
                                "description": "Year the book was published"
                            }
                        },
                        "required": ["title", "author", "publication_year"]
                    }
                }
            }
        }))
    }

    async fn seed(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if !ctx.store.is_empty()? {
            tracing::info!(module = self.name(), "store already populated; skipping seed");
            return Ok(());
        }
        for book in sample_catalog() {
            let record = ctx.store.insert(book)?;
            tracing::info!(module = self.name(), id = record.id, title = %record.title, "seeded book");
        }
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// The sample catalog loaded by the seed hook and the `seed` CLI command.
pub fn sample_catalog() -> Vec<NewBook> {
    let books = [
        ("1984", "George Orwell", 1949),
        ("Animal Farm", "George Orwell", 1945),
        (
            "Harry Potter and the Philosopher's Stone",
            "J.K. Rowling",
            1997,
        ),
        ("The Hobbit", "J.R.R. Tolkien", 1937),
        ("To Kill a Mockingbird", "Harper Lee", 1960),
    ];
    books
        .into_iter()
        .map(|(title, author, publication_year)| NewBook {
            title: title.to_string(),
            author: author.to_string(),
            publication_year,
        })
        .collect()
}

fn authorize_write(access: &AccessControl, headers: &HeaderMap) -> Result<(), AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(shelf_authz::bearer_token);
    if access.may_write(bearer) {
        Ok(())
    } else {
        Err(AppError::unauthorized(
            "a valid bearer token is required for write operations",
        ))
    }
}

/// List books. Raw query params become a `QuerySpec`; the resolver applies
/// filter, search, and ordering over a store snapshot.
async fn list_books(
    State(state): State<BooksState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Vec<BookRecord>>, AppError> {
    // Reject a malformed year before resolution; inside the resolver a
    // non-numeric year would silently match nothing.
    if let Some(year) = params.get("publication_year") {
        if year.parse::<i32>().is_err() {
            return Err(AppError::bad_request(format!(
                "publication_year must be an integer, got '{year}'"
            )));
        }
    }

    let spec = QuerySpec::from_params(&params);
    let snapshot = state.store.snapshot()?;
    let books = resolve(&snapshot, &spec)?;
    Ok(Json(books))
}

/// Retrieve a single book by id.
async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<u64>,
) -> Result<Json<BookRecord>, AppError> {
    Ok(Json(state.store.get(id)?))
}

/// Create a book. Requires a valid bearer token.
async fn create_book(
    State(state): State<BooksState>,
    headers: HeaderMap,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<BookRecord>), AppError> {
    authorize_write(&state.access, &headers)?;
    let book = payload.validate()?;
    let record = state.store.insert(book)?;
    tracing::info!(id = record.id, title = %record.title, "book created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fully replace a book. Requires a valid bearer token.
async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<BookPayload>,
) -> Result<Json<BookRecord>, AppError> {
    authorize_write(&state.access, &headers)?;
    let book = payload.validate()?;
    let record = state.store.replace(id, book)?;
    tracing::info!(id = record.id, "book updated");
    Ok(Json(record))
}

/// Delete a book. Requires a valid bearer token.
async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    authorize_write(&state.access, &headers)?;
    state.store.remove(id)?;
    tracing::info!(id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create a new instance of the books module.
pub fn create_module(store: Arc<RecordStore>, access: Arc<AccessControl>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, access))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const TEST_TOKEN: &str = "test-token";

    fn test_router() -> (Router, Arc<RecordStore>) {
        let store = Arc::new(RecordStore::new());
        let access = Arc::new(AccessControl::new([TEST_TOKEN]));
        let module = BooksModule::new(store.clone(), access);
        (module.routes(), store)
    }

    fn seeded_router() -> (Router, Arc<RecordStore>) {
        let (router, store) = test_router();
        for book in sample_catalog() {
            store.insert(book).unwrap();
        }
        (router, store)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn write_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn list_returns_catalog_sorted_by_title() {
        let (router, _) = seeded_router();
        let response = router.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let titles: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["title"].as_str().unwrap())
            .collect();
        let mut sorted = titles.clone();
        sorted.sort();
        assert_eq!(titles, sorted);
        assert_eq!(titles.len(), 5);
    }

    #[tokio::test]
    async fn list_filters_by_author() {
        let (router, _) = seeded_router();
        let response = router
            .oneshot(get_request("/?author=George%20Orwell"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let books = body.as_array().unwrap();
        assert_eq!(books.len(), 2);
        assert!(books.iter().all(|b| b["author"] == "George Orwell"));
    }

    #[tokio::test]
    async fn list_searches_title_and_author_case_insensitively() {
        let (router, _) = seeded_router();
        let response = router.oneshot(get_request("/?search=orwell")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_with_empty_search_returns_nothing() {
        let (router, _) = seeded_router();
        let response = router.oneshot(get_request("/?search=")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_year_descending() {
        let (router, _) = seeded_router();
        let response = router
            .oneshot(get_request("/?ordering=-publication_year"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let years: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["publication_year"].as_i64().unwrap())
            .collect();
        let mut sorted = years.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(years, sorted);
    }

    #[tokio::test]
    async fn list_rejects_unknown_filter_field() {
        let (router, _) = seeded_router();
        let response = router.oneshot(get_request("/?isbn=123")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "invalid_field");
    }

    #[tokio::test]
    async fn list_rejects_unknown_ordering_field() {
        let (router, _) = seeded_router();
        let response = router
            .oneshot(get_request("/?ordering=nonexistent_field"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_rejects_non_integer_year_filter() {
        let (router, _) = seeded_router();
        let response = router
            .oneshot(get_request("/?publication_year=abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn detail_returns_the_record() {
        let (router, store) = test_router();
        let record = store
            .insert(NewBook {
                title: "The Hobbit".to_string(),
                author: "J.R.R. Tolkien".to_string(),
                publication_year: 1937,
            })
            .unwrap();

        let response = router
            .oneshot(get_request(&format!("/{}", record.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "The Hobbit");
    }

    #[tokio::test]
    async fn detail_of_missing_book_is_404() {
        let (router, _) = seeded_router();
        let response = router.oneshot(get_request("/9999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn create_requires_a_bearer_token() {
        let (router, store) = test_router();
        let response = router
            .oneshot(write_request(
                "POST",
                "/create",
                None,
                json!({"title": "New Book", "author": "New Author", "publication_year": 2020}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn create_with_token_returns_201() {
        let (router, store) = test_router();
        let response = router
            .oneshot(write_request(
                "POST",
                "/create",
                Some(TEST_TOKEN),
                json!({"title": "New Book", "author": "New Author", "publication_year": 2020}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["title"], "New Book");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn create_rejects_wrong_token() {
        let (router, _) = test_router();
        let response = router
            .oneshot(write_request(
                "POST",
                "/create",
                Some("wrong-token"),
                json!({"title": "New Book", "author": "New Author", "publication_year": 2020}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_invalid_payload_with_422() {
        let (router, _) = test_router();
        let response = router
            .oneshot(write_request(
                "POST",
                "/create",
                Some(TEST_TOKEN),
                json!({"title": "", "author": "Somebody", "publication_year": 2020}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn update_replaces_the_record() {
        let (router, store) = test_router();
        let record = store
            .insert(NewBook {
                title: "1984".to_string(),
                author: "George Orwell".to_string(),
                publication_year: 1949,
            })
            .unwrap();

        let response = router
            .oneshot(write_request(
                "PUT",
                &format!("/update/{}", record.id),
                Some(TEST_TOKEN),
                json!({"title": "Nineteen Eighty-Four", "author": "George Orwell", "publication_year": 1949}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.get(record.id).unwrap().title, "Nineteen Eighty-Four");
    }

    #[tokio::test]
    async fn update_of_missing_book_is_404() {
        let (router, _) = test_router();
        let response = router
            .oneshot(write_request(
                "PUT",
                "/update/42",
                Some(TEST_TOKEN),
                json!({"title": "Ghost", "author": "Nobody", "publication_year": 2000}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_returns_204_and_removes_the_record() {
        let (router, store) = test_router();
        let record = store
            .insert(NewBook {
                title: "1984".to_string(),
                author: "George Orwell".to_string(),
                publication_year: 1949,
            })
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/delete/{}", record.id))
                    .header(header::AUTHORIZATION, format!("Bearer {TEST_TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn delete_without_token_is_401() {
        let (router, store) = seeded_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/delete/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.len().unwrap(), 5);
    }

    #[tokio::test]
    async fn routes_accept_trailing_slash_paths() {
        let (router, store) = test_router();

        let response = router
            .clone()
            .oneshot(write_request(
                "POST",
                "/create/",
                Some(TEST_TOKEN),
                json!({"title": "1984", "author": "George Orwell", "publication_year": 1949}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_u64().unwrap();

        let response = router
            .clone()
            .oneshot(get_request(&format!("/{id}/")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(write_request(
                "PUT",
                &format!("/update/{id}/"),
                Some(TEST_TOKEN),
                json!({"title": "Nineteen Eighty-Four", "author": "George Orwell", "publication_year": 1949}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/delete/{id}/"))
                    .header(header::AUTHORIZATION, format!("Bearer {TEST_TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn combined_filter_search_and_ordering() {
        let (router, _) = seeded_router();
        let response = router
            .oneshot(get_request(
                "/?author=George%20Orwell&search=animal&ordering=publication_year",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let books = body.as_array().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["title"], "Animal Farm");
    }
}
