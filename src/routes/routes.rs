//! Defines routes for the inventory service.
//!
//! ## Structure
//! - **Item endpoints**
//!   - `POST   /register`              — register an item (multipart)
//!   - `GET    /inventory`             — list items
//!   - `GET    /inventory/{id}`        — fetch one item
//!   - `PUT    /inventory/{id}`        — update name/description (JSON)
//!   - `DELETE /inventory/{id}`        — delete item and its photo
//!
//! - **Photo endpoints**
//!   - `GET    /inventory/{id}/photo`  — raw JPEG bytes
//!   - `PUT    /inventory/{id}/photo`  — replace photo (multipart)
//!
//! - **Search**
//!   - `GET    /search`                — HTML fragment
//!   - `POST   /search`                — JSON
//!
//! Every other path or method answers 405.

use crate::{
    errors::AppError,
    handlers::{
        health_handlers::{healthz, readyz},
        inventory_handlers::{
            delete_item, get_item, get_photo, list_items, put_photo, register_item, update_item,
        },
        search_handlers::{search_item, search_page},
    },
    services::inventory_service::InventoryService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

/// Build the router carrying `InventoryService` as shared state.
///
/// `max_upload_bytes` caps request bodies, which matters for the multipart
/// photo uploads.
pub fn routes(max_upload_bytes: usize) -> Router<InventoryService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/register", post(register_item))
        .route("/inventory", get(list_items))
        .route(
            "/inventory/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/inventory/{id}/photo", get(get_photo).put(put_photo))
        .route("/search", get(search_page).post(search_item))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        json_store::JsonFileStore, photo_store::PhotoStore, sqlite_store::tests::memory_store,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "inventory-test-boundary";
    const LIMIT: usize = 10 * 1024 * 1024;

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"p.jpg\"\r\n\
                             Content-Type: image/jpeg\r\n\r\n",
                            name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart(method: Method, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn raw_json(method: Method, uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn empty(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_bytes(resp: Response) -> Vec<u8> {
        to_bytes(resp.into_body(), LIMIT).await.unwrap().to_vec()
    }

    async fn body_json(resp: Response) -> Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    async fn json_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileStore::open(dir.path().join("inventory.json"))
            .await
            .unwrap();
        let photos = PhotoStore::open(dir.path().join("uploads")).await.unwrap();
        let service = InventoryService::new(Arc::new(repo), photos);
        (dir, routes(LIMIT).with_state(service))
    }

    async fn sqlite_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let photos = PhotoStore::open(dir.path().join("uploads")).await.unwrap();
        let service = InventoryService::new(Arc::new(memory_store().await), photos);
        (dir, routes(LIMIT).with_state(service))
    }

    async fn register(app: &Router, parts: &[Part<'_>]) -> Value {
        let resp = app
            .clone()
            .oneshot(multipart(Method::POST, "/register", parts))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn lamp_lifecycle() {
        let (_dir, app) = json_app().await;
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Lamp"),
                Part::Text("description", "desk lamp"),
            ],
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(created["name"], "Lamp");
        assert_eq!(created["description"], "desk lamp");
        assert_eq!(created["photo"], Value::Null);

        let resp = send(
            &app,
            json_req(
                Method::PUT,
                &format!("/inventory/{}", id),
                json!({ "description": "small desk lamp" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["name"], "Lamp");
        assert_eq!(updated["description"], "small desk lamp");

        let resp = send(&app, empty(Method::DELETE, &format!("/inventory/{}", id))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, empty(Method::GET, &format!("/inventory/{}", id))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, empty(Method::GET, "/inventory")).await;
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn register_blank_name_is_rejected() {
        let (_dir, app) = json_app().await;
        for name in ["", "   "] {
            let resp = send(
                &app,
                multipart(
                    Method::POST,
                    "/register",
                    &[
                        Part::Text("inventory_name", name),
                        Part::File("photo", b"jpeg"),
                    ],
                ),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        let resp = send(
            &app,
            multipart(Method::POST, "/register", &[Part::Text("description", "x")]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&app, empty(Method::GET, "/inventory")).await;
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn get_returns_trimmed_name_and_default_description() {
        let (_dir, app) = json_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "  Chair ")]).await;
        let id = created["id"].as_str().unwrap();

        let resp = send(&app, empty(Method::GET, &format!("/inventory/{}", id))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({ "id": id, "name": "Chair", "description": "", "photo": null })
        );
    }

    #[tokio::test]
    async fn photo_round_trip_and_replacement() {
        let (dir, app) = json_app().await;
        let original: &[u8] = b"\xff\xd8\xff\xe0original\x00bytes";
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Camera"),
                Part::File("photo", original),
            ],
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(
            created["photo"].as_str().unwrap(),
            format!("/inventory/{}/photo", id)
        );

        let photo_uri = format!("/inventory/{}/photo", id);
        let resp = send(&app, empty(Method::GET, &photo_uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(body_bytes(resp).await, original);

        let replacement: &[u8] = b"\xff\xd8replacement";
        let resp = send(
            &app,
            multipart(Method::PUT, &photo_uri, &[Part::File("photo", replacement)]),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, empty(Method::GET, &photo_uri)).await;
        assert_eq!(body_bytes(resp).await, replacement);

        let mut uploads = tokio::fs::read_dir(dir.path().join("uploads")).await.unwrap();
        let mut count = 0;
        while uploads.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1, "old photo file must be gone");
    }

    #[tokio::test]
    async fn photo_missing_cases_are_404() {
        let (_dir, app) = json_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let id = created["id"].as_str().unwrap();

        let resp = send(&app, empty(Method::GET, &format!("/inventory/{}/photo", id))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, empty(Method::GET, "/inventory/unknown/photo")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(
            &app,
            multipart(
                Method::PUT,
                "/inventory/unknown/photo",
                &[Part::File("photo", b"x")],
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_photo_file() {
        let (dir, app) = json_app().await;
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Camera"),
                Part::File("photo", b"jpeg"),
            ],
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = send(&app, empty(Method::DELETE, &format!("/inventory/{}", id))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let mut uploads = tokio::fs::read_dir(dir.path().join("uploads")).await.unwrap();
        assert!(uploads.next_entry().await.unwrap().is_none());

        let resp = send(&app, empty(Method::DELETE, &format!("/inventory/{}", id))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn partial_updates_keep_other_field() {
        let (_dir, app) = sqlite_app().await;
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Lamp"),
                Part::Text("description", "desk lamp"),
            ],
        )
        .await;
        let uri = format!("/inventory/{}", created["id"].as_str().unwrap());

        let resp = send(&app, json_req(Method::PUT, &uri, json!({ "name": "Lantern" }))).await;
        let body = body_json(resp).await;
        assert_eq!(body["name"], "Lantern");
        assert_eq!(body["description"], "desk lamp");

        let resp = send(
            &app,
            json_req(Method::PUT, &uri, json!({ "name": "", "description": "old" })),
        )
        .await;
        let body = body_json(resp).await;
        assert_eq!(body["name"], "Lantern");
        assert_eq!(body["description"], "old");
    }

    #[tokio::test]
    async fn empty_update_is_noop_on_json_backend() {
        let (_dir, app) = json_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let uri = format!("/inventory/{}", created["id"].as_str().unwrap());

        let resp = send(
            &app,
            json_req(Method::PUT, &uri, json!({ "name": "", "description": "" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, created);

        let resp = send(&app, json_req(Method::PUT, "/inventory/nope", json!({}))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_update_is_rejected_on_sqlite_backend() {
        let (_dir, app) = sqlite_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let uri = format!("/inventory/{}", created["id"].as_str().unwrap());

        let resp = send(&app, json_req(Method::PUT, &uri, json!({}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "nothing to update");

        let resp = send(
            &app,
            json_req(Method::PUT, "/inventory/nope", json!({ "name": "X" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_without_body_is_an_empty_patch() {
        let (_dir, app) = json_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let uri = format!("/inventory/{}", created["id"].as_str().unwrap());

        let resp = send(&app, empty(Method::PUT, &uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, created);

        let resp = send(&app, empty(Method::PUT, "/inventory/ghost")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await,
            json!({ "error": "item not found", "status": 404 })
        );

        let resp = send(&app, raw_json(Method::PUT, "/inventory/ghost", "  ")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_json_bodies_are_400() {
        let (_dir, app) = json_app().await;
        let created = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let uri = format!("/inventory/{}", created["id"].as_str().unwrap());

        let cases = [
            json_req(Method::PUT, &uri, json!({ "name": 5 })),
            json_req(Method::PUT, &uri, json!({ "description": ["a"] })),
            raw_json(Method::PUT, &uri, "{ not json"),
            json_req(Method::POST, "/search", json!({ "id": 42 })),
            raw_json(Method::POST, "/search", "{ not json"),
            empty(Method::POST, "/search"),
        ];
        for req in cases {
            let label = format!("{} {}", req.method(), req.uri());
            let resp = send(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", label);
            assert_eq!(
                body_json(resp).await,
                json!({ "error": "invalid JSON body", "status": 400 }),
                "{}",
                label
            );
        }

        let resp = send(&app, empty(Method::GET, &uri)).await;
        assert_eq!(body_json(resp).await, created);
    }

    #[tokio::test]
    async fn list_uses_host_header_for_photo_urls() {
        let (_dir, app) = sqlite_app().await;
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Camera"),
                Part::File("photo", b"jpeg"),
            ],
        )
        .await;
        register(&app, &[Part::Text("inventory_name", "Lamp")]).await;

        let req = Request::builder()
            .uri("/inventory")
            .header(header::HOST, "inventory.local:8080")
            .body(Body::empty())
            .unwrap();
        let items = body_json(send(&app, req).await).await;
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0]["photo"],
            format!(
                "http://inventory.local:8080/inventory/{}/photo",
                created["id"].as_str().unwrap()
            )
        );
        assert_eq!(items[1]["photo"], Value::Null);
    }

    #[tokio::test]
    async fn search_page_renders_found_and_missing() {
        let (_dir, app) = json_app().await;
        let created = register(
            &app,
            &[
                Part::Text("inventory_name", "Lamp"),
                Part::Text("description", "desk lamp"),
            ],
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = send(
            &app,
            empty(Method::GET, &format!("/search?id={}&includePhoto=on", id)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("<b>Name:</b> Lamp"));
        assert!(html.contains("<b>Photo:</b> none"));

        let resp = send(&app, empty(Method::GET, &format!("/search?id={}", id))).await;
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(!html.contains("Photo:"));

        let resp = send(&app, empty(Method::GET, "/search?id=ghost")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(html.contains("Item not found"));
    }

    #[tokio::test]
    async fn search_json_augments_description_only_in_response() {
        let (_dir, app) = json_app().await;
        let with_photo = register(
            &app,
            &[
                Part::Text("inventory_name", "Camera"),
                Part::Text("description", "mirrorless"),
                Part::File("photo", b"jpeg"),
            ],
        )
        .await;
        let id = with_photo["id"].as_str().unwrap();

        let resp = send(
            &app,
            json_req(Method::POST, "/search", json!({ "id": id, "has_photo": true })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({
                "id": id,
                "name": "Camera",
                "description": format!("mirrorless (photo: /inventory/{}/photo)", id),
            })
        );

        let resp = send(&app, empty(Method::GET, &format!("/inventory/{}", id))).await;
        assert_eq!(body_json(resp).await["description"], "mirrorless");

        let plain = register(&app, &[Part::Text("inventory_name", "Lamp")]).await;
        let resp = send(
            &app,
            json_req(
                Method::POST,
                "/search",
                json!({ "id": plain["id"], "has_photo": "on" }),
            ),
        )
        .await;
        assert_eq!(body_json(resp).await["description"], " (photo: none)");

        let resp = send(
            &app,
            json_req(Method::POST, "/search", json!({ "id": "ghost" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn undefined_routes_and_methods_are_405() {
        let (_dir, app) = json_app().await;
        let cases = [
            (Method::GET, "/"),
            (Method::GET, "/register"),
            (Method::POST, "/inventory"),
            (Method::DELETE, "/inventory"),
            (Method::POST, "/inventory/abc"),
            (Method::DELETE, "/inventory/abc/photo"),
            (Method::PUT, "/search"),
            (Method::GET, "/inventory/abc/photo/extra"),
            (Method::PATCH, "/nowhere"),
        ];
        for (method, uri) in cases {
            let resp = send(&app, empty(method.clone(), uri)).await;
            assert_eq!(
                resp.status(),
                StatusCode::METHOD_NOT_ALLOWED,
                "{} {}",
                method,
                uri
            );
        }
        let resp = send(&app, empty(Method::GET, "/nowhere")).await;
        assert_eq!(
            body_json(resp).await,
            json!({ "error": "method not allowed", "status": 405 })
        );
    }

    #[tokio::test]
    async fn health_endpoints() {
        let (_dir, app) = sqlite_app().await;
        let resp = send(&app, empty(Method::GET, "/healthz")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, empty(Method::GET, "/readyz")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["sqlite"]["ok"], true);
        assert_eq!(body["checks"]["photos"]["ok"], true);
    }

    #[tokio::test]
    async fn readiness_failure_hides_backend_error() {
        let (dir, app) = json_app().await;
        tokio::fs::write(dir.path().join("inventory.json"), b"{ not json")
            .await
            .unwrap();

        let resp = send(&app, empty(Method::GET, "/readyz")).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["checks"]["json"],
            json!({ "ok": false, "error": "unavailable" })
        );
        assert_eq!(body["checks"]["photos"]["ok"], true);
    }
}
