//! HTTP handlers for item registration, CRUD and photo delivery.
//! Photo bodies are streamed from disk; storage concerns live in
//! `InventoryService`.

use crate::{
    errors::AppError,
    models::item::{ItemPatch, ItemView},
    services::inventory_service::{InventoryService, NewItem},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Fields collected from a `multipart/form-data` upload.
#[derive(Debug, Default)]
struct UploadForm {
    inventory_name: Option<String>,
    description: Option<String>,
    photo: Option<Bytes>,
}

/// JSON body of `PUT /inventory/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemReq {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Scheme+host prefix for synthesized photo URLs, taken from the `Host`
/// header. Empty (relative URLs) when the request has none.
pub(crate) fn request_base(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_default()
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("inventory_name") => form.inventory_name = Some(field.text().await?),
            Some("description") => form.description = Some(field.text().await?),
            Some("photo") => form.photo = Some(field.bytes().await?),
            other => debug!("ignoring multipart field {:?}", other),
        }
    }
    Ok(form)
}

/// `POST /register` — multipart `inventory_name`, `description`, `photo`.
pub async fn register_item(
    State(service): State<InventoryService>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_upload(multipart).await?;
    let item = service
        .register(NewItem {
            name: form.inventory_name,
            description: form.description,
            photo: form.photo,
        })
        .await?;

    let view = ItemView::from_item(item, &request_base(&headers));
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /inventory`
pub async fn list_items(
    State(service): State<InventoryService>,
    headers: HeaderMap,
) -> Result<Json<Vec<ItemView>>, AppError> {
    let base = request_base(&headers);
    let items = service.list().await?;
    Ok(Json(
        items
            .into_iter()
            .map(|item| ItemView::from_item(item, &base))
            .collect(),
    ))
}

/// `GET /inventory/{id}`
pub async fn get_item(
    State(service): State<InventoryService>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ItemView>, AppError> {
    let item = service.get(&id).await?;
    Ok(Json(ItemView::from_item(item, &request_base(&headers))))
}

/// `PUT /inventory/{id}` — JSON `{name?, description?}`; absent or empty
/// fields are left unchanged. An empty body is an empty patch.
pub async fn update_item(
    State(service): State<InventoryService>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ItemView>, AppError> {
    let patch = if body.trim_ascii().is_empty() {
        ItemPatch::default()
    } else {
        let Json(req) = Json::<UpdateItemReq>::from_bytes(&body)?;
        ItemPatch::from_input(req.name, req.description)
    };
    let item = service.update(&id, patch).await?;
    Ok(Json(ItemView::from_item(item, &request_base(&headers))))
}

/// `DELETE /inventory/{id}`
pub async fn delete_item(
    State(service): State<InventoryService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete(&id).await?;
    Ok(Json(json!({ "message": "item deleted", "id": id })))
}

/// `GET /inventory/{id}/photo` — raw JPEG bytes as a streaming response.
pub async fn get_photo(
    State(service): State<InventoryService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let file = service.open_photo(&id).await?;
    let len = file
        .metadata()
        .await
        .map(|meta| meta.len())
        .map_err(|err| {
            tracing::error!("could not stat photo of item {}: {}", id, err);
            AppError::internal("could not read photo")
        })?;

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    Ok(response)
}

/// `PUT /inventory/{id}/photo` — multipart `photo`.
pub async fn put_photo(
    State(service): State<InventoryService>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<ItemView>, AppError> {
    let form = read_upload(multipart).await?;
    let item = service.replace_photo(&id, form.photo).await?;
    Ok(Json(ItemView::from_item(item, &request_base(&headers))))
}
