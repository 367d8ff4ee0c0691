//! Exact-id lookup, rendered either as an HTML fragment (`GET /search`, the
//! browser form) or as JSON (`POST /search`).

use crate::{
    errors::AppError,
    handlers::inventory_handlers::request_base,
    models::item::{Item, photo_url},
    services::inventory_service::InventoryService,
};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::HeaderMap,
    response::Html,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Query string of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub id: Option<String>,
    /// Checkbox value; only `on` enables the photo.
    #[serde(rename = "includePhoto")]
    pub include_photo: Option<String>,
}

/// JSON body of `POST /search`.
#[derive(Debug, Deserialize)]
pub struct SearchReq {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub has_photo: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Accept `true`/`false`, form-style strings (`on`, `true`, `1`) or numbers.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(s)) => matches!(s.trim(), "on" | "true" | "1"),
        None => false,
    })
}

/// `GET /search?id=&includePhoto=on` — always 200; a miss renders a
/// "not found" fragment.
pub async fn search_page(
    State(service): State<InventoryService>,
    headers: HeaderMap,
    Query(q): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let include_photo = q.include_photo.as_deref() == Some("on");
    let item = service.find(q.id.as_deref()).await?;
    Ok(Html(match item {
        Some(item) => render_result(&item, include_photo, &request_base(&headers)),
        None => "<h3>Item not found</h3>".to_string(),
    }))
}

/// `POST /search` — JSON lookup. With `has_photo` the description of the
/// response (not the stored record) gets a note on where the photo lives.
pub async fn search_item(
    State(service): State<InventoryService>,
    headers: HeaderMap,
    body: Result<Json<SearchReq>, JsonRejection>,
) -> Result<Json<SearchResult>, AppError> {
    let Json(req) = body?;
    let item = service
        .find(req.id.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("item not found"))?;

    let mut description = item.description;
    if req.has_photo {
        let location = match item.photo_path {
            Some(_) => photo_url(&request_base(&headers), &item.id),
            None => "none".to_string(),
        };
        description.push_str(&format!(" (photo: {})", location));
    }

    Ok(Json(SearchResult {
        id: item.id,
        name: item.name,
        description,
    }))
}

fn render_result(item: &Item, include_photo: bool, base: &str) -> String {
    let mut html = String::from("<h2>Search result</h2>");
    html.push_str(&format!("<p><b>ID:</b> {}</p>", html_escape(&item.id)));
    html.push_str(&format!("<p><b>Name:</b> {}</p>", html_escape(&item.name)));
    html.push_str(&format!(
        "<p><b>Description:</b> {}</p>",
        html_escape(&item.description)
    ));

    if include_photo {
        match item.photo_path {
            Some(_) => html.push_str(&format!(
                r#"<p><img src="{}" width="200"></p>"#,
                html_escape(&photo_url(base, &item.id))
            )),
            None => html.push_str("<p><b>Photo:</b> none</p>"),
        }
    }
    html
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
