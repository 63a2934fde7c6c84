use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "../../frontend/"]
#[include = "*.html"]
#[include = "*.js"]
#[include = "*.css"]
pub struct FrontendAssets;

/// Serves the single-page dashboard.
pub async fn index() -> Response {
    match FrontendAssets::get("index.html") {
        Some(file) => Html(file.data.into_owned()).into_response(),
        None => (StatusCode::NOT_FOUND, "dashboard page not bundled").into_response(),
    }
}

/// Serves other bundled assets by path.
pub async fn asset(axum::extract::Path(path): axum::extract::Path<String>) -> Response {
    let Some(file) = FrontendAssets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let content_type = if path.ends_with(".js") {
        "application/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else {
        "text/html; charset=utf-8"
    };
    ([(header::CONTENT_TYPE, content_type)], file.data.into_owned()).into_response()
}
