//! 前端页面

use axum::{response::Html, routing::get, Router};

use crate::state::AppState;
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("../../static/index.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn page_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(index))
}
