//! API 路由模块

mod boards;
mod health;
mod ideas;
mod page;

pub use boards::board_routes;
pub use health::health_routes;
pub use ideas::idea_routes;
pub use page::page_routes;

use axum::Router;

use crate::state::AppState;
use std::sync::Arc;

/// 创建所有 API 路由
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(page_routes())
        .merge(health_routes())
        .merge(idea_routes())
        .merge(board_routes())
        .with_state(state)
}
