//! 创意看板端点
//!
//! 每块看板对应一个表单的视图状态；生成调用期间不持有看板锁。

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::SubmitRequest;
use crate::services::{Admission, BoardView, Completion};
use crate::state::{AppState, SharedBoard};

/// 看板响应
#[derive(Serialize)]
pub struct BoardResponse {
    pub id: String,
    #[serde(flatten)]
    pub board: BoardView,
}

impl BoardResponse {
    fn new(id: impl Into<String>, board: BoardView) -> Json<Self> {
        Json(Self {
            id: id.into(),
            board,
        })
    }
}

fn find_board(state: &AppState, id: &str) -> AppResult<SharedBoard> {
    state
        .board(id)
        .ok_or_else(|| AppError::NotFound(format!("board {}", id)))
}

/// 新建看板
async fn create_board(State(state): State<Arc<AppState>>) -> Json<BoardResponse> {
    let (id, board) = state.create_board();
    info!("Board created: id={}", id);
    let view = board.lock().snapshot();
    BoardResponse::new(id, view)
}

/// 获取看板快照
async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BoardResponse>> {
    let board = find_board(&state, &id)?;
    let view = board.lock().snapshot();
    Ok(BoardResponse::new(id, view))
}

/// 提交新主题
async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> AppResult<Json<BoardResponse>> {
    let board = find_board(&state, &id)?;
    let admission = board.lock().begin_submit(&req.topic, req.difficulty);
    run_generation(&state, id, &board, admission).await
}

/// 加载更多
async fn load_more(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BoardResponse>> {
    let board = find_board(&state, &id)?;
    let admission = board.lock().begin_load_more();
    run_generation(&state, id, &board, admission).await
}

/// 重置看板
async fn reset_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BoardResponse>> {
    let board = find_board(&state, &id)?;
    let view = {
        let mut guard = board.lock();
        guard.reset();
        guard.snapshot()
    };
    Ok(BoardResponse::new(id, view))
}

/// 删除看板
async fn delete_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    if !state.remove_board(&id) {
        return Err(AppError::NotFound(format!("board {}", id)));
    }
    info!("Board removed: id={}", id);
    Ok(Json(json!({ "success": true })))
}

/// 执行一次生成并把结果写回看板
///
/// 生成失败不是 HTTP 错误：看板进入 failed 状态，快照里带错误消息
async fn run_generation(
    state: &AppState,
    id: String,
    board: &SharedBoard,
    admission: Admission,
) -> AppResult<Json<BoardResponse>> {
    let ticket = match admission {
        Admission::Admitted(ticket) => ticket,
        Admission::Ignored => {
            return Err(AppError::BadRequest("topic must not be empty".to_string()))
        }
        Admission::Busy => {
            return Err(AppError::Conflict(
                "a generation request is already in flight".to_string(),
            ))
        }
        Admission::NothingToExtend => {
            return Err(AppError::BadRequest(
                "submit a topic before loading more ideas".to_string(),
            ))
        }
    };

    info!(
        "Generation started: board={}, token={}, mode={:?}",
        id,
        ticket.token(),
        ticket.mode()
    );

    // 生成与写回在独立任务中完成：客户端断开导致处理器被丢弃时，看板仍会离开 pending
    let generator = Arc::clone(&state.generator);
    let board = Arc::clone(board);
    let board_id = id.clone();
    let view = tokio::spawn(async move {
        let token = ticket.token();
        let result = generator.generate(ticket.request()).await;

        let mut guard = board.lock();
        if guard.complete(ticket, result) == Completion::Stale {
            warn!("Discarding stale generation result: board={}, token={}", board_id, token);
        }
        guard.snapshot()
    })
    .await
    .map_err(|e| AppError::Internal(format!("generation task failed: {}", e)))?;

    Ok(BoardResponse::new(id, view))
}

/// 创建看板路由
pub fn board_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/boards", post(create_board))
        .route("/api/boards/:id", get(get_board).delete(delete_board))
        .route("/api/boards/:id/submit", post(submit))
        .route("/api/boards/:id/load-more", post(load_more))
        .route("/api/boards/:id/reset", post(reset_board))
}
