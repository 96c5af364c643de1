//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::services::{IdeaBoard, IdeaGenerator};

/// 共享看板
pub type SharedBoard = Arc<Mutex<IdeaBoard>>;

/// 默认空闲回收时间
pub const DEFAULT_BOARD_TTL: Duration = Duration::from_secs(30 * 60);

/// 默认看板上限
pub const DEFAULT_MAX_BOARDS: usize = 1000;

/// 注册表条目：看板及其最近访问时间
pub struct BoardEntry {
    board: SharedBoard,
    last_touched: Mutex<Instant>,
}

impl BoardEntry {
    fn new(board: SharedBoard) -> Self {
        Self {
            board,
            last_touched: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_touched.lock() = Instant::now();
    }

    fn last_touched(&self) -> Instant {
        *self.last_touched.lock()
    }

    fn is_loading(&self) -> bool {
        self.board.lock().is_loading()
    }
}

/// 看板注册表
pub type BoardRegistry = DashMap<String, BoardEntry>;

/// 应用共享状态
///
/// 生成器在启动时创建一次并注入；看板只在状态转换时加锁，不跨越 await
pub struct AppState {
    /// 创意生成器
    pub generator: Arc<IdeaGenerator>,
    /// 看板注册表
    pub boards: BoardRegistry,
    board_ttl: Duration,
    max_boards: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(generator: IdeaGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            boards: DashMap::new(),
            board_ttl: DEFAULT_BOARD_TTL,
            max_boards: DEFAULT_MAX_BOARDS,
        }
    }

    /// 设置看板回收策略
    pub fn with_board_limits(mut self, ttl: Duration, max_boards: usize) -> Self {
        self.board_ttl = ttl;
        self.max_boards = max_boards.max(1);
        self
    }

    /// 新建看板，返回其 ID
    ///
    /// 插入前先回收空闲看板，注册表满时淘汰最久未访问的看板
    pub fn create_board(&self) -> (String, SharedBoard) {
        self.evict_idle();
        self.evict_to_fit(self.max_boards - 1);

        let id = Uuid::new_v4().to_string();
        let board = Arc::new(Mutex::new(IdeaBoard::new()));
        self.boards.insert(id.clone(), BoardEntry::new(Arc::clone(&board)));
        (id, board)
    }

    /// 查找看板并刷新访问时间
    pub fn board(&self, id: &str) -> Option<SharedBoard> {
        self.boards.get(id).map(|entry| {
            entry.touch();
            Arc::clone(&entry.board)
        })
    }

    /// 删除看板
    pub fn remove_board(&self, id: &str) -> bool {
        self.boards.remove(id).is_some()
    }

    /// 回收空闲超时的看板，生成中的看板保留
    pub fn evict_idle(&self) -> usize {
        let before = self.boards.len();
        let ttl = self.board_ttl;
        self.boards
            .retain(|_, entry| entry.is_loading() || entry.last_touched().elapsed() < ttl);
        let evicted = before.saturating_sub(self.boards.len());
        if evicted > 0 {
            info!("Evicted {} idle boards ({} remaining)", evicted, self.boards.len());
        }
        evicted
    }

    /// 淘汰最久未访问的看板，直到数量不超过 limit
    fn evict_to_fit(&self, limit: usize) {
        let excess = self.boards.len().saturating_sub(limit);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(String, Instant)> = self
            .boards
            .iter()
            .filter(|entry| !entry.is_loading())
            .map(|entry| (entry.key().clone(), entry.last_touched()))
            .collect();
        candidates.sort_by_key(|(_, touched)| *touched);

        let evicted = candidates
            .into_iter()
            .take(excess)
            .filter(|(id, _)| self.boards.remove(id).is_some())
            .count();
        info!("Board registry full, evicted {} least recently used", evicted);
    }
}

/// 创建可共享的应用状态
pub fn create_shared_state(
    generator: IdeaGenerator,
    board_ttl: Duration,
    max_boards: usize,
) -> Arc<AppState> {
    Arc::new(AppState::new(generator).with_board_limits(board_ttl, max_boards))
}

/// 后台定期回收空闲看板
pub fn spawn_board_sweeper(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.evict_idle();
        }
    })
}
