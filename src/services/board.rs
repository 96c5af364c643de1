//! 创意看板状态机
//!
//! 每个表单一块看板：`Idle -> Pending(token) -> Succeeded | Failed`。
//! 同一时间最多一个请求在途；完成结果只有在令牌与当前在途请求一致时才会生效，
//! 过期的响应直接丢弃。

use serde::Serialize;

use super::idea_service::GenerationError;
use crate::models::{Difficulty, Idea, IdeaRequest};

/// 提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// 新主题：成功时整体替换
    Fresh,
    /// 加载更多：成功时追加
    LoadMore,
}

/// 看板状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardStatus {
    Idle,
    Pending { token: u64, mode: SubmitMode },
    Succeeded,
    Failed { message: String },
}

impl BoardStatus {
    fn name(&self) -> &'static str {
        match self {
            BoardStatus::Idle => "idle",
            BoardStatus::Pending { .. } => "pending",
            BoardStatus::Succeeded => "succeeded",
            BoardStatus::Failed { .. } => "failed",
        }
    }
}

/// 在途请求凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    token: u64,
    mode: SubmitMode,
    request: IdeaRequest,
}

impl Ticket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn mode(&self) -> SubmitMode {
        self.mode
    }

    pub fn request(&self) -> &IdeaRequest {
        &self.request
    }
}

/// 提交结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// 已进入 Pending，调用方需发出生成请求
    Admitted(Ticket),
    /// 主题为空，什么都不做
    Ignored,
    /// 已有请求在途，拒绝
    Busy,
    /// 没有可以继续加载的主题
    NothingToExtend,
}

/// 完成结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// 看板快照（返回给前端）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub status: &'static str,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_topic: Option<String>,
    pub difficulty: Difficulty,
    pub ideas: Vec<Idea>,
}

/// 创意看板
#[derive(Debug, Clone)]
pub struct IdeaBoard {
    ideas: Vec<Idea>,
    active_topic: Option<String>,
    difficulty: Difficulty,
    status: BoardStatus,
    next_token: u64,
}

impl IdeaBoard {
    pub fn new() -> Self {
        Self {
            ideas: Vec::new(),
            active_topic: None,
            difficulty: Difficulty::default(),
            status: BoardStatus::Idle,
            next_token: 1,
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> &BoardStatus {
        &self.status
    }

    #[cfg(test)]
    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    #[cfg(test)]
    pub fn active_topic(&self) -> Option<&str> {
        self.active_topic.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, BoardStatus::Pending { .. })
    }

    /// 新主题提交
    pub fn begin_submit(&mut self, topic: &str, difficulty: Difficulty) -> Admission {
        let Some(request) = IdeaRequest::new(topic, difficulty) else {
            return Admission::Ignored;
        };
        if self.is_loading() {
            return Admission::Busy;
        }

        self.ideas.clear();
        self.difficulty = difficulty;
        Admission::Admitted(self.enter_pending(SubmitMode::Fresh, request))
    }

    /// 加载更多：沿用当前主题，排除已展示的标题
    pub fn begin_load_more(&mut self) -> Admission {
        if self.is_loading() {
            return Admission::Busy;
        }
        let Some(request) = self
            .active_topic
            .as_deref()
            .and_then(|topic| IdeaRequest::new(topic, self.difficulty))
        else {
            return Admission::NothingToExtend;
        };

        let request = request.with_exclusions(self.ideas.iter().map(|i| i.title.as_str()));
        Admission::Admitted(self.enter_pending(SubmitMode::LoadMore, request))
    }

    fn enter_pending(&mut self, mode: SubmitMode, request: IdeaRequest) -> Ticket {
        let token = self.next_token;
        self.next_token += 1;
        self.status = BoardStatus::Pending { token, mode };
        Ticket {
            token,
            mode,
            request,
        }
    }

    /// 应用生成结果
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Idea>, GenerationError>,
    ) -> Completion {
        match self.status {
            BoardStatus::Pending { token, .. } if token == ticket.token => {}
            _ => return Completion::Stale,
        }

        self.status = match (ticket.mode, result) {
            (SubmitMode::Fresh, Ok(ideas)) => {
                self.ideas = ideas;
                self.active_topic = Some(ticket.request.topic().to_string());
                BoardStatus::Succeeded
            }
            (SubmitMode::LoadMore, Ok(ideas)) => {
                self.ideas.extend(ideas);
                BoardStatus::Succeeded
            }
            (SubmitMode::Fresh, Err(e)) => {
                self.ideas.clear();
                self.active_topic = None;
                BoardStatus::Failed {
                    message: e.to_string(),
                }
            }
            (SubmitMode::LoadMore, Err(e)) => BoardStatus::Failed {
                message: e.to_string(),
            },
        };
        Completion::Applied
    }

    /// 回到初始状态；在途请求的结果将被丢弃
    pub fn reset(&mut self) {
        self.ideas.clear();
        self.active_topic = None;
        self.status = BoardStatus::Idle;
    }

    pub fn snapshot(&self) -> BoardView {
        BoardView {
            status: self.status.name(),
            is_loading: self.is_loading(),
            error: match &self.status {
                BoardStatus::Failed { message } => Some(message.clone()),
                _ => None,
            },
            active_topic: self.active_topic.clone(),
            difficulty: self.difficulty,
            ideas: self.ideas.clone(),
        }
    }
}

impl Default for IdeaBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::idea_service::GENERATION_FAILURE_MESSAGE;

    fn idea(title: &str, difficulty: Difficulty) -> Idea {
        Idea {
            title: title.to_string(),
            description: format!("{} description", title),
            tags: vec!["Rust".to_string()],
            steps: vec!["Start".to_string()],
            difficulty,
            code_sample: None,
        }
    }

    fn batch(titles: &[&str]) -> Vec<Idea> {
        titles.iter().map(|t| idea(t, Difficulty::Beginner)).collect()
    }

    fn admitted(admission: Admission) -> Ticket {
        match admission {
            Admission::Admitted(ticket) => ticket,
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_topic_is_noop() {
        let mut board = IdeaBoard::new();
        assert_eq!(board.begin_submit("   ", Difficulty::Beginner), Admission::Ignored);
        assert_eq!(board.status(), &BoardStatus::Idle);
        assert!(!board.is_loading());
    }

    #[test]
    fn test_second_submit_rejected_while_pending() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("robots", Difficulty::Advanced));
        assert!(board.is_loading());

        assert_eq!(board.begin_submit("drones", Difficulty::Advanced), Admission::Busy);
        assert_eq!(board.begin_load_more(), Admission::Busy);

        assert_eq!(board.complete(ticket, Ok(batch(&["A"]))), Completion::Applied);
        assert!(!board.is_loading());
        assert!(matches!(board.begin_submit("drones", Difficulty::Advanced), Admission::Admitted(_)));
    }

    #[test]
    fn test_gardener_scenario_fresh_then_load_more() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("a mobile app for gardeners", Difficulty::Beginner));
        assert_eq!(ticket.mode(), SubmitMode::Fresh);
        assert_eq!(ticket.request().topic(), "a mobile app for gardeners");
        assert!(ticket.request().exclude_titles().is_empty());

        let first = batch(&["Plant Care Tracker", "Garden Planner", "Harvest Log"]);
        board.complete(ticket, Ok(first));
        let view = board.snapshot();
        assert_eq!(view.status, "succeeded");
        assert_eq!(view.ideas.len(), 3);
        assert!(view.ideas.iter().all(|i| i.difficulty == Difficulty::Beginner));

        let ticket = admitted(board.begin_load_more());
        assert_eq!(ticket.mode(), SubmitMode::LoadMore);
        assert_eq!(ticket.request().difficulty(), Difficulty::Beginner);
        assert!(ticket
            .request()
            .exclude_titles()
            .contains(&"Plant Care Tracker".to_string()));
        // 加载期间保留已有创意
        assert_eq!(board.ideas().len(), 3);

        board.complete(ticket, Ok(batch(&["Seed Swap", "Compost Timer", "Pest Guide"])));
        assert_eq!(board.ideas().len(), 6);
        assert_eq!(board.ideas()[0].title, "Plant Care Tracker");
        assert_eq!(board.ideas()[5].title, "Pest Guide");
        assert_eq!(board.active_topic(), Some("a mobile app for gardeners"));
    }

    #[test]
    fn test_fresh_submit_replaces_previous_ideas() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("games", Difficulty::Beginner));
        board.complete(ticket, Ok(batch(&["A", "B", "C"])));

        let ticket = admitted(board.begin_submit("music", Difficulty::Intermediate));
        assert!(board.ideas().is_empty());
        board.complete(ticket, Ok(batch(&["D"])));

        assert_eq!(board.ideas().len(), 1);
        assert_eq!(board.active_topic(), Some("music"));
        assert_eq!(board.snapshot().difficulty, Difficulty::Intermediate);
    }

    #[test]
    fn test_fresh_failure_clears_ideas() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("games", Difficulty::Beginner));
        board.complete(ticket, Ok(batch(&["A", "B", "C"])));

        let ticket = admitted(board.begin_submit("music", Difficulty::Beginner));
        board.complete(ticket, Err(GenerationError::Failure));

        let view = board.snapshot();
        assert_eq!(view.status, "failed");
        assert!(!view.is_loading);
        assert!(view.ideas.is_empty());
        assert_eq!(view.error.as_deref(), Some(GENERATION_FAILURE_MESSAGE));
        assert_eq!(board.begin_load_more(), Admission::NothingToExtend);
    }

    #[test]
    fn test_load_more_failure_keeps_ideas() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("games", Difficulty::Beginner));
        board.complete(ticket, Ok(batch(&["A", "B", "C"])));

        let ticket = admitted(board.begin_load_more());
        board.complete(ticket, Err(GenerationError::Failure));

        let view = board.snapshot();
        assert_eq!(view.status, "failed");
        assert!(!view.is_loading);
        assert_eq!(view.ideas.len(), 3);
        assert_eq!(view.active_topic.as_deref(), Some("games"));

        // 失败后可以重试
        assert!(matches!(board.begin_load_more(), Admission::Admitted(_)));
    }

    #[test]
    fn test_load_more_requires_active_topic() {
        let mut board = IdeaBoard::new();
        assert_eq!(board.begin_load_more(), Admission::NothingToExtend);
        assert_eq!(board.status(), &BoardStatus::Idle);
    }

    #[test]
    fn test_stale_ticket_after_reset_is_ignored() {
        let mut board = IdeaBoard::new();
        let stale = admitted(board.begin_submit("games", Difficulty::Beginner));
        board.reset();

        let current = admitted(board.begin_submit("music", Difficulty::Beginner));
        assert!(current.token() > stale.token());

        assert_eq!(board.complete(stale, Ok(batch(&["Old"]))), Completion::Stale);
        assert!(board.is_loading());
        assert!(board.ideas().is_empty());

        assert_eq!(board.complete(current, Ok(batch(&["New"]))), Completion::Applied);
        assert_eq!(board.ideas()[0].title, "New");
    }

    #[test]
    fn test_completion_without_pending_is_stale() {
        let mut board = IdeaBoard::new();
        let ticket = admitted(board.begin_submit("games", Difficulty::Beginner));
        let duplicate = ticket.clone();
        assert_eq!(board.complete(ticket, Ok(batch(&["A"]))), Completion::Applied);
        assert_eq!(board.complete(duplicate, Ok(batch(&["B"]))), Completion::Stale);
        assert_eq!(board.ideas().len(), 1);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut board = IdeaBoard::new();
        admitted(board.begin_submit("games", Difficulty::Advanced));
        let value = serde_json::to_value(board.snapshot()).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["isLoading"], true);
        assert_eq!(value["difficulty"], "Advanced");
        assert!(value.get("error").is_none());
    }
}
