//! 创意生成服务
//!
//! 封装 LlmClient：构建提示词、声明输出结构、发出单次调用、解析并校验结果。
//! 所有失败都在这里收敛为 `GenerationError`，根因只写日志。

use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::idea_schema::{idea_schema, IDEA_SCHEMA_NAME};
use super::prompt_service::PromptService;
use crate::llm::{
    detect_api_format, GenerationOptions, LlmClient, LlmError, SchemaNode, StructuredRequest,
};
use crate::models::{Difficulty, Idea, IdeaRequest, UnknownDifficulty};
use crate::utils::request_logger::{Failure, LogEntry, RequestContext, RequestLogger};

/// 生成失败时展示给用户的消息
pub const GENERATION_FAILURE_MESSAGE: &str = "Could not generate ideas. Please try again.";

/// 校验失败时展示给用户的消息
pub const VALIDATION_FAILURE_MESSAGE: &str =
    "The generated ideas were incomplete. Please try again.";

/// 创意生成错误
///
/// Display 只输出面向用户的通用消息
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// 网络、非 2xx、空响应、JSON 语法或缺少必需字段
    #[error("{}", GENERATION_FAILURE_MESSAGE)]
    Failure,

    /// 结构可解析但违反校验规则
    #[error("{}", VALIDATION_FAILURE_MESSAGE)]
    Validation,
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Failure => "generation_failure",
            GenerationError::Validation => "validation_error",
        }
    }
}

/// 解析阶段错误（内部使用，携带根因）
#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("idea #{index}: {reason}")]
    Invalid { index: usize, reason: String },
}

impl ParseError {
    fn kind(&self) -> &'static str {
        match self {
            ParseError::Malformed(_) => "parse",
            ParseError::Invalid { .. } => "validation",
        }
    }
}

impl From<ParseError> for GenerationError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Malformed(_) => GenerationError::Failure,
            ParseError::Invalid { .. } => GenerationError::Validation,
        }
    }
}

/// 模型返回的原始创意
///
/// 必需字段缺失由反序列化直接拒绝；难度先按字符串接收再校验
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdea {
    title: String,
    description: String,
    #[serde(alias = "technologies")]
    tags: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    code_sample: Option<String>,
}

/// 解析并校验模型输出
///
/// 缺少 difficulty 时使用请求的难度；顺序保持与响应一致
fn parse_ideas(text: &str, requested: Difficulty) -> Result<Vec<Idea>, ParseError> {
    let payload = strip_code_fence(text.trim());
    let raw: Vec<RawIdea> = serde_json::from_str(payload)?;

    raw.into_iter()
        .enumerate()
        .map(|(index, idea)| validate_idea(index, idea, requested))
        .collect()
}

fn validate_idea(index: usize, raw: RawIdea, requested: Difficulty) -> Result<Idea, ParseError> {
    let invalid = |reason: &str| ParseError::Invalid {
        index,
        reason: reason.to_string(),
    };

    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return Err(invalid("blank title"));
    }
    let description = raw.description.trim().to_string();
    if description.is_empty() {
        return Err(invalid("blank description"));
    }

    let tags = clean_list(raw.tags);
    if tags.is_empty() {
        return Err(invalid("no tags"));
    }

    let difficulty = match raw.difficulty.as_deref() {
        None => requested,
        Some(label) => label
            .parse()
            .map_err(|e: UnknownDifficulty| invalid(&e.to_string()))?,
    };

    Ok(Idea {
        title,
        description,
        tags,
        steps: clean_list(raw.steps),
        difficulty,
        code_sample: raw.code_sample.filter(|c| !c.trim().is_empty()),
    })
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 去掉包裹的 Markdown 代码块（```json ... ```）
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// 创意生成器
///
/// 启动时创建一次，通过 AppState 注入
pub struct IdeaGenerator {
    client: LlmClient,
    model: String,
    options: GenerationOptions,
    prompt_service: PromptService,
    schema: SchemaNode,
    request_logger: Option<Arc<RequestLogger>>,
}

impl IdeaGenerator {
    /// 创建新的创意生成器
    pub fn new(client: LlmClient, model: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            client,
            model: model.into(),
            options,
            prompt_service: PromptService::new(),
            schema: idea_schema(),
            request_logger: None,
        }
    }

    /// 启用 JSONL 诊断日志
    pub fn with_request_logger(mut self, logger: Arc<RequestLogger>) -> Self {
        self.request_logger = Some(logger);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 生成创意列表
    ///
    /// 恰好一次调用，不重试；要么全部解析成功，要么整体失败
    pub async fn generate(&self, request: &IdeaRequest) -> Result<Vec<Idea>, GenerationError> {
        let prompt = self.prompt_service.build_idea_prompt(request);
        let start_time = Instant::now();
        let log_entry = self.request_logger.as_ref().map(|logger| {
            logger.log_request(&RequestContext {
                api_format: detect_api_format(&self.model).as_str(),
                base_url: self.client.base_url(),
                api_key: self.client.api_key(),
                model: &self.model,
                topic: request.topic(),
                difficulty: request.difficulty().label(),
                excluded_count: request.exclude_titles().len(),
                prompt: &prompt,
                temperature: self.options.temperature,
                top_p: self.options.top_p,
            })
        });

        info!(
            "Generating ideas: topic={:?}, difficulty={}, excluded={}",
            request.topic(),
            request.difficulty(),
            request.exclude_titles().len()
        );

        let response = self
            .client
            .generate_structured(StructuredRequest {
                model: &self.model,
                prompt: &prompt,
                schema_name: IDEA_SCHEMA_NAME,
                schema: &self.schema,
                options: &self.options,
            })
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!("Idea generation request failed: {}", e);
                self.record_llm_error(log_entry, start_time, &e);
                return Err(GenerationError::Failure);
            }
        };

        debug!(
            "Generation response received: length={}, finish_reason={:?}",
            response.text.len(),
            response.finish_reason
        );

        match parse_ideas(&response.text, request.difficulty()) {
            Ok(ideas) => {
                info!("Generated {} ideas for topic={:?}", ideas.len(), request.topic());
                if let (Some(logger), Some(entry)) = (&self.request_logger, log_entry) {
                    logger.log_success(entry, start_time, &response.text, ideas.len());
                }
                Ok(ideas)
            }
            Err(e) => {
                warn!("Generated payload rejected: {}", e);
                if let (Some(logger), Some(entry)) = (&self.request_logger, log_entry) {
                    logger.log_error(
                        entry,
                        start_time,
                        Failure {
                            error_type: e.kind(),
                            error_message: &e.to_string(),
                            status_code: None,
                            response_preview: Some(&response.text),
                        },
                    );
                }
                Err(e.into())
            }
        }
    }

    fn record_llm_error(
        &self,
        entry: Option<LogEntry>,
        start_time: Instant,
        e: &LlmError,
    ) {
        if let (Some(logger), Some(entry)) = (&self.request_logger, entry) {
            logger.log_error(
                entry,
                start_time,
                Failure {
                    error_type: e.kind(),
                    error_message: &e.to_string(),
                    status_code: e.status_code(),
                    response_preview: None,
                },
            );
        }
    }
}
