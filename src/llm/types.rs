//! LLM 类型定义

use super::schema::SchemaNode;

/// 生成选项
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// 温度参数
    pub temperature: Option<f64>,
    /// top_p 参数
    pub top_p: Option<f64>,
    /// 最大输出 token 数
    pub max_tokens: Option<u32>,
}

/// 结构化输出请求
///
/// 单轮调用：一个提示词加上声明的输出结构
#[derive(Debug, Clone, Copy)]
pub struct StructuredRequest<'a> {
    /// 模型名称
    pub model: &'a str,
    /// 提示词
    pub prompt: &'a str,
    /// 输出结构名称（OpenAI json_schema 需要）
    pub schema_name: &'a str,
    /// 声明的输出结构
    pub schema: &'a SchemaNode,
    /// 采样参数
    pub options: &'a GenerationOptions,
}

/// 结构化输出响应
#[derive(Debug, Clone, Default)]
pub struct StructuredResponse {
    /// 模型返回的原始文本
    pub text: String,
    /// 完成原因
    pub finish_reason: Option<String>,
}

/// LLM 错误类型
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP 请求错误
    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API 返回错误
    #[error("API 错误 ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// JSON 解析错误
    #[error("JSON 解析失败: {0}")]
    JsonError(#[from] serde_json::Error),

    /// 响应中没有可用文本（例如被安全策略拦截）
    #[error("响应为空: {0}")]
    EmptyResponse(String),
}

impl LlmError {
    /// 错误类型标识，用于诊断日志
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::HttpError(e) if e.is_timeout() => "timeout",
            LlmError::HttpError(_) => "http",
            LlmError::ApiError { .. } => "api",
            LlmError::ConfigError(_) => "config",
            LlmError::JsonError(_) => "json",
            LlmError::EmptyResponse(_) => "empty_response",
        }
    }

    /// HTTP 状态码（如果有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
