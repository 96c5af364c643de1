//! LLM 模块
//!
//! 提供统一的结构化输出客户端，支持 Gemini 和 OpenAI 兼容 API 格式。

mod client;
mod format;
mod gemini;
mod openai;
mod schema;
mod types;

pub use client::LlmClient;
pub use format::detect_api_format;
pub use schema::SchemaNode;
pub use types::*;
