//! 统一 LLM 客户端

use reqwest::Client;
use std::time::Duration;
use tracing::info;

use super::format::{detect_api_format, ApiFormat};
use super::gemini::generate_gemini;
use super::openai::generate_openai;
use super::types::{LlmError, StructuredRequest, StructuredResponse};

/// 统一 LLM 客户端
///
/// 支持 Gemini 和 OpenAI 兼容 API 格式，根据模型名称自动选择
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::ConfigError("API Key is required".to_string()));
        }

        // 构建 HTTP 客户端
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 单次结构化输出调用（自动检测 API 格式）
    ///
    /// 不重试、不流式：每次调用恰好发出一个 HTTP 请求
    pub async fn generate_structured(
        &self,
        request: StructuredRequest<'_>,
    ) -> Result<StructuredResponse, LlmError> {
        let api_format = detect_api_format(request.model);
        info!(
            "LLM request: model={}, api_format={:?}",
            request.model, api_format
        );

        match api_format {
            ApiFormat::Gemini => {
                generate_gemini(&self.client, &self.api_key, &self.base_url, request).await
            }
            ApiFormat::OpenAi => {
                generate_openai(&self.client, &self.api_key, &self.base_url, request).await
            }
        }
    }
}
