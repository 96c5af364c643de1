//! OpenAI Chat Completions API 实现（结构化输出）

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use super::format::{build_openai_endpoint, truncate_body};
use super::types::{LlmError, StructuredRequest, StructuredResponse};

/// json_schema 要求根节点为对象，数组根会包装在该字段下
const WRAPPED_ARRAY_FIELD: &str = "items";

/// OpenAI 请求载荷
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: Value,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI 响应
#[derive(Deserialize, Debug)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAiResponseMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// 调用 OpenAI 兼容 API（非流式）
pub async fn generate_openai(
    client: &Client,
    api_key: &str,
    base_url: &str,
    request: StructuredRequest<'_>,
) -> Result<StructuredResponse, LlmError> {
    let endpoint = build_openai_endpoint(base_url);
    let wrapped = request.schema.is_array();

    let mut schema = request.schema.to_json_schema();
    if wrapped {
        let mut properties = Map::new();
        properties.insert(WRAPPED_ARRAY_FIELD.to_string(), schema);
        schema = json!({
            "type": "object",
            "properties": properties,
            "required": [WRAPPED_ARRAY_FIELD],
        });
    }

    let payload = OpenAiRequest {
        model: request.model,
        messages: vec![OpenAiMessage {
            role: "user",
            content: request.prompt,
        }],
        stream: false,
        temperature: request.options.temperature,
        top_p: request.options.top_p,
        max_tokens: request.options.max_tokens,
        response_format: json!({
            "type": "json_schema",
            "json_schema": {
                "name": request.schema_name,
                "schema": schema,
                "strict": false,
            },
        }),
    };

    debug!("OpenAI API request: endpoint={}, model={}", endpoint, request.model);

    let response = client
        .post(&endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    // 检查状态码
    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();
        error!(
            "OpenAI API error: status={}, body={}",
            status_code,
            truncate_body(&error_text)
        );
        return Err(LlmError::ApiError {
            status: status_code,
            message: error_text,
        });
    }

    let body: OpenAiResponse = response.json().await?;
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::EmptyResponse("no choices".to_string()))?;

    let Some(content) = choice.message.content.filter(|c| !c.trim().is_empty()) else {
        let reason = choice
            .message
            .refusal
            .or(choice.finish_reason)
            .unwrap_or_else(|| "empty content".to_string());
        return Err(LlmError::EmptyResponse(reason));
    };

    let text = if wrapped { unwrap_array(content) } else { content };

    Ok(StructuredResponse {
        text,
        finish_reason: choice.finish_reason,
    })
}

/// 取出包装字段中的数组；无法识别时原样返回，由调用方解析失败
fn unwrap_array(content: String) -> String {
    match serde_json::from_str::<Value>(content.trim()) {
        Ok(Value::Object(mut map)) => match map.remove(WRAPPED_ARRAY_FIELD) {
            Some(inner @ Value::Array(_)) => inner.to_string(),
            _ => content,
        },
        _ => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_array() {
        assert_eq!(unwrap_array(r#"{"items":[{"a":1}]}"#.to_string()), r#"[{"a":1}]"#);
        assert_eq!(unwrap_array("[1,2]".to_string()), "[1,2]");
        assert_eq!(unwrap_array("not json".to_string()), "not json");
        assert_eq!(unwrap_array(r#"{"other":[]}"#.to_string()), r#"{"other":[]}"#);
    }
}
