//! REST API 请求/响应模型

use serde::{Deserialize, Serialize};

use super::idea::{Difficulty, Idea};

/// 直接生成请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIdeasRequest {
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub exclude_titles: Vec<String>,
}

/// 直接生成响应
#[derive(Debug, Serialize)]
pub struct GenerateIdeasResponse {
    pub success: bool,
    pub ideas: Vec<Idea>,
}

/// 看板提交请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}
