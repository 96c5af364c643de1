//! 项目创意数据模型

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// 显示标签，同时写入提示词和输出结构
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 未知难度标签
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty: {0}")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownDifficulty(value.to_string()))
    }
}

/// 项目创意
///
/// 一次结果集内不可变；`steps` 与 `code_sample` 为可选字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub title: String,
    pub description: String,
    #[serde(alias = "technologies")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_sample: Option<String>,
}

/// 生成请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeaRequest {
    topic: String,
    difficulty: Difficulty,
    exclude_titles: Vec<String>,
}

impl IdeaRequest {
    /// 创建请求；主题去除首尾空白后为空则返回 None
    pub fn new(topic: &str, difficulty: Difficulty) -> Option<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return None;
        }
        Some(Self {
            topic: topic.to_string(),
            difficulty,
            exclude_titles: Vec::new(),
        })
    }

    /// 附加需要排除的已有标题（"加载更多"）
    pub fn with_exclusions<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude_titles = titles
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn exclude_titles(&self) -> &[String] {
        &self.exclude_titles
    }
}
