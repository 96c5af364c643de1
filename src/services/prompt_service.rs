//! Prompt 构建服务
//!
//! 负责把主题、难度和排除标题组装成单条生成指令

use crate::models::IdeaRequest;

/// 每次请求生成的创意数量
pub const IDEA_COUNT: usize = 3;

/// 字段要求
const FIELD_REQUIREMENTS: &str = r#"For each idea, provide:
- "title": a short, catchy project title.
- "description": one paragraph explaining the project, its purpose and its main features.
- "tags": 3 to 5 relevant technologies, concepts or keywords.
- "difficulty": the skill level label, which must be exactly "{difficulty}".
- "steps": 5 to 7 high-level, actionable steps to build the project, in order.
- "codeSample": optionally, a brief code snippet in a relevant language that illustrates a core concept."#;

/// Prompt 服务
pub struct PromptService;

impl PromptService {
    /// 创建新的 Prompt 服务
    pub fn new() -> Self {
        Self
    }

    /// 构建创意生成提示词
    pub fn build_idea_prompt(&self, request: &IdeaRequest) -> String {
        let difficulty = request.difficulty().label();

        let mut prompt = format!(
            "Generate {} distinct, innovative project ideas related to the following topic: \"{}\".\n\
             The target skill level is {}. Every idea must be realistic for a developer at the {} level.\n\n",
            IDEA_COUNT,
            request.topic(),
            difficulty,
            difficulty,
        );
        prompt.push_str(&FIELD_REQUIREMENTS.replace("{difficulty}", difficulty));

        // "加载更多"：要求避开已展示的标题
        if let Some(clause) = Self::exclusion_clause(request.exclude_titles()) {
            prompt.push_str("\n\n");
            prompt.push_str(&clause);
        }

        prompt
    }

    /// 构建排除子句
    fn exclusion_clause(titles: &[String]) -> Option<String> {
        if titles.is_empty() {
            return None;
        }

        let listed: Vec<String> = titles.iter().map(|t| format!("- \"{}\"", t)).collect();
        Some(format!(
            "The following ideas have already been suggested. The new ideas must be clearly different from them and must not reuse these titles:\n{}",
            listed.join("\n")
        ))
    }
}

impl Default for PromptService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    #[test]
    fn test_prompt_contains_topic_and_difficulty() {
        let service = PromptService::new();

        for difficulty in Difficulty::ALL {
            let request = IdeaRequest::new("a mobile app for gardeners", difficulty).unwrap();
            let prompt = service.build_idea_prompt(&request);
            assert!(prompt.contains("a mobile app for gardeners"));
            assert!(prompt.contains(difficulty.label()));
            assert!(prompt.contains("Generate 3 distinct"));
        }
    }

    #[test]
    fn test_prompt_lists_required_fields() {
        let service = PromptService::new();
        let request = IdeaRequest::new("compilers", Difficulty::Advanced).unwrap();
        let prompt = service.build_idea_prompt(&request);

        for field in ["\"title\"", "\"description\"", "\"tags\"", "\"difficulty\"", "\"steps\"", "\"codeSample\""] {
            assert!(prompt.contains(field), "missing field {}", field);
        }
        assert!(prompt.contains("exactly \"Advanced\""));
    }

    #[test]
    fn test_prompt_without_exclusions_has_no_clause() {
        let service = PromptService::new();
        let request = IdeaRequest::new("robots", Difficulty::Beginner).unwrap();
        assert!(!service.build_idea_prompt(&request).contains("already been suggested"));
    }

    #[test]
    fn test_prompt_includes_every_excluded_title() {
        let service = PromptService::new();
        let request = IdeaRequest::new("a mobile app for gardeners", Difficulty::Beginner)
            .unwrap()
            .with_exclusions(["Plant Care Tracker", "Seed Swap Map", "Compost Timer"]);
        let prompt = service.build_idea_prompt(&request);

        assert!(prompt.contains("already been suggested"));
        for title in ["Plant Care Tracker", "Seed Swap Map", "Compost Timer"] {
            assert!(prompt.contains(title), "missing title {}", title);
        }
    }
}
