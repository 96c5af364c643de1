//! 创意列表输出结构声明

use crate::llm::SchemaNode;
use crate::models::Difficulty;

/// 输出结构名称
pub const IDEA_SCHEMA_NAME: &str = "project_ideas";

/// 创意数组的输出结构
///
/// 对远端服务只是提示，解析后仍需校验
pub fn idea_schema() -> SchemaNode {
    let item = SchemaNode::Object {
        properties: vec![
            (
                "title".to_string(),
                SchemaNode::string("A short, catchy title for the project idea."),
            ),
            (
                "description".to_string(),
                SchemaNode::string(
                    "A one-paragraph explanation of the project idea, its purpose and potential features.",
                ),
            ),
            (
                "tags".to_string(),
                SchemaNode::string_array("3 to 5 relevant technologies, concepts or keywords."),
            ),
            (
                "difficulty".to_string(),
                SchemaNode::enumeration(
                    "The skill level of the project.",
                    Difficulty::ALL.iter().map(|d| d.label()),
                ),
            ),
            (
                "steps".to_string(),
                SchemaNode::string_array("Actionable, high-level steps to build the project."),
            ),
            (
                "codeSample".to_string(),
                SchemaNode::string(
                    "A small, illustrative code snippet in a relevant language. Optional.",
                ),
            ),
        ],
        required: ["title", "description", "tags", "difficulty", "steps"]
            .into_iter()
            .map(String::from)
            .collect(),
    };

    SchemaNode::array_of(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_idea_schema_shape() {
        let schema = idea_schema().to_json_schema();
        assert_eq!(schema["type"], "array");

        let item = &schema["items"];
        assert_eq!(
            item["required"],
            json!(["title", "description", "tags", "difficulty", "steps"])
        );
        assert_eq!(
            item["properties"]["difficulty"]["enum"],
            json!(["Beginner", "Intermediate", "Advanced"])
        );
        assert_eq!(item["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(item["properties"]["codeSample"]["type"], "string");
    }
}
