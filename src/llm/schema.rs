//! 输出结构声明
//!
//! 与具体 API 无关的结构树，按 API 格式渲染成各自的 JSON 表示：
//! Gemini 使用 OpenAPI 子集（大写类型名），OpenAI 使用标准 JSON Schema。

use serde_json::{json, Map, Value};

/// 输出结构节点
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// 字符串，可选枚举约束
    String {
        description: Option<String>,
        enum_values: Vec<String>,
    },
    /// 数组
    Array {
        description: Option<String>,
        items: Box<SchemaNode>,
    },
    /// 对象，属性按声明顺序排列
    Object {
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    },
}

impl SchemaNode {
    /// 字符串节点
    pub fn string(description: impl Into<String>) -> Self {
        SchemaNode::String {
            description: Some(description.into()),
            enum_values: Vec::new(),
        }
    }

    /// 枚举字符串节点
    pub fn enumeration<I, S>(description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaNode::String {
            description: Some(description.into()),
            enum_values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// 字符串数组节点
    pub fn string_array(description: impl Into<String>) -> Self {
        SchemaNode::Array {
            description: Some(description.into()),
            items: Box::new(SchemaNode::String {
                description: None,
                enum_values: Vec::new(),
            }),
        }
    }

    /// 数组节点
    pub fn array_of(items: SchemaNode) -> Self {
        SchemaNode::Array {
            description: None,
            items: Box::new(items),
        }
    }

    /// 是否为数组根
    pub fn is_array(&self) -> bool {
        matches!(self, SchemaNode::Array { .. })
    }

    /// 渲染为 Gemini responseSchema
    pub fn to_gemini(&self) -> Value {
        match self {
            SchemaNode::String {
                description,
                enum_values,
            } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("STRING"));
                insert_description(&mut node, description);
                if !enum_values.is_empty() {
                    node.insert("format".into(), json!("enum"));
                    node.insert("enum".into(), json!(enum_values));
                }
                Value::Object(node)
            }
            SchemaNode::Array { description, items } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("ARRAY"));
                insert_description(&mut node, description);
                node.insert("items".into(), items.to_gemini());
                Value::Object(node)
            }
            SchemaNode::Object {
                properties,
                required,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_gemini()))
                    .collect();
                let ordering: Vec<&str> = properties.iter().map(|(name, _)| name.as_str()).collect();
                json!({
                    "type": "OBJECT",
                    "properties": props,
                    "required": required,
                    "propertyOrdering": ordering,
                })
            }
        }
    }

    /// 渲染为标准 JSON Schema
    pub fn to_json_schema(&self) -> Value {
        match self {
            SchemaNode::String {
                description,
                enum_values,
            } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("string"));
                insert_description(&mut node, description);
                if !enum_values.is_empty() {
                    node.insert("enum".into(), json!(enum_values));
                }
                Value::Object(node)
            }
            SchemaNode::Array { description, items } => {
                let mut node = Map::new();
                node.insert("type".into(), json!("array"));
                insert_description(&mut node, description);
                node.insert("items".into(), items.to_json_schema());
                Value::Object(node)
            }
            SchemaNode::Object {
                properties,
                required,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json_schema()))
                    .collect();
                json!({
                    "type": "object",
                    "properties": props,
                    "required": required,
                })
            }
        }
    }
}

fn insert_description(node: &mut Map<String, Value>, description: &Option<String>) {
    if let Some(desc) = description {
        node.insert("description".into(), json!(desc));
    }
}
