//! 应用配置管理
//!
//! 启动时加载一次：可执行文件同级的 config.json 提供默认值，环境变量覆盖。
//! 加载结果由 main 显式传递，不使用全局单例。

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

/// API 密钥环境变量（按优先级）
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    // 配置文件位于可执行文件同级目录
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.json")
}

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API 密钥
    #[serde(default)]
    pub api_key: String,

    /// LLM API 基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 模型名称
    #[serde(default = "default_model")]
    pub model: String,

    /// 温度参数 (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// top_p 参数 (0.0 - 1.0]
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// 最大输出 token 数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 监听地址
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// JSONL 请求日志目录，未设置则不记录
    #[serde(default)]
    pub request_log_dir: Option<PathBuf>,

    /// 看板空闲多久后回收（秒）
    #[serde(default = "default_board_ttl_secs")]
    pub board_ttl_secs: u64,

    /// 同时保留的看板上限
    #[serde(default = "default_max_boards")]
    pub max_boards: usize,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_bind_addr() -> String {
    "127.0.0.1:8765".to_string()
}

fn default_board_ttl_secs() -> u64 {
    1800
}

fn default_max_boards() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            bind_addr: default_bind_addr(),
            request_log_dir: None,
            board_ttl_secs: default_board_ttl_secs(),
            max_boards: default_max_boards(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和进程环境加载
    pub fn load() -> Result<Self, AppError> {
        let base = load_config_from_file(&get_config_path())?.unwrap_or_default();
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// 用查找函数提供的值覆盖配置并校验
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|&k| get(k)) {
            self.api_key = key;
        }
        if let Some(v) = get("IDEAS_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("IDEAS_MODEL") {
            self.model = v;
        }
        if let Some(v) = get("IDEAS_TEMPERATURE") {
            self.temperature = parse_value("IDEAS_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("IDEAS_TOP_P") {
            self.top_p = parse_value("IDEAS_TOP_P", &v)?;
        }
        if let Some(v) = get("IDEAS_MAX_TOKENS") {
            self.max_tokens = parse_value("IDEAS_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("IDEAS_TIMEOUT_SECS") {
            self.timeout_secs = parse_value("IDEAS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("IDEAS_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("IDEAS_REQUEST_LOG_DIR") {
            self.request_log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("IDEAS_BOARD_TTL_SECS") {
            self.board_ttl_secs = parse_value("IDEAS_BOARD_TTL_SECS", &v)?;
        }
        if let Some(v) = get("IDEAS_MAX_BOARDS") {
            self.max_boards = parse_value("IDEAS_MAX_BOARDS", &v)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// 校验配置，缺少密钥为致命错误
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "API key is missing; set {} in the environment",
                API_KEY_VARS.join(" or ")
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(AppError::Config(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_boards == 0 {
            return Err(AppError::Config("max_boards must be at least 1".to_string()));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// 解析监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        self.bind_addr
            .parse()
            .map_err(|e| AppError::Config(format!("invalid bind address {:?}: {}", self.bind_addr, e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn board_ttl(&self) -> Duration {
        Duration::from_secs(self.board_ttl_secs)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| AppError::Config(format!("invalid value for {}: {:?} ({})", key, raw, e)))
}

/// 从文件加载配置；文件不存在时返回 None
fn load_config_from_file(path: &Path) -> Result<Option<AppConfig>, AppError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("读取配置文件失败: {}", e)))?;
    let config = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("解析配置文件失败: {}", e)))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!((config.temperature - 0.7).abs() < f64::EPSILON);
        assert!((config.top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.bind_addr, "127.0.0.1:8765");
        assert!(config.request_log_dir.is_none());
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let result = AppConfig::default().with_overrides(env(&[]));
        assert!(matches!(result, Err(AppError::Config(_))));

        let result = AppConfig::default().with_overrides(env(&[("GEMINI_API_KEY", "   ")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_api_key_fallback_order() {
        let config = AppConfig::default()
            .with_overrides(env(&[("API_KEY", "fallback")]))
            .unwrap();
        assert_eq!(config.api_key, "fallback");

        let config = AppConfig::default()
            .with_overrides(env(&[("API_KEY", "fallback"), ("GEMINI_API_KEY", "primary")]))
            .unwrap();
        assert_eq!(config.api_key, "primary");
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::default()
            .with_overrides(env(&[
                ("GEMINI_API_KEY", "k"),
                ("IDEAS_MODEL", "gpt-4o-mini"),
                ("IDEAS_TEMPERATURE", "0.8"),
                ("IDEAS_TOP_P", "1"),
                ("IDEAS_BIND_ADDR", "0.0.0.0:9000"),
                ("IDEAS_REQUEST_LOG_DIR", "/tmp/ideas"),
            ]))
            .unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert!((config.temperature - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.request_log_dir, Some(PathBuf::from("/tmp/ideas")));
    }

    #[test]
    fn test_board_limits() {
        let config = AppConfig::default().with_overrides(env(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.board_ttl(), Duration::from_secs(1800));
        assert_eq!(config.max_boards, 1000);

        let config = AppConfig::default()
            .with_overrides(env(&[
                ("GEMINI_API_KEY", "k"),
                ("IDEAS_BOARD_TTL_SECS", "60"),
                ("IDEAS_MAX_BOARDS", "5"),
            ]))
            .unwrap();
        assert_eq!(config.board_ttl(), Duration::from_secs(60));
        assert_eq!(config.max_boards, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad = [
            ("IDEAS_TEMPERATURE", "warm"),
            ("IDEAS_TEMPERATURE", "3.5"),
            ("IDEAS_TOP_P", "0"),
            ("IDEAS_TIMEOUT_SECS", "-1"),
            ("IDEAS_BIND_ADDR", "localhost"),
            ("IDEAS_MAX_BOARDS", "0"),
        ];
        for (key, value) in bad {
            let result = AppConfig::default().with_overrides(env(&[("GEMINI_API_KEY", "k"), (key, value)]));
            assert!(matches!(result, Err(AppError::Config(_))), "{}={} accepted", key, value);
        }
    }

    #[test]
    fn test_file_config_partial_fields() {
        let dir = std::env::temp_dir().join(format!("idea-forge-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{"api_key":"from-file","model":"gemini-2.0-flash"}"#).unwrap();

        let config = load_config_from_file(&path).unwrap().unwrap();
        assert_eq!(config.api_key, "from-file");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_tokens, 8192);

        assert!(load_config_from_file(&dir.join("missing.json")).unwrap().is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
