//! 生成请求日志记录器
//!
//! 记录所有创意生成请求到 JSONL 文件，保留返回给用户时被隐藏的根因，便于调试和分析。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// 请求日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 请求 ID
    pub request_id: String,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// API 格式
    pub api_format: String,
    /// 基础 URL
    pub base_url: String,
    /// API 密钥（脱敏）
    pub api_key_masked: String,
    /// 模型名称
    pub model: String,
    /// 主题
    pub topic: String,
    /// 难度
    pub difficulty: String,
    /// 排除标题数量
    pub excluded_count: usize,
    /// 提示词预览
    pub prompt_preview: String,
    /// 温度参数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// top_p 参数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// 状态
    pub status: String,
    /// 持续时间（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// 解析出的创意数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idea_count: Option<usize>,
    /// 响应长度
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
    /// 响应预览
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,
    /// 错误类型
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// 错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// HTTP 状态码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// 请求上下文
pub struct RequestContext<'a> {
    pub api_format: &'a str,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
    pub topic: &'a str,
    pub difficulty: &'a str,
    pub excluded_count: usize,
    pub prompt: &'a str,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
}

/// 失败信息
pub struct Failure<'a> {
    pub error_type: &'a str,
    pub error_message: &'a str,
    pub status_code: Option<u16>,
    pub response_preview: Option<&'a str>,
}

/// 请求日志记录器
pub struct RequestLogger {
    log_path: PathBuf,
    max_entries: usize,
    file: Mutex<Option<File>>,
}

impl RequestLogger {
    /// 创建新的日志记录器
    pub fn new(log_dir: &Path) -> Self {
        // 确保目录存在
        let _ = fs::create_dir_all(log_dir);

        Self {
            log_path: log_dir.join("generation_requests.jsonl"),
            max_entries: 1000,
            file: Mutex::new(None),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 生成请求 ID
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// API 密钥脱敏
    pub fn mask_api_key(api_key: &str) -> String {
        let chars: Vec<char> = api_key.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    /// 截断字符串
    fn truncate(s: &str, max_chars: usize) -> String {
        match s.char_indices().nth(max_chars) {
            None => s.to_string(),
            Some((idx, _)) => format!("{}...", &s[..idx]),
        }
    }

    /// 记录请求开始
    pub fn log_request(&self, ctx: &RequestContext<'_>) -> LogEntry {
        LogEntry {
            request_id: Self::generate_request_id(),
            timestamp: Utc::now(),
            api_format: ctx.api_format.to_string(),
            base_url: ctx.base_url.to_string(),
            api_key_masked: Self::mask_api_key(ctx.api_key),
            model: ctx.model.to_string(),
            topic: Self::truncate(ctx.topic, 200),
            difficulty: ctx.difficulty.to_string(),
            excluded_count: ctx.excluded_count,
            prompt_preview: Self::truncate(ctx.prompt, 300),
            temperature: ctx.temperature,
            top_p: ctx.top_p,
            status: "pending".to_string(),
            duration_ms: None,
            idea_count: None,
            response_length: None,
            response_preview: None,
            error_type: None,
            error_message: None,
            status_code: None,
        }
    }

    /// 记录成功
    pub fn log_success(
        &self,
        mut entry: LogEntry,
        start_time: Instant,
        response_text: &str,
        idea_count: usize,
    ) {
        entry.status = "success".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.response_length = Some(response_text.len());
        entry.idea_count = Some(idea_count);
        entry.response_preview = Some(Self::truncate(response_text, 300));
        self.write_entry(&entry);
    }

    /// 记录错误
    pub fn log_error(&self, mut entry: LogEntry, start_time: Instant, failure: Failure<'_>) {
        entry.status = "error".to_string();
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.error_type = Some(failure.error_type.to_string());
        entry.error_message = Some(Self::truncate(failure.error_message, 500));
        entry.status_code = failure.status_code;
        if let Some(text) = failure.response_preview {
            entry.response_length = Some(text.len());
            entry.response_preview = Some(Self::truncate(text, 300));
        }
        self.write_entry(&entry);
    }

    /// 写入日志条目
    fn write_entry(&self, entry: &LogEntry) {
        let mut file_guard = self.file.lock();

        // 懒加载文件
        if file_guard.is_none() {
            if let Ok(f) = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
            {
                *file_guard = Some(f);
            }
        }

        if let Some(file) = file_guard.as_mut() {
            if let Ok(json) = serde_json::to_string(entry) {
                let _ = writeln!(file, "{}", json);
                let _ = file.flush();
            }
        }

        self.cleanup_if_needed(&mut file_guard);
    }

    /// 清理旧日志
    ///
    /// 持有文件锁执行；重写后丢弃旧句柄，下次写入时重新打开
    fn cleanup_if_needed(&self, file_guard: &mut Option<File>) {
        let Ok(file) = File::open(&self.log_path) else {
            return;
        };
        let lines: Vec<String> = BufReader::new(file).lines().map_while(Result::ok).collect();

        if lines.len() > self.max_entries {
            let keep_lines = &lines[lines.len() - self.max_entries..];
            if let Ok(mut file) = File::create(&self.log_path) {
                for line in keep_lines {
                    let _ = writeln!(file, "{}", line);
                }
            }
            *file_guard = None;
        }
    }
}
