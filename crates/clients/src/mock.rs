//! Mock 客户端
//!
//! 用于测试的 mock 实现，记录调用并支持注入失败场景。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use tracing::{debug, instrument};

use contracts::{ContractError, MediaFetcher, Status, StatusApi, RATE_LIMIT_CODE};

/// 一次 post 调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedStatus {
    /// 发帖文本
    pub text: String,
    /// 附带的本地媒体文件
    pub media: Vec<PathBuf>,
}

/// Mock API 配置
#[derive(Debug, Default, Clone)]
pub struct MockApiConfig {
    /// 成功这么多次之后开始失败 (None = 从不失败)
    pub fail_after: Option<usize>,
    /// 失败时返回的状态码
    pub fail_code: u16,
}

impl MockApiConfig {
    /// 第 `n` 次之后触发限流
    pub fn rate_limit_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            fail_code: RATE_LIMIT_CODE,
        }
    }

    /// 每次都以 `code` 拒绝
    pub fn always_reject(code: u16) -> Self {
        Self {
            fail_after: Some(0),
            fail_code: code,
        }
    }
}

/// Mock 发帖 API
#[derive(Debug)]
pub struct MockStatusApi {
    config: MockApiConfig,
    next_id: AtomicU64,
    posts: Mutex<Vec<PostedStatus>>,
    attempts: AtomicU64,
}

impl MockStatusApi {
    /// 创建从不失败的 mock
    pub fn new() -> Self {
        Self::with_config(MockApiConfig::default())
    }

    /// 使用配置创建 mock
    pub fn with_config(config: MockApiConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(5000), // 从 5000 开始，便于识别
            posts: Mutex::new(Vec::new()),
            attempts: AtomicU64::new(0),
        }
    }

    /// 成功的 post 调用
    pub fn posts(&self) -> Vec<PostedStatus> {
        self.posts.lock().unwrap().clone()
    }

    /// 所有 post 调用次数 (含失败)
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockStatusApi {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusApi for MockStatusApi {
    #[instrument(name = "mock_api_post", skip(self, text, media))]
    async fn post(&self, text: &str, media: &[PathBuf]) -> Result<Status, ContractError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut posts = self.posts.lock().unwrap();
        if self
            .config
            .fail_after
            .is_some_and(|n| posts.len() >= n)
        {
            return Err(ContractError::remote_api(self.config.fail_code, "mock rejection"));
        }

        posts.push(PostedStatus {
            text: text.to_string(),
            media: media.to_vec(),
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(id, "mock post accepted");
        Ok(Status {
            id,
            text: Some(text.to_string()),
            ..Default::default()
        })
    }
}

/// Mock 媒体下载
///
/// 只返回登记过的 URL；其它 URL 按 404 处理。
#[derive(Debug, Default)]
pub struct MockMediaFetcher {
    bodies: HashMap<String, Bytes>,
    fallback: Option<Bytes>,
    requests: Mutex<Vec<String>>,
}

impl MockMediaFetcher {
    /// 创建空 mock
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记 `url` 的响应体
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// 未登记的 URL 也返回 `body`
    pub fn serve_any(mut self, body: impl Into<Bytes>) -> Self {
        self.fallback = Some(body.into());
        self
    }

    /// 按顺序记录的请求
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl MediaFetcher for MockMediaFetcher {
    async fn get(&self, url: &str) -> Result<Bytes, ContractError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ContractError::media_fetch(url, "404 Not Found"))
    }
}
