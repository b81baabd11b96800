//! StreamBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：订阅范围、数据源、全局开关、worker 池与过滤链。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use validator::Validate;

use crate::{ContractError, DrainLimit, WorkerKind};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 上游订阅范围 (由 feed 消费，core 不使用)
    #[serde(default)]
    pub stream: SubscriptionConfig,

    /// 原始数据来源
    #[serde(default)]
    pub feed: FeedConfig,

    /// 全局开关
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// 媒体下载 HTTP 客户端
    #[serde(default)]
    pub http: HttpConfig,

    /// Worker 池定义列表 (顺序即分发顺序)
    #[validate(nested)]
    pub workers: Vec<WorkerConfig>,
}

impl StreamBlueprint {
    /// 按 kind 查找 worker 配置
    pub fn worker(&self, kind: WorkerKind) -> Option<&WorkerConfig> {
        self.workers.iter().find(|w| w.kind == kind)
    }

    /// 已配置的 worker 类型 (配置顺序)
    pub fn worker_kinds(&self) -> Vec<WorkerKind> {
        self.workers.iter().map(|w| w.kind).collect()
    }

    /// 所有池的 worker 总数
    pub fn total_workers(&self) -> usize {
        self.workers.iter().map(|w| w.pool_size).sum()
    }
}

/// 订阅白名单：用户 id 与话题
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// 关注的用户 id
    #[serde(default)]
    pub follow: Vec<u64>,

    /// 跟踪的话题 / 关键词
    #[serde(default)]
    pub track: Vec<String>,
}

impl SubscriptionConfig {
    /// 空白名单表示不过滤
    pub fn is_empty(&self) -> bool {
        self.follow.is_empty() && self.track.is_empty()
    }
}

/// 数据源配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 数据源类型
    #[serde(default)]
    pub source: FeedSourceKind,

    /// 回放文件路径 (仅 replay)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// 两行之间的间隔 (毫秒，0 = 不等待)
    #[serde(default)]
    pub interval_ms: u64,
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSourceKind {
    /// 从标准输入读取 NDJSON
    #[default]
    Stdin,
    /// 回放 NDJSON 文件
    Replay,
}

/// 全局开关
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// 只记录将要执行的动作
    #[serde(default)]
    pub dry_run: bool,

    /// 退出时不等待 worker 排空队列
    #[serde(default = "default_daemon")]
    pub daemon: bool,

    /// 远端发帖后端
    #[serde(default)]
    pub post_backend: PostBackend,

    /// 处理的 status 数量上限 (None 或 0 = 不限)
    #[serde(default)]
    pub max_statuses: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            daemon: default_daemon(),
            post_backend: PostBackend::default(),
            max_statuses: None,
        }
    }
}

fn default_daemon() -> bool {
    true
}

/// 远端发帖后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostBackend {
    /// 仅记录日志，返回合成的 status
    #[default]
    Logging,
}

/// 媒体下载 HTTP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 单次请求超时 (秒)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Worker 池配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Worker 类型
    pub kind: WorkerKind,

    /// 池大小 (1..=9)
    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1, max = 9, message = "pool_size must be in 1..=9"))]
    pub pool_size: usize,

    /// 每个 worker 最多处理的条目数 (None = 不限)
    #[serde(default)]
    #[validate(range(min = 1, message = "drain_limit must be > 0"))]
    pub drain_limit: Option<u64>,

    /// 覆盖全局 dry_run
    #[serde(default)]
    pub dry_run: Option<bool>,

    /// 输出目录 (writer / media_downloader)
    #[serde(default = "default_dirname")]
    pub dirname: PathBuf,

    /// 文件名 / 子目录模板
    #[serde(default)]
    pub format: Option<String>,

    /// JSON 输出编码 (writer)
    #[serde(default)]
    pub encoding: TextEncoding,

    /// 媒体暂存目录 (mirror)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// 过滤链 (None = 该类型的默认过滤器)
    #[serde(default)]
    pub filters: Option<Vec<FilterSpec>>,
}

fn default_pool_size() -> usize {
    2
}

fn default_dirname() -> PathBuf {
    PathBuf::from("./")
}

impl WorkerConfig {
    /// 使用默认值创建
    pub fn new(kind: WorkerKind) -> Self {
        Self {
            kind,
            pool_size: default_pool_size(),
            drain_limit: None,
            dry_run: None,
            dirname: default_dirname(),
            format: None,
            encoding: TextEncoding::default(),
            temp_dir: None,
            filters: None,
        }
    }

    /// 模板，未配置时取该类型的默认值
    pub fn format_or_default(&self) -> &str {
        match (&self.format, self.kind) {
            (Some(format), _) => format,
            (None, WorkerKind::Writer) => "status_{id}.json",
            (None, WorkerKind::MediaDownloader) => "media_{id}",
            (None, WorkerKind::Mirror) => "",
        }
    }

    /// mirror 暂存目录，默认在输出目录下的 tmp
    pub fn temp_dir_or_default(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.dirname.join("tmp"))
    }

    /// 校验后的 drain limit
    pub fn drain_limit(&self) -> Result<DrainLimit, ContractError> {
        DrainLimit::new(self.drain_limit)
    }

    /// 生效的 dry_run
    pub fn effective_dry_run(&self, global: bool) -> bool {
        self.dry_run.unwrap_or(global)
    }
}

/// 文本编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// UTF-32，带 little-endian BOM (与既有存档兼容)
    #[default]
    Utf32,
    /// UTF-8
    Utf8,
}

/// 过滤器声明 (配置形式)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// 该 worker 类型的默认过滤器
    Default,
    IsReply,
    HasMentions,
    IsRetweet,
    HasMedia,
    IsQuote,
    IsRtGame,
    TweetedBy {
        user_id: u64,
    },
    HasHashtag {
        tag: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// 取反
    Not {
        filter: Box<FilterSpec>,
    },
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default_filter"),
            Self::IsReply => f.write_str("is_reply"),
            Self::HasMentions => f.write_str("has_mentions"),
            Self::IsRetweet => f.write_str("is_retweet"),
            Self::HasMedia => f.write_str("has_media"),
            Self::IsQuote => f.write_str("is_quote"),
            Self::IsRtGame => f.write_str("is_rt_game"),
            Self::TweetedBy { user_id } => write!(f, "tweeted_by({user_id})"),
            Self::HasHashtag { tag, ignore_case } => {
                write!(f, "has_hashtag({tag}, ignore_case={ignore_case})")
            }
            Self::Not { filter } => write!(f, "not({filter})"),
        }
    }
}
