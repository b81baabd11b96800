//! Feed 错误类型

use std::path::PathBuf;

use thiserror::Error;

/// Feed 错误
#[derive(Debug, Error)]
pub enum FeedError {
    /// 回放文件无法打开
    #[error("cannot open feed file {path}: {source}")]
    Open {
        /// 文件路径
        path: PathBuf,
        /// 底层错误
        #[source]
        source: std::io::Error,
    },

    /// 读取数据源失败
    #[error("feed read failed: {0}")]
    Io(#[from] std::io::Error),

    /// 通道已关闭
    #[error("feed channel closed")]
    ChannelClosed,
}

/// Feed Result 类型别名
pub type Result<T> = std::result::Result<T, FeedError>;
