//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, StreamBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<StreamBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<StreamBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FeedSourceKind, FilterSpec, TextEncoding, WorkerKind};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[stream]
follow = [6253282]
track = ["rust"]

[feed]
source = "replay"
path = "statuses.ndjson"

[[workers]]
kind = "writer"
dirname = "./out"
encoding = "utf8"
filters = [{ kind = "default" }, { kind = "not", filter = { kind = "has_media" } }]

[[workers]]
kind = "media_downloader"
pool_size = 4
drain_limit = 10
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.stream.follow, vec![6253282]);
        assert_eq!(bp.feed.source, FeedSourceKind::Replay);
        assert_eq!(bp.workers.len(), 2);
        assert_eq!(bp.workers[0].kind, WorkerKind::Writer);
        assert_eq!(bp.workers[0].encoding, TextEncoding::Utf8);
        assert_eq!(
            bp.workers[0].filters.as_deref(),
            Some(
                &[
                    FilterSpec::Default,
                    FilterSpec::Not {
                        filter: Box::new(FilterSpec::HasMedia)
                    }
                ][..]
            )
        );
        assert_eq!(bp.workers[1].pool_size, 4);
        assert_eq!(bp.workers[1].drain_limit, Some(10));
        assert!(bp.pipeline.daemon);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "pipeline": { "dry_run": true, "daemon": false },
            "workers": [
                { "kind": "mirror", "pool_size": 1, "dry_run": false }
            ]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert!(bp.pipeline.dry_run);
        assert!(!bp.pipeline.daemon);
        assert_eq!(bp.workers[0].dry_run, Some(false));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_worker_kind() {
        let content = r#"
[[workers]]
kind = "archiver"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
