//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个 worker，且 kind 不重复
//! - pool_size 在 1..=9，drain_limit > 0 (validator derive)
//! - 文件名模板非空且花括号配对
//! - follow id 非零，track 关键词非空
//! - replay 数据源必须给出 path

use std::collections::HashSet;

use contracts::{ContractError, FeedSourceKind, StreamBlueprint, WorkerKind};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 StreamBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    validate_workers_present(blueprint)?;
    validate_worker_kinds(blueprint)?;
    validate_ranges(blueprint)?;
    validate_templates(blueprint)?;
    validate_subscription(blueprint)?;
    validate_feed(blueprint)?;
    Ok(())
}

/// 至少一个 worker
fn validate_workers_present(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    if blueprint.workers.is_empty() {
        return Err(ContractError::config_validation(
            "workers",
            "at least one worker must be configured",
        ));
    }
    Ok(())
}

/// 校验 worker kind 唯一性
fn validate_worker_kinds(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for worker in &blueprint.workers {
        if !seen.insert(worker.kind) {
            return Err(ContractError::config_validation(
                format!("workers[kind={}]", worker.kind),
                "duplicate worker kind",
            ));
        }
    }
    Ok(())
}

/// 数值范围 (由 validator derive 声明)
fn validate_ranges(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|errors| first_violation("", &errors))
}

/// 把 validator 的错误树展开成第一条 `字段路径 + 消息`
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ContractError {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    return ContractError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_violation(&path, inner),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_violation(&format!("{path}[{idx}]"), inner);
                }
            }
        }
    }
    ContractError::config_validation(prefix, "invalid value")
}

/// 校验输出模板
fn validate_templates(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    for worker in &blueprint.workers {
        if worker.kind == WorkerKind::Mirror {
            continue;
        }
        let template = worker.format_or_default();
        let field = format!("workers[kind={}].format", worker.kind);
        if template.is_empty() {
            return Err(ContractError::config_validation(
                field,
                "format template cannot be empty",
            ));
        }
        if !braces_balanced(template) {
            return Err(ContractError::config_validation(
                field,
                format!("unbalanced braces in format template '{template}'"),
            ));
        }
    }
    Ok(())
}

/// `{{` / `}}` 为转义，其余花括号必须成对且不嵌套
fn braces_balanced(template: &str) -> bool {
    let mut chars = template.chars().peekable();
    let mut open = false;
    while let Some(c) = chars.next() {
        match c {
            '{' if !open && chars.peek() == Some(&'{') => {
                chars.next();
            }
            '}' if !open && chars.peek() == Some(&'}') => {
                chars.next();
            }
            '{' if !open => open = true,
            '}' if open => open = false,
            '{' | '}' => return false,
            _ => {}
        }
    }
    !open
}

/// 校验订阅白名单
fn validate_subscription(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    if let Some(idx) = blueprint.stream.follow.iter().position(|id| *id == 0) {
        return Err(ContractError::config_validation(
            format!("stream.follow[{idx}]"),
            "user id must be non-zero",
        ));
    }
    if let Some(idx) = blueprint
        .stream
        .track
        .iter()
        .position(|term| term.trim().is_empty())
    {
        return Err(ContractError::config_validation(
            format!("stream.track[{idx}]"),
            "track term cannot be empty",
        ));
    }
    Ok(())
}

/// 校验数据源
fn validate_feed(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    if blueprint.feed.source == FeedSourceKind::Replay && blueprint.feed.path.is_none() {
        return Err(ContractError::config_validation(
            "feed.path",
            "replay source requires a path",
        ));
    }
    Ok(())
}
