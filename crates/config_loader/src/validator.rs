//! 配置校验模块
//!
//! 校验规则：
//! - tolerance / step / playback_rate > 0 且有限
//! - tick_interval_ms > 0
//! - service.base_url 非空且为 http(s)
//! - service.timeout_secs > 0
//! - sink 名称非空且唯一
//! - network sink 必须提供合法的 addr

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, ReplayerConfig, SinkType};

/// 校验 ReplayerConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ReplayerConfig) -> Result<(), ContractError> {
    validate_playback(config)?;
    validate_service(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 校验播放参数
fn validate_playback(config: &ReplayerConfig) -> Result<(), ContractError> {
    let playback = &config.playback;

    for (field, value) in [
        ("playback.tolerance", playback.tolerance),
        ("playback.step", playback.step),
        ("playback.playback_rate", playback.playback_rate),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be a finite value > 0, got {value}"),
            ));
        }
    }

    if playback.tick_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "playback.tick_interval_ms",
            "tick_interval_ms must be > 0",
        ));
    }

    Ok(())
}

/// 校验分析服务配置
fn validate_service(config: &ReplayerConfig) -> Result<(), ContractError> {
    let service = &config.service;

    let base_url = service.base_url.trim();
    if base_url.is_empty() {
        return Err(ContractError::config_validation(
            "service.base_url",
            "base_url cannot be empty",
        ));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "service.base_url",
            format!("base_url must start with http:// or https://, got '{base_url}'"),
        ));
    }

    if service.timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "service.timeout_secs",
            "timeout_secs must be > 0",
        ));
    }

    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(config: &ReplayerConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::Network {
            let addr = sink.params.get("addr").ok_or_else(|| {
                ContractError::config_validation(
                    format!("sinks[{}].params.addr", sink.name),
                    "network sink requires 'addr'",
                )
            })?;
            addr.parse::<SocketAddr>().map_err(|e| {
                ContractError::config_validation(
                    format!("sinks[{}].params.addr", sink.name),
                    format!("invalid socket address '{addr}': {e}"),
                )
            })?;
        }
    }
    Ok(())
}
