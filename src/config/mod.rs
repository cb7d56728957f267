use crate::error::ConfigError;
use crate::r#const::{odoh_limits, timeout_limits};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::debug;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

pub mod common;

pub use common::*;

// 配置结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

// 自定义验证函数 - 验证URL格式
pub fn validate_url(url_str: &str) -> Result<(), ValidationError> {
    match Url::parse(url_str) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_url")),
    }
}

// 自定义验证函数 - DoH 服务器必须是完整的 URL
pub fn validate_doh_server(config: &TransportConfig) -> Result<(), ValidationError> {
    if matches!(config.protocol, TransportProtocol::Doh) {
        return validate_url(&config.server);
    }
    Ok(())
}

// 自定义验证函数 - 代理仅适用于 ODoH
pub fn validate_proxy_usage(config: &TransportConfig) -> Result<(), ValidationError> {
    match (&config.protocol, &config.proxy) {
        (TransportProtocol::Doh, Some(_)) => Err(ValidationError::new("proxy_requires_odoh")),
        (TransportProtocol::Odoh, Some(proxy)) if proxy.trim().is_empty() => {
            Err(ValidationError::new("empty_proxy"))
        }
        _ => Ok(()),
    }
}

// 自定义验证函数 - ODoH 中继只使用 HTTP/1.1 或 HTTP/2
pub fn validate_odoh_stack(config: &TransportConfig) -> Result<(), ValidationError> {
    if config.protocol == TransportProtocol::Odoh && config.http_version == HttpVersion::Http3 {
        return Err(ValidationError::new("odoh_requires_standard_stack"));
    }
    Ok(())
}

// 自定义验证函数 - 握手超时不能超过总超时
pub fn validate_handshake_timeout(config: &TransportConfig) -> Result<(), ValidationError> {
    if config.handshake_timeout > config.timeout {
        return Err(ValidationError::new("handshake_timeout_exceeds_timeout"));
    }
    Ok(())
}

fn default_timeout() -> u64 {
    timeout_limits::DEFAULT_TIMEOUT
}

fn default_handshake_timeout() -> u64 {
    timeout_limits::DEFAULT_HANDSHAKE_TIMEOUT
}

fn default_padding() -> usize {
    odoh_limits::DEFAULT_PADDING
}

/// Per-call transport configuration.
///
/// A transport reads it for the duration of one call and never mutates it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[validate(schema(
    function = "validate_doh_server",
    message = "DoH server must be a valid URL"
))]
#[validate(schema(
    function = "validate_proxy_usage",
    message = "Proxy is only supported for ODoH and must not be empty"
))]
#[validate(schema(
    function = "validate_odoh_stack",
    message = "HTTP/3 is only supported for DoH"
))]
#[validate(schema(
    function = "validate_handshake_timeout",
    message = "Handshake timeout must not exceed the overall timeout"
))]
pub struct TransportConfig {
    // 传输协议（doh/odoh）
    #[serde(default)]
    pub protocol: TransportProtocol,
    // DoH服务器URL，或 ODoH 目标主机
    #[validate(length(min = 1, message = "Server must not be empty"))]
    pub server: String,
    // ODoH 代理主机（可选）
    #[serde(default)]
    pub proxy: Option<String>,
    // DoH请求方法（GET/POST），默认为GET
    #[serde(default)]
    pub method: DoHMethod,
    // HTTP 协议栈
    #[serde(default)]
    pub http_version: HttpVersion,
    // 请求总超时（秒）
    #[serde(default = "default_timeout")]
    #[validate(range(
        min = timeout_limits::MIN_TIMEOUT,
        max = timeout_limits::MAX_TIMEOUT,
        message = "Timeout must be between 1 and 65535 seconds"
    ))]
    pub timeout: u64,
    // TLS/QUIC 握手超时（秒）
    #[serde(default = "default_handshake_timeout")]
    #[validate(range(
        min = timeout_limits::MIN_TIMEOUT,
        max = timeout_limits::MAX_TIMEOUT,
        message = "Handshake timeout must be between 1 and 65535 seconds"
    ))]
    pub handshake_timeout: u64,
    // HTTP用户代理（可选）
    #[serde(default)]
    pub user_agent: Option<String>,
    // 关闭 QUIC 路径 MTU 探测（仅 HTTP/3）
    #[serde(default)]
    pub no_pmtud: bool,
    // 额外信任的 CA 证书（PEM）
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    // 事务ID不一致时的处理策略
    #[serde(default)]
    pub id_mismatch: IdMismatchPolicy,
    // ODoH 明文填充长度
    #[serde(default = "default_padding")]
    #[validate(range(
        max = odoh_limits::MAX_PADDING,
        message = "ODoH padding must not exceed 512 bytes"
    ))]
    pub odoh_padding: usize,
}

impl TransportConfig {
    // 创建 DoH 配置
    pub fn doh(server: impl Into<String>) -> Self {
        Self {
            protocol: TransportProtocol::Doh,
            server: server.into(),
            ..Self::default()
        }
    }

    // 创建 ODoH 配置
    pub fn odoh(target: impl Into<String>, proxy: Option<String>) -> Self {
        Self {
            protocol: TransportProtocol::Odoh,
            server: target.into(),
            proxy,
            ..Self::default()
        }
    }

    // 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        debug!("Loading configuration file: {:?}", path.as_ref());
        let content = fs::read_to_string(path).map_err(ConfigError::LoadError)?;
        Self::from_yaml_str(&content)
    }

    // 从 YAML 字符串加载配置
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: TransportConfig =
            serde_yaml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    // 验证配置有效性
    pub fn validate(&self) -> ConfigResult<()> {
        // 使用 validator 库进行验证
        if let Err(errors) = Validate::validate(self) {
            return Err(ConfigError::ValidationError(format_validation_errors(
                &errors,
            )));
        }
        Ok(())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn handshake_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout)
    }

    // 仅在非空时返回用户代理
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref().filter(|agent| !agent.is_empty())
    }
}

// 将 ValidationErrors 转换为友好的错误信息
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    // 格式化字段错误
    for (field, error_kind) in errors.errors() {
        match error_kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    messages.push(format!("Field '{}': {}", field, message));
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errors) => {
                messages.push(format!(
                    "Struct '{}' validation failed: {}",
                    field,
                    format_validation_errors(struct_errors)
                ));
            }
            validator::ValidationErrorsKind::List(list_errors) => {
                for (index, err) in list_errors {
                    messages.push(format!(
                        "List '{}' at index {}: {}",
                        field,
                        index,
                        format_validation_errors(err)
                    ));
                }
            }
        }
    }

    if messages.is_empty() {
        "Unknown validation error".to_string()
    } else {
        messages.join("\n")
    }
}

// 默认配置实现
impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            protocol: TransportProtocol::Doh,
            server: crate::r#const::doh_defaults::DEFAULT_SERVER.to_string(),
            proxy: None,
            method: DoHMethod::Get,
            http_version: HttpVersion::Http2,
            timeout: default_timeout(),
            handshake_timeout: default_handshake_timeout(),
            user_agent: None,
            no_pmtud: false,
            ca_file: None,
            id_mismatch: IdMismatchPolicy::Reject,
            odoh_padding: default_padding(),
        }
    }
}
