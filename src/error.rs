use crate::r#const::error_labels;
use hickory_proto::error::ProtoError;
use hickory_proto::op::Message;
use std::io;
use thiserror::Error;

// 各 HTTP 协议栈共享的底层错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// 传输错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("packing DNS message: {0}")]
    Encoding(#[source] ProtoError),

    #[error("unpacking DNS response from {url}: {source}")]
    Decoding {
        url: String,
        #[source]
        source: ProtoError,
    },

    #[error("requesting {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("relaying through {host}: {source}")]
    Relay {
        host: String,
        #[source]
        source: BoxError,
    },

    #[error("got status code {status} from {url}")]
    Protocol { status: u16, url: String },

    #[error("invalid serialized ObliviousDoHConfig from {target}: {reason}")]
    ConfigDiscovery { target: String, reason: String },

    #[error("{target} publishes no ObliviousDoHConfig with supported algorithms")]
    UnsupportedConfig { target: String },

    #[error("{host} responded with an invalid Content-Type header: {content_type}")]
    InvalidContentType { host: String, content_type: String },

    #[error("encrypting ODoH query: {0}")]
    Encryption(#[source] odoh_rs::Error),

    #[error("decrypting ODoH response from {host}: {source}")]
    Decryption {
        host: String,
        #[source]
        source: odoh_rs::Error,
    },

    #[error("response id {actual} does not match query id {expected}")]
    IdentifierMismatch {
        expected: u16,
        actual: u16,
        response: Box<Message>,
    },

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TransportError {
    // 返回稳定的错误类型标签，用于指标和日志
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encoding(_) => error_labels::ENCODING,
            Self::Decoding { .. } => error_labels::DECODING,
            Self::Transport { .. } => error_labels::TRANSPORT,
            Self::Timeout { .. } => error_labels::TIMEOUT,
            Self::Relay { .. } => error_labels::RELAY,
            Self::Protocol { .. } => error_labels::PROTOCOL,
            Self::ConfigDiscovery { .. } => error_labels::CONFIG_DISCOVERY,
            Self::UnsupportedConfig { .. } => error_labels::UNSUPPORTED_CONFIG,
            Self::InvalidContentType { .. } => error_labels::INVALID_CONTENT_TYPE,
            Self::Encryption(_) => error_labels::ENCRYPTION,
            Self::Decryption { .. } => error_labels::DECRYPTION,
            Self::IdentifierMismatch { .. } => error_labels::ID_MISMATCH,
            Self::Tls(_) => error_labels::TLS,
            Self::Config(_) => error_labels::CONFIG,
        }
    }

    /// Recovers the decoded response carried by an identifier mismatch.
    ///
    /// The response was received but cannot be proven to answer the query
    /// that was sent; callers that take it accept that risk.
    pub fn into_response(self) -> Option<Message> {
        match self {
            Self::IdentifierMismatch { response, .. } => Some(*response),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Tls(err.to_string())
    }
}

impl From<rustls::Error> for TransportError {
    fn from(err: rustls::Error) -> Self {
        Self::Tls(err.to_string())
    }
}

// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadError(#[from] io::Error),

    #[error("YAML parsing error: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
