use crate::config::{HttpVersion, TransportConfig};
use crate::error::{BoxError, TransportError};
use crate::r#const::{alpn, stack_labels};
use crate::tls;
use crate::transport::h3::H3RoundTripper;
use async_trait::async_trait;
use bytes::Bytes;
use rustls::ClientConfig;
use tracing::debug;

/// One HTTP exchange over some HTTP stack.
///
/// Implementations are built for a single call and dropped with it.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError>;

    fn protocol_name(&self) -> &'static str;
}

// HTTP/1.1 与 HTTP/2 协议栈（reqwest）
pub struct StandardRoundTripper {
    client: reqwest::Client,
}

#[async_trait]
impl RoundTrip for StandardRoundTripper {
    async fn round_trip(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();

        // 读取完整响应体
        let body = response.bytes().await?;

        let mut converted = http::Response::new(body);
        *converted.status_mut() = status;
        *converted.version_mut() = version;
        *converted.headers_mut() = headers;
        Ok(converted)
    }

    fn protocol_name(&self) -> &'static str {
        stack_labels::HTTP
    }
}

pub struct HttpClient;

impl HttpClient {
    // 按配置选择协议栈，创建仅用于本次调用的客户端
    pub fn create(
        config: &TransportConfig,
        tls: &ClientConfig,
    ) -> Result<Box<dyn RoundTrip>, TransportError> {
        match config.http_version {
            HttpVersion::Http2 => Ok(Box::new(Self::create_standard(config, tls)?)),
            HttpVersion::Http3 => {
                debug!("Using HTTP/3");
                Ok(Box::new(H3RoundTripper::new(config, tls)?))
            }
        }
    }

    // 创建 HTTP/1.1 或 HTTP/2 客户端
    pub fn create_standard(
        config: &TransportConfig,
        tls: &ClientConfig,
    ) -> Result<StandardRoundTripper, TransportError> {
        debug!(
            "Creating HTTP client, timeout: {}s, handshake timeout: {}s",
            config.timeout, config.handshake_timeout
        );

        // 每次调用最多保留一个空闲连接，不跨调用复用
        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls::with_alpn(tls, &[alpn::H2, alpn::HTTP_11]))
            .connect_timeout(config.handshake_timeout_duration())
            .timeout(config.timeout_duration())
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| TransportError::Tls(format!("Failed to create HTTP client: {}", e)))?;

        Ok(StandardRoundTripper { client })
    }
}
