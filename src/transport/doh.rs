use crate::{
    config::{DoHMethod, TransportConfig},
    error::TransportError,
    r#const::{doh_defaults, http_headers, transport_labels},
    tls,
    transport::{
        check_transaction_id, endpoint::request_url, http_client::HttpClient, network_error,
        observe, pack_query, unpack_response, DnsTransport,
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bytes::Bytes;
use hickory_proto::op::Message;
use rustls::ClientConfig;
use std::sync::Arc;
use tracing::debug;

/// DNS-over-HTTPS (RFC 8484) against a single server URL.
///
/// Every query builds its own HTTP client, so calls share nothing and may run
/// concurrently.
pub struct DirectTransport {
    config: TransportConfig,
    tls: Option<Arc<ClientConfig>>,
}

impl DirectTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config, tls: None }
    }

    // 使用调用方提供的 TLS 配置，替代默认根证书
    pub fn with_tls_config(mut self, tls: Arc<ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    // 构造 DoH 请求
    pub fn build_request(&self, query: &Message) -> Result<http::Request<Bytes>, TransportError> {
        // 将DNS查询编码为二进制数据
        let query_data = pack_query(query)?;

        // 服务器 URL 原样使用，只追加 dns 参数
        let mut url = request_url(&self.config.server, "")?;
        let mut builder = http::Request::builder()
            .method(self.config.method.as_http())
            .header(
                http_headers::ACCEPT,
                http_headers::content_types::DNS_MESSAGE,
            );

        // 根据配置的方法选择GET或POST
        let body = match self.config.method {
            DoHMethod::Get => {
                // Base64Url编码后作为查询参数
                let b64_data = URL_SAFE_NO_PAD.encode(&query_data);
                url.query_pairs_mut()
                    .append_pair(doh_defaults::DNS_QUERY_PARAM, &b64_data);
                Bytes::new()
            }
            DoHMethod::Post => {
                builder = builder.header(
                    http_headers::CONTENT_TYPE,
                    http_headers::content_types::DNS_MESSAGE,
                );
                Bytes::from(query_data)
            }
        };

        if let Some(agent) = self.config.user_agent() {
            debug!("Setting User-Agent to {}", agent);
            builder = builder.header(http_headers::USER_AGENT, agent);
        }

        builder
            .uri(url.as_str())
            .body(body)
            .map_err(|e| TransportError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            })
    }

    // 执行一次完整的 DoH 请求/响应
    pub async fn query(&self, query: &Message) -> Result<Message, TransportError> {
        let tls = match &self.tls {
            Some(tls) => tls.clone(),
            None => tls::client_config(self.config.ca_file.as_deref())?,
        };
        let client = HttpClient::create(&self.config, &tls)?;

        let request = self.build_request(query)?;
        let url = request.uri().to_string();
        debug!(
            "[{}] sending {} request to {}",
            client.protocol_name(),
            request.method(),
            url
        );

        let response =
            match tokio::time::timeout(self.config.timeout_duration(), client.round_trip(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(source)) => return Err(network_error(&url, source)),
                Err(_) => return Err(TransportError::Timeout { url }),
            };

        // 检查状态码，非200时不解析响应体
        if response.status() != http::StatusCode::OK {
            return Err(TransportError::Protocol {
                status: response.status().as_u16(),
                url,
            });
        }

        debug!(
            "[{}] received {} bytes from {}",
            client.protocol_name(),
            response.body().len(),
            url
        );

        // 解析二进制响应为DNS消息
        let message = unpack_response(response.body(), &url)?;

        check_transaction_id(query, message, self.config.id_mismatch, &url)
    }
}

#[async_trait]
impl DnsTransport for DirectTransport {
    async fn send(&self, query: &Message) -> Result<Message, TransportError> {
        observe(transport_labels::DOH, self.query(query)).await
    }

    fn protocol_name(&self) -> &'static str {
        transport_labels::DOH
    }
}
