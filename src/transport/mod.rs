// 声明子模块
pub mod doh;
pub mod endpoint;
pub mod h3;
pub mod http_client;
pub mod odoh;

pub use doh::DirectTransport;
pub use endpoint::build_url;
pub use http_client::{HttpClient, RoundTrip};
pub use odoh::ObliviousTransport;

use crate::config::{IdMismatchPolicy, TransportConfig, TransportProtocol};
use crate::error::{BoxError, TransportError};
use crate::metrics::METRICS;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::future::Future;
use std::time::Instant;
use tracing::{error, warn};

/// A way of carrying one DNS query to a resolver and bringing back its answer.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(&self, query: &Message) -> Result<Message, TransportError>;

    fn protocol_name(&self) -> &'static str;
}

// 根据配置中的协议创建传输
pub fn create_transport(config: TransportConfig) -> Box<dyn DnsTransport> {
    match config.protocol {
        TransportProtocol::Doh => Box::new(DirectTransport::new(config)),
        TransportProtocol::Odoh => Box::new(ObliviousTransport::new(config)),
    }
}

// 将DNS查询编码为二进制数据
pub(crate) fn pack_query(query: &Message) -> Result<Vec<u8>, TransportError> {
    query.to_vec().map_err(TransportError::Encoding)
}

// 解析二进制响应为DNS消息
pub(crate) fn unpack_response(body: &[u8], url: &str) -> Result<Message, TransportError> {
    Message::from_vec(body).map_err(|source| TransportError::Decoding {
        url: url.to_string(),
        source,
    })
}

// 校验响应的事务ID；不一致时绝不丢弃已解码的响应
pub(crate) fn check_transaction_id(
    query: &Message,
    response: Message,
    policy: IdMismatchPolicy,
    url: &str,
) -> Result<Message, TransportError> {
    if response.id() == query.id() {
        return Ok(response);
    }

    warn!(
        "Response from {} has id {}, expected {}",
        url,
        response.id(),
        query.id()
    );

    match policy {
        IdMismatchPolicy::Reject => Err(TransportError::IdentifierMismatch {
            expected: query.id(),
            actual: response.id(),
            response: Box::new(response),
        }),
        IdMismatchPolicy::Accept => Ok(response),
    }
}

// 将底层网络错误归类：reqwest 自身的超时视为超时错误
pub(crate) fn network_error(url: &str, source: BoxError) -> TransportError {
    let timed_out = source
        .downcast_ref::<reqwest::Error>()
        .map(|e| e.is_timeout())
        .unwrap_or(false);

    if timed_out {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Transport {
            url: url.to_string(),
            source,
        }
    }
}

// 记录一次查询的请求数、耗时和错误指标
pub(crate) async fn observe<F>(transport: &'static str, call: F) -> Result<Message, TransportError>
where
    F: Future<Output = Result<Message, TransportError>>,
{
    METRICS
        .transport_requests_total()
        .with_label_values(&[transport])
        .inc();

    let start_time = Instant::now();
    let result = call.await;

    METRICS
        .transport_duration_seconds()
        .with_label_values(&[transport])
        .observe(start_time.elapsed().as_secs_f64());

    if let Err(ref e) = result {
        error!("[{}] query failed: {}", transport, e);
        METRICS
            .transport_errors_total()
            .with_label_values(&[transport, e.kind()])
            .inc();
    }

    result
}
