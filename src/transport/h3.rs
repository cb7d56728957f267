use crate::config::TransportConfig;
use crate::error::{BoxError, TransportError};
use crate::r#const::{h3_defaults, stack_labels};
use crate::tls;
use crate::transport::http_client::RoundTrip;
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use rustls::ClientConfig;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Error, Debug)]
pub enum H3Error {
    #[error("request URI has no host")]
    MissingHost,

    #[error("resolving {0}: {1}")]
    Resolve(String, #[source] io::Error),

    #[error("no address found for {0}")]
    NoAddress(String),

    #[error("binding QUIC endpoint: {0}")]
    Bind(#[source] io::Error),

    #[error("initiating QUIC connection to {0}: {1}")]
    Connect(SocketAddr, #[source] quinn::ConnectError),

    #[error("QUIC handshake with {0} timed out")]
    HandshakeTimeout(String),

    #[error("QUIC connection to {0} failed: {1}")]
    Connection(SocketAddr, #[source] quinn::ConnectionError),

    #[error("HTTP/3 {stage}: {message}")]
    Protocol {
        stage: &'static str,
        message: String,
    },
}

impl H3Error {
    fn protocol(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Protocol {
            stage,
            message: err.to_string(),
        }
    }
}

// 单次请求的 QUIC 会话；无论以何种方式退出都会关闭连接和端点
struct QuicSession {
    endpoint: quinn::Endpoint,
    connection: quinn::Connection,
    driver: Option<JoinHandle<()>>,
}

impl Drop for QuicSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        let code = quinn::VarInt::from_u32(h3_defaults::NO_ERROR);
        self.connection.close(code, b"");
        self.endpoint.close(code, b"");
    }
}

// HTTP/3 over QUIC 协议栈
pub struct H3RoundTripper {
    client_config: quinn::ClientConfig,
    handshake_timeout: Duration,
}

impl H3RoundTripper {
    pub fn new(config: &TransportConfig, tls: &ClientConfig) -> Result<Self, TransportError> {
        let tls = tls::with_alpn(tls, &[h3_defaults::ALPN]);
        let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(Arc::new(tls))
            .map_err(|e| TransportError::Tls(format!("invalid QUIC TLS config: {}", e)))?;

        let mut transport = quinn::TransportConfig::default();
        if config.no_pmtud {
            debug!("Disabling QUIC path MTU discovery");
            transport.mtu_discovery_config(None);
        }

        let mut client_config = quinn::ClientConfig::new(Arc::new(quic_crypto));
        client_config.transport_config(Arc::new(transport));

        Ok(Self {
            client_config,
            handshake_timeout: config.handshake_timeout_duration(),
        })
    }

    async fn resolve_addr(&self, host: &str, port: u16) -> Result<SocketAddr, H3Error> {
        let target = format!("{}:{}", host, port);
        let mut addrs = tokio::time::timeout(
            self.handshake_timeout,
            tokio::net::lookup_host((host, port)),
        )
        .await
        .map_err(|_| H3Error::HandshakeTimeout(target.clone()))?
        .map_err(|e| H3Error::Resolve(target.clone(), e))?;

        addrs.next().ok_or(H3Error::NoAddress(target))
    }

    async fn connect(&self, host: &str, port: u16) -> Result<QuicSession, H3Error> {
        let addr = self.resolve_addr(host, port).await?;

        let bind: SocketAddr = if addr.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let mut endpoint = quinn::Endpoint::client(bind).map_err(H3Error::Bind)?;
        endpoint.set_default_client_config(self.client_config.clone());

        let connecting = endpoint
            .connect(addr, host)
            .map_err(|e| H3Error::Connect(addr, e))?;

        let connection = tokio::time::timeout(self.handshake_timeout, connecting)
            .await
            .map_err(|_| H3Error::HandshakeTimeout(addr.to_string()))?
            .map_err(|e| H3Error::Connection(addr, e))?;

        debug!("QUIC connection established with {}({})", host, addr);

        Ok(QuicSession {
            endpoint,
            connection,
            driver: None,
        })
    }

    async fn execute(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, H3Error> {
        let (parts, body) = request.into_parts();
        let host = parts
            .uri
            .host()
            .ok_or(H3Error::MissingHost)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = parts.uri.port_u16().unwrap_or(h3_defaults::DEFAULT_PORT);

        let mut session = self.connect(&host, port).await?;

        let h3_conn = h3_quinn::Connection::new(session.connection.clone());
        let (mut driver, mut send_request) = h3::client::new(h3_conn)
            .await
            .map_err(|e| H3Error::protocol("client setup", e))?;

        session.driver = Some(tokio::spawn(async move {
            let _ = std::future::poll_fn(|cx| driver.poll_close(cx)).await;
        }));

        let mut stream = send_request
            .send_request(http::Request::from_parts(parts, ()))
            .await
            .map_err(|e| H3Error::protocol("send request", e))?;

        if !body.is_empty() {
            stream
                .send_data(body)
                .await
                .map_err(|e| H3Error::protocol("send data", e))?;
        }

        stream
            .finish()
            .await
            .map_err(|e| H3Error::protocol("finish stream", e))?;

        let response = stream
            .recv_response()
            .await
            .map_err(|e| H3Error::protocol("receive response", e))?;

        // 读取完整响应体
        let mut data = BytesMut::new();
        while let Some(mut chunk) = stream
            .recv_data()
            .await
            .map_err(|e| H3Error::protocol("read body", e))?
        {
            data.extend_from_slice(chunk.chunk());
            chunk.advance(chunk.remaining());
        }

        drop(session);

        let (parts, ()) = response.into_parts();
        Ok(http::Response::from_parts(parts, data.freeze()))
    }
}

#[async_trait]
impl RoundTrip for H3RoundTripper {
    async fn round_trip(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        Ok(self.execute(request).await?)
    }

    fn protocol_name(&self) -> &'static str {
        stack_labels::H3
    }
}
