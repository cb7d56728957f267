//! Oblivious DNS-over-HTTPS (RFC 9230).
//!
//! A query is sealed for the target resolver's published HPKE key and posted
//! to a proxy, which forwards the opaque bytes to the target. The pipeline is
//! a fixed sequence of steps, each producing the typed input of the next:
//!
//! ```text
//! discover_config -> encrypt_query -> relay -> validate_content_type
//!     -> decrypt_response -> decode
//! ```

use crate::{
    config::{HttpVersion, TransportConfig},
    error::TransportError,
    r#const::{http_headers, odoh_defaults, transport_labels},
    tls,
    transport::{
        check_transaction_id,
        endpoint::{authority, request_url},
        http_client::{HttpClient, RoundTrip},
        network_error, observe, pack_query, unpack_response, DnsTransport,
    },
};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use hickory_proto::op::Message;
use odoh_rs::{
    compose, parse, ObliviousDoHConfigContents, ObliviousDoHMessage,
    ObliviousDoHMessagePlaintext, OdohSecret,
};
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Target configuration chosen during discovery.
#[derive(Debug)]
pub struct DiscoveredConfig {
    // 目标的 ODoH 解析地址
    pub target: Url,
    pub contents: ObliviousDoHConfigContents,
}

/// A sealed query together with the state needed to open its answer.
///
/// Opening consumes it, so the client secret serves exactly one response.
pub struct EncryptedQuery {
    plaintext: ObliviousDoHMessagePlaintext,
    secret: OdohSecret,
    body: Bytes,
}

impl EncryptedQuery {
    // 已封装的 ObliviousDoHMessage 字节
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// What came back from the proxy (or target), not yet trusted.
#[derive(Debug)]
pub struct RelayedResponse {
    pub url: String,
    pub host: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct ObliviousTransport {
    config: TransportConfig,
    tls: Option<Arc<ClientConfig>>,
}

impl ObliviousTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config, tls: None }
    }

    // 使用调用方提供的 TLS 配置，替代默认根证书
    pub fn with_tls_config(mut self, tls: Arc<ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Resolves `query` through `proxy_host` to `target_host`.
    ///
    /// Without a proxy the sealed query is posted straight to the target, which
    /// still hides the query from on-path observers but not the client address.
    pub async fn query(
        &self,
        query: &Message,
        target_host: &str,
        proxy_host: Option<&str>,
    ) -> Result<Message, TransportError> {
        let tls = match &self.tls {
            Some(tls) => tls.clone(),
            None => tls::client_config(self.config.ca_file.as_deref())?,
        };
        // 中继始终走 HTTP/1.1 或 HTTP/2
        if self.config.http_version == HttpVersion::Http3 {
            warn!("[odoh] HTTP/3 is not used for ODoH, relaying over the standard HTTP stack");
        }
        let client = HttpClient::create_standard(&self.config, &tls)?;
        let timeout = self.config.timeout_duration();
        let user_agent = self.config.user_agent();

        let discovered = discover_config(&client, target_host, user_agent, timeout).await?;
        let encrypted = encrypt_query(query, &discovered.contents, self.config.odoh_padding)?;
        let relayed = relay(
            &client,
            &encrypted,
            &discovered.target,
            proxy_host,
            user_agent,
            timeout,
        )
        .await?;

        validate_content_type(&relayed)?;
        if relayed.status != http::StatusCode::OK.as_u16() {
            return Err(TransportError::Protocol {
                status: relayed.status,
                url: relayed.url,
            });
        }

        let plaintext = decrypt_response(encrypted, &relayed)?;
        let message = unpack_response(&plaintext, &relayed.url)?;

        check_transaction_id(query, message, self.config.id_mismatch, &relayed.url)
    }
}

#[async_trait]
impl DnsTransport for ObliviousTransport {
    async fn send(&self, query: &Message) -> Result<Message, TransportError> {
        observe(
            transport_labels::ODOH,
            self.query(query, &self.config.server, self.config.proxy.as_deref()),
        )
        .await
    }

    fn protocol_name(&self) -> &'static str {
        transport_labels::ODOH
    }
}

// 获取目标发布的 ODoH 配置，并选出第一个受支持的配置
pub async fn discover_config(
    client: &dyn RoundTrip,
    target_host: &str,
    user_agent: Option<&str>,
    timeout: Duration,
) -> Result<DiscoveredConfig, TransportError> {
    let target = request_url(target_host, odoh_defaults::TARGET_PATH)?;

    let mut discovery = target.clone();
    discovery.set_path(odoh_defaults::CONFIG_DISCOVERY_PATH);
    discovery.set_query(None);
    let url = discovery.to_string();

    let mut builder = http::Request::get(url.as_str());
    if let Some(agent) = user_agent {
        builder = builder.header(http_headers::USER_AGENT, agent);
    }
    let request = builder
        .body(Bytes::new())
        .map_err(|e| network_error(&url, Box::new(e)))?;

    debug!("[odoh] fetching configuration from {}", url);
    let response = match tokio::time::timeout(timeout, client.round_trip(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(source)) => return Err(network_error(&url, source)),
        Err(_) => return Err(TransportError::Timeout { url }),
    };

    let host = authority(&target);
    if response.status() != http::StatusCode::OK {
        return Err(TransportError::ConfigDiscovery {
            target: host,
            reason: format!("got status code {} from {}", response.status().as_u16(), url),
        });
    }

    let contents = select_config(response.body(), &host)?;
    Ok(DiscoveredConfig { target, contents })
}

/// Walks a serialized `ObliviousDoHConfigs` list and picks the first entry
/// whose version, KEM, KDF and AEAD this client implements.
///
/// Entries are skipped on their outer framing alone, so a list that also
/// advertises other suites still yields a usable config. Only the selected
/// entry's contents are handed to `odoh_rs::parse`.
pub fn select_config(
    body: &[u8],
    target: &str,
) -> Result<ObliviousDoHConfigContents, TransportError> {
    let invalid = |reason: String| TransportError::ConfigDiscovery {
        target: target.to_string(),
        reason,
    };

    if body.is_empty() {
        return Err(invalid("empty configuration body".to_string()));
    }

    // configs<1..2^16-1>
    let mut buf = body;
    if buf.remaining() < 2 {
        return Err(invalid("truncated configuration list".to_string()));
    }
    let list_len = buf.get_u16() as usize;
    if buf.remaining() < list_len {
        return Err(invalid(format!(
            "configuration list declares {} bytes, {} available",
            list_len,
            buf.remaining()
        )));
    }
    let mut list = &buf[..list_len];
    if list.is_empty() {
        return Err(invalid("configuration list is empty".to_string()));
    }

    // version(2) | length(2) | contents
    let mut selected = None;
    while list.has_remaining() {
        if list.remaining() < 4 {
            return Err(invalid("truncated configuration entry".to_string()));
        }
        let version = list.get_u16();
        let length = list.get_u16() as usize;
        if list.remaining() < length {
            return Err(invalid(format!(
                "configuration entry declares {} bytes, {} available",
                length,
                list.remaining()
            )));
        }
        let (contents, rest) = list.split_at(length);
        list = rest;

        if version == odoh_defaults::CONFIG_VERSION && is_supported(contents) {
            if selected.is_none() {
                selected = Some(contents);
            }
        } else {
            debug!(
                "[odoh] skipping unsupported configuration (version {:#06x}) from {}",
                version, target
            );
        }
    }

    let contents = selected.ok_or_else(|| TransportError::UnsupportedConfig {
        target: target.to_string(),
    })?;

    let mut contents = Bytes::copy_from_slice(contents);
    parse(&mut contents).map_err(|e: odoh_rs::Error| invalid(e.to_string()))
}

// kem_id(2) | kdf_id(2) | aead_id(2) | public_key
fn is_supported(contents: &[u8]) -> bool {
    use odoh_defaults::algorithms;

    if contents.len() < 6 {
        return false;
    }

    let id = |offset: usize| u16::from_be_bytes([contents[offset], contents[offset + 1]]);
    id(0) == algorithms::KEM_X25519_HKDF_SHA256
        && id(2) == algorithms::KDF_HKDF_SHA256
        && id(4) == algorithms::AEAD_AES_128_GCM
}

// 编码查询并用目标公钥封装
pub fn encrypt_query(
    query: &Message,
    config: &ObliviousDoHConfigContents,
    padding: usize,
) -> Result<EncryptedQuery, TransportError> {
    let query_data = pack_query(query)?;
    let plaintext = ObliviousDoHMessagePlaintext::new(&query_data, padding);

    let mut rng = rand::thread_rng();
    let (message, secret) = odoh_rs::encrypt_query(&plaintext, config, &mut rng)
        .map_err(TransportError::Encryption)?;
    let body = compose(&message)
        .map_err(TransportError::Encryption)?
        .freeze();

    Ok(EncryptedQuery {
        plaintext,
        secret,
        body,
    })
}

// 经代理（或直接）把密文 POST 给目标
pub async fn relay(
    client: &dyn RoundTrip,
    encrypted: &EncryptedQuery,
    target: &Url,
    proxy_host: Option<&str>,
    user_agent: Option<&str>,
    timeout: Duration,
) -> Result<RelayedResponse, TransportError> {
    let url = match proxy_host {
        Some(proxy) => {
            let mut url = request_url(proxy, odoh_defaults::PROXY_PATH)?;
            url.query_pairs_mut()
                .append_pair(odoh_defaults::TARGET_HOST_PARAM, &authority(target))
                .append_pair(odoh_defaults::TARGET_PATH_PARAM, target.path());
            url
        }
        None => target.clone(),
    };
    let host = authority(&url);

    let mut builder = http::Request::post(url.as_str())
        .header(
            http_headers::CONTENT_TYPE,
            http_headers::content_types::OBLIVIOUS_DNS_MESSAGE,
        )
        .header(
            http_headers::ACCEPT,
            http_headers::content_types::OBLIVIOUS_DNS_MESSAGE,
        );
    if let Some(agent) = user_agent {
        builder = builder.header(http_headers::USER_AGENT, agent);
    }
    let request = builder
        .body(encrypted.body().clone())
        .map_err(|e| TransportError::Relay {
            host: host.clone(),
            source: Box::new(e),
        })?;

    info!("[odoh] relaying query for {} via {}", authority(target), host);
    let response = match tokio::time::timeout(timeout, client.round_trip(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(source)) => return Err(TransportError::Relay { host, source }),
        Err(elapsed) => {
            return Err(TransportError::Relay {
                host,
                source: Box::new(elapsed),
            })
        }
    };

    let content_type = response
        .headers()
        .get(http_headers::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    Ok(RelayedResponse {
        url: url.to_string(),
        host,
        status: response.status().as_u16(),
        content_type,
        body: response.into_body(),
    })
}

/// Rejects anything not labelled as an ODoH message, including clear-text
/// `application/dns-message` answers from a downgrading proxy or target.
pub fn validate_content_type(response: &RelayedResponse) -> Result<(), TransportError> {
    let valid = response
        .content_type
        .as_deref()
        .and_then(|value| value.split(';').next())
        .map(|essence| {
            essence
                .trim()
                .eq_ignore_ascii_case(http_headers::content_types::OBLIVIOUS_DNS_MESSAGE)
        })
        .unwrap_or(false);

    if valid {
        return Ok(());
    }

    Err(TransportError::InvalidContentType {
        host: response.host.clone(),
        content_type: response
            .content_type
            .clone()
            .unwrap_or_else(|| "<missing>".to_string()),
    })
}

// 用加密查询时保留的密钥打开响应，返回 DNS 明文
pub fn decrypt_response(
    encrypted: EncryptedQuery,
    response: &RelayedResponse,
) -> Result<Bytes, TransportError> {
    let decryption_error = |source: odoh_rs::Error| TransportError::Decryption {
        host: response.host.clone(),
        source,
    };

    let mut body = response.body.clone();
    let message: ObliviousDoHMessage = parse(&mut body).map_err(decryption_error)?;
    let plaintext =
        odoh_rs::decrypt_response(&encrypted.plaintext, &message, encrypted.secret)
            .map_err(decryption_error)?;

    Ok(plaintext.into_msg())
}
