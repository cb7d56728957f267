use crate::error::TransportError;
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

// 构建客户端 TLS 配置：webpki 根证书，加上可选的 PEM 证书包
pub fn client_config(ca_file: Option<&Path>) -> Result<Arc<ClientConfig>, TransportError> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = ca_file {
        debug!("Loading additional trust anchors from {:?}", path);
        let mut reader = BufReader::new(File::open(path)?);
        let mut added = 0usize;
        for cert in rustls_pemfile::certs(&mut reader) {
            root_store.add(cert?)?;
            added += 1;
        }
        if added == 0 {
            return Err(TransportError::Tls(format!(
                "no certificates found in {}",
                path.display()
            )));
        }
    }

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

// 复制一份配置并设置 ALPN
pub fn with_alpn(base: &ClientConfig, protocols: &[&[u8]]) -> ClientConfig {
    let mut config = base.clone();
    config.alpn_protocols = protocols.iter().map(|p| p.to_vec()).collect();
    config
}
