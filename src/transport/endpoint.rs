use crate::error::TransportError;
use crate::r#const::url_defaults;
use url::Url;

// 补全协议前缀，返回协议之后的部分用于判断是否带路径
fn with_scheme(server: &str) -> (String, &str) {
    let server = server.trim();
    for prefix in [url_defaults::HTTPS_PREFIX, url_defaults::HTTP_PREFIX] {
        if let Some(rest) = server.strip_prefix(prefix) {
            return (server.to_string(), rest);
        }
    }
    (format!("{}{}", url_defaults::HTTPS_PREFIX, server), server)
}

/// Parses a server string that may omit its scheme and path.
///
/// A missing scheme becomes `https://`. When the URL has no path, `default_path`
/// is set as the path and percent-encoded as one, so literal query text in it is
/// never merged into real query parameters.
pub fn parse_target(server: &str, default_path: &str) -> Result<Url, url::ParseError> {
    let (full, _) = with_scheme(server);
    let mut url = Url::parse(&full)?;
    if !default_path.is_empty() && matches!(url.path(), "" | "/") {
        url.set_path(default_path);
    }
    Ok(url)
}

/// Renders the target URL the way it was written.
///
/// The `url` crate always gives an origin a root `/`; a server written
/// without a path, with no default path to add, comes back without it.
pub fn build_url(server: &str, default_path: &str) -> Result<String, url::ParseError> {
    let url = parse_target(server, default_path)?;
    let (_, rest) = with_scheme(server);

    let written_without_path = !rest.contains('/');
    let bare = default_path.is_empty()
        && written_without_path
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none();

    let rendered = url.as_str();
    match rendered.strip_suffix('/') {
        Some(origin) if bare => Ok(origin.to_string()),
        _ => Ok(rendered.to_string()),
    }
}

// 同 parse_target，解析失败时转换为传输错误
pub(crate) fn request_url(server: &str, default_path: &str) -> Result<Url, TransportError> {
    parse_target(server, default_path).map_err(|e| TransportError::Transport {
        url: server.to_string(),
        source: Box::new(e),
    })
}

// 主机名加非默认端口，用于代理的 targethost 参数
pub fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
