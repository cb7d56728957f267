use dnshttp::transport::endpoint::{authority, build_url, parse_target};

#[test]
fn test_build_url_without_default_path() {
    let url = build_url("https://www.example.com", "").unwrap();
    assert_eq!(url, "https://www.example.com");

    let url = build_url("http://www.example.com", "").unwrap();
    assert_eq!(url, "http://www.example.com");

    // 显式写出的根路径保留
    let url = build_url("https://www.example.com/", "").unwrap();
    assert_eq!(url, "https://www.example.com/");
}

#[test]
fn test_build_url_escapes_literal_query_text() {
    // 默认路径中的查询文本按路径转义，不会变成真正的查询参数
    let url = build_url("https://www.example.com", "?foo=bar&baz=qux").unwrap();
    assert_eq!(url, "https://www.example.com/%3Ffoo=bar&baz=qux");

    let parsed = parse_target("https://www.example.com", "?foo=bar&baz=qux").unwrap();
    assert!(parsed.query().is_none());
    assert_eq!(parsed.query_pairs().count(), 0);
}

#[test]
fn test_build_url_adds_scheme_and_default_path() {
    let url = build_url("odoh.cloudflare-dns.com", "/dns-query").unwrap();
    assert_eq!(url, "https://odoh.cloudflare-dns.com/dns-query");

    let url = build_url("  dns.google  ", "/dns-query").unwrap();
    assert_eq!(url, "https://dns.google/dns-query");

    let url = build_url("dns.google", "").unwrap();
    assert_eq!(url, "https://dns.google");
}

#[test]
fn test_build_url_keeps_explicit_path() {
    let url = build_url("https://dns.example.com/resolve", "/dns-query").unwrap();
    assert_eq!(url, "https://dns.example.com/resolve");

    let parsed = parse_target("http://127.0.0.1:8053/custom?x=1", "/dns-query").unwrap();
    assert_eq!(parsed.path(), "/custom");
    assert_eq!(parsed.query(), Some("x=1"));
}

#[test]
fn test_build_url_rejects_garbage() {
    assert!(build_url("https://", "").is_err());
    assert!(build_url("http://exa mple.com", "").is_err());
}

#[test]
fn test_authority() {
    let url = parse_target("https://odoh.example.net/dns-query", "").unwrap();
    assert_eq!(authority(&url), "odoh.example.net");

    let url = parse_target("http://127.0.0.1:8443", "").unwrap();
    assert_eq!(authority(&url), "127.0.0.1:8443");

    // 默认端口不会出现
    let url = parse_target("https://odoh.example.net:443", "").unwrap();
    assert_eq!(authority(&url), "odoh.example.net");
}
