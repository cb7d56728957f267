use assert_matches::assert_matches;
use clap::Parser;
use dnshttp::args::Args;
use dnshttp::config::{DoHMethod, HttpVersion, IdMismatchPolicy, TransportProtocol};
use dnshttp::error::ConfigError;
use hickory_proto::op::MessageType;
use hickory_proto::rr::RecordType;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_default_arguments() {
    let args = Args::try_parse_from(["dnshttp", "example.com"]).unwrap();
    assert_eq!(args.name, "example.com");
    assert_eq!(args.record_type, "A");
    assert!(!args.debug);
    assert!(!args.test_config);

    let config = args.to_config().unwrap();
    assert_eq!(config.protocol, TransportProtocol::Doh);
    assert_eq!(config.server, "https://dns.google/dns-query");
    assert_eq!(config.method, DoHMethod::Get);
    assert_eq!(config.http_version, HttpVersion::Http2);
    assert_eq!(config.timeout, 5);
    assert_eq!(config.handshake_timeout, 3);
    assert_eq!(config.id_mismatch, IdMismatchPolicy::Reject);
}

#[test]
fn test_doh_flags() {
    let args = Args::try_parse_from([
        "dnshttp",
        "example.com",
        "aaaa",
        "-s",
        "https://dns.example.com/dns-query",
        "--post",
        "--http3",
        "--no-pmtud",
        "--timeout",
        "10",
        "--handshake-timeout",
        "4",
        "--user-agent",
        "dnshttp-test/1.0",
        "--accept-mismatched-id",
    ])
    .unwrap();

    let config = args.to_config().unwrap();
    assert_eq!(config.server, "https://dns.example.com/dns-query");
    assert_eq!(config.method, DoHMethod::Post);
    assert_eq!(config.http_version, HttpVersion::Http3);
    assert!(config.no_pmtud);
    assert_eq!(config.timeout, 10);
    assert_eq!(config.handshake_timeout, 4);
    assert_eq!(config.user_agent(), Some("dnshttp-test/1.0"));
    assert_eq!(config.id_mismatch, IdMismatchPolicy::Accept);

    let query = args.query_message().unwrap();
    assert_eq!(query.queries()[0].query_type(), RecordType::AAAA);
}

#[test]
fn test_odoh_flags() {
    let args = Args::try_parse_from([
        "dnshttp",
        "example.com",
        "--odoh",
        "-s",
        "odoh.cloudflare-dns.com",
        "--proxy",
        "odoh.crypto.sx",
        "--odoh-padding",
        "32",
    ])
    .unwrap();

    let config = args.to_config().unwrap();
    assert_eq!(config.protocol, TransportProtocol::Odoh);
    assert_eq!(config.server, "odoh.cloudflare-dns.com");
    assert_eq!(config.proxy.as_deref(), Some("odoh.crypto.sx"));
    assert_eq!(config.odoh_padding, 32);
}

#[test]
fn test_proxy_without_odoh_is_rejected() {
    let args =
        Args::try_parse_from(["dnshttp", "example.com", "--proxy", "odoh.crypto.sx"]).unwrap();
    assert_matches!(args.to_config(), Err(ConfigError::ValidationError(_)));
}

#[test]
fn test_config_file_takes_precedence() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"protocol: odoh\nserver: \"odoh.example.net\"\n")
        .unwrap();
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    let args = Args::try_parse_from(["dnshttp", "example.com", "-c", path, "--post"]).unwrap();

    let config = args.to_config().unwrap();
    assert_eq!(config.protocol, TransportProtocol::Odoh);
    assert_eq!(config.server, "odoh.example.net");
    assert_eq!(config.method, DoHMethod::Get);
}

#[test]
fn test_query_message() {
    let args = Args::try_parse_from(["dnshttp", "example.com.", "mx"]).unwrap();
    let query = args.query_message().unwrap();

    assert_eq!(query.message_type(), MessageType::Query);
    assert!(query.recursion_desired());
    assert_eq!(query.queries().len(), 1);
    assert_eq!(query.queries()[0].name().to_ascii(), "example.com.");
    assert_eq!(query.queries()[0].query_type(), RecordType::MX);

    // 未知记录类型
    let args = Args::try_parse_from(["dnshttp", "example.com", "bogus"]).unwrap();
    assert!(args.query_message().is_err());
}
