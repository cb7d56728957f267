use assert_matches::assert_matches;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dnshttp::config::{DoHMethod, HttpVersion, IdMismatchPolicy, TransportConfig};
use dnshttp::error::TransportError;
use dnshttp::metrics::METRICS;
use dnshttp::tls;
use dnshttp::transport::{DirectTransport, DnsTransport, HttpClient};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;
use wiremock::{
    matchers::{body_bytes, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

// 测试DNS消息辅助函数
fn create_test_dns_query(domain: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message.set_id(1234);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);

    let name = Name::from_str(&format!("{}.", domain)).unwrap();
    let query = Query::query(name, record_type);
    message.add_query(query);

    message
}

// 测试DNS回复辅助函数
fn create_test_dns_response(id: u16) -> Vec<u8> {
    let mut response = Message::new();
    response.set_id(id);
    response.set_message_type(MessageType::Response);
    response.set_recursion_desired(true);
    response.set_recursion_available(true);
    response.set_op_code(OpCode::Query);
    response.set_response_code(ResponseCode::NoError);

    let name = Name::from_str("example.com.").unwrap();
    response.add_query(Query::query(name.clone(), RecordType::A));

    // 添加一个回答记录
    let mut record = Record::with(name, RecordType::A, 300);
    record.set_data(Some(RData::A(A(Ipv4Addr::new(93, 184, 216, 34)))));
    response.add_answer(record);

    response.to_vec().unwrap()
}

fn dns_response_template(id: u16) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "application/dns-message")
        .set_body_bytes(create_test_dns_response(id))
}

fn doh_config(mock_server: &MockServer) -> TransportConfig {
    TransportConfig::doh(format!("{}/dns-query", mock_server.uri()))
}

#[tokio::test]
async fn test_doh_get_message() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);
    let encoded = URL_SAFE_NO_PAD.encode(query.to_vec().unwrap());

    // GET 请求必须携带 base64url 编码的 dns 参数
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .and(query_param("dns", encoded.as_str()))
        .and(header("Accept", "application/dns-message"))
        .respond_with(dns_response_template(1234))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = DirectTransport::new(doh_config(&mock_server));
    let response = transport.send(&query).await.unwrap();

    assert_eq!(response.id(), query.id());
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(response.queries().len(), 1);
    assert_eq!(response.queries()[0].name(), query.queries()[0].name());
    assert_eq!(
        response.queries()[0].query_type(),
        query.queries()[0].query_type()
    );
    assert_eq!(response.answers().len(), 1);
}

#[tokio::test]
async fn test_doh_post_message() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    // POST 请求体为二进制 DNS 消息
    Mock::given(method("POST"))
        .and(path("/dns-query"))
        .and(header("Content-Type", "application/dns-message"))
        .and(header("Accept", "application/dns-message"))
        .and(body_bytes(query.to_vec().unwrap()))
        .respond_with(dns_response_template(1234))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = doh_config(&mock_server);
    config.method = DoHMethod::Post;

    let response = DirectTransport::new(config).send(&query).await.unwrap();
    assert_eq!(response.id(), 1234);
}

#[tokio::test]
async fn test_doh_user_agent_header() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(dns_response_template(1234))
        .mount(&mock_server)
        .await;

    // 设置 User-Agent
    let mut config = doh_config(&mock_server);
    config.user_agent = Some("dnshttp-test/1.0".to_string());
    DirectTransport::new(config).send(&query).await.unwrap();

    // 空 User-Agent 不发送
    let mut config = doh_config(&mock_server);
    config.user_agent = Some(String::new());
    DirectTransport::new(config).send(&query).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("user-agent").unwrap().to_str().unwrap(),
        "dnshttp-test/1.0"
    );
    assert!(requests[1].headers.get("user-agent").is_none());
}

#[tokio::test]
async fn test_doh_error_status_codes() {
    let query = create_test_dns_query("example.com", RecordType::A);

    for status in [400u16, 403, 500, 503] {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dns-query"))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("Content-Type", "application/dns-message")
                    .set_body_bytes(create_test_dns_response(1234)),
            )
            .mount(&mock_server)
            .await;

        let result = DirectTransport::new(doh_config(&mock_server))
            .send(&query)
            .await;

        assert_matches!(
            result,
            Err(TransportError::Protocol { status: got, ref url })
                if got == status && url.starts_with(&mock_server.uri()),
            "status {}",
            status
        );
    }
}

#[tokio::test]
async fn test_doh_transaction_id_mismatch_rejected() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(dns_response_template(4321))
        .mount(&mock_server)
        .await;

    let result = DirectTransport::new(doh_config(&mock_server))
        .send(&query)
        .await;

    let err = result.unwrap_err();
    assert_matches!(
        err,
        TransportError::IdentifierMismatch {
            expected: 1234,
            actual: 4321,
            ..
        }
    );

    // 错误中仍保留已解码的响应
    let response = err.into_response().expect("response is carried by the error");
    assert_eq!(response.id(), 4321);
    assert_eq!(response.answers().len(), 1);
}

#[tokio::test]
async fn test_doh_transaction_id_mismatch_accepted() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(dns_response_template(4321))
        .mount(&mock_server)
        .await;

    let mut config = doh_config(&mock_server);
    config.id_mismatch = IdMismatchPolicy::Accept;

    let response = DirectTransport::new(config).send(&query).await.unwrap();
    assert_eq!(response.id(), 4321);
}

#[tokio::test]
async fn test_doh_malformed_response_body() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/dns-message")
                .set_body_bytes(vec![0x00, 0x01, 0x02]),
        )
        .mount(&mock_server)
        .await;

    let result = DirectTransport::new(doh_config(&mock_server))
        .send(&query)
        .await;
    assert_matches!(result, Err(TransportError::Decoding { .. }));
}

#[tokio::test]
async fn test_doh_timeout() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(dns_response_template(1234).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = doh_config(&mock_server);
    config.timeout = 1;
    config.handshake_timeout = 1;

    let result = DirectTransport::new(config).send(&query).await;
    assert_matches!(result, Err(TransportError::Timeout { .. }));
}

#[tokio::test]
async fn test_doh_connection_refused() {
    let query = create_test_dns_query("example.com", RecordType::A);
    let config = TransportConfig::doh("http://127.0.0.1:1/dns-query");

    let result = DirectTransport::new(config).send(&query).await;
    assert_matches!(
        result,
        Err(TransportError::Transport { ref url, .. }) if url.starts_with("http://127.0.0.1:1/dns-query?dns=")
    );
}

#[tokio::test]
async fn test_doh_errors_are_counted() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let _ = DirectTransport::new(doh_config(&mock_server))
        .send(&query)
        .await;

    let errors = METRICS
        .transport_errors_total()
        .with_label_values(&["doh", "protocol"])
        .get();
    assert!(errors >= 1);
    assert!(
        METRICS
            .transport_requests_total()
            .with_label_values(&["doh"])
            .get()
            >= 1
    );
}

#[test]
fn test_doh_request_is_independent_of_http_stack() {
    let query = create_test_dns_query("example.com", RecordType::AAAA);

    let mut config = TransportConfig::doh("https://dns.example.com/dns-query");
    config.user_agent = Some("dnshttp-test/1.0".to_string());
    let http2 = DirectTransport::new(config.clone())
        .build_request(&query)
        .unwrap();

    config.http_version = HttpVersion::Http3;
    let http3 = DirectTransport::new(config).build_request(&query).unwrap();

    assert_eq!(http2.method(), http3.method());
    assert_eq!(http2.uri(), http3.uri());
    assert_eq!(http2.headers(), http3.headers());
    assert_eq!(http2.body(), http3.body());
}

#[test]
fn test_doh_get_request_encoding() {
    let query = create_test_dns_query("example.com", RecordType::A);
    let encoded = URL_SAFE_NO_PAD.encode(query.to_vec().unwrap());

    let request = DirectTransport::new(TransportConfig::doh("dns.example.com/dns-query"))
        .build_request(&query)
        .unwrap();

    assert_eq!(request.method(), http::Method::GET);
    assert_eq!(
        request.uri().to_string(),
        format!("https://dns.example.com/dns-query?dns={}", encoded)
    );
    assert!(!encoded.contains('='));
    assert!(request.body().is_empty());
    assert_eq!(
        request.headers().get("accept").unwrap(),
        "application/dns-message"
    );
    assert!(request.headers().get("user-agent").is_none());
}

#[test]
fn test_doh_server_url_is_used_as_given() {
    let query = create_test_dns_query("example.com", RecordType::A);
    let encoded = URL_SAFE_NO_PAD.encode(query.to_vec().unwrap());

    // 不带路径的服务器地址不会被补上 /dns-query
    let request = DirectTransport::new(TransportConfig::doh("https://doh.example.com"))
        .build_request(&query)
        .unwrap();
    assert_eq!(request.uri().path(), "/");
    assert_eq!(request.uri().query(), Some(format!("dns={}", encoded).as_str()));

    let mut config = TransportConfig::doh("https://doh.example.com/resolve");
    config.method = DoHMethod::Post;
    let request = DirectTransport::new(config).build_request(&query).unwrap();
    assert_eq!(request.uri().path(), "/resolve");
    assert!(request.uri().query().is_none());
}

#[tokio::test]
async fn test_doh_server_without_path() {
    let mock_server = MockServer::start().await;
    let query = create_test_dns_query("example.com", RecordType::A);

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param(
            "dns",
            URL_SAFE_NO_PAD.encode(query.to_vec().unwrap()).as_str(),
        ))
        .respond_with(dns_response_template(1234))
        .expect(1)
        .mount(&mock_server)
        .await;

    // 使用调用方提供的 TLS 配置
    let transport = DirectTransport::new(TransportConfig::doh(mock_server.uri()))
        .with_tls_config(tls::client_config(None).unwrap());
    let response = transport.send(&query).await.unwrap();
    assert_eq!(response.id(), 1234);
}

#[test]
fn test_http_stack_selection() {
    let tls = tls::client_config(None).unwrap();

    let config = TransportConfig::doh("https://dns.example.com/dns-query");
    let client = HttpClient::create(&config, &tls).unwrap();
    assert_eq!(client.protocol_name(), "http");

    let mut config = TransportConfig::doh("https://dns.example.com/dns-query");
    config.http_version = HttpVersion::Http3;
    config.no_pmtud = true;
    let client = HttpClient::create(&config, &tls).unwrap();
    assert_eq!(client.protocol_name(), "h3");
}

#[tokio::test]
async fn test_doh_http3_unreachable_server() {
    let query = create_test_dns_query("example.com", RecordType::A);

    let mut config = TransportConfig::doh("https://127.0.0.1:1/dns-query");
    config.http_version = HttpVersion::Http3;
    config.timeout = 5;
    config.handshake_timeout = 1;

    let result = DirectTransport::new(config).send(&query).await;
    assert_matches!(result, Err(TransportError::Transport { .. }));
}
