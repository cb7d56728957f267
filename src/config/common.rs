use serde::{Deserialize, Serialize};

// 传输协议枚举
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    // 直接 DNS-over-HTTPS
    #[default]
    Doh,
    // Oblivious DNS-over-HTTPS
    Odoh,
}

// DoH请求方法枚举
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DoHMethod {
    // GET请求方法
    #[default]
    Get,
    // POST请求方法
    Post,
}

impl DoHMethod {
    pub fn as_http(&self) -> http::Method {
        match self {
            DoHMethod::Get => http::Method::GET,
            DoHMethod::Post => http::Method::POST,
        }
    }
}

// HTTP 协议栈选择
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpVersion {
    // HTTP/1.1 或 HTTP/2（TCP）
    #[default]
    Http2,
    // HTTP/3（QUIC）
    Http3,
}

// 响应事务ID与查询不一致时的处理策略
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdMismatchPolicy {
    // 返回错误（错误中仍携带解码后的响应）
    #[default]
    Reject,
    // 记录警告后照常返回响应
    Accept,
}
