// 应用常量定义

//
// 配置参数限制常量
//

// 超时配置限制
pub mod timeout_limits {
    // 默认请求总超时（秒）
    pub const DEFAULT_TIMEOUT: u64 = 5;
    // 默认握手超时（秒）
    pub const DEFAULT_HANDSHAKE_TIMEOUT: u64 = 3;
    // 最小超时
    pub const MIN_TIMEOUT: u64 = 1;
    // 最大超时
    pub const MAX_TIMEOUT: u64 = 65535;
}

// ODoH 配置限制
pub mod odoh_limits {
    // 默认填充长度
    pub const DEFAULT_PADDING: usize = 0;
    // 最大填充长度
    pub const MAX_PADDING: usize = 512;
}

//
// 协议常量
//

// DoH 默认值
pub mod doh_defaults {
    // GET 请求中携带 DNS 消息的查询参数
    pub const DNS_QUERY_PARAM: &str = "dns";
    // 默认 DoH 服务器
    pub const DEFAULT_SERVER: &str = "https://dns.google/dns-query";
}

// ODoH 默认值
pub mod odoh_defaults {
    // 配置发现路径
    pub const CONFIG_DISCOVERY_PATH: &str = "/.well-known/odohconfigs";
    // 代理转发路径
    pub const PROXY_PATH: &str = "/proxy";
    // 目标解析路径
    pub const TARGET_PATH: &str = "/dns-query";
    // 支持的 ObliviousDoHConfig 版本
    pub const CONFIG_VERSION: u16 = 0x0001;
    // 代理查询参数：目标主机
    pub const TARGET_HOST_PARAM: &str = "targethost";
    // 代理查询参数：目标路径
    pub const TARGET_PATH_PARAM: &str = "targetpath";

    // 支持的 HPKE 算法标识
    pub mod algorithms {
        // DHKEM(X25519, HKDF-SHA256)
        pub const KEM_X25519_HKDF_SHA256: u16 = 0x0020;
        // HKDF-SHA256
        pub const KDF_HKDF_SHA256: u16 = 0x0001;
        // AES-128-GCM
        pub const AEAD_AES_128_GCM: u16 = 0x0001;
    }
}

// URL 默认值
pub mod url_defaults {
    // 默认协议前缀
    pub const HTTPS_PREFIX: &str = "https://";
    // 明文协议前缀
    pub const HTTP_PREFIX: &str = "http://";
}

// HTTP/3 常量
pub mod h3_defaults {
    // 默认端口
    pub const DEFAULT_PORT: u16 = 443;
    // ALPN 标识
    pub const ALPN: &[u8] = b"h3";
    // H3_NO_ERROR 关闭码
    pub const NO_ERROR: u32 = 0x100;
}

// HTTP/1.1 与 HTTP/2 的 ALPN 标识
pub mod alpn {
    pub const H2: &[u8] = b"h2";
    pub const HTTP_11: &[u8] = b"http/1.1";
}

// HTTP头常量
pub mod http_headers {
    // Content-Type 头
    pub const CONTENT_TYPE: &str = "Content-Type";
    // Accept 头
    pub const ACCEPT: &str = "Accept";
    // User-Agent 头
    pub const USER_AGENT: &str = "User-Agent";

    // 内容类型常量
    pub mod content_types {
        // DNS消息内容类型
        pub const DNS_MESSAGE: &str = "application/dns-message";
        // ODoH消息内容类型
        pub const OBLIVIOUS_DNS_MESSAGE: &str = "application/oblivious-dns-message";
    }
}

//
// 指标标签常量
//

// 传输类型标签
pub mod transport_labels {
    // 直接 DoH
    pub const DOH: &str = "doh";
    // Oblivious DoH
    pub const ODOH: &str = "odoh";
}

// HTTP 协议栈标签
pub mod stack_labels {
    // HTTP/1.1 或 HTTP/2
    pub const HTTP: &str = "http";
    // HTTP/3
    pub const H3: &str = "h3";
}

// 错误类型标签
pub mod error_labels {
    pub const ENCODING: &str = "encoding";
    pub const DECODING: &str = "decoding";
    pub const TRANSPORT: &str = "transport";
    pub const TIMEOUT: &str = "timeout";
    pub const RELAY: &str = "relay";
    pub const PROTOCOL: &str = "protocol";
    pub const CONFIG_DISCOVERY: &str = "config_discovery";
    pub const UNSUPPORTED_CONFIG: &str = "unsupported_config";
    pub const INVALID_CONTENT_TYPE: &str = "invalid_content_type";
    pub const ENCRYPTION: &str = "encryption";
    pub const DECRYPTION: &str = "decryption";
    pub const ID_MISMATCH: &str = "id_mismatch";
    pub const TLS: &str = "tls";
    pub const CONFIG: &str = "config";
}
