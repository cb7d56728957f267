use crate::config::{DoHMethod, HttpVersion, IdMismatchPolicy, TransportConfig, TransportProtocol};
use crate::error::ConfigError;
use crate::r#const::{doh_defaults, odoh_limits, timeout_limits};
use clap::{ArgAction, Parser};
use hickory_proto::error::ProtoError;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use std::path::PathBuf;
use std::str::FromStr;

// DoH / ODoH 查询工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dnshttp",
    author,
    version,
    about = "Send a DNS query over HTTPS (RFC 8484) or Oblivious DoH (RFC 9230)\n\n\
             Key Features:\n\
             - DoH over HTTP/1.1, HTTP/2 or HTTP/3 (QUIC), GET or POST\n\
             - ODoH with target configuration discovery and proxy relaying\n\
             - Transaction ID verification with explicit override\n\
             - YAML configuration files with validation"
)]
pub struct Args {
    // 查询的域名
    pub name: String,

    // 记录类型
    #[arg(default_value = "A")]
    pub record_type: String,

    // 配置文件路径（设置后忽略其余传输参数）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    // DoH 服务器 URL 或 ODoH 目标主机
    #[arg(short, long, default_value = doh_defaults::DEFAULT_SERVER)]
    pub server: String,

    #[arg(
        long = "odoh",
        action = ArgAction::SetTrue,
        help = "Use Oblivious DoH; --server names the target resolver"
    )]
    pub odoh: bool,

    #[arg(long, help = "ODoH proxy host")]
    pub proxy: Option<String>,

    #[arg(
        long = "odoh-padding",
        help = "Zero bytes appended to ODoH plaintexts",
        default_value_t = odoh_limits::DEFAULT_PADDING
    )]
    pub odoh_padding: usize,

    #[arg(long = "post", action = ArgAction::SetTrue, help = "Use POST instead of GET")]
    pub post: bool,

    #[arg(long = "http3", action = ArgAction::SetTrue, help = "Use HTTP/3 over QUIC")]
    pub http3: bool,

    #[arg(
        long = "no-pmtud",
        action = ArgAction::SetTrue,
        help = "Disable QUIC path MTU discovery (HTTP/3 only)"
    )]
    pub no_pmtud: bool,

    #[arg(
        long,
        help = "Overall timeout in seconds",
        default_value_t = timeout_limits::DEFAULT_TIMEOUT
    )]
    pub timeout: u64,

    #[arg(
        long = "handshake-timeout",
        help = "TLS/QUIC handshake timeout in seconds",
        default_value_t = timeout_limits::DEFAULT_HANDSHAKE_TIMEOUT
    )]
    pub handshake_timeout: u64,

    #[arg(long = "user-agent", help = "HTTP User-Agent header")]
    pub user_agent: Option<String>,

    #[arg(long = "ca-file", help = "PEM bundle of additional trusted CAs")]
    pub ca_file: Option<PathBuf>,

    #[arg(
        long = "accept-mismatched-id",
        action = ArgAction::SetTrue,
        help = "Accept responses whose transaction ID differs from the query"
    )]
    pub accept_mismatched_id: bool,

    // 测试配置
    #[arg(
        short = 't',
        long = "test",
        action = ArgAction::SetTrue,
        help = "Validate the transport configuration and exit"
    )]
    pub test_config: bool,

    // 启用调试日志
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        help = "Enable debug level logging for detailed output"
    )]
    pub debug: bool,
}

impl Args {
    // 解析命令行参数
    pub fn parse_args() -> Self {
        Args::parse()
    }

    // 生成传输配置：优先使用配置文件
    pub fn to_config(&self) -> Result<TransportConfig, ConfigError> {
        if let Some(path) = &self.config {
            return TransportConfig::from_file(path);
        }

        let config = TransportConfig {
            protocol: if self.odoh {
                TransportProtocol::Odoh
            } else {
                TransportProtocol::Doh
            },
            server: self.server.clone(),
            proxy: self.proxy.clone(),
            method: if self.post {
                DoHMethod::Post
            } else {
                DoHMethod::Get
            },
            http_version: if self.http3 {
                HttpVersion::Http3
            } else {
                HttpVersion::Http2
            },
            timeout: self.timeout,
            handshake_timeout: self.handshake_timeout,
            user_agent: self.user_agent.clone(),
            no_pmtud: self.no_pmtud,
            ca_file: self.ca_file.clone(),
            id_mismatch: if self.accept_mismatched_id {
                IdMismatchPolicy::Accept
            } else {
                IdMismatchPolicy::Reject
            },
            odoh_padding: self.odoh_padding,
        };
        config.validate()?;
        Ok(config)
    }

    // 构造递归查询消息
    pub fn query_message(&self) -> Result<Message, ProtoError> {
        let name = if self.name.ends_with('.') {
            Name::from_ascii(&self.name)?
        } else {
            Name::from_ascii(format!("{}.", self.name))?
        };
        let record_type = RecordType::from_str(&self.record_type.to_uppercase())?;

        let mut message = Message::new();
        message.set_id(rand::random::<u16>());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(Query::query(name, record_type));
        Ok(message)
    }
}
