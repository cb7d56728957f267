pub mod args;
pub mod config;
pub mod r#const;
pub mod error;
pub mod metrics;
pub mod tls;
pub mod transport;

// 重导出常用组件
pub use args::Args;
pub use config::{DoHMethod, HttpVersion, IdMismatchPolicy, TransportConfig, TransportProtocol};
pub use error::{ConfigError, TransportError};
pub use metrics::METRICS;
pub use transport::{
    build_url, create_transport, DirectTransport, DnsTransport, HttpClient, ObliviousTransport,
    RoundTrip,
};
