use dnshttp::{create_transport, Args, TransportError, METRICS};
use hickory_proto::op::Message;
use mimalloc::MiMalloc;
use std::process;
use tracing::{debug, error, info, warn};

// 使用 mimalloc 分配器提高内存效率
#[global_allocator]
static GLOBAL: MiMalloc = mimalloc::MiMalloc;

fn init_logging(args: &Args) {
    let builder = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    // 如果启用调试模式，输出调试信息，否则只输出 info 及以上级别
    if args.debug {
        builder.with_max_level(tracing::Level::DEBUG)
    } else {
        builder.with_max_level(tracing::Level::INFO)
    }
    .init();
}

fn print_response(response: &Message) {
    println!(
        ";; id: {}, status: {}, answers: {}",
        response.id(),
        response.response_code(),
        response.answers().len()
    );
    for query in response.queries() {
        println!(";{}", query);
    }
    for record in response.answers() {
        println!("{}", record);
    }
}

// 程序入口
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志
    init_logging(&args);

    // 加载配置
    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid transport configuration: {}", e);
            process::exit(1);
        }
    };

    // 如果是测试模式，成功验证配置后退出
    if args.test_config {
        info!("Configuration validation successful");
        return Ok(());
    }

    let query = match args.query_message() {
        Ok(query) => query,
        Err(e) => {
            error!("Invalid query: {}", e);
            process::exit(1);
        }
    };

    let transport = create_transport(config);
    info!(
        "Resolving {} {} via {}",
        args.name,
        args.record_type.to_uppercase(),
        transport.protocol_name()
    );

    let result = transport.send(&query).await;

    // 调试模式下输出本次查询的指标
    if args.debug {
        match METRICS.export_metrics() {
            Ok(text) => debug!("Transport metrics:\n{}", text),
            Err(e) => debug!("Failed to export metrics: {}", e),
        }
    }

    match result {
        Ok(response) => {
            print_response(&response);
            Ok(())
        }
        Err(e @ TransportError::IdentifierMismatch { .. }) => {
            warn!("{}; rerun with --accept-mismatched-id to use it anyway", e);
            process::exit(2);
        }
        Err(_) => process::exit(1),
    }
}
