use once_cell::sync::Lazy;
use prometheus::{opts, HistogramVec, IntCounterVec, Registry};

// 全局静态指标实例
pub static METRICS: Lazy<TransportMetrics> = Lazy::new(TransportMetrics::new);

// DNS 传输层指标
pub struct TransportMetrics {
    registry: Registry,

    transport_requests_total: IntCounterVec,
    transport_errors_total: IntCounterVec,
    transport_duration_seconds: HistogramVec,
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportMetrics {
    // 创建新的指标收集器
    pub fn new() -> Self {
        let registry = Registry::new();

        let transport_requests_total = IntCounterVec::new(
            opts!(
                "dnshttp_transport_requests_total",
                "Total DNS queries sent, classified by transport (doh, odoh)"
            ),
            &["transport"],
        )
        .unwrap();

        let transport_errors_total = IntCounterVec::new(
            opts!(
                "dnshttp_transport_errors_total",
                "Total failed DNS queries, classified by transport and error kind"
            ),
            &["transport", "kind"],
        )
        .unwrap();

        let transport_duration_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "dnshttp_transport_duration_seconds",
                "DNS query duration in seconds including client setup, classified by transport",
                vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            ),
            &["transport"],
        )
        .unwrap();

        let metrics = TransportMetrics {
            registry,
            transport_requests_total,
            transport_errors_total,
            transport_duration_seconds,
        };

        // 注册所有指标
        metrics.register_all_metrics();

        metrics
    }

    // 注册所有指标
    fn register_all_metrics(&self) {
        self.registry
            .register(Box::new(self.transport_requests_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.transport_errors_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.transport_duration_seconds.clone()))
            .unwrap();
    }

    // 获取 Prometheus 注册表
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // 导出所有指标为文本格式
    pub fn export_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        encoder.encode_utf8(&metric_families, &mut buffer)?;
        Ok(buffer)
    }

    pub fn transport_requests_total(&self) -> &IntCounterVec {
        &self.transport_requests_total
    }

    pub fn transport_errors_total(&self) -> &IntCounterVec {
        &self.transport_errors_total
    }

    pub fn transport_duration_seconds(&self) -> &HistogramVec {
        &self.transport_duration_seconds
    }
}
