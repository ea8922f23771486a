// Observability: metrics recording and Prometheus rendering

pub mod metrics;

pub use metrics::{init, render, MetricName};
