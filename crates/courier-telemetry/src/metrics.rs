//! Prometheus metrics.
//!
//! Naming: `cc_<subsystem>_<metric>_<unit>`. Everything lives in one
//! process-wide registry; [`register_metrics`] may be called more than once.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LEDGER METRICS (Subsystem 2)
    // =========================================================================

    pub static ref BLOCKS_SEALED: Counter = Counter::new(
        "cc_ledger_blocks_sealed_total",
        "Blocks persisted by the sealing cycle, genesis included"
    ).expect("metric creation failed");

    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "cc_ledger_chain_height",
        "Height of the current chain head"
    ).expect("metric creation failed");

    /// outcome: sealed/dropped
    pub static ref LEDGER_ENTRIES: CounterVec = CounterVec::new(
        Opts::new("cc_ledger_entries_total", "Mempool entries processed by sealing"),
        &["kind", "outcome"]
    ).expect("metric creation failed");

    /// outcome: applied/unsupported/failed
    pub static ref BACKFILL_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("cc_ledger_backfill_total", "Block-id back-fill outcomes"),
        &["outcome"]
    ).expect("metric creation failed");

    pub static ref SEAL_FAILURES: Counter = Counter::new(
        "cc_ledger_seal_failures_total",
        "Seals abandoned because the block could not be persisted"
    ).expect("metric creation failed");

    // =========================================================================
    // MEMPOOL METRICS (Subsystem 1)
    // =========================================================================

    pub static ref MEMPOOL_EVICTIONS: Counter = Counter::new(
        "cc_mempool_evictions_total",
        "Entries evicted because the mempool was full"
    ).expect("metric creation failed");

    pub static ref MEMPOOL_PENDING: Gauge = Gauge::new(
        "cc_mempool_entries_pending",
        "Entries waiting for the next seal"
    ).expect("metric creation failed");

    // =========================================================================
    // DELIVERY METRICS (Subsystem 3)
    // =========================================================================

    pub static ref CLIENTS_CONNECTED: GaugeVec = GaugeVec::new(
        Opts::new("cc_delivery_clients_connected", "Registered connections per pool"),
        &["pool"]
    ).expect("metric creation failed");

    /// status: pending/delivered/read
    pub static ref STATUS_ADVANCED: CounterVec = CounterVec::new(
        Opts::new("cc_delivery_status_writes_total", "Message status writes by resulting status"),
        &["status"]
    ).expect("metric creation failed");

    pub static ref DELIVERY_FAILURES: CounterVec = CounterVec::new(
        Opts::new("cc_delivery_write_failures_total", "Frames that could not be written"),
        &["pool"]
    ).expect("metric creation failed");
}

/// Registers every metric with [`REGISTRY`]. Idempotent.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ledger
        Box::new(BLOCKS_SEALED.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(LEDGER_ENTRIES.clone()),
        Box::new(BACKFILL_OUTCOMES.clone()),
        Box::new(SEAL_FAILURES.clone()),
        // Mempool
        Box::new(MEMPOOL_EVICTIONS.clone()),
        Box::new(MEMPOOL_PENDING.clone()),
        // Delivery
        Box::new(CLIENTS_CONNECTED.clone()),
        Box::new(STATUS_ADVANCED.clone()),
        Box::new(DELIVERY_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encodes the registry in Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}
