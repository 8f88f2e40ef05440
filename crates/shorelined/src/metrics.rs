//! Prometheus metrics for modem signal readings.

use prometheus::{
    register_gauge_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, Encoder, GaugeVec, IntCounter, IntGaugeVec, Registry,
    TextEncoder,
};
use shoreline_core::SignalReport;
use std::sync::Arc;

/// Signal metrics for Prometheus.
///
/// Per-channel gauges are cleared and rebuilt on every refresh, so a channel
/// that drops out of the bonding group disappears from the exposition instead
/// of serving its last reading forever.
#[derive(Clone)]
pub struct SignalMetrics {
    pub downstream_snr: GaugeVec,
    pub downstream_power_level: GaugeVec,
    pub downstream_unerrored_codewords: GaugeVec,
    pub downstream_correctable_codewords: GaugeVec,
    pub downstream_uncorrectable_codewords: GaugeVec,
    pub upstream_symbol_rate: GaugeVec,
    pub upstream_power_level: GaugeVec,
    pub modem_info: IntGaugeVec,
    pub scrape_errors_total: IntCounter,

    registry: Arc<Registry>,
}

impl SignalMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let downstream_snr = register_gauge_vec_with_registry!(
            "downstream_snr",
            "Downstream signal-to-noise ratio in dB",
            &["channel", "frequency_hz", "modulation"],
            registry
        )
        .unwrap();

        let downstream_power_level = register_gauge_vec_with_registry!(
            "downstream_power_level",
            "Downstream power level reading in dBmV",
            &["channel", "frequency_hz", "modulation"],
            registry
        )
        .unwrap();

        let downstream_unerrored_codewords = register_gauge_vec_with_registry!(
            "downstream_unerrored_codewords",
            "Codewords received intact since power-on",
            &["channel"],
            registry
        )
        .unwrap();

        let downstream_correctable_codewords = register_gauge_vec_with_registry!(
            "downstream_correctable_codewords",
            "Codewords recovered by error correction since power-on",
            &["channel"],
            registry
        )
        .unwrap();

        let downstream_uncorrectable_codewords = register_gauge_vec_with_registry!(
            "downstream_uncorrectable_codewords",
            "Codewords dropped as unrecoverable since power-on",
            &["channel"],
            registry
        )
        .unwrap();

        let upstream_symbol_rate = register_gauge_vec_with_registry!(
            "upstream_symbol_rate",
            "Upstream symbol rate in sym/sec",
            &["channel", "frequency_hz", "modulation", "lock_status"],
            registry
        )
        .unwrap();

        let upstream_power_level = register_gauge_vec_with_registry!(
            "upstream_power_level",
            "Upstream power level reading in dBmV",
            &["channel", "frequency_hz", "modulation", "lock_status"],
            registry
        )
        .unwrap();

        let modem_info = register_int_gauge_vec_with_registry!(
            "modem_info",
            "Detected modem family, always 1",
            &["model"],
            registry
        )
        .unwrap();

        let scrape_errors_total = register_int_counter_with_registry!(
            "scrape_errors_total",
            "Total status page scrapes that failed",
            registry
        )
        .unwrap();

        Self {
            downstream_snr,
            downstream_power_level,
            downstream_unerrored_codewords,
            downstream_correctable_codewords,
            downstream_uncorrectable_codewords,
            upstream_symbol_rate,
            upstream_power_level,
            modem_info,
            scrape_errors_total,
            registry: Arc::new(registry),
        }
    }

    /// Publish the detected family. Called once after resolution.
    pub fn set_modem(&self, model: &str) {
        self.modem_info.with_label_values(&[model]).set(1);
    }

    /// Replace every per-channel series with the readings of one scrape.
    pub fn record_report(&self, report: &SignalReport) {
        self.downstream_snr.reset();
        self.downstream_power_level.reset();
        self.downstream_unerrored_codewords.reset();
        self.downstream_correctable_codewords.reset();
        self.downstream_uncorrectable_codewords.reset();
        self.upstream_symbol_rate.reset();
        self.upstream_power_level.reset();

        for (channel, r) in &report.downstream {
            let labels = [channel.as_str(), r.frequency.as_str(), r.modulation.as_str()];
            self.downstream_snr.with_label_values(&labels).set(r.snr);
            self.downstream_power_level
                .with_label_values(&labels)
                .set(r.power_level);
            self.downstream_correctable_codewords
                .with_label_values(&[channel.as_str()])
                .set(r.correctable);
            self.downstream_uncorrectable_codewords
                .with_label_values(&[channel.as_str()])
                .set(r.uncorrectable);
            // Only the row-per-attribute firmware reports this counter;
            // absent means no series, not zero.
            if let Some(unerrored) = r.unerrored {
                self.downstream_unerrored_codewords
                    .with_label_values(&[channel.as_str()])
                    .set(unerrored);
            }
        }

        for (channel, r) in &report.upstream {
            let labels = [
                channel.as_str(),
                r.frequency.as_str(),
                r.modulation.as_str(),
                r.lock_status.as_str(),
            ];
            self.upstream_symbol_rate
                .with_label_values(&labels)
                .set(r.symbol_rate);
            self.upstream_power_level
                .with_label_values(&labels)
                .set(r.power_level);
        }
    }

    /// Count a failed scrape.
    pub fn record_scrape_error(&self) {
        self.scrape_errors_total.inc();
    }

    /// Export metrics in Prometheus text format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for SignalMetrics {
    fn default() -> Self {
        Self::new()
    }
}
