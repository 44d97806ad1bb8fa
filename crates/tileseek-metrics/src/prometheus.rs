//! Prometheus text export.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install a Prometheus recorder as the global recorder and describe every
/// resolver metric.
///
/// No HTTP listener is started. The handle renders the text exposition
/// format on demand.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    crate::describe_metrics();
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric_defs;

    #[test]
    fn test_render_includes_recorded_counter() {
        let handle = install_prometheus_recorder().unwrap();
        metrics::counter!(metric_defs::DESCRIPTOR_MATCHES.name).increment(2);

        let text = handle.render();
        assert!(
            text.lines()
                .any(|l| l.starts_with("tileseek_descriptor_matches") && l.ends_with(" 2")),
            "unexpected exposition:\n{text}"
        );
    }
}
