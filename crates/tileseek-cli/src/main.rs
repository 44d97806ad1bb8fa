//! `tileseek`: list the lidar point-cloud tiles covering a point.
//!
//! ```text
//! tileseek -82.461096 40.028172
//! tileseek -9179527.2 4870037.0 --crs 3857 --json
//! ```

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tileseek_geo::{Crs, Point};
use tileseek_resolver::{ResolutionEngine, ResolutionResult, ResolveError, ResolverConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "prometheus")]
use tileseek_metrics::PrometheusHandle;

#[derive(Parser, Debug)]
#[command(name = "tileseek")]
#[command(about = "Find the USGS lidar tiles whose footprint covers a point")]
#[command(version, allow_negative_numbers = true)]
struct Cli {
    /// X coordinate (longitude for EPSG:4326)
    x: f64,

    /// Y coordinate (latitude for EPSG:4326)
    y: f64,

    /// EPSG code of the input point
    #[arg(long, default_value_t = 4326)]
    crs: u32,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spatial index query endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Descriptors per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum concurrent requests
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print matches and statistics as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write resolver metrics in Prometheus text format to this file on exit
    #[cfg(feature = "prometheus")]
    #[arg(long, value_name = "PATH")]
    metrics_out: Option<PathBuf>,
}

impl Cli {
    /// File (or default) configuration with command-line overrides applied.
    fn resolver_config(&self) -> Result<ResolverConfig, ResolveError> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::from_file(path)?,
            None => ResolverConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.index_endpoint = endpoint.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency_limit = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.fetch_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    fn point(&self) -> Point {
        Point::new(self.x, self.y, Crs(self.crs))
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn render_json(point: &Point, result: &ResolutionResult) -> serde_json::Value {
    let matches: Vec<_> = result
        .matches
        .iter()
        .map(|m| {
            json!({
                "descriptor": m.descriptor.as_str(),
                "data_link": m.data_link.as_str(),
            })
        })
        .collect();

    json!({
        "point": point,
        "matches": matches,
        "stats": result.stats,
    })
}

async fn run(cli: &Cli) -> Result<(), ResolveError> {
    let config = cli.resolver_config()?;
    let engine = ResolutionEngine::from_config(&config)?;
    let point = cli.point();

    info!(
        point = %point,
        endpoint = %config.index_endpoint,
        batch_size = engine.batch_size(),
        concurrency = engine.concurrency_limit(),
        "Resolving tiles"
    );
    let result = engine.resolve(point).await?;

    if cli.json {
        println!("{:#}", render_json(&point, &result));
    } else {
        for link in result.data_links() {
            println!("{link}");
        }
    }

    if result.is_empty() {
        info!(point = %point, "No tiles cover this point");
    }
    Ok(())
}

#[cfg(feature = "prometheus")]
fn write_metrics(path: &std::path::Path, handle: &PrometheusHandle) {
    match std::fs::write(path, handle.render()) {
        Ok(()) => info!(path = %path.display(), "Wrote metrics"),
        Err(e) => error!(path = %path.display(), error = %e, "Failed to write metrics"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    #[cfg(feature = "prometheus")]
    let exporter = match &cli.metrics_out {
        Some(path) => match tileseek_metrics::install_prometheus_recorder() {
            Ok(handle) => Some((path.clone(), handle)),
            Err(e) => {
                error!("Failed to install metrics recorder: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let outcome = run(&cli).await;

    #[cfg(feature = "prometheus")]
    if let Some((path, handle)) = &exporter {
        write_metrics(path, handle);
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_negative_coordinates() {
        let cli = Cli::try_parse_from(["tileseek", "-82.461096", "40.028172"]).unwrap();
        assert_eq!(cli.x, -82.461096);
        assert_eq!(cli.y, 40.028172);
        assert_eq!(cli.point().crs, Crs::WGS84);
        assert!(!cli.json);
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "tileseek",
            "-9179527.2",
            "4870037.0",
            "--crs",
            "3857",
            "--batch-size",
            "500",
            "--concurrency",
            "32",
            "--timeout",
            "10",
            "--endpoint",
            "http://localhost:9000/query",
        ])
        .unwrap();

        let config = cli.resolver_config().unwrap();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.concurrency_limit, 32);
        assert_eq!(config.fetch_timeout_secs, 10);
        assert_eq!(config.index_endpoint, "http://localhost:9000/query");
        assert_eq!(cli.point().crs, Crs::WEB_MERCATOR);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cli = Cli::try_parse_from(["tileseek", "0", "0", "--batch-size", "0"]).unwrap();
        assert!(cli.resolver_config().is_err());
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_metrics_out_flag() {
        let cli = Cli::try_parse_from(["tileseek", "1", "2", "--metrics-out", "run.prom"]).unwrap();
        assert_eq!(cli.metrics_out, Some(PathBuf::from("run.prom")));
    }

    #[test]
    fn test_json_shape() {
        let result = ResolutionResult::default();
        let value = render_json(&Point::lon_lat(1.0, 2.0), &result);
        assert_eq!(value["matches"], json!([]));
        assert_eq!(value["stats"]["matches"], 0);
        assert_eq!(value["point"]["x"], 1.0);
    }
}
