use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use valuable::Valuable;

#[derive(Args, serde::Deserialize, Clone)]
pub struct Config {
    #[arg(long, env = "GENNEXT_HOST", default_value_t = String::from("localhost"))]
    host: String,
    #[arg(long, env = "GENNEXT_PORT", default_value_t = 8000)]
    port: u16,
    /// Directory under which PRS package artifacts are written, one
    /// subdirectory per job.
    #[arg(long, env = "GENNEXT_PRS_OUTPUT_DIR", default_value = "/tmp/prs_output")]
    prs_output_dir: Utf8PathBuf,
    #[command(flatten)]
    #[serde(flatten)]
    thresholds: QcThresholds,
}

impl Config {
    #[must_use]
    pub fn app_address(&self) -> String {
        let Self { host, port, .. } = self;

        format!("{host}:{port}")
    }

    #[must_use]
    pub fn thresholds(&self) -> &QcThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn prs_output_dir(&self) -> &Utf8Path {
        &self.prs_output_dir
    }
}

/// QC banding limits. Read once at startup from flags or the environment and
/// passed into the rule functions explicitly - the rules themselves never
/// consult the environment, so tests can inject their own limits.
#[derive(Args, Serialize, Deserialize, Valuable, Clone, Copy, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct QcThresholds {
    /// Minimum acceptable DNA concentration (ng/µL).
    #[arg(long, env = "DNA_MIN_CONC", default_value_t = 20.0)]
    pub dna_min_conc: f64,
    /// Lower bound of the acceptable A260/280 purity window.
    #[arg(long, env = "A260_280_MIN", default_value_t = 1.7)]
    pub a260_280_min: f64,
    /// Upper bound of the acceptable A260/280 purity window.
    #[arg(long, env = "A260_280_MAX", default_value_t = 2.1)]
    pub a260_280_max: f64,
    /// Minimum acceptable A260/230 ratio.
    #[arg(long, env = "A260_230_MIN", default_value_t = 1.8)]
    pub a260_230_min: f64,
    /// Minimum call rate for a Pass on genotyping metrics.
    #[arg(long, env = "CALLRATE_MIN", default_value_t = 0.98)]
    pub callrate_min: f64,
    /// Minimum dish QC for a Pass/Warn on genotyping metrics.
    #[arg(long, env = "DISHQC_MIN", default_value_t = 0.82)]
    pub dishqc_min: f64,
}

impl Default for QcThresholds {
    fn default() -> Self {
        Self {
            dna_min_conc: 20.0,
            a260_280_min: 1.7,
            a260_280_max: 2.1,
            a260_230_min: 1.8,
            callrate_min: 0.98,
            dishqc_min: 0.82,
        }
    }
}

#[derive(Parser)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,
    #[arg(long, env = "GENNEXT_LOG_DIR")]
    pub log_dir: Option<Utf8PathBuf>,
}
