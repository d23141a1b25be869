//! Command line entry point for the county and state trend reports.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use covid_trends::charts::{StaticChartRenderer, DEFAULT_SIZE};
use covid_trends::config::{
    Granularity, Metric, RegionChoice, ReportConfig, DEFAULT_COUNTIES, DEFAULT_STATE,
    DEFAULT_STATES,
};
use covid_trends::gui::{ChartSettings, TrendApp};
use covid_trends::pipeline;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "covid_trends", about = "COVID-19 case and death trends by county or state")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report counties of one state
    Counties {
        /// Comma-separated county names, or N for the top N counties
        #[arg(short = 'c', long, default_value = DEFAULT_COUNTIES)]
        counties: String,
        /// State the counties belong to
        #[arg(short = 's', long, default_value = DEFAULT_STATE)]
        state: String,
        /// Print how to refresh the upstream data before running
        #[arg(short = 'g', long)]
        get: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Report states
    States {
        /// Comma-separated state names, or N for the top N states
        #[arg(short = 's', long, default_value = DEFAULT_STATES)]
        states: String,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Print every row of each region
    #[arg(short = 'l', long)]
    lines: bool,
    /// Log-scaled Y axis
    #[arg(short = 'o', long)]
    log: bool,
    /// Chart all regions on one plot: c/d daily cases/deaths, C/D total cases/deaths
    #[arg(short = 'm', long)]
    multi: Option<String>,
    /// Show values as a percentage of population
    #[arg(short = 'n', long)]
    norm: bool,
    /// Echo the parsed options
    #[arg(short = 'd', long)]
    debug: bool,
    /// Observations CSV (defaults to the upstream file name)
    #[arg(long)]
    data: Option<PathBuf>,
    /// Population estimates CSV
    #[arg(long)]
    population: Option<PathBuf>,
    /// Also write the chart to this PNG file
    #[arg(long)]
    save: Option<PathBuf>,
}

impl CommonArgs {
    fn apply(self, config: &mut ReportConfig) {
        config.lines = self.lines;
        config.log_y = self.log;
        config.multi = self.multi.as_deref().map(Metric::from_flag);
        config.normalize = self.norm;
        config.debug = self.debug;
        if let Some(data) = self.data {
            config.data_file = data;
        }
        if let Some(population) = self.population {
            config.population_file = population;
        }
        config.save_chart = self.save;
    }
}

fn build_config(command: Commands) -> ReportConfig {
    match command {
        Commands::Counties {
            counties,
            state,
            get,
            common,
        } => {
            let mut config = ReportConfig::new(Granularity::County);
            config.regions = RegionChoice::parse(&counties);
            config.parent = Some(state);
            config.fetch = get;
            common.apply(&mut config);
            config
        }
        Commands::States { states, common } => {
            let mut config = ReportConfig::new(Granularity::State);
            config.regions = RegionChoice::parse(&states);
            common.apply(&mut config);
            config
        }
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = build_config(cli.command);
    log::debug!("Running {} report", config.granularity.noun());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = pipeline::run(&config, &mut out)
        .with_context(|| format!("{} report failed", config.granularity.noun()))?;
    out.flush()?;
    drop(out);

    let Some(chart) = outcome.chart else {
        return Ok(());
    };
    let metric = config.metric();

    if let Some(path) = &config.save_chart {
        StaticChartRenderer::save_png(&chart, metric, config.log_y, path, DEFAULT_SIZE)
            .with_context(|| format!("Failed to save chart to {}", path.display()))?;
    }

    TrendApp::run(
        chart,
        ChartSettings {
            metric,
            log_y: config.log_y,
        },
    )
    .map_err(|e| anyhow!("Chart window failed: {e}"))
}
