//! # Tide Calendar Entry Point
//!
//! Computes one year of Sun, Moon and tide series for the configured station
//! and prints them, either as a day-by-day text table or as JSON for a
//! calendar renderer.
//!
//! ```text
//! tide-calendar [--config PATH] [--year N] [--json] [--chart YYYY-MM-DD]
//!               [--heights sun|moon] [--delta-t SECONDS] [--write-config] [-v]
//! ```
//!
//! Logging goes to stderr. `-v` turns on debug output; `TIDE_CALENDAR_LOG`
//! takes any `tracing` filter directive and overrides both.


use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tide_calendar_lib::almanac::Almanac;
use tide_calendar_lib::astro::AstroBody;
use tide_calendar_lib::config::{Config, DEFAULT_CONFIG_FILE};
use tide_calendar_lib::ephemeris::{Body, Ephemeris};
use tide_calendar_lib::report;
use tide_calendar_lib::tide_data::TideSeries;

#[derive(Parser, Debug)]
#[command(name = "tide-calendar", version, about = "Sun * Moon * Tides calendar series")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Calendar year, overriding the configuration
    #[arg(short, long)]
    year: Option<i32>,

    /// Print every series as JSON instead of the text summary
    #[arg(long)]
    json: bool,

    /// Also plot the tide curve of this local date
    #[arg(long, value_name = "YYYY-MM-DD")]
    chart: Option<NaiveDate>,

    /// Also list the height samples of `sun` or `moon`, limited to the
    /// `--chart` date when one is given
    #[arg(long, value_name = "BODY")]
    heights: Option<Body>,

    /// TT minus UT in seconds, instead of the almanac's estimate
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    delta_t: Option<f64>,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Everything computed for one station and year.
#[derive(Debug, Serialize)]
pub(crate) struct Calendar {
    pub sun: AstroBody,
    pub moon: AstroBody,
    pub tides: Option<TideSeries>,
}

impl Calendar {
    pub(crate) fn compute<E: Ephemeris + ?Sized>(
        config: &Config,
        ephemeris: &E,
    ) -> anyhow::Result<Self> {
        let location = config.location();
        let settings = config.astro_settings();
        let year = config.calendar.year;

        let tides = if config.tides.extrema.is_empty() {
            tracing::info!("no tide extrema configured, skipping tides");
            None
        } else {
            let series = TideSeries::from_local_extrema(
                &config.local_extrema(),
                &config.station.timezone,
                config.calendar.tide_resolution,
            )
            .context("building tide curve")?;
            if series.year != year {
                tracing::warn!(
                    tide_year = series.year,
                    calendar_year = year,
                    "tide table is for a different year than the calendar"
                );
            }
            Some(series)
        };

        let sun = AstroBody::compute(ephemeris, &location, year, Body::Sun, &settings)
            .context("computing the Sun")?;
        let moon = AstroBody::compute(ephemeris, &location, year, Body::Moon, &settings)
            .context("computing the Moon")?;

        Ok(Calendar { sun, moon, tides })
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("tide-calendar error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = Config::load_from_path(&cli.config);
    if let Some(year) = cli.year {
        config.calendar.year = year;
    }
    config.validate().context("invalid configuration")?;

    if cli.write_config {
        return config.save_to_path(&cli.config);
    }

    let almanac = cli.delta_t.map_or_else(Almanac::new, Almanac::with_delta_t);
    tracing::info!(
        station = %config.station.name,
        year = config.calendar.year,
        delta_t = ?cli.delta_t,
        "making Sun * Moon * Tides calendar"
    );
    let calendar = Calendar::compute(&config, &almanac)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&calendar).context("serializing calendar")?;
        println!("{json}");
        return Ok(());
    }

    print!(
        "{}",
        report::render_summary(&calendar.sun, &calendar.moon, calendar.tides.as_ref())?
    );

    if let Some(date) = cli.chart {
        match calendar
            .tides
            .as_ref()
            .and_then(|tides| report::render_tide_chart(tides, date))
        {
            Some(chart) => print!("\n{chart}"),
            None => tracing::warn!(%date, "no tide samples on that date"),
        }
    }

    if let Some(body) = cli.heights {
        let astro = match body {
            Body::Sun => &calendar.sun,
            Body::Moon => &calendar.moon,
        };
        print!("\n{}", report::render_heights(astro, cli.chart));
    }
    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TIDE_CALENDAR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
