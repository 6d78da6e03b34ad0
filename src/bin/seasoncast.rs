use std::env;
use std::path::PathBuf;

use anyhow::bail;
use chrono::Local;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info, warn};

use seasoncast::config::Config;
use seasoncast::csv::CsvWriter;
use seasoncast::data::{DataRepository, PlayerRecord};
use seasoncast::eligibility::EligibilityPolicy;
use seasoncast::metric::Metric;
use seasoncast::player::{PlayerKey, Role};
use seasoncast::print;
use seasoncast::service::{ForecastService, MetricOutcome};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON configuration file; defaults apply when omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// player role: batter or pitcher
    #[clap(short = 'r', long)]
    role: Role,

    /// player ID, or a case-insensitive fragment of the player's name
    #[clap(short = 'p', long)]
    player: String,

    /// comma-separated metrics; all metrics of the role when omitted
    #[clap(short = 'm', long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// number of seasons to forecast
    #[clap(short = 'n', long)]
    periods: Option<usize>,

    /// print the batch as JSON instead of tables
    #[clap(long)]
    json: bool,

    /// fail rather than warn when the player misses an anchor season
    #[clap(long)]
    strict: bool,

    /// print the regression coefficients of each forecast
    #[clap(long)]
    diagnostics: bool,

    /// also write the forecast rows to a CSV file
    #[clap(long)]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    debug!("args: {args:?}");
    let config = match &args.config {
        None => Config::default(),
        Some(path) => Config::load(path)?,
    };
    debug!("config: {config:?}");

    let repository = DataRepository::load(&config.data)?;
    let record = resolve_player(&repository, args.role, &args.player)?;
    info!("player: {} ({})", record.name, record.key);

    let service = ForecastService::try_from(&config)?;
    let metrics = if args.metrics.is_empty() {
        service.catalog().metrics(args.role).collect::<Vec<_>>()
    } else {
        args.metrics
            .iter()
            .map(|name| Metric::parse(name))
            .collect::<Result<Vec<_>, _>>()?
    };
    let periods = args.periods.unwrap_or(config.default_periods);

    let policy = EligibilityPolicy {
        min_seasons: config.forecast.min_seasons,
        anchors: config.eligibility.clone(),
    };
    let report = policy.evaluate(&record.seasons(), Local::now().date_naive());
    if !report.is_eligible() {
        if args.strict {
            bail!(
                "{} is not eligible: missing seasons {:?} of {:?}",
                record.key,
                report.missing,
                report.required
            );
        }
        warn!(
            "{} misses anchor seasons {:?} of {:?}; forecasting regardless",
            record.key, report.missing, report.required
        );
    }

    let series = record.series_by_metric(metrics.iter().copied());
    let batch = service.forecast_player(&record.key, &series, metrics.iter().copied(), periods)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        for metric in &metrics {
            if let Some(MetricOutcome::Forecast(result)) = batch.outcomes.get(metric) {
                let bound = service.catalog().bound(args.role, *metric)?;
                info!(
                    "{metric} ({}), {:.0}% interval:\n{}",
                    metric.description(),
                    result.confidence_level * 100.,
                    Console::default().render(&print::tabulate(result, bound))
                );
                if args.diagnostics {
                    info!(
                        "{metric} fit over {} degree(s) of freedom:\n{}",
                        result.diagnostics.degrees_of_freedom,
                        Console::default().render(&print::tabulate_diagnostics(&result.diagnostics))
                    );
                }
            }
        }
        let unavailable = metrics
            .iter()
            .filter_map(|metric| batch.outcomes.get(metric))
            .filter_map(MetricOutcome::unavailable)
            .collect::<Vec<_>>();
        if !unavailable.is_empty() {
            info!(
                "unavailable:\n{}",
                Console::default().render(&print::tabulate_unavailable(unavailable))
            );
        }
    }

    if let Some(path) = &args.csv {
        let mut writer = CsvWriter::create(path)?;
        writer.append(print::CSV_HEADER)?;
        for metric in &metrics {
            if let Some(MetricOutcome::Forecast(result)) = batch.outcomes.get(metric) {
                print::write_future(&mut writer, result, service.catalog().bound(args.role, *metric)?)?;
            }
        }
        writer.flush()?;
        info!("wrote forecasts to {}", path.display());
    }

    let stats = service.cache().stats()?;
    debug!("cache hits: {}, misses: {}", stats.hits(), stats.misses());
    Ok(())
}

fn resolve_player<'a>(
    repository: &'a DataRepository,
    role: Role,
    player: &str,
) -> anyhow::Result<&'a PlayerRecord> {
    if let Some(record) = repository.player(&PlayerKey::new(role, player.trim())) {
        return Ok(record);
    }
    let found = repository.find_by_name(role, player);
    match found.as_slice() {
        [record] => Ok(*record),
        [] => bail!("no {role} matches '{player}'"),
        _ => bail!(
            "'{player}' matches several players: {}",
            found
                .iter()
                .map(|record| format!("{} ({})", record.name, record.key.id))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
