use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod error;
mod intake;
mod metrics;
mod models;
mod ranking;
mod report;
mod source;
mod store;
mod trophies;

use config::EngineConfig;
use error::DashboardError;
use models::DailyRecord;
use report::DashboardView;

#[derive(Parser)]
#[command(name = "self-battle")]
#[command(about = "Past, present and future self dashboard for a daily log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DashboardArgs {
    /// Path or http(s) URL of the daily log (defaults to $DASHBOARD_SOURCE or data.json)
    #[arg(long)]
    source: Option<String>,
    /// Date treated as today, YYYY-MM-DD (defaults to the current UTC date)
    #[arg(long)]
    today: Option<NaiveDate>,
    /// Days in the moving-average window
    #[arg(long)]
    window: Option<usize>,
    /// Multiplier applied to the past average to set the target
    #[arg(long)]
    target_multiplier: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the full dashboard
    Report {
        #[command(flatten)]
        args: DashboardArgs,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Rows in the recent trend table
        #[arg(long, default_value_t = 14)]
        trend_days: usize,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print present, past and future placements
    Rankings {
        #[command(flatten)]
        args: DashboardArgs,
    },
    /// Print the trophy case
    Trophies {
        #[command(flatten)]
        args: DashboardArgs,
    },
    /// Add or replace the entry for one day
    Log {
        #[arg(long, default_value = "data.json")]
        data: PathBuf,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        score: Option<f64>,
        /// Minutes spent
        #[arg(long)]
        time_spent: Option<f64>,
        #[arg(long)]
        bounty: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
        /// Issue title; its first YYYY-MM-DD becomes the entry date
        #[arg(long, requires = "issue_body")]
        issue_title: Option<String>,
        /// Issue-form body (markdown sections or JSON object)
        #[arg(long, conflicts_with_all = ["score", "time_spent", "bounty"])]
        issue_body: Option<String>,
    },
    /// Import entries from a CSV file
    Import {
        #[arg(long, default_value = "data.json")]
        data: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
}

fn today_or(value: Option<NaiveDate>) -> NaiveDate {
    value.unwrap_or_else(|| Utc::now().date_naive())
}

async fn load_view(args: DashboardArgs) -> Result<DashboardView, DashboardError> {
    let config = EngineConfig::from_env()?
        .with_overrides(args.window, args.target_multiplier)
        .validate()?;
    let location = config::resolve_source(args.source);
    let data_source = source::open_source(&location, config::http_timeout_secs()?)?;
    let records = source::load_records(data_source.as_ref()).await?;

    let today = today_or(args.today);
    let view = report::build_dashboard(&records, today, &config);
    if !view.today_logged {
        warn!(%today, "no entry logged for today");
    }
    Ok(view)
}

fn non_negative(value: Option<f64>, name: &str) -> anyhow::Result<f64> {
    let value = value.unwrap_or(0.0);
    anyhow::ensure!(
        value.is_finite() && value >= 0.0,
        "--{name} must be a non-negative number"
    );
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            args,
            format,
            trend_days,
            out,
        } => {
            let rendered = match load_view(args).await {
                Ok(view) => match format {
                    Format::Markdown => Ok(report::render_markdown(&view, trend_days)),
                    Format::Json => Ok(serde_json::to_string_pretty(&view)?),
                },
                Err(err) => Err(err),
            };

            let page = match &rendered {
                Ok(page) => page.clone(),
                Err(err) => report::render_error(err),
            };
            match &out {
                Some(path) => {
                    std::fs::write(path, &page)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => print!("{page}"),
            }

            rendered.context("failed to build the dashboard")?;
        }
        Commands::Rankings { args } => {
            let view = load_view(args).await?;

            println!("{}", view.battle.headline);
            for card in &view.cards {
                let present = match (&card.present, &card.ranking.present) {
                    (Some(value), Some(place)) => {
                        format!("{} ({})", report::format_value(*value), place.label)
                    }
                    _ => "N/A".to_string(),
                };
                println!(
                    "- {}: present {}, past {} ({}), future {} ({})",
                    card.label,
                    present,
                    card.past
                        .map(report::format_value)
                        .unwrap_or_else(|| "N/A".to_string()),
                    card.ranking.past.label,
                    card.future
                        .map(report::format_value)
                        .unwrap_or_else(|| "N/A".to_string()),
                    card.ranking.future.label
                );
            }
        }
        Commands::Trophies { args } => {
            let view = load_view(args).await?;
            let unlocked = view.trophies.iter().filter(|t| t.unlocked).count();

            println!("Trophies unlocked: {unlocked} of {}", view.trophies.len());
            for trophy in &view.trophies {
                println!(
                    "- [{}] {} {}: {}",
                    if trophy.unlocked { "x" } else { " " },
                    trophy.icon,
                    trophy.name,
                    trophy.description
                );
            }
        }
        Commands::Log {
            data,
            date,
            score,
            time_spent,
            bounty,
            notes,
            issue_title,
            issue_body,
        } => {
            let mut entry = match issue_body {
                Some(body) => intake::record_from_issue(
                    issue_title.as_deref().unwrap_or_default(),
                    &body,
                    today_or(None),
                )?,
                None => DailyRecord::new(
                    today_or(None),
                    non_negative(score, "score")?,
                    non_negative(time_spent, "time-spent")?,
                    non_negative(bounty, "bounty")?,
                ),
            };
            if let Some(date) = date {
                entry.date = date;
            }
            if notes.is_some() {
                entry.notes = notes;
            }

            let summary = format!(
                "{}: score {}, time spent {} minutes, bounty ${}",
                entry.date,
                report::format_value(entry.score),
                report::format_value(entry.time_spent),
                report::format_value(entry.bounty)
            );
            let outcome = store::log_entry(&data, entry)?;
            let verb = match outcome {
                store::Upsert::Added => "Logged",
                store::Upsert::Replaced => "Replaced",
            };
            println!("{verb} entry for {summary}.");
        }
        Commands::Import { data, csv } => {
            let summary = store::import_csv(&data, &csv)?;
            println!(
                "Imported {} new and {} replaced entries from {} into {}.",
                summary.added,
                summary.replaced,
                csv.display(),
                data.display()
            );
        }
    }

    Ok(())
}
