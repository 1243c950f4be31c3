use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use epi_pipeline::config::Config;
use epi_pipeline::export::{self, Headline};
use epi_pipeline::logging;
use epi_pipeline::types::{CaseKind, FactColumn, Lookup};
use epi_pipeline::{Pipeline, PipelineOutput};

#[derive(Parser)]
#[command(name = "epi_pipeline")]
#[command(about = "Builds dashboard tables from public epidemiological time-series feeds")]
#[command(version)]
struct Cli {
    /// TOML configuration file (falls back to EPI_PIPELINE_CONFIG, then pipeline.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all derived tables and export them as CSV and JSON
    Build {
        /// Output directory (overrides output.dir from the config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the daily series and snapshot status for one location
    Location {
        /// Location name as it appears in the feeds, e.g. "United Kingdom"
        name: String,
    },
    /// Show the global daily summary tail and the top locations for the as-of date
    Summary {
        /// Number of locations to list
        #[arg(long, default_value_t = 10)]
        top: usize,
        /// Number of trailing days of the global summary to print
        #[arg(long, default_value_t = 14)]
        days: usize,
    },
    /// List every location present in the fact table
    Locations,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let metrics_handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder unavailable: {}", e);
            None
        }
    };

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    let output = match Pipeline::run(&config) {
        Ok(output) => output,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(e).context("building derived tables");
        }
    };
    report_join_gaps(&output);

    match cli.command {
        Commands::Build { out } => {
            let dir = out.unwrap_or_else(|| config.output.dir.clone());
            print_headline(&output);
            let files = export::write_tables(&output, &dir)?;
            if let Some(handle) = &metrics_handle {
                write_metrics(handle, &dir)?;
            }
            println!("\n💾 Wrote {} files to {}", files.len(), dir.display());
        }
        Commands::Location { name } => print_location(&output, &name),
        Commands::Summary { top, days } => {
            print_headline(&output);
            print_summary(&output, top, days);
        }
        Commands::Locations => {
            for location in output.locations() {
                println!("{location}");
            }
        }
    }
    Ok(())
}

fn report_join_gaps(output: &PipelineOutput) {
    let gaps = output.join_gaps();
    if gaps.is_empty() {
        return;
    }
    let dropped = gaps.iter().filter(|g| g.lookup == Lookup::Continent).count();
    let ungeocoded = gaps.iter().filter(|g| g.lookup == Lookup::Geocoding).count();
    info!(
        dropped_without_continent = dropped,
        without_coordinates = ungeocoded,
        total = gaps.len(),
        "Join gaps absorbed"
    );
}

fn write_metrics(handle: &PrometheusHandle, dir: &Path) -> anyhow::Result<()> {
    let path = dir.join("metrics.prom");
    fs::write(&path, handle.render())
        .with_context(|| format!("writing metrics snapshot to {}", path.display()))
}

fn print_headline(output: &PipelineOutput) {
    let headline = Headline::from_output(output);
    println!("📊 Latest update: {}", output.as_of());
    println!("   New cases:    {:>15}", format_count(headline.new_confirmed));
    println!("   Total cases:  {:>15}", format_count(headline.total_confirmed));
    println!("   New deaths:   {:>15}", format_count(headline.new_deaths));
    println!("   Total deaths: {:>15}", format_count(headline.total_deaths));
    println!("   Total active: {:>15}", format_count(headline.total_active));
}

fn print_summary(output: &PipelineOutput, top: usize, days: usize) {
    println!("\n🌍 Global new cases per day");
    let daily = output.daily();
    for day in &daily[daily.len().saturating_sub(days)..] {
        println!(
            "   {}  {:>12}  {:>10}",
            day.date,
            format_count(day.new_confirmed),
            format_count(day.new_deaths)
        );
    }

    println!("\n🔝 Top {} locations on {}", top, output.as_of());
    for row in output.top_latest(top) {
        println!(
            "   {:<32} {:>12} {:>10}",
            row.location,
            format_count(row.new_confirmed),
            format_count(row.new_deaths)
        );
    }
}

fn print_location(output: &PipelineOutput, name: &str) {
    let rows = output.rows_for_location(name);
    if rows.is_empty() {
        println!("⚠️  Unknown location: {name}");
        return;
    }

    println!("📍 {} ({})", name, rows[0].continent);
    if let Some(status) = output.location_status(name) {
        let rate = status
            .mortality_rate
            .map(|r| format!("{r:.2}%"))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "   Total cases: {}  Total deaths: {}  % of deaths: {}",
            format_count(status.confirmed),
            format_count(status.deaths),
            rate
        );
    }
    for row in rows {
        let cells: Vec<String> = [CaseKind::Confirmed, CaseKind::Deaths]
            .into_iter()
            .map(|kind| {
                format!(
                    "{:>12} {:>12}",
                    format_count(row.value(FactColumn::new_count(kind))),
                    format_count(row.value(FactColumn::total(kind)))
                )
            })
            .collect();
        println!("   {}  {}", row.date, cells.join("  "));
    }
}

/// `1234567` → `1,234,567`
fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-45000), "-45,000");
    }
}
