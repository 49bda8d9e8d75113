//! Command dispatcher: resolves configuration and inputs, runs the analysis,
//! and routes each subcommand to its formatter.

use anyhow::{anyhow, Context, Result};
use basketperf::config::EngineConfig;
use basketperf::pipeline::Analysis;
use basketperf::reports::parse_periods;
use basketperf::returns::{AlignedReturns, TransformOptions};
use basketperf::store::{files, MemoryStore};
use basketperf::utils::{parse_flexible_date, round_for_display};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;

use crate::cli::{formatters, Cli, Commands};

/// Config file values with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;

    if let Some(path) = &cli.baskets {
        config.data.baskets = Some(path.clone());
    }
    if let Some(path) = &cli.benchmarks {
        config.data.benchmarks = Some(path.clone());
    }
    if let Some(path) = &cli.mapping {
        config.data.mapping = Some(path.clone());
    }
    if let Some(text) = &cli.as_of {
        config.as_of = Some(parse_flexible_date(text)?);
    }

    Ok(config)
}

fn load_store(config: &EngineConfig) -> Result<MemoryStore> {
    let baskets = config.data.baskets.as_deref().ok_or_else(|| {
        anyhow!("No basket file given. Use --baskets <file> or set [data].baskets in the config file")
    })?;
    files::load_store(
        baskets,
        config.data.benchmarks.as_deref(),
        config.data.mapping.as_deref(),
    )
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Route a parsed command line to its handler
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let store = load_store(&config)?;
    let analysis = Analysis::new(&store, &config);
    let decimals = config.display_decimals;

    match cli.command {
        Commands::Returns {
            names,
            from,
            to,
            rebase,
            cumulative,
            export,
        } => {
            let start = from.as_deref().map(parse_flexible_date).transpose()?;
            let end = to.as_deref().map(parse_flexible_date).transpose()?;
            let options = TransformOptions {
                rebase: rebase.map(|value| value.unwrap_or(config.base_value)),
                cumulative,
                start,
                end,
            };
            let table = analysis.returns_table(&names, &options)?;

            if let Some(path) = export {
                export_returns_csv(&table, &path)?;
                info!("Wrote {} row(s) to {:?}", table.dates.len(), path);
            }

            if cli.json {
                print_json(&formatters::format_returns_json(&table, decimals))
            } else {
                let as_percent = options.rebase.is_none() && !options.cumulative;
                print!("{}", formatters::format_returns_table(&table, decimals, as_percent));
                Ok(())
            }
        }

        Commands::Summary => {
            if cli.json {
                print_json(&formatters::format_summary_json(&analysis.summary, decimals))
            } else {
                print!("{}", formatters::format_summary_table(&analysis.summary, decimals));
                Ok(())
            }
        }

        Commands::Relative { basket } => {
            let rows = match basket {
                Some(name) => vec![analysis.relative_for(&name)?],
                None => analysis.relative.clone(),
            };
            if cli.json {
                print_json(&formatters::format_relative_json(&rows, decimals))
            } else {
                print!(
                    "{}",
                    formatters::format_relative_table(&rows, &analysis.summary.periods, decimals)
                );
                Ok(())
            }
        }

        Commands::Contribution { basket, periods } => {
            let periods = if periods.is_empty() {
                config.periods.clone()
            } else {
                parse_periods(&periods)?
            };
            let table = analysis
                .contribution(&store, &basket, &periods, &config)
                .with_context(|| format!("Failed to build contribution table for {}", basket))?;
            if cli.json {
                print_json(&formatters::format_contribution_json(&table, decimals))
            } else {
                print!("{}", formatters::format_contribution_table(&table, decimals));
                Ok(())
            }
        }
    }
}

/// Write an aligned table as CSV; blank cells mark dates a series did not cover
fn export_returns_csv(table: &AlignedReturns, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export file {:?}", path))?;

    let mut header = vec!["date".to_string()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;

    for (date, row) in table.dates.iter().zip(table.rows.iter()) {
        let mut record = vec![date.to_string()];
        record.extend(row.iter().map(|cell| {
            cell.map(|v: Decimal| round_for_display(v, 12).normalize().to_string())
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
