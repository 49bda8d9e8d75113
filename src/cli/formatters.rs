//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation. Values are rounded
//! here and nowhere else.

use basketperf::reports::{ContributionTable, Period, PerformanceSummary, RelativeRow};
use basketperf::returns::AlignedReturns;
use basketperf::utils::{format_number, format_pct, round_for_display};
use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Alignment, Style},
};

/// Percentage cell colored by sign
fn signed_pct(value: Decimal, decimals: u32) -> String {
    let text = format_pct(value, decimals);
    let shown = round_for_display(value * Decimal::ONE_HUNDRED, decimals);
    if shown > Decimal::ZERO {
        text.green().to_string()
    } else if shown < Decimal::ZERO {
        text.red().to_string()
    } else {
        text
    }
}

fn render(builder: Builder, text_columns: usize) -> String {
    let mut table = builder.build();
    table.with(Style::modern());
    // Right-align everything after the label columns
    table.modify(Columns::new(text_columns..), Alignment::right());
    table.to_string()
}

fn period_header(periods: &[Period]) -> Vec<String> {
    periods.iter().map(|p| p.label().to_string()).collect()
}

fn rounded_map(values: &BTreeMap<Period, Decimal>, decimals: u32) -> Value {
    let map: Map<String, Value> = values
        .iter()
        .map(|(p, v)| (p.label().to_string(), json!(round_for_display(*v, decimals))))
        .collect();
    Value::Object(map)
}

/// Daily return / cumulative / rebased table
pub fn format_returns_table(table: &AlignedReturns, decimals: u32, as_percent: bool) -> String {
    if table.is_empty() {
        return format!("{} No return data in range\n", "ℹ".blue().bold());
    }

    let mut builder = Builder::default();
    let mut header = vec!["Date".to_string()];
    header.extend(table.columns.iter().cloned());
    builder.push_record(header);

    for (date, row) in table.dates.iter().zip(table.rows.iter()) {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        record.extend(row.iter().map(|cell| match cell {
            Some(v) if as_percent => format_pct(*v, decimals),
            Some(v) => format_number(*v, decimals),
            None => "-".to_string(),
        }));
        builder.push_record(record);
    }

    format!("\n{}\n", render(builder, 1))
}

pub fn format_returns_json(table: &AlignedReturns, decimals: u32) -> Value {
    let rows: Vec<Value> = table
        .dates
        .iter()
        .zip(table.rows.iter())
        .map(|(date, row)| {
            let mut obj = Map::new();
            obj.insert("date".to_string(), json!(date));
            for (name, cell) in table.columns.iter().zip(row.iter()) {
                obj.insert(name.clone(), json!(cell.map(|v| round_for_display(v, decimals))));
            }
            Value::Object(obj)
        })
        .collect();
    json!({ "columns": table.columns, "rows": rows })
}

/// Performance summary: one row per basket/benchmark, one column per period
pub fn format_summary_table(summary: &PerformanceSummary, decimals: u32) -> String {
    if summary.is_empty() {
        return format!("{} No baskets to summarize\n", "ℹ".blue().bold());
    }

    let mut builder = Builder::default();
    let mut header = vec!["Name".to_string()];
    header.extend(period_header(&summary.periods));
    builder.push_record(header);

    for (name, returns) in &summary.rows {
        let mut record = vec![name.clone()];
        record.extend(summary.periods.iter().map(|p| {
            returns
                .get(p)
                .map(|v| signed_pct(*v, decimals))
                .unwrap_or_else(|| "-".to_string())
        }));
        builder.push_record(record);
    }

    let as_of = summary
        .as_of
        .map(|d| d.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "\n{} Performance Summary (as of {})\n\n{}\n",
        "📈".cyan().bold(),
        as_of,
        render(builder, 1)
    )
}

pub fn format_summary_json(summary: &PerformanceSummary, decimals: u32) -> Value {
    let rows: Map<String, Value> = summary
        .rows
        .iter()
        .map(|(name, returns)| (name.clone(), rounded_map(returns, decimals)))
        .collect();
    json!({
        "as_of": summary.as_of,
        "periods": summary.periods,
        "returns": rows,
    })
}

/// Relative performance: basket minus benchmark, per period
pub fn format_relative_table(rows: &[RelativeRow], periods: &[Period], decimals: u32) -> String {
    if rows.is_empty() {
        return format!(
            "{} No baskets with a benchmark to compare against\n",
            "ℹ".blue().bold()
        );
    }

    let mut builder = Builder::default();
    let mut header = vec!["Basket".to_string(), "Benchmark".to_string()];
    header.extend(period_header(periods));
    builder.push_record(header);

    for row in rows {
        let mut record = vec![row.basket.clone(), row.benchmark.clone()];
        record.extend(periods.iter().map(|p| {
            row.excess
                .get(p)
                .map(|v| signed_pct(*v, decimals))
                .unwrap_or_else(|| "-".to_string())
        }));
        builder.push_record(record);
    }

    format!(
        "\n{} Relative Performance\n\n{}\n",
        "⚖".cyan().bold(),
        render(builder, 2)
    )
}

pub fn format_relative_json(rows: &[RelativeRow], decimals: u32) -> Value {
    let rows: Vec<Value> = rows
        .iter()
        .map(|r| {
            json!({
                "basket": r.basket,
                "benchmark": r.benchmark,
                "excess": rounded_map(&r.excess, decimals),
            })
        })
        .collect();
    Value::Array(rows)
}

/// Contribution table: metadata columns, then absolute/relative per period
pub fn format_contribution_table(table: &ContributionTable, decimals: u32) -> String {
    if table.rows.is_empty() {
        return format!("{} Basket {} has no records\n", "ℹ".blue().bold(), table.basket);
    }

    let mut builder = Builder::default();
    let mut header: Vec<String> = ["Ticker", "Company", "Sector", "Industry", "Mkt Cap", "Issuer", "Weight"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for p in &table.periods {
        header.push(format!("{} Contrib", p.label()));
        header.push(format!("{} Share", p.label()));
    }
    builder.push_record(header);

    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    for row in &table.rows {
        let mut record = vec![
            row.ticker.clone(),
            text(&row.info.company),
            text(&row.info.sector),
            text(&row.info.industry),
            row.info
                .market_cap
                .map(|m| format_number(m, 0))
                .unwrap_or_else(|| "-".to_string()),
            text(&row.info.issuer_type),
            format_pct(row.weight, 2),
        ];
        for p in &table.periods {
            match row.periods.get(p) {
                Some(c) => {
                    record.push(signed_pct(c.absolute, decimals));
                    record.push(format_pct(c.relative, 2));
                }
                None => {
                    record.push("-".to_string());
                    record.push("-".to_string());
                }
            }
        }
        builder.push_record(record);
    }

    let mut output = format!(
        "\n{} Contribution - {}\n\n{}\n",
        "🧩".cyan().bold(),
        table.basket,
        render(builder, 4)
    );

    output.push_str(&format!("\n{} Totals", "━".repeat(40).bright_black()));
    for p in &table.periods {
        if let Some(total) = table.totals.get(p) {
            output.push_str(&format!(
                "\n{:<8} {}",
                format!("{}:", p.label()).bold(),
                signed_pct(*total, decimals)
            ));
        }
    }
    output.push('\n');
    output
}

pub fn format_contribution_json(table: &ContributionTable, decimals: u32) -> Value {
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let periods: Map<String, Value> = row
                .periods
                .iter()
                .map(|(p, c)| {
                    (
                        p.label().to_string(),
                        json!({
                            "absolute": round_for_display(c.absolute, decimals),
                            "relative": round_for_display(c.relative, decimals),
                        }),
                    )
                })
                .collect();
            json!({
                "ticker": row.ticker,
                "company": row.info.company,
                "sector": row.info.sector,
                "industry": row.info.industry,
                "market_cap": row.info.market_cap,
                "issuer_type": row.info.issuer_type,
                "weight": row.weight,
                "periods": periods,
            })
        })
        .collect();

    json!({
        "basket": table.basket,
        "as_of": table.as_of,
        "periods": table.periods,
        "totals": rounded_map(&table.totals, decimals),
        "rows": rows,
    })
}
