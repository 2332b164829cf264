use crate::models::{AggregatedGroup, ComparisonOutcome, RunResults, StoredComparison};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Output format options
#[derive(Debug, Clone, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print run results in the specified format
pub fn print_results(results: &RunResults, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(results),
        OutputFormat::Json => print_json(results),
    }
}

/// Display form of an average score, rounded to two decimals
pub fn format_average(average: f64) -> String {
    format!("{:.2}", average)
}

/// Print results in plain text format
fn print_plain(results: &RunResults) {
    let mut text = String::new();
    match render_plain(&mut text, results) {
        Ok(()) => print!("{}", text),
        Err(e) => eprintln!("Error rendering results: {}", e),
    }
}

fn render_plain(out: &mut impl Write, results: &RunResults) -> fmt::Result {
    for (i, outcome) in results.translations.iter().enumerate() {
        let request = &outcome.request;
        writeln!(out, "=== Translation {} ===", i + 1)?;
        writeln!(
            out,
            "{} → {} ({})",
            request.source_language, request.destination_language, request.model_choice
        )?;
        writeln!(out, "Message: {}", request.message)?;
        writeln!(out, "Translation: {}", outcome.translation)?;
        writeln!(out)?;
    }

    for (i, outcome) in results.comparisons.iter().enumerate() {
        render_comparison(out, i + 1, outcome)?;

        if i < results.comparisons.len() - 1 {
            writeln!(out, "{}", "=".repeat(50))?;
            writeln!(out)?;
        }
    }

    Ok(())
}

fn render_comparison(out: &mut impl Write, num: usize, outcome: &ComparisonOutcome) -> fmt::Result {
    match &outcome.title {
        Some(title) => writeln!(out, "=== Comparison {}: {} ===", num, title)?,
        None => writeln!(out, "=== Comparison {} ===", num)?,
    }
    writeln!(out)?;

    if !outcome.groups.is_empty() {
        writeln!(out, "📊 EVALUATION RESULTS")?;
        writeln!(out, "---------------------")?;
        for group in &outcome.groups {
            render_group(out, group)?;
        }
    }

    writeln!(out, "📝 STORED COMPARISONS")?;
    writeln!(out, "---------------------")?;
    if outcome.history.is_empty() {
        writeln!(out, "No stored comparisons.")?;
        writeln!(out)?;
    }
    for stored in &outcome.history {
        render_stored(out, stored)?;
    }

    Ok(())
}

fn render_group(out: &mut impl Write, group: &AggregatedGroup) -> fmt::Result {
    writeln!(out, "Input Text: {}", group.input_text)?;
    for model in &group.models {
        writeln!(out, "  Model: {}", model.model_name)?;
        writeln!(out, "  Average Score: {}", format_average(model.average))?;
        for detail in &model.details {
            writeln!(out, "    • Evaluating Model: {}", detail.evaluating_model_name)?;
            writeln!(out, "      Score: {}", detail.score)?;
            writeln!(out, "      Comment: {}", detail.comment)?;
            writeln!(out, "      Translation: {}", detail.translation)?;
        }
    }
    writeln!(out)
}

fn render_stored(out: &mut impl Write, stored: &StoredComparison) -> fmt::Result {
    let request = &stored.request;
    writeln!(
        out,
        "Source: {} → {} ({})",
        request.source_language,
        request.destination_language,
        stored.timestamp.to_rfc3339()
    )?;
    writeln!(out, "Message: {}", request.message)?;
    for group in &stored.comparison {
        writeln!(out, "  Input Text: {}", group.input_text)?;
        for model in &group.models {
            writeln!(
                out,
                "    {:<28} {}",
                model.model_name,
                format_average(model.average)
            )?;
        }
    }
    writeln!(out)
}

/// Print results in JSON format
fn print_json(results: &RunResults) {
    match serde_json::to_string_pretty(results) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}
