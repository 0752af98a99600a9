//! Table output formatting

use colored::Colorize;
use tabled::{
    builder::Builder,
    settings::{Alignment, Modify, Style, object::Rows},
};

use crate::advice::Advice;

const AZ_COLUMN: &str = "Availability Zone";
const REGION_COLUMN: &str = "Region";
const INSTANCE_COLUMN: &str = "Instance Info";
const VCPU_COLUMN: &str = "vCPU";
const MEMORY_COLUMN: &str = "Memory GiB";
const SAVINGS_COLUMN: &str = "Savings over On-Demand";
const INTERRUPTION_COLUMN: &str = "Frequency of interruption";
const SCORE_COLUMN: &str = "Spot Market Score";
const PRICE_COLUMN: &str = "USD/Hour";

/// Render advice records as a table.
///
/// The region column appears only for multi-region output. Score-enabled
/// records expand to one row per availability zone.
pub fn advice_table(records: &[Advice], show_region: bool, with_scores: bool) -> String {
    if records.is_empty() {
        return "No results found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(header(show_region, with_scores));
    for record in records {
        if with_scores {
            push_score_rows(&mut builder, record, show_region);
        } else {
            builder.push_record(base_row(record, show_region, None));
        }
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}

fn header(show_region: bool, with_scores: bool) -> Vec<String> {
    let mut cols = Vec::new();
    if show_region {
        cols.push(REGION_COLUMN.to_string());
    }
    if with_scores {
        cols.push(AZ_COLUMN.to_string());
    }
    cols.extend(
        [
            INSTANCE_COLUMN,
            VCPU_COLUMN,
            MEMORY_COLUMN,
            SAVINGS_COLUMN,
            INTERRUPTION_COLUMN,
        ]
        .map(String::from),
    );
    if with_scores {
        cols.push(SCORE_COLUMN.to_string());
    }
    cols.push(PRICE_COLUMN.to_string());
    cols
}

fn base_row(record: &Advice, show_region: bool, zone: Option<(&str, i32)>) -> Vec<String> {
    let mut row = Vec::new();
    if show_region {
        row.push(record.region.clone());
    }
    if let Some((zone, _)) = zone {
        row.push(zone.to_string());
    }
    row.push(record.instance.clone());
    row.push(record.shape.cores.to_string());
    row.push(format!("{}", record.shape.ram_gb));
    row.push(format!("{}%", record.savings));
    row.push(record.range.label.clone());
    if let Some((_, score)) = zone {
        row.push(color_score(score));
    }
    row.push(format!("{:.4}", record.price));
    row
}

fn push_score_rows(builder: &mut Builder, record: &Advice, show_region: bool) {
    match &record.zone_scores {
        Some(scores) if !scores.is_empty() => {
            for (zone, score) in scores {
                builder.push_record(base_row(record, show_region, Some((zone, *score))));
            }
        }
        _ => {
            // No live data for any zone of this record
            builder.push_record(base_row(record, show_region, Some(("-", 0))));
        }
    }
}

fn color_score(score: i32) -> String {
    let text = score.to_string();
    if score > 75 {
        text.bright_green().to_string()
    } else if score > 50 {
        text.bright_yellow().to_string()
    } else if score > 25 {
        text.bright_magenta().to_string()
    } else if score > 0 {
        text.bright_red().to_string()
    } else {
        text
    }
}
