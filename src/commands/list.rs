//! `list`: show saved targets.

use std::io::Write;

use crate::config::Config;
use crate::error::AppError;
use crate::registry::{Registry, TargetRecord};
use crate::status;

const HEADERS: [&str; 4] = ["ID", "HOST", "USER", "SECRET"];

/// Prints targets whose id contains `filter`, as a table or JSON.
pub fn run<W: Write>(
    config: &Config,
    filter: Option<&str>,
    json: bool,
    out: &mut W,
) -> Result<(), AppError> {
    let registry = Registry::open(config.servers_file.clone())?;
    let records: Vec<&TargetRecord> = match filter {
        Some(filter) => registry.targets().filter(filter),
        None => registry.targets().iter().collect(),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &records)?;
        writeln!(out)?;
        return Ok(());
    }

    if records.is_empty() {
        status::info(&format!(
            "No targets found in {}",
            registry.path().display()
        ));
        return Ok(());
    }

    write_table(&records, out)?;
    Ok(())
}

fn write_table<W: Write>(records: &[&TargetRecord], out: &mut W) -> std::io::Result<()> {
    let rows: Vec<[&str; 4]> = records
        .iter()
        .map(|r| {
            [
                r.id.as_str(),
                r.host.as_str(),
                r.username().unwrap_or("-"),
                r.secret_ref().unwrap_or("-"),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    for row in std::iter::once(&HEADERS).chain(&rows) {
        let line: Vec<String> = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        writeln!(out, "{}", line.join("  ").trim_end())?;
    }
    Ok(())
}
