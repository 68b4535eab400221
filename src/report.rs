//! Human-readable dumps of the header and decoded data.
//!
//! Pure string builders used by the verbose decode path and the `sxm-info`
//! binary. They never touch the decode itself.

use std::collections::HashMap;

use crate::body::ChannelFrame;
use crate::header::{ChannelTable, HeaderModel};

/// Column-major table of all header keys, `num_columns` wide.
pub fn header_keys_table(header: &HeaderModel, num_columns: usize) -> String {
    let keys: Vec<&str> = header.keys().collect();
    if keys.is_empty() {
        return "(no header keys)\n".to_string();
    }
    let num_columns = num_columns.max(1);
    let width = keys.iter().map(|k| k.len()).max().unwrap_or(0) + 2;
    let num_rows = keys.len().div_ceil(num_columns);

    let mut out = String::from("--- Header keys ---\n");
    for r in 0..num_rows {
        let mut cells = Vec::with_capacity(num_columns);
        for c in 0..num_columns {
            let idx = r + c * num_rows;
            cells.push(format!("{:<width$}", keys.get(idx).copied().unwrap_or("")));
        }
        out.push_str(cells.join("| ").trim_end());
        out.push('\n');
    }
    out
}

/// The channel table with aligned columns.
pub fn channel_table(table: &ChannelTable) -> String {
    let mut rows = vec![vec![
        "Channel".to_string(),
        "Name".to_string(),
        "Unit".to_string(),
        "Direction".to_string(),
        "Calibration".to_string(),
        "Offset".to_string(),
    ]];
    for channel in table.iter() {
        rows.push(vec![
            channel.index.to_string(),
            channel.name.clone(),
            channel.unit.clone(),
            format!("{:?}", channel.directions).to_lowercase(),
            format!("{:E}", channel.calibration),
            format!("{:E}", channel.offset),
        ]);
    }

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|c| rows.iter().map(|row| row[c].len()).max().unwrap_or(0))
        .collect();

    let mut out = String::from("--- Channels ---\n");
    for (i, row) in rows.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect();
        let line = line.join(" | ");
        if i == 0 {
            out.push_str(&line);
            out.push('\n');
            out.push_str(&"-".repeat(line.len()));
        } else {
            out.push_str(&line);
        }
        out.push('\n');
    }
    out
}

/// Grid shapes per channel and direction, in channel-table order.
pub fn data_shapes(table: &ChannelTable, frames: &HashMap<String, ChannelFrame>) -> String {
    let mut out = String::from("--- Data shapes ---\n");
    for name in table.names() {
        out.push_str(&format!("  {name}\n"));
        if let Some(frame) = frames.get(name) {
            for direction in frame.directions() {
                let grid = frame
                    .get(direction)
                    .map(|g| format!("{:?}", g.shape()))
                    .unwrap_or_default();
                out.push_str(&format!("    {direction:?}: {grid}\n"));
            }
        }
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
