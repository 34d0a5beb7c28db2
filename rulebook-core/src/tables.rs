//! Table-to-Record Normalizer
//!
//! Raw tables become rows of collapsed cell texts, then ordered records keyed
//! by slugified headers.

use crate::dom::Element;
use crate::navigation::ContentNode;
use crate::text::{collapse_whitespace, slugify};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

pub type Row = Vec<String>;

/// One table row keyed by header slug, in column order.
pub type Record = IndexMap<String, String>;

/// Rows of the outermost table only; a table nested inside a cell
/// contributes nothing.
pub fn table_to_rows(table: &Element) -> Vec<Row> {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    rows
}

fn collect_rows(parent: &Element, rows: &mut Vec<Row>) {
    for child in parent.child_elements() {
        if child.is("table") {
            continue;
        }
        if child.is("tr") {
            let cells: Row = child
                .child_elements()
                .filter(|cell| cell.is("td") || cell.is("th"))
                .map(|cell| collapse_whitespace(&cell.raw_text()))
                .collect();
            if !cells.is_empty() {
                rows.push(cells);
            }
        } else {
            collect_rows(child, rows);
        }
    }
}

/// Rows of the first table in `nodes`, or nothing.
pub fn first_table_rows(nodes: &[ContentNode<'_>]) -> Vec<Row> {
    nodes
        .iter()
        .find(|node| node.is_table())
        .map(|node| table_to_rows(node.element))
        .unwrap_or_default()
}

/// Rows of every table in `nodes`, one entry per table.
pub fn all_table_rows(nodes: &[ContentNode<'_>]) -> Vec<Vec<Row>> {
    nodes
        .iter()
        .filter(|node| node.is_table())
        .map(|node| table_to_rows(node.element))
        .collect()
}

pub(crate) fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Slugified keys; an empty or repeated slug falls back to `column_{n}`.
pub fn header_keys(headers: &[String]) -> Vec<String> {
    let mut seen = IndexSet::new();
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let slug = slugify(header);
            let key = if slug.is_empty() || seen.contains(&slug) {
                format!("column_{}", idx + 1)
            } else {
                slug
            };
            seen.insert(key.clone());
            key
        })
        .collect()
}

fn build_records(keys: &[String], data: &[Row]) -> Vec<Record> {
    data.iter()
        .filter(|row| !is_blank_row(row))
        .map(|row| {
            keys.iter()
                .enumerate()
                .map(|(idx, key)| (key.clone(), row.get(idx).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Row 0 is the header; every non-blank later row becomes a record.
pub fn rows_to_records(rows: &[Row]) -> Vec<Record> {
    if rows.len() < 2 {
        return Vec::new();
    }
    build_records(&header_keys(&rows[0]), &rows[1..])
}

/// Two physical header rows, detected by an empty first cell in row 0 with a
/// populated row 1. Cells merge column-wise with row 1 winning, and data
/// starts at row 2. Other shapes fall back to [`rows_to_records`].
pub fn rows_to_records_merged_header(rows: &[Row]) -> Vec<Record> {
    let two_row_header = rows.len() > 1
        && !rows[1].is_empty()
        && rows[0].first().is_some_and(|cell| cell.is_empty());
    if !two_row_header {
        return rows_to_records(rows);
    }

    let (upper, lower) = (&rows[0], &rows[1]);
    let width = upper.len().max(lower.len());
    let merged: Row = (0..width)
        .map(|idx| {
            let below = lower.get(idx).map(String::as_str).unwrap_or("");
            let above = upper.get(idx).map(String::as_str).unwrap_or("");
            let header = if below.is_empty() { above } else { below };
            header.to_string()
        })
        .collect();
    build_records(&header_keys(&merged), &rows[2..])
}

/// Raw header row plus non-blank data rows, kept positional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    pub headers: Row,
    pub rows: Vec<Row>,
}

impl TablePayload {
    pub fn from_rows(rows: &[Row]) -> Self {
        let Some((headers, data)) = rows.split_first() else {
            return Self::default();
        };
        Self {
            headers: headers.clone(),
            rows: data.iter().filter(|row| !is_blank_row(row)).cloned().collect(),
        }
    }
}
