//! In-memory tabular data produced by CSV assets.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use db::{Column, ColumnType, Value};

/// A typed table: named columns plus row-major cells.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Read comma-separated data whose first record is the header.
    ///
    /// Column types are inferred from the data: a column is `Integer` if
    /// every non-empty cell parses as `i64`, else `Real` if every non-empty
    /// cell parses as `f64`, else `Text`.  Empty cells become `Null`; a
    /// column with no non-empty cell is `Text`.
    ///
    /// Repeated header names are renamed `name.1`, `name.2`, … so every
    /// column name is unique.
    ///
    /// An input with no header yields a table with no columns.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = unique_headers(rdr.headers()?.iter().map(str::to_owned).collect());

        let mut raw: Vec<csv::StringRecord> = Vec::new();
        for record in rdr.records() {
            raw.push(record?);
        }

        let types: Vec<ColumnType> = (0..headers.len())
            .map(|i| infer_type(raw.iter().map(|r| r.get(i).unwrap_or(""))))
            .collect();

        let rows = raw
            .iter()
            .map(|record| {
                record
                    .iter()
                    .zip(&types)
                    .map(|(cell, ty)| parse_cell(cell, *ty))
                    .collect()
            })
            .collect();

        let columns = headers
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Column::new(name, ty))
            .collect();

        Ok(Self { columns, rows })
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();

    headers
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let next = suffixes.entry(name.clone()).or_insert(0);
            loop {
                *next += 1;
                let candidate = format!("{name}.{next}");
                if taken.insert(candidate.clone()) {
                    seen.insert(candidate.clone());
                    return candidate;
                }
            }
        })
        .collect()
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut inferred = None;
    for cell in cells.filter(|c| !c.is_empty()) {
        let mut ty = inferred.unwrap_or(ColumnType::Integer);
        if ty == ColumnType::Integer && cell.parse::<i64>().is_err() {
            ty = ColumnType::Real;
        }
        if ty == ColumnType::Real && cell.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
        inferred = Some(ty);
    }
    inferred.unwrap_or(ColumnType::Text)
}

fn parse_cell(cell: &str, ty: ColumnType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    // `infer_type` guarantees the parse succeeds for the chosen type.
    match ty {
        ColumnType::Integer => cell
            .parse()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::Text(cell.to_owned())),
        ColumnType::Real => cell
            .parse()
            .map(Value::Real)
            .unwrap_or_else(|_| Value::Text(cell.to_owned())),
        ColumnType::Text => Value::Text(cell.to_owned()),
    }
}
