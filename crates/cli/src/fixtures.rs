//! Random CSV fixtures for exercising asset pipelines.

use std::path::Path;

use rand::Rng;
use serde::Serialize;

pub const COLUMNS: [&str; 6] = ["id", "name", "age", "email", "date_of_birth", "city"];

const CITIES: [&str; 7] = [
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "Philadelphia",
    "San Antonio",
];

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// One generated person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRow {
    pub id: u32,
    pub name: String,
    pub age: u32,
    pub email: String,
    /// `DD/MM/YYYY`
    pub date_of_birth: String,
    pub city: &'static str,
}

fn random_string<R: Rng>(rng: &mut R, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

pub fn generate_rows<R: Rng>(rng: &mut R, count: usize) -> Vec<PersonRow> {
    (0..count)
        .map(|_| PersonRow {
            id: rng.gen_range(1..=1000),
            name: random_string(rng, LETTERS, 8),
            age: rng.gen_range(18..=99),
            email: format!("{}@example.com", random_string(rng, LOWER_ALNUM, 8)),
            date_of_birth: format!(
                "{:02}/{:02}/{}",
                rng.gen_range(1..=31),
                rng.gen_range(1..=12),
                rng.gen_range(1960..=2005)
            ),
            city: CITIES[rng.gen_range(0..CITIES.len())],
        })
        .collect()
}

/// Write `rows` with a header line, even when `rows` is empty.
pub fn write_csv(path: &Path, rows: &[PersonRow]) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
