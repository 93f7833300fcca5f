use std::fs;
use std::path::Path;

use crate::api::Record;

/// Load a JSON fixture of result records by name
pub fn load_results_fixture(fixture_name: &str) -> Vec<Record> {
    let path = Path::new("src/tests/fixtures").join(format!("{}.json", fixture_name));
    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {}", fixture_name));
    serde_json::from_str(&raw)
        .unwrap_or_else(|_| panic!("Fixture {} is not a JSON array of records", fixture_name))
}
