//! Turns cleaned JSON / JSONL movie rows into [`MovieRecord`]s.
//!
//! A row that is present but malformed still yields a record (with the bad
//! fields absent) so row order, and with it the model checksum, is stable.

use crate::catalog::{CrewMember, MovieRecord};
use crate::error::LoadError;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Load one `.json` (array or single object) or `.jsonl` file.
pub fn load_file(path: &Path) -> Result<Vec<MovieRecord>, LoadError> {
    let f = File::open(path)?;
    let reader = BufReader::new(f);
    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        load_jsonl(reader)
    } else {
        load_json(reader)
    }
}

pub fn load_jsonl<R: BufRead>(reader: R) -> Result<Vec<MovieRecord>, LoadError> {
    let mut out = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<Value>(&line) {
            Ok(v) => out.push(record_from_value(&v)),
            Err(e) => {
                tracing::warn!(line = lineno + 1, error = %e, "unparseable row, keeping it with empty fields");
                out.push(MovieRecord::default());
            }
        }
    }
    Ok(out)
}

pub fn load_json<R: Read>(reader: R) -> Result<Vec<MovieRecord>, LoadError> {
    let json: Value = serde_json::from_reader(reader)?;
    match json {
        Value::Array(arr) => Ok(arr.iter().map(record_from_value).collect()),
        Value::Object(_) => Ok(vec![record_from_value(&json)]),
        other => Err(LoadError::NoInput(format!("expected an array or object, found {other}"))),
    }
}

pub fn record_from_value(v: &Value) -> MovieRecord {
    let Some(obj) = v.as_object() else {
        tracing::warn!("row is not an object, keeping it with empty fields");
        return MovieRecord::default();
    };
    MovieRecord {
        title: string_field(obj, "title"),
        release_date: string_field(obj, "release_date"),
        release_year: number_field(obj, "release_year").map(|y| y as i32),
        popularity: number_field(obj, "popularity"),
        revenue: number_field(obj, "revenue"),
        budget: number_field(obj, "budget"),
        vote_count: number_field(obj, "vote_count").filter(|n| *n >= 0.0).map(|n| n as u64),
        vote_average: number_field(obj, "vote_average"),
        cast: obj.get("cast").map(cast_list).unwrap_or_default(),
        crew: obj.get("crew").map(crew_list).unwrap_or_default(),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers or numeric strings; anything else (including NaN text) is absent.
fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn cast_list(v: &Value) -> Vec<String> {
    let Value::Array(items) = v else { return Vec::new() };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn crew_list(v: &Value) -> Vec<CrewMember> {
    let Value::Array(items) = v else { return Vec::new() };
    items
        .iter()
        .filter_map(|item| {
            let o = item.as_object()?;
            let name = o.get("name")?.as_str()?.to_string();
            let job = o.get("job").and_then(Value::as_str).unwrap_or_default().to_string();
            Some(CrewMember { name, job })
        })
        .collect()
}
