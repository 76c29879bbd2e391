//! Deterministic chart heuristic.
//!
//! A chart is attached only when the question asks for something comparative
//! (one of [`CHART_KEYWORDS`]) and the result is a small list of rows. The
//! label and value columns are picked from the first row's key order.

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

use crate::types::{JsonObject, Question, ResultSet};

pub const CHART_KEYWORDS: &[&str] = &[
    "average",
    "total",
    "count",
    "sum",
    "per client",
    "by client",
    "comparison",
    "compare",
    "distribution",
    "breakdown",
    "top",
    "bottom",
    "ranking",
    "trend",
];

pub const MAX_CHART_ROWS: usize = 100;

pub const PALETTE: [&str; 10] = [
    "rgba(54, 162, 235, 0.6)",
    "rgba(255, 99, 132, 0.6)",
    "rgba(255, 206, 86, 0.6)",
    "rgba(75, 192, 192, 0.6)",
    "rgba(153, 102, 255, 0.6)",
    "rgba(255, 159, 64, 0.6)",
    "rgba(199, 199, 199, 0.6)",
    "rgba(83, 102, 255, 0.6)",
    "rgba(255, 99, 255, 0.6)",
    "rgba(99, 255, 132, 0.6)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    #[serde(serialize_with = "serialize_data")]
    pub data: Vec<f64>,
    pub background_color: Colors,
    pub border_color: Colors,
    pub border_width: u32,
}

/// Whole values go out as JSON integers (`40`, not `40.0`).
fn serialize_data<S: Serializer>(data: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(data.iter().map(|value| data_number(*value)))
}

/// Largest integer an f64 holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn data_number(value: f64) -> Number {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        Number::from(value as i64)
    } else {
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

/// One color for the whole series (bar, line) or one per point (pie).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Colors {
    Uniform(String),
    PerPoint(Vec<String>),
}

/// Chart for `results`, or `None` when the heuristic declines.
pub fn chart_for(question: &Question, results: &ResultSet) -> Option<ChartSpec> {
    let question = question.lowercase();
    let rows = results.rows()?;
    if !is_eligible(&question, rows) {
        return None;
    }
    build_chart(&question, rows)
}

/// Keyword and size gate. `question` must already be lowercased.
pub fn is_eligible(question: &str, rows: &[JsonObject]) -> bool {
    let has_keyword = CHART_KEYWORDS.iter().any(|k| question.contains(k));
    has_keyword && (1..=MAX_CHART_ROWS).contains(&rows.len())
}

pub fn chart_type_for(question: &str) -> ChartType {
    if question.contains("distribution") || question.contains("breakdown") {
        ChartType::Pie
    } else if question.contains("trend") || question.contains("over time") {
        ChartType::Line
    } else {
        ChartType::Bar
    }
}

/// First key that is `_id` or names a client, name or source; else the first key.
pub fn label_field(row: &JsonObject) -> Option<&str> {
    row.keys()
        .find(|key| {
            let lower = key.to_lowercase();
            key.as_str() == "_id"
                || lower.contains("client")
                || lower.contains("name")
                || lower.contains("source")
        })
        .or_else(|| row.keys().next())
        .map(String::as_str)
}

/// First key other than `label` whose value in `row` is a number.
pub fn numeric_field<'a>(row: &'a JsonObject, label: &str) -> Option<&'a str> {
    row.iter()
        .find(|(key, value)| key.as_str() != label && value.is_number())
        .map(|(key, _)| key.as_str())
}

/// Build the chart without the eligibility gate. `question` must be lowercased.
pub fn build_chart(question: &str, rows: &[JsonObject]) -> Option<ChartSpec> {
    let first = rows.first()?;
    let label = label_field(first)?;
    let numeric = numeric_field(first, label)?;

    let labels = rows.iter().map(|row| label_text(row.get(label))).collect();
    let data: Vec<f64> = rows.iter().map(|row| numeric_value(row.get(numeric))).collect();

    let chart_type = chart_type_for(question);
    let (background_color, border_color) = match chart_type {
        ChartType::Pie => {
            let colors: Vec<String> = PALETTE
                .iter()
                .cycle()
                .take(data.len())
                .map(|c| c.to_string())
                .collect();
            let borders = colors.iter().map(|c| solid(c)).collect();
            (Colors::PerPoint(colors), Colors::PerPoint(borders))
        }
        ChartType::Bar | ChartType::Line => (
            Colors::Uniform(PALETTE[0].to_string()),
            Colors::Uniform(solid(PALETTE[0])),
        ),
    };

    Some(ChartSpec {
        chart_type,
        title: format!("{numeric} by {label}"),
        labels,
        datasets: vec![Dataset {
            label: numeric.to_string(),
            data,
            background_color,
            border_color,
            border_width: 1,
        }],
    })
}

/// Border variant of a palette color: same hue, alpha 1.
fn solid(color: &str) -> String {
    color.replace("0.6", "1")
}

/// Text for a label cell. Missing cells read `undefined`, null reads `null`,
/// ObjectIds read as their hex string, other objects as compact JSON.
pub fn label_text(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_text(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => label_text(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(obj)) => match obj.get("$oid").and_then(Value::as_str) {
            Some(oid) if obj.len() == 1 => oid.to_string(),
            _ => Value::Object(obj.clone()).to_string(),
        },
    }
}

/// Integral floats print without a fractional part, as `5` rather than `5.0`.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

/// Numeric value of a data cell. Anything that does not read as a finite or
/// infinite number (missing, null, text, objects) counts as 0.
pub fn numeric_value(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => parse_numeric_text(s),
        Some(Value::Array(items)) if items.len() == 1 => numeric_value(items.first()),
        Some(Value::Object(obj)) if obj.len() == 1 => ["$numberDecimal", "$numberDouble", "$numberLong", "$numberInt"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(parse_numeric_text)
            .unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_nan() {
        0.0
    } else {
        n
    }
}

fn parse_numeric_text(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => 0.0,
        _ => s.parse().unwrap_or(0.0),
    }
}
