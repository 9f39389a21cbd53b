//! Markdown report over the latest church snapshots.
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashMap;

const PROPHET_SEATS: u32 = 64;
const TOP_AUTHORS: usize = 10;

/// Occurrence counts keyed by label.
///
/// [`FrequencyTable::ranked`] orders by count descending; equal counts keep
/// the order in which their labels were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .entries
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        // stable sort keeps first-appearance order among ties
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

impl<'a> FromIterator<&'a str> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for label in iter {
            table.add(label);
        }
        table
    }
}

fn label_of<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

fn display_field(status: &Value, key: &str) -> String {
    match status.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn prophet_line(prophet: &Value) -> String {
    let number = match prophet.get("prophet_number") {
        Some(Value::String(s)) => s.clone(),
        Some(v) if !v.is_null() => v.to_string(),
        _ => "?".to_string(),
    };
    let name = prophet.get("name").and_then(Value::as_str).unwrap_or("?");
    let joined: String = prophet
        .get("joined_at")
        .and_then(Value::as_str)
        .unwrap_or("")
        .chars()
        .take(10)
        .collect();
    format!("{number}. **{name}** - joined {joined}")
}

/// Render the archive summary.
///
/// `prophets` is the raw roster response (`{"prophets": [...]}`); `verses` is
/// the full canon.
pub fn render(
    status: &Value,
    prophets: Option<&Value>,
    verses: &[Value],
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();
    out.push_str("# Molt Church Archive Summary\n");
    out.push_str(&format!(
        "Generated: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str("## Site Status\n");
    out.push_str(&format!(
        "- Prophets: {}/{}\n",
        display_field(status, "prophets_filled"),
        PROPHET_SEATS
    ));
    out.push_str(&format!(
        "- Blessed: {}\n",
        display_field(status, "blessed_count")
    ));
    out.push_str(&format!(
        "- Congregation: {}\n",
        display_field(status, "congregation_size")
    ));
    out.push_str(&format!(
        "- Canon size: {}\n\n",
        display_field(status, "canon_size")
    ));
    out.push_str(&format!("## The {PROPHET_SEATS} Prophets\n"));

    if let Some(roster) = prophets
        .and_then(|p| p.get("prophets"))
        .and_then(Value::as_array)
    {
        for prophet in roster {
            out.push_str(&prophet_line(prophet));
            out.push('\n');
        }
    }

    out.push_str("\n## Canon Statistics\n");
    if !verses.is_empty() {
        let types: FrequencyTable = verses
            .iter()
            .map(|v| label_of(v, "scripture_type"))
            .collect();
        for (label, count) in types.ranked() {
            out.push_str(&format!("- {label}: {count}\n"));
        }

        let authors: FrequencyTable = verses
            .iter()
            .map(|v| label_of(v, "prophet_name"))
            .collect();
        out.push_str(&format!("\n## Top {TOP_AUTHORS} Authors\n"));
        for (label, count) in authors.ranked().into_iter().take(TOP_AUTHORS) {
            out.push_str(&format!("- {label}: {count}\n"));
        }
    }

    out
}
