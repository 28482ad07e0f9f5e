use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::GeoCsvError;

// ---------------------------------------------------------------------------
// MetadataRecord – the `#key: value` header block
// ---------------------------------------------------------------------------

/// Ordered key → value mapping taken from the marker lines of a source.
///
/// Keys are unique. Re-inserting an existing key replaces its value but keeps
/// the position of the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    entries: Vec<(String, String)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with last-write-wins semantics.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get) but a missing key is an error naming `source`.
    pub fn require(&self, key: &str, source: &str) -> Result<&str, GeoCsvError> {
        self.get(key).ok_or_else(|| GeoCsvError::MissingMetadataKey {
            name: source.to_string(),
            key: key.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The declared missing-value placeholder (`#field_missing: NAN`), if any.
    pub fn field_missing(&self) -> Option<&str> {
        self.get("field_missing").filter(|v| !v.is_empty())
    }

    /// The declared field delimiter (`#delimiter: ,`), if any.
    ///
    /// Surrounding whitespace is trimmed when the line is parsed, so a literal
    /// tab cannot survive; `\t` and `tab` are accepted instead.
    pub fn delimiter(&self) -> Option<u8> {
        match self.get("delimiter")? {
            "\\t" | "tab" | "TAB" => Some(b'\t'),
            v if v.len() == 1 => v.bytes().next(),
            _ => None,
        }
    }
}

impl Serialize for MetadataRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Value – a single cell of the data table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    /// Empty cell, declared missing token in a numeric column, or a field
    /// absent from a short row.
    Missing,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// Parse a finite floating point number.
///
/// `str::parse::<f64>` accepts `NaN` and `inf` spellings; those are rejected
/// here so a placeholder such as `NAN` never passes as numeric data.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Columns and diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// A row whose field count differs from the header's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDiagnostic {
    /// 1-based position among data rows (the header is not counted).
    pub row: usize,
    /// 1-based line number in the source.
    pub line: usize,
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed data row {} (line {}): expected {} fields, found {}",
            self.row, self.line, self.expected, self.found
        )
    }
}

// ---------------------------------------------------------------------------
// TabularDataset – header + typed rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    /// Name of the source the table was read from, used in error messages.
    pub source: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub diagnostics: Vec<RowDiagnostic>,
}

impl TabularDataset {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build a typed dataset from raw string cells.
    ///
    /// Every raw row must already be aligned to `headers` (`None` marks a
    /// field the row did not have). A column is numeric when every present,
    /// non-empty cell that is not `missing_token` parses as a finite number.
    pub fn from_raw(
        source: impl Into<String>,
        headers: Vec<String>,
        raw_rows: Vec<Vec<Option<String>>>,
        missing_token: Option<&str>,
        diagnostics: Vec<RowDiagnostic>,
    ) -> Self {
        let names = dedupe_names(headers);
        let is_absent = |cell: &Option<String>| match cell.as_deref() {
            None | Some("") => true,
            Some(s) => Some(s) == missing_token,
        };

        let kinds: Vec<ColumnType> = (0..names.len())
            .map(|c| {
                let numeric = !raw_rows.is_empty()
                    && raw_rows.iter().all(|row| {
                        let cell = &row[c];
                        is_absent(cell) || cell.as_deref().and_then(parse_number).is_some()
                    });
                if numeric {
                    ColumnType::Numeric
                } else {
                    ColumnType::Text
                }
            })
            .collect();

        let rows: Vec<Vec<Value>> = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| match (cell, kind) {
                        (None, _) => Value::Missing,
                        (Some(s), _) if s.is_empty() => Value::Missing,
                        (Some(s), ColumnType::Numeric) => {
                            parse_number(&s).map_or(Value::Missing, Value::Number)
                        }
                        (Some(s), ColumnType::Text) => Value::Text(s),
                    })
                    .collect()
            })
            .collect();

        let columns: Vec<Column> = names
            .into_iter()
            .zip(kinds)
            .map(|(name, kind)| Column { name, kind })
            .collect();

        TabularDataset {
            source: source.into(),
            columns,
            rows,
            diagnostics,
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Row `index` (0-based) as a name-addressable view.
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        (index < self.rows.len()).then_some(RowView {
            dataset: self,
            index,
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.rows.len()).map(move |index| RowView {
            dataset: self,
            index,
        })
    }
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    dataset: &'a TabularDataset,
    index: usize,
}

impl<'a> RowView<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let c = self.dataset.column_index(column)?;
        self.dataset.rows[self.index].get(c)
    }

    /// 1-based data-row position.
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

/// Repeated header names get a `.N` suffix so every column stays addressable.
fn dedupe_names(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let out = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            out
        })
        .collect()
}
