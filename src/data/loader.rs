use std::io;

use log::{debug, warn};

use super::model::{MetadataRecord, RowDiagnostic, TabularDataset};
use super::source::{classify, LineKind, Source, MARKER};
use crate::error::GeoCsvError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Both views of one GeoCSV source.
#[derive(Debug, Clone)]
pub struct GeoCsv {
    pub metadata: MetadataRecord,
    pub table: TabularDataset,
}

/// How the data block is split and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub delimiter: u8,
    /// Placeholder treated as absent in numeric columns (e.g. `NAN`).
    pub missing_token: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            missing_token: None,
        }
    }
}

impl TableOptions {
    /// Options declared by the source's own header (`delimiter`, `field_missing`).
    pub fn from_metadata(metadata: &MetadataRecord) -> Self {
        let mut options = Self::default();
        if let Some(d) = metadata.delimiter() {
            options.delimiter = d;
        }
        if let Some(token) = metadata.field_missing() {
            options.missing_token = Some(token.to_string());
        }
        options
    }
}

/// Read the `#key: value` block of a source.
pub fn extract_metadata(source: &Source) -> Result<MetadataRecord, GeoCsvError> {
    let lines = source.read_lines()?;
    Ok(metadata_from_lines(&lines))
}

/// Read the delimited table of a source, skipping every metadata line.
pub fn extract_table(source: &Source, options: &TableOptions) -> Result<TabularDataset, GeoCsvError> {
    let lines = source.read_lines()?;
    table_from_lines(&source.name(), &lines, options)
}

/// Read a source once and return both views.
///
/// When `options` is `None` the table is split and typed according to the
/// `delimiter` and `field_missing` keys of the source's own metadata.
pub fn load_geocsv(source: &Source, options: Option<&TableOptions>) -> Result<GeoCsv, GeoCsvError> {
    let name = source.name();
    let lines = source.read_lines()?;
    let metadata = metadata_from_lines(&lines);
    let options = options
        .cloned()
        .unwrap_or_else(|| TableOptions::from_metadata(&metadata));
    let table = table_from_lines(&name, &lines, &options)?;
    debug!(
        "{name}: {} metadata entries, {} columns, {} rows",
        metadata.len(),
        table.columns.len(),
        table.len()
    );
    Ok(GeoCsv { metadata, table })
}

// ---------------------------------------------------------------------------
// Header block
// ---------------------------------------------------------------------------

pub fn metadata_from_lines<S: AsRef<str>>(lines: &[S]) -> MetadataRecord {
    let mut metadata = MetadataRecord::new();
    for line in lines.iter().map(AsRef::as_ref) {
        if classify(line) != LineKind::Metadata {
            continue;
        }
        let trimmed = line.trim();
        let body = trimmed.strip_prefix(MARKER).unwrap_or(trimmed).trim();
        match body.split_once(':') {
            Some((key, value)) => metadata.insert(key.trim(), value.trim()),
            None => {
                let key = format!("unparsed_line_{}", metadata.len());
                metadata.insert(key, body);
            }
        }
    }
    metadata
}

// ---------------------------------------------------------------------------
// Data block
// ---------------------------------------------------------------------------

pub fn table_from_lines<S: AsRef<str>>(
    name: &str,
    lines: &[S],
    options: &TableOptions,
) -> Result<TabularDataset, GeoCsvError> {
    // (source line number, text) of every non-blank data line
    let data_lines: Vec<(usize, &str)> = lines
        .iter()
        .map(AsRef::as_ref)
        .enumerate()
        .filter(|(_, line)| classify(line) == LineKind::Data && !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
        .collect();

    if data_lines.is_empty() {
        return Ok(TabularDataset::empty(name));
    }

    let body = data_lines
        .iter()
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .delimiter(options.delimiter)
        .from_reader(body.as_bytes());

    let read_error = |e: csv::Error| GeoCsvError::SourceRead {
        name: name.to_string(),
        cause: io::Error::new(io::ErrorKind::InvalidData, e),
    };

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record.map_err(read_error)?.iter().map(str::to_string).collect(),
        None => return Ok(TabularDataset::empty(name)),
    };
    let width = headers.len();

    let mut raw_rows = Vec::new();
    let mut diagnostics = Vec::new();

    for (i, result) in records.enumerate() {
        let record = result.map_err(read_error)?;
        let row = i + 1;

        if record.len() != width {
            let line = record
                .position()
                .and_then(|p| data_lines.get(p.line() as usize - 1))
                .map_or(0, |(n, _)| *n);
            let diagnostic = RowDiagnostic {
                row,
                line,
                expected: width,
                found: record.len(),
            };
            warn!("{name}: {diagnostic}");
            diagnostics.push(diagnostic);
        }

        let mut cells: Vec<Option<String>> = record
            .iter()
            .take(width)
            .map(|s| Some(s.to_string()))
            .collect();
        cells.resize(width, None);
        raw_rows.push(cells);
    }

    Ok(TabularDataset::from_raw(
        name,
        headers,
        raw_rows,
        options.missing_token.as_deref(),
        diagnostics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ColumnType, Value};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const NAV: &str = "\
#dataset: GeoCSV 2.0
#delimiter: ,
#field_missing: NAN
#cruise_id: RR2402
#source_dataset: doi:10.7284/910464
#title: Transit, San Diego to Honolulu
#note this has no colon
iso_time,ship_longitude,ship_latitude,speed_made_good,course_made_good
2024-02-17T00:01:00.00Z,-117.236062,32.706543,0.15,180.000
2024-02-17T00:02:00.00Z,-117.236100,32.706500,NAN,181.500
2024-02-17T00:03:00.00Z,-117.236200,32.706400,0.30,182.000
";

    #[test]
    fn metadata_key_value_and_unparsed_lines() {
        let md = extract_metadata(&Source::text("nav", NAV)).unwrap();

        assert_eq!(md.len(), 7);
        assert_eq!(md.get("cruise_id"), Some("RR2402"));
        // split happens on the first colon only
        assert_eq!(md.get("source_dataset"), Some("doi:10.7284/910464"));
        assert_eq!(md.get("unparsed_line_6"), Some("note this has no colon"));
    }

    #[test]
    fn only_one_marker_is_stripped() {
        let md = metadata_from_lines(&["  ## heading: x  "]);
        assert_eq!(md.get("# heading"), Some("x"));
    }

    #[test]
    fn duplicate_keys_collapse() {
        let md = metadata_from_lines(&["#a: 1", "#b: 2", "#a: 3"]);
        assert_eq!(md.len(), 2);
        assert_eq!(md.get("a"), Some("3"));
    }

    #[test]
    fn table_rows_exclude_header_and_metadata() {
        let table = extract_table(&Source::text("nav", NAV), &TableOptions::default()).unwrap();

        assert_eq!(table.len(), 3);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(
            names,
            vec!["iso_time", "ship_longitude", "ship_latitude", "speed_made_good", "course_made_good"]
        );
        assert!(table.diagnostics.is_empty());
        // undeclared NAN keeps speed as text
        assert_eq!(table.column("speed_made_good").unwrap().kind, ColumnType::Text);
        assert_eq!(table.column("ship_longitude").unwrap().kind, ColumnType::Numeric);
        assert_eq!(table.column("iso_time").unwrap().kind, ColumnType::Text);
    }

    #[test]
    fn load_geocsv_honours_declared_missing_token() {
        let csv = load_geocsv(&Source::text("nav", NAV), None).unwrap();
        let speed = csv.table.column("speed_made_good").unwrap();
        assert_eq!(speed.kind, ColumnType::Numeric);
        assert_eq!(csv.table.row(1).unwrap().get("speed_made_good"), Some(&Value::Missing));
    }

    #[test]
    fn every_line_is_classified_exactly_once() {
        let lines: Vec<&str> = NAV.lines().collect();
        let md = metadata_from_lines(&lines);
        let table = table_from_lines("nav", &lines, &TableOptions::default()).unwrap();

        let metadata_lines = lines.iter().filter(|l| classify(l) == LineKind::Metadata).count();
        let data_lines = lines.len() - metadata_lines;
        assert_eq!(metadata_lines, md.len());
        assert_eq!(data_lines, table.len() + 1);
    }

    #[test]
    fn short_and_long_rows_are_reported_and_aligned() {
        let text = "#x: 1\na,b,c\n1,2,3\n4,5\n6,7,8,9\n10,11,12\n";
        let table = extract_table(&Source::text("mem", text), &TableOptions::default()).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.diagnostics.len(), 2);
        assert_eq!(
            table.diagnostics[0],
            RowDiagnostic { row: 2, line: 4, expected: 3, found: 2 }
        );
        assert_eq!(table.diagnostics[1].row, 3);
        assert_eq!(table.diagnostics[1].found, 4);

        assert_eq!(table.rows[1], vec![Value::Number(4.0), Value::Number(5.0), Value::Missing]);
        assert_eq!(table.rows[2], vec![Value::Number(6.0), Value::Number(7.0), Value::Number(8.0)]);
        assert_eq!(table.rows[3][2], Value::Number(12.0));
    }

    #[test]
    fn stray_quote_stays_on_its_own_line() {
        let text = "a,b\n1,\"2\n3,4\n5,6\n7,8\n";
        let table = extract_table(&Source::text("quote", text), &TableOptions::default()).unwrap();

        assert_eq!(table.len(), 4);
        assert!(table.diagnostics.is_empty());
        assert_eq!(table.rows[0][1], Value::Text("\"2".into()));
        assert_eq!(table.rows[3], vec![Value::Number(7.0), Value::Number(8.0)]);
    }

    #[test]
    fn stray_quote_keeps_diagnostic_lines() {
        let text = "#x: 1\na,b\n\"1,2\n3\n4,5\n";
        let table = extract_table(&Source::text("quote", text), &TableOptions::default()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.diagnostics,
            vec![RowDiagnostic { row: 2, line: 4, expected: 2, found: 1 }]
        );
    }

    #[test]
    fn header_only_and_metadata_only_sources() {
        let header_only = extract_table(&Source::text("h", "#a: 1\nx,y\n"), &TableOptions::default()).unwrap();
        assert_eq!(header_only.columns.len(), 2);
        assert!(header_only.is_empty());

        let none = extract_table(&Source::text("m", "#a: 1\n#b: 2\n"), &TableOptions::default()).unwrap();
        assert!(none.columns.is_empty());
        assert!(none.is_empty());
    }

    #[test]
    fn custom_delimiter() {
        let text = "#delimiter: ;\nlon;lat\n1.5;2.5\n";
        let csv = load_geocsv(&Source::text("semi", text), None).unwrap();
        assert_eq!(csv.table.row(0).unwrap().get("lat"), Some(&Value::Number(2.5)));
    }

    #[test]
    fn extraction_is_idempotent_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("RR2402_1min.geoCSV");
        File::create(&path).unwrap().write_all(NAV.as_bytes()).unwrap();

        let source = Source::file(&path);
        let first = extract_metadata(&source).unwrap();
        let second = extract_metadata(&source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_reports_error_for_both_views() {
        let dir = tempdir().unwrap();
        let source = Source::file(dir.path().join("absent.geoCSV"));

        assert!(matches!(extract_metadata(&source), Err(GeoCsvError::SourceNotFound { .. })));
        assert!(extract_metadata(&source).unwrap_or_default().is_empty());
        assert!(extract_table(&source, &TableOptions::default())
            .unwrap_or_default()
            .is_empty());
        assert!(matches!(
            extract_table(&source, &TableOptions::default()),
            Err(GeoCsvError::SourceNotFound { .. })
        ));
    }
}
