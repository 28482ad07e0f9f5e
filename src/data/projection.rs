use super::model::{parse_number, TabularDataset, Value};
use crate::error::GeoCsvError;

/// Pull `columns` out of every row, in the requested order, as numbers.
///
/// A cell that is missing, or equal to `missing_token`, becomes `f64::NAN`
/// only when the caller supplies a token; otherwise it is a
/// [`GeoCsvError::NonNumericValue`] like any other non-numeric cell.
pub fn project_columns(
    dataset: &TabularDataset,
    columns: &[&str],
    missing_token: Option<&str>,
) -> Result<Vec<Vec<f64>>, GeoCsvError> {
    let indices = columns
        .iter()
        .map(|name| {
            dataset
                .column_index(name)
                .ok_or_else(|| GeoCsvError::ColumnNotFound {
                    name: dataset.source.clone(),
                    column: name.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    dataset
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            indices
                .iter()
                .zip(columns)
                .map(|(&c, name)| {
                    let cell = row.get(c).unwrap_or(&Value::Missing);
                    coerce(cell, missing_token).ok_or_else(|| GeoCsvError::NonNumericValue {
                        name: dataset.source.clone(),
                        row: r + 1,
                        column: name.to_string(),
                        value: match cell {
                            Value::Missing => String::new(),
                            other => other.to_string(),
                        },
                    })
                })
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect()
}

fn coerce(cell: &Value, missing_token: Option<&str>) -> Option<f64> {
    match cell {
        Value::Number(v) => Some(*v),
        Value::Missing => missing_token.map(|_| f64::NAN),
        Value::Text(s) if Some(s.as_str()) == missing_token => Some(f64::NAN),
        Value::Text(s) => parse_number(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{extract_table, TableOptions};
    use crate::data::source::Source;

    const TRACK: &str = "\
#cruise_id: RR2402
iso_time,ship_longitude,ship_latitude,speed_made_good,course_made_good
2024-02-17T00:01:00.00Z,-117.236062,32.706543,0.15,180.000
2024-02-17T00:02:00.00Z,-117.2361,NAN,0.20,181.000
";

    fn table() -> TabularDataset {
        extract_table(&Source::text("track", TRACK), &TableOptions::default()).unwrap()
    }

    #[test]
    fn projects_requested_columns_in_order() {
        let text = "\
iso_time,ship_longitude,ship_latitude,speed_made_good,course_made_good
2024-02-17T00:01:00.00Z,-117.236062,32.706543,0.15,180.000
";
        let ds = extract_table(&Source::text("one", text), &TableOptions::default()).unwrap();
        let coords = project_columns(&ds, &["ship_longitude", "ship_latitude"], None).unwrap();
        assert_eq!(coords, vec![vec![-117.236062, 32.706543]]);

        let swapped = project_columns(&ds, &["ship_latitude", "ship_longitude"], None).unwrap();
        assert_eq!(swapped, vec![vec![32.706543, -117.236062]]);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let err = project_columns(&table(), &["ship_longitude", "depth"], None).unwrap_err();
        match err {
            GeoCsvError::ColumnNotFound { column, name } => {
                assert_eq!(column, "depth");
                assert_eq!(name, "track");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nan_placeholder_without_convention_is_non_numeric() {
        let err = project_columns(&table(), &["ship_longitude", "ship_latitude"], None).unwrap_err();
        match err {
            GeoCsvError::NonNumericValue { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "ship_latitude");
                assert_eq!(value, "NAN");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nan_placeholder_with_convention_becomes_nan() {
        let coords = project_columns(&table(), &["ship_longitude", "ship_latitude"], Some("NAN")).unwrap();
        assert_eq!(coords.len(), 2);
        assert!(coords[1][1].is_nan());
        assert_eq!(coords[1][0], -117.2361);
    }

    #[test]
    fn empty_cell_needs_convention() {
        let ds = extract_table(&Source::text("gap", "a,b\n1,\n"), &TableOptions::default()).unwrap();
        assert!(project_columns(&ds, &["a", "b"], None).is_err());
        let coords = project_columns(&ds, &["a", "b"], Some("NAN")).unwrap();
        assert!(coords[0][1].is_nan());
    }
}
