//! Loading the merged census tract table.
//!
//! The input is a comma-separated file with a header line, one row per
//! census tract. Fields may be double-quoted (with `""` as an escaped
//! quote); quoted fields may not span lines. Blank lines are skipped.
//!
//! Numeric columns are read leniently: empty cells, `NA`/`NaN` and anything
//! that does not parse as a finite number become `None`, and each accessor
//! decides how to filter them.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::DataError;

/// Home value ratio, 2019-23 over 1990.
pub const APPRECIATION_RATIO: &str = "home_value_ratio_2019_23_to_1990";
/// Median home value in 1990.
pub const HOME_VALUE_1990: &str = "median_home_value_1990";
/// Median home value over 2019-23.
pub const HOME_VALUE_2019_23: &str = "2019-23_value";

/// Year assigned to the 2019-23 aggregate (its midpoint).
pub const YEAR_2019_23: f64 = 2021.0;

/// Predictors of the poverty regression, in model order.
pub const REGRESSION_PREDICTORS: [&str; 7] = [
    "poverty_rate",
    "race_white",
    "race_asian_pacific_islander",
    "housing_occupied",
    "occupancy_rate",
    "total_housing_units",
    HOME_VALUE_1990,
];

/// Raw census table: a header and string cells.
#[derive(Debug, Clone)]
pub struct CensusTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Home values stacked into `(year, value)` observations.
#[derive(Debug, Clone, Default)]
pub struct HomeValuePanel {
    /// Observation year
    pub years: Vec<f64>,
    /// Median home value
    pub values: Vec<f64>,
}

impl HomeValuePanel {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Whether the panel has no observations.
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Complete-case response and predictor columns.
#[derive(Debug, Clone)]
pub struct RegressionFrame {
    /// Response column name
    pub response_name: String,
    /// Response values
    pub response: Vec<f64>,
    /// Named predictor columns, aligned with the response
    pub predictors: Vec<(String, Vec<f64>)>,
    /// Rows dropped for a missing value in any used column
    pub dropped_rows: usize,
}

impl RegressionFrame {
    /// Predictors in the borrowed form taken by the regression routines.
    pub fn predictor_slices(&self) -> Vec<(&str, &[f64])> {
        self.predictors
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
            .collect()
    }

    /// Number of complete rows.
    pub fn len(&self) -> usize {
        self.response.len()
    }

    /// Whether no row is complete.
    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }
}

/// Split one CSV line into fields, honouring double quotes.
fn split_fields(line: &str, line_number: usize) -> Result<Vec<String>, DataError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DataError::Parse {
            line: line_number,
            message: "unterminated quoted field".to_string(),
        });
    }
    fields.push(field);
    Ok(fields.into_iter().map(|f| f.trim().to_string()).collect())
}

/// Lenient numeric cell parse.
fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl CensusTable {
    /// Read a table from a CSV file.
    ///
    /// # Errors
    /// `DataError::Io` if the file cannot be read, `DataError::Parse` for a
    /// malformed line.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Read a table from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DataError> {
        let mut headers: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = index + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields = split_fields(line, line_number)?;
            match &headers {
                None => {
                    let fields: Vec<String> = fields
                        .into_iter()
                        .map(|f| f.trim_start_matches('\u{feff}').to_string())
                        .collect();
                    headers = Some(fields);
                }
                Some(h) => {
                    if fields.len() != h.len() {
                        return Err(DataError::Parse {
                            line: line_number,
                            message: format!(
                                "expected {} fields, found {}",
                                h.len(),
                                fields.len()
                            ),
                        });
                    }
                    rows.push(fields);
                }
            }
        }

        let headers = headers.ok_or_else(|| DataError::Parse {
            line: 1,
            message: "no header line".to_string(),
        })?;
        Ok(Self { headers, rows })
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Result<usize, DataError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// A column parsed as numbers, `None` where a cell is missing or not numeric.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, DataError> {
        let index = self.column_index(name)?;
        let column: Vec<Option<f64>> = self.rows.iter().map(|row| parse_cell(&row[index])).collect();
        let missing = column.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            log::debug!("Column '{}': {} of {} cells missing", name, missing, column.len());
        }
        Ok(column)
    }

    /// Positive home value appreciation ratios.
    pub fn appreciation_ratios(&self) -> Result<Vec<f64>, DataError> {
        Ok(self
            .numeric_column(APPRECIATION_RATIO)?
            .into_iter()
            .flatten()
            .filter(|&r| r > 0.0)
            .collect())
    }

    /// Stack the 1990 and 2019-23 home values into one `(year, value)` panel.
    ///
    /// All 1990 observations come first, then all 2019-23 observations, each
    /// in row order. Missing values are dropped.
    pub fn home_value_panel(&self) -> Result<HomeValuePanel, DataError> {
        let mut panel = HomeValuePanel::default();
        for (column, year) in [(HOME_VALUE_1990, 1990.0), (HOME_VALUE_2019_23, YEAR_2019_23)] {
            for value in self.numeric_column(column)?.into_iter().flatten() {
                panel.years.push(year);
                panel.values.push(value);
            }
        }
        Ok(panel)
    }

    /// Rows where the response and every predictor are present.
    pub fn regression_frame(
        &self,
        response: &str,
        predictors: &[&str],
    ) -> Result<RegressionFrame, DataError> {
        let response_column = self.numeric_column(response)?;
        let predictor_columns = predictors
            .iter()
            .map(|name| self.numeric_column(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut frame = RegressionFrame {
            response_name: response.to_string(),
            response: Vec::new(),
            predictors: predictors
                .iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
            dropped_rows: 0,
        };

        for row in 0..self.len() {
            let values: Option<Vec<f64>> = predictor_columns.iter().map(|c| c[row]).collect();
            match (response_column[row], values) {
                (Some(y), Some(values)) => {
                    frame.response.push(y);
                    for ((_, column), v) in frame.predictors.iter_mut().zip(values) {
                        column.push(v);
                    }
                }
                _ => frame.dropped_rows += 1,
            }
        }

        if frame.dropped_rows > 0 {
            log::warn!(
                "Dropped {} of {} rows with missing regression values",
                frame.dropped_rows,
                self.len()
            );
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn table(text: &str) -> CensusTable {
        CensusTable::from_reader(Cursor::new(text)).unwrap()
    }

    #[test]
    fn test_quoted_fields() {
        let fields = split_fields(r#"a,"b,c","say ""hi""",  d "#, 1).unwrap();
        assert_eq!(fields, vec!["a", "b,c", "say \"hi\"", "d"]);
        assert!(matches!(
            split_fields(r#"a,"b"#, 4),
            Err(DataError::Parse { line: 4, .. })
        ));
    }

    #[test]
    fn test_numeric_column_is_lenient() {
        let t = table("id,x\n1,2.5\n2,\n3,NA\n4,abc\n\n5,-1e3\n");
        assert_eq!(t.len(), 5);
        assert_eq!(
            t.numeric_column("x").unwrap(),
            vec![Some(2.5), None, None, None, Some(-1000.0)]
        );
    }

    #[test]
    fn test_missing_column() {
        let t = table("a,b\n1,2\n");
        match t.numeric_column("c") {
            Err(DataError::MissingColumn { name }) => assert_eq!(name, "c"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_a_parse_error() {
        let result = CensusTable::from_reader(Cursor::new("a,b\n1,2\n3\n"));
        assert!(matches!(result, Err(DataError::Parse { line: 3, .. })));
    }

    #[test]
    fn test_appreciation_ratios_keep_positive_values() {
        let t = table(&format!("{}\n2.5\n0\n-1\n\n3.25\nNA\n", APPRECIATION_RATIO));
        assert_eq!(t.appreciation_ratios().unwrap(), vec![2.5, 3.25]);
    }

    #[test]
    fn test_home_value_panel_stacks_years() {
        let t = table(&format!(
            "GISJOIN,{},{}\nG1,100,400\nG2,,500\nG3,200,\n",
            HOME_VALUE_1990, HOME_VALUE_2019_23
        ));
        let panel = t.home_value_panel().unwrap();
        assert_eq!(panel.years, vec![1990.0, 1990.0, 2021.0, 2021.0]);
        assert_eq!(panel.values, vec![100.0, 200.0, 400.0, 500.0]);
    }

    #[test]
    fn test_regression_frame_complete_cases() {
        let t = table("y,a,b\n1,2,3\n4,,6\n7,8,9\n,1,1\n");
        let frame = t.regression_frame("y", &["a", "b"]).unwrap();
        assert_eq!(frame.response, vec![1.0, 7.0]);
        assert_eq!(frame.predictors[0], ("a".to_string(), vec![2.0, 8.0]));
        assert_eq!(frame.predictors[1], ("b".to_string(), vec![3.0, 9.0]));
        assert_eq!(frame.dropped_rows, 2);
        assert_eq!(frame.predictor_slices()[1].0, "b");
    }

    #[test]
    fn test_empty_input_has_no_header() {
        assert!(matches!(
            CensusTable::from_reader(Cursor::new("\n\n")),
            Err(DataError::Parse { .. })
        ));
    }
}
