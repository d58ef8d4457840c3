// 🌱 Seed data loader
// Reads the bundled diamonds CSV into records for first-run bulk loading.
//
// Exported dataframes often carry a leading unnamed index column and stray
// quote characters in header names ("""carat"""); both are tolerated.

use crate::catalog::{Clarity, Color, Cut, DiamondInput, DiamondRecord, Grade};
use crate::error::SeedError;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// The ten attribute columns every seed file must carry
pub const SEED_COLUMNS: [&str; 10] = [
    "carat", "cut", "color", "clarity", "depth", "table", "price", "x", "y", "z",
];

/// Position of each attribute column inside the CSV row
#[derive(Debug)]
struct ColumnMap {
    positions: [usize; 10],
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, SeedError> {
        let mut positions: [Option<usize>; 10] = [None; 10];

        for (index, raw) in headers.iter().enumerate() {
            let name = clean_cell(raw);

            // Index column left behind by a dataframe export
            if name.is_empty() || name.starts_with("Unnamed") {
                continue;
            }

            let slot = SEED_COLUMNS
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| SeedError::UnexpectedColumn(name.clone()))?;

            if positions[slot].replace(index).is_some() {
                return Err(SeedError::DuplicateColumn(name));
            }
        }

        let mut resolved = [0usize; 10];
        for (slot, position) in positions.iter().enumerate() {
            resolved[slot] = position.ok_or(SeedError::MissingColumn(SEED_COLUMNS[slot]))?;
        }

        Ok(ColumnMap {
            positions: resolved,
        })
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        let slot = SEED_COLUMNS
            .iter()
            .position(|c| *c == column)
            .unwrap_or_default();
        record.get(self.positions[slot]).unwrap_or_default()
    }
}

/// Strip whitespace and any `"` characters
fn clean_cell(raw: &str) -> String {
    raw.trim().replace('"', "").trim().to_string()
}

/// Parse a seed CSV file.
///
/// Parsing is all-or-nothing: the first bad row aborts with an error naming
/// its line and column.
pub fn load_seed_csv(path: &Path) -> Result<Vec<DiamondRecord>, SeedError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            SeedError::NotFound(path.to_path_buf())
        } else {
            SeedError::Csv(csv::Error::from(e))
        }
    })?;
    read_seed(file)
}

pub fn read_seed<R: Read>(reader: R) -> Result<Vec<DiamondRecord>, SeedError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(rdr.headers()?)?;

    let mut records = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let row = result?;
        // Header is line 1
        let line = row.position().map(|p| p.line()).unwrap_or(index as u64 + 2);

        let number = |column: &'static str| -> Result<f64, SeedError> {
            let cell = clean_cell(columns.cell(&row, column));
            cell.parse::<f64>().map_err(|e| SeedError::InvalidValue {
                line,
                column,
                message: format!("'{}' is not a number ({})", cell, e),
            })
        };

        let input = DiamondInput {
            carat: number("carat")?,
            depth: number("depth")?,
            table: number("table")?,
            x: number("x")?,
            y: number("y")?,
            z: number("z")?,
            cut: grade::<Cut>(&columns, &row, line)?,
            color: grade::<Color>(&columns, &row, line)?,
            clarity: grade::<Clarity>(&columns, &row, line)?,
        };

        records.push(input.with_price(number("price")?));
    }

    Ok(records)
}

fn grade<G: Grade>(columns: &ColumnMap, row: &StringRecord, line: u64) -> Result<G, SeedError> {
    let cell = clean_cell(columns.cell(row, G::FIELD));
    G::from_label(&cell).map_err(|e| SeedError::InvalidValue {
        line,
        column: G::FIELD,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_dataframe_export_with_index_column() {
        let csv = "\
\"\",\"carat\",\"cut\",\"color\",\"clarity\",\"depth\",\"table\",\"price\",\"x\",\"y\",\"z\"
\"1\",0.23,\"Ideal\",\"E\",\"SI2\",61.5,55,326,3.95,3.98,2.43
\"2\",0.21,\"Premium\",\"E\",\"SI1\",59.8,61,326,3.89,3.84,2.31
\"3\",0.23,\"Good\",\"E\",\"VS1\",56.9,65,327,4.05,4.07,2.31
";

        let records = read_seed(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].input.carat, 0.23);
        assert_eq!(records[0].input.cut, Cut::Ideal);
        assert_eq!(records[1].input.clarity, Clarity::SI1);
        assert_eq!(records[2].input.table, 65.0);
        assert_eq!(records[2].price, 327.0);
        assert!(records.iter().all(|r| r.id.is_none()));
    }

    #[test]
    fn test_header_with_doubled_quotes_and_any_order() {
        // Triple quotes survive CSV unquoting as a literal `"carat"`
        let csv = "\
\"\"\"price\"\"\",\"\"\"carat\"\"\",cut,color,clarity,depth,table,x,y,z
4000,1.0,Very Good,G,VS2,62.0,57,6.4,6.4,3.97
";

        let records = read_seed(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, 4000.0);
        assert_eq!(records[0].input.carat, 1.0);
        assert_eq!(records[0].input.cut, Cut::VeryGood);
    }

    #[test]
    fn test_unnamed_pandas_index_is_dropped() {
        let csv = "\
Unnamed: 0,carat,cut,color,clarity,depth,table,price,x,y,z
0,0.3,Fair,J,I1,64.0,58,400,4.2,4.2,2.7
";

        let records = read_seed(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input.color, Color::J);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let csv = "carat,cut,color,clarity,depth,table,x,y,z\n0.3,Fair,J,I1,64.0,58,4.2,4.2,2.7\n";

        let err = read_seed(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, SeedError::MissingColumn("price")));
    }

    #[test]
    fn test_unexpected_column_is_reported() {
        let csv = "carat,cut,color,clarity,depth,table,price,x,y,z,fluorescence\n";

        let err = read_seed(csv.as_bytes()).unwrap_err();

        assert!(matches!(err, SeedError::UnexpectedColumn(ref c) if c == "fluorescence"));
    }

    #[test]
    fn test_bad_value_names_line_and_column() {
        let csv = "\
carat,cut,color,clarity,depth,table,price,x,y,z
0.3,Fair,J,I1,64.0,58,400,4.2,4.2,2.7
0.4,Excellent,J,I1,64.0,58,400,4.2,4.2,2.7
";

        let err = read_seed(csv.as_bytes()).unwrap_err();

        match err {
            SeedError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "cut");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let csv = "carat,cut,color,clarity,depth,table,price,x,y,z\nabc,Fair,J,I1,64.0,58,400,4.2,4.2,2.7\n";
        let err = read_seed(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("carat"));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let csv = "carat,cut,color,clarity,depth,table,price,x,y,z\n0.3,Fair,J\n";

        assert!(matches!(read_seed(csv.as_bytes()), Err(SeedError::Csv(_))));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let csv = "carat,cut,color,clarity,depth,table,price,x,y,z\n";

        assert!(read_seed(csv.as_bytes()).unwrap().is_empty());
    }
}
