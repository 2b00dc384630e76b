// Primitives for reading voter positions from CSV files.

use std::io::Read;

use crate::winmap::*;

pub fn read_csv_voters(path: &str, source: &VoterSource) -> WinMapResult<Vec<WeightedVoter>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_voters(rdr, source)
}

pub fn read_voters<R: Read>(
    rdr: csv::Reader<R>,
    source: &VoterSource,
) -> WinMapResult<Vec<WeightedVoter>> {
    let first_row = source.first_voter_row_index()?;
    let x_idx = source.x_column_index()?;
    let y_idx = source.y_column_index()?;
    let weight_idx_o = source.weight_column_index_int()?;

    let mut res: Vec<WeightedVoter> = Vec::new();
    // The index starts at 1 to respect most conventions in the spreadsheet world
    for (idx, line_r) in rdr.into_records().enumerate().skip(first_row.saturating_sub(1)) {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_voters: lineno: {:?} row: {:?}", lineno, line);
        let x = read_coordinate(&line, x_idx, lineno)?;
        let y = read_coordinate(&line, y_idx, lineno)?;
        let weight = match weight_idx_o {
            Some(weight_idx) => read_number(&line, weight_idx, lineno)?,
            None => 1.0,
        };
        if weight < 0.0 {
            whatever!("line {}: negative voter weight {}", lineno, weight)
        }
        res.push(WeightedVoter {
            voter: Voter::new(x, y),
            weight,
        });
    }
    Ok(res)
}

fn read_number(line: &csv::StringRecord, col: usize, lineno: usize) -> WinMapResult<f64> {
    let cell = line.get(col).context(CsvLineTooShortSnafu { lineno })?;
    let value = cell
        .trim()
        .parse::<f64>()
        .ok()
        .context(CsvNumberSnafu {
            lineno,
            content: cell.to_string(),
        })?;
    if !value.is_finite() {
        whatever!("line {}: {} is not a finite number", lineno, cell)
    }
    Ok(value)
}

fn read_coordinate(line: &csv::StringRecord, col: usize, lineno: usize) -> WinMapResult<f64> {
    let value = read_number(line, col, lineno)?;
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(
            "read_coordinate: line {}: clamping {} to {}",
            lineno, value, clamped
        );
    }
    Ok(clamped)
}
