//! Plain-text two-to-four column data files.
//!
//! One point per line: `x y [x_uncertainty y_uncertainty]`. Columns are
//! separated by whitespace unless a separator is given; blank lines and
//! lines starting with `#` are ignored. There is no header.

use std::io::{BufRead, Write};
use std::path::Path;

/// One data row.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_unc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_unc: Option<f64>,
}

impl DataPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            x_unc: None,
            y_unc: None,
        }
    }

    pub fn with_uncertainties(x: f64, y: f64, x_unc: f64, y_unc: f64) -> Self {
        Self {
            x,
            y,
            x_unc: Some(x_unc),
            y_unc: Some(y_unc),
        }
    }
}

/// Errors raised while loading a data file.
#[derive(Debug)]
pub enum DataFileError {
    Io(std::io::Error),
    /// A line could not be parsed; `line` is 1-based.
    MalformedLine { line: usize, reason: String },
}

impl std::fmt::Display for DataFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::MalformedLine { line, reason } => {
                write!(f, "malformed data on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for DataFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::MalformedLine { .. } => None,
        }
    }
}

impl From<std::io::Error> for DataFileError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

fn parse_field(raw: &str, line: usize, what: &str) -> Result<f64, DataFileError> {
    raw.parse::<f64>()
        .map_err(|e| DataFileError::MalformedLine {
            line,
            reason: format!("invalid {} '{}': {}", what, raw, e),
        })
}

fn split_fields<'a>(line: &'a str, sep: Option<&'a str>) -> Vec<&'a str> {
    match sep {
        Some(sep) => line
            .split(sep)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        None => line.split_whitespace().collect(),
    }
}

/// Parse one non-comment line.
fn parse_line(raw: &str, line: usize, sep: Option<&str>) -> Result<DataPoint, DataFileError> {
    let fields = split_fields(raw, sep);
    if fields.len() < 2 {
        return Err(DataFileError::MalformedLine {
            line,
            reason: format!("expected at least 2 columns, found {}", fields.len()),
        });
    }
    let x = parse_field(fields[0], line, "x value")?;
    let y = parse_field(fields[1], line, "y value")?;
    let x_unc = fields
        .get(2)
        .map(|raw| parse_field(raw, line, "x uncertainty"))
        .transpose()?;
    let y_unc = fields
        .get(3)
        .map(|raw| parse_field(raw, line, "y uncertainty"))
        .transpose()?;
    Ok(DataPoint { x, y, x_unc, y_unc })
}

/// Parse all points together with their 1-based line numbers.
pub(crate) fn read_numbered_points<R: BufRead>(
    reader: R,
    sep: Option<&str>,
) -> Result<Vec<(usize, DataPoint)>, DataFileError> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        out.push((idx + 1, parse_line(trimmed, idx + 1, sep)?));
    }
    Ok(out)
}

/// Parse every point of a data stream.
pub fn read_points<R: BufRead>(reader: R, sep: Option<&str>) -> Result<Vec<DataPoint>, DataFileError> {
    Ok(read_numbered_points(reader, sep)?
        .into_iter()
        .map(|(_, p)| p)
        .collect())
}

/// Load a data file from disk.
pub fn load_points(path: &Path, sep: Option<&str>) -> Result<Vec<DataPoint>, DataFileError> {
    let file = std::fs::File::open(path)?;
    read_points(std::io::BufReader::new(file), sep)
}

/// Write points, emitting uncertainty columns only when both are present.
pub fn write_points<W: Write>(mut writer: W, points: &[DataPoint]) -> std::io::Result<()> {
    for p in points {
        match (p.x_unc, p.y_unc) {
            (Some(xu), Some(yu)) => writeln!(writer, "{} {} {} {}", p.x, p.y, xu, yu)?,
            _ => writeln!(writer, "{} {}", p.x, p.y)?,
        }
    }
    writer.flush()
}

/// Save points to a file on disk.
pub fn save_points(path: &Path, points: &[DataPoint]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_points(std::io::BufWriter::new(file), points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# header comment\n\n0.0 0.1\n  # indented comment\n0.5 -0.2 0.01 0.02\n";
        let points = read_points(text.as_bytes(), None).expect("parse");
        assert_eq!(
            points,
            vec![
                DataPoint::new(0.0, 0.1),
                DataPoint::with_uncertainties(0.5, -0.2, 0.01, 0.02),
            ]
        );
    }

    #[test]
    fn three_columns_leave_y_uncertainty_empty() {
        let points = read_points("1 2 0.5\n".as_bytes(), None).expect("parse");
        assert_eq!(points[0].x_unc, Some(0.5));
        assert_eq!(points[0].y_unc, None);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let text = "1 2\n# skip\n3\n";
        let err = read_points(text.as_bytes(), None).expect_err("single column");
        match err {
            DataFileError::MalformedLine { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparsable_number_is_malformed() {
        let err = read_points("1 abc\n".as_bytes(), None).expect_err("bad float");
        assert!(err.to_string().contains("line 1"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn custom_separator_splits_csv() {
        let points = read_points("1.5, 2.5\n3,4,0.1,0.2\n".as_bytes(), Some(",")).expect("csv");
        assert_eq!(points[0], DataPoint::new(1.5, 2.5));
        assert_eq!(points[1], DataPoint::with_uncertainties(3.0, 4.0, 0.1, 0.2));
    }

    #[test]
    fn written_points_parse_back() {
        let points = vec![
            DataPoint::new(0.25, 1.75),
            DataPoint::with_uncertainties(-1.0, 2.0, 0.5, 0.125),
        ];
        let mut buf = Vec::new();
        write_points(&mut buf, &points).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text, "0.25 1.75\n-1 2 0.5 0.125\n");
        assert_eq!(read_points(text.as_bytes(), None).expect("parse"), points);
    }
}
