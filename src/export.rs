//! CSV export of the sample buffer
//!
//! The table has one `time` column (seconds, `index × timebase`) followed by
//! one integer column per channel axis, named `<channel>_<axis>`:
//!
//! ```text
//! time,accelerometer_x,accelerometer_y,accelerometer_z
//! 0.000000,12,-5,300
//! 0.100000,13,-4,298
//! ```
//!
//! Files are written to a temporary file in the destination directory and
//! renamed into place only after every row is flushed, so a failed export
//! never leaves a truncated table at the target path.

use crate::backend::BufferView;
use crate::error::{PlotterError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the leading timestamp column
pub const TIME_COLUMN: &str = "time";

/// Write every sample of `view` to `path`; returns the number of rows written
pub fn export_csv(view: &BufferView<'_>, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let export_err = |source: std::io::Error| PlotterError::Export {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir).map_err(export_err)?;
    let rows = {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let rows = write_table(view, &mut writer).map_err(export_err)?;
        writer.flush().map_err(export_err)?;
        rows
    };
    tmp.as_file().sync_all().map_err(export_err)?;
    tmp.persist(path).map_err(|e| export_err(e.error))?;

    tracing::info!("Exported {} samples to {:?}", rows, path);
    Ok(rows)
}

/// Serialize `view` as CSV into any writer
pub fn write_table<W: Write>(view: &BufferView<'_>, writer: &mut W) -> std::io::Result<usize> {
    let mut header = String::from(TIME_COLUMN);
    for channel in view.channels() {
        for axis in 0..channel.axis_count() {
            header.push(',');
            header.push_str(&channel.column_name(axis));
        }
    }
    writeln!(writer, "{}", header)?;

    let mut line = String::new();
    for (row, timestamp) in view.timestamps().enumerate() {
        line.clear();
        line.push_str(&format!("{:.6}", timestamp.as_secs_f64()));
        if let Some(values) = view.row(row) {
            for value in values {
                line.push(',');
                line.push_str(&value.to_string());
            }
        }
        writeln!(writer, "{}", line)?;
    }

    Ok(view.len())
}

/// A table read back from an exported file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedTable {
    /// Axis column names, without the time column
    pub columns: Vec<String>,
    /// Time column, in seconds
    pub times: Vec<f64>,
    /// One entry per row, aligned with `columns`
    pub rows: Vec<Vec<i32>>,
}

impl ImportedTable {
    /// All values of one named column
    pub fn column(&self, name: &str) -> Option<Vec<i32>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a table written by [`export_csv`]
pub fn read_csv(path: impl AsRef<Path>) -> Result<ImportedTable> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| PlotterError::Import(format!("cannot open {:?}: {}", path, e)))?;
    let mut lines = BufReader::new(file).lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| PlotterError::Import(e.to_string()))?,
        None => return Err(PlotterError::Import("empty file".to_string())),
    };
    let mut names = header.split(',').map(str::trim);
    if names.next() != Some(TIME_COLUMN) {
        return Err(PlotterError::Import(format!(
            "first column must be '{}'",
            TIME_COLUMN
        )));
    }
    let columns: Vec<String> = names.map(str::to_string).collect();

    let mut times = Vec::new();
    let mut rows = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line.map_err(|e| PlotterError::Import(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row_no = n + 2;
        let mut fields = line.split(',').map(str::trim);

        let time = fields
            .next()
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| PlotterError::Import(format!("row {}: bad time value", row_no)))?;

        let values = fields
            .map(|v| v.parse::<i32>())
            .collect::<std::result::Result<Vec<i32>, _>>()
            .map_err(|e| PlotterError::Import(format!("row {}: {}", row_no, e)))?;
        if values.len() != columns.len() {
            return Err(PlotterError::Import(format!(
                "row {}: expected {} values, got {}",
                row_no,
                columns.len(),
                values.len()
            )));
        }

        times.push(time);
        rows.push(values);
    }

    Ok(ImportedTable {
        columns,
        times,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TimeSeriesBuffer;
    use crate::types::{ParsedSample, Reading, SensorChannel};
    use std::time::Duration;
    use tempfile::TempDir;

    fn two_channel_buffer(count: i32) -> TimeSeriesBuffer {
        let mut buffer = TimeSeriesBuffer::new(
            &[SensorChannel::Accelerometer, SensorChannel::Gyroscope],
            Duration::from_millis(100),
        );
        for i in 0..count {
            buffer
                .append(ParsedSample::new(vec![
                    Reading::new(SensorChannel::Accelerometer, [i, -i, 300]),
                    Reading::new(SensorChannel::Gyroscope, [0, 1, i * 2]),
                ]))
                .unwrap();
        }
        buffer
    }

    #[test]
    fn test_header_and_rows() {
        let buffer = two_channel_buffer(2);
        let mut out = Vec::new();
        let rows = write_table(&buffer.full(), &mut out).unwrap();
        assert_eq!(rows, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "time,accelerometer_x,accelerometer_y,accelerometer_z,gyroscope_x,gyroscope_y,gyroscope_z"
        );
        assert_eq!(lines[1], "0.000000,0,0,300,0,1,0");
        assert_eq!(lines[2], "0.100000,1,-1,300,0,1,2");
    }

    #[test]
    fn test_export_then_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.csv");
        let buffer = two_channel_buffer(25);

        assert_eq!(export_csv(&buffer.full(), &path).unwrap(), 25);

        let table = read_csv(&path).unwrap();
        assert_eq!(table.len(), 25);
        let expected: Vec<i32> = buffer
            .full()
            .axis(SensorChannel::Gyroscope, 2)
            .unwrap()
            .collect();
        assert_eq!(table.column("gyroscope_z").unwrap(), expected);
        assert!((table.times[24] - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_buffer_exports_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        let buffer = two_channel_buffer(0);
        assert_eq!(export_csv(&buffer.full(), &path).unwrap(), 0);
        let table = read_csv(&path).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 6);
    }

    #[test]
    fn test_failed_export_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = export_csv(&two_channel_buffer(3).full(), &path).unwrap_err();
        assert!(matches!(err, PlotterError::Export { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale").unwrap();
        export_csv(&two_channel_buffer(1).full(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("time,"));
    }

    #[test]
    fn test_read_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "time,a,b\n0.0,1\n").unwrap();
        assert!(matches!(read_csv(&path), Err(PlotterError::Import(_))));
    }
}
