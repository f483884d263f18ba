use std::fs;
use std::path::Path;

use csv::StringRecord;

use crate::error::{FnResult, WriteError};

/// Per-stop diagnostic numbers written to the `_extended` output file,
/// for one event type (arrival or departure) of one row.
#[derive(Debug, Clone)]
pub struct DiagnosticStats {
    pub original: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub n_filtered: usize,
    pub n_unfiltered: usize,
}

/// One fully-resolved output row: the final arrival/departure values the
/// engine decided to emit, plus the diagnostics behind that decision
/// (absent when no Stats existed for that event type at this stop).
pub struct EmittedStopTime {
    pub raw: StringRecord,
    pub arrival_value: i64,
    pub departure_value: i64,
    pub arrival_diag: Option<DiagnosticStats>,
    pub departure_diag: Option<DiagnosticStats>,
}

/// Schedule writer (spec §4.5). One of the four named injected
/// capabilities. Writes both files to the GTFS directory; the original
/// `stop_times.txt` is never touched.
pub trait GtfsWriter {
    fn write(
        &self,
        gtfs_dir: &Path,
        headers: &StringRecord,
        arrival_column: usize,
        departure_column: usize,
        rows: &[EmittedStopTime],
    ) -> FnResult<()>;
}

pub struct CsvGtfsWriter;

impl CsvGtfsWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvGtfsWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GtfsWriter for CsvGtfsWriter {
    fn write(
        &self,
        gtfs_dir: &Path,
        headers: &StringRecord,
        arrival_column: usize,
        departure_column: usize,
        rows: &[EmittedStopTime],
    ) -> FnResult<()> {
        let new_path = gtfs_dir.join("stop_times.txt_new");
        let extended_path = gtfs_dir.join("stop_times.txt_extended");
        let new_tmp = gtfs_dir.join("stop_times.txt_new.tmp");
        let extended_tmp = gtfs_dir.join("stop_times.txt_extended.tmp");

        write_new_file(&new_tmp, headers, arrival_column, departure_column, rows)?;
        write_extended_file(&extended_tmp, headers, arrival_column, departure_column, rows)?;

        // Both renames happen only after both temp files were written
        // successfully, so a crash mid-write never leaves a partially
        // updated pair of outputs (spec §5/§7: either both files are
        // produced, or neither is).
        fs::rename(&new_tmp, &new_path)
            .map_err(|e| WriteError(format!("cannot finalize {}: {}", new_path.display(), e)))?;
        fs::rename(&extended_tmp, &extended_path)
            .map_err(|e| WriteError(format!("cannot finalize {}: {}", extended_path.display(), e)))?;

        Ok(())
    }
}

fn write_new_file(
    path: &Path,
    headers: &StringRecord,
    arrival_column: usize,
    departure_column: usize,
    rows: &[EmittedStopTime],
) -> FnResult<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| WriteError(format!("cannot create {}: {}", path.display(), e)))?;
    wtr.write_record(headers)
        .map_err(|e| WriteError(format!("cannot write header to {}: {}", path.display(), e)))?;

    for row in rows {
        let mut record: Vec<String> = row.raw.iter().map(|s| s.to_string()).collect();
        record[arrival_column] = format_gtfs_time(row.arrival_value);
        record[departure_column] = format_gtfs_time(row.departure_value);
        wtr.write_record(&record)
            .map_err(|e| WriteError(format!("cannot write row to {}: {}", path.display(), e)))?;
    }
    wtr.flush()
        .map_err(|e| WriteError(format!("cannot flush {}: {}", path.display(), e)))?;
    Ok(())
}

fn write_extended_file(
    path: &Path,
    headers: &StringRecord,
    arrival_column: usize,
    departure_column: usize,
    rows: &[EmittedStopTime],
) -> FnResult<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| WriteError(format!("cannot create {}: {}", path.display(), e)))?;

    let mut extended_headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    for prefix in &["arrival", "departure"] {
        extended_headers.push(format!("original_{}", prefix));
        extended_headers.push(format!("min_{}", prefix));
        extended_headers.push(format!("max_{}", prefix));
        extended_headers.push(format!("mean_{}", prefix));
        extended_headers.push(format!("std_dev_{}", prefix));
        extended_headers.push(format!("n_filtered_{}", prefix));
        extended_headers.push(format!("n_unfiltered_{}", prefix));
    }
    wtr.write_record(&extended_headers)
        .map_err(|e| WriteError(format!("cannot write header to {}: {}", path.display(), e)))?;

    for row in rows {
        let mut record: Vec<String> = row.raw.iter().map(|s| s.to_string()).collect();
        record[arrival_column] = format_gtfs_time(row.arrival_value);
        record[departure_column] = format_gtfs_time(row.departure_value);
        push_diagnostic_columns(&mut record, &row.arrival_diag);
        push_diagnostic_columns(&mut record, &row.departure_diag);
        wtr.write_record(&record)
            .map_err(|e| WriteError(format!("cannot write row to {}: {}", path.display(), e)))?;
    }
    wtr.flush()
        .map_err(|e| WriteError(format!("cannot flush {}: {}", path.display(), e)))?;
    Ok(())
}

fn push_diagnostic_columns(record: &mut Vec<String>, diag: &Option<DiagnosticStats>) {
    match diag {
        Some(d) => {
            record.push(format_gtfs_time(d.original));
            record.push(format_gtfs_time(d.min));
            record.push(format_gtfs_time(d.max));
            record.push(format!("{:.3}", d.mean));
            record.push(d.std_dev.map(|s| format!("{:.3}", s)).unwrap_or_default());
            record.push(d.n_filtered.to_string());
            record.push(d.n_unfiltered.to_string());
        }
        None => {
            for _ in 0..7 {
                record.push(String::new());
            }
        }
    }
}

/// Formats seconds-from-midnight as GTFS's `HH:MM:SS`, preserving values
/// above 24:00:00 for after-midnight service.
fn format_gtfs_time(total_seconds: i64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_after_midnight_time() {
        assert_eq!(format_gtfs_time(25 * 3600 + 3 * 60 + 10), "25:03:10");
    }

    #[test]
    fn formats_regular_time() {
        assert_eq!(format_gtfs_time(7 * 3600 + 3 * 60), "07:03:00");
    }
}
