//! CSV export for cycle records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::CycleRecord;

/// Column header for CSV telemetry export.
const HEADER: &str = "cycle,time,load_w,production_w,grid_w,status,direction,required_w,target_grid_w,\
                       main_area,main_setpoint_w,main_w,main_soc,main_ready,\
                       support_area,support_setpoint_w,support_w,support_soc,support_ready,error";

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Exports cycle records to a CSV file at the given path.
///
/// Writes a header row followed by one row per cycle. Undefined values are
/// written as empty fields. Produces deterministic output for identical
/// inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[CycleRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes cycle records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[CycleRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.cycle.to_string(),
            r.time.format("%Y-%m-%dT%H:%M:%S").to_string(),
            r.load_w.to_string(),
            r.production_w.to_string(),
            r.grid_w.to_string(),
            r.status.to_string(),
            opt(r.direction),
            opt(r.required_w),
            opt(r.target_grid_w),
            opt(r.main_area),
            opt(r.main.setpoint_w),
            r.main.applied_w.to_string(),
            r.main.soc.to_string(),
            r.main.ready.to_string(),
            opt(r.support_area),
            opt(r.support.setpoint_w),
            r.support.applied_w.to_string(),
            r.support.soc.to_string(),
            r.support.ready.to_string(),
            r.error.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
