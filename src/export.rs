//! Writing recorded traces to disk at the end of a session.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::Mode;
use crate::signal::SignalConditioner;

/// File stem for a session's outputs, `<UTC timestamp>_<mode>`.
pub fn session_stem(started: DateTime<Utc>, mode: Mode) -> String {
    format!("{}_{}", started.format("%Y%m%dT%H%M%SZ"), mode)
}

/// `<dir>/<stem><suffix>`, e.g. `logs/20260101T120000Z_game.csv`.
pub fn session_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{stem}{suffix}"))
}

/// One row per retained sample: absolute index, time, raw, rectified
/// bandpassed and smoothed output.
pub fn save_traces_csv<P: AsRef<Path>>(path: P, conditioner: &SignalConditioner) -> std::io::Result<()> {
    if let Some(dir) = path.as_ref().parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(f, "index,time,raw,bandpassed,output")?;
    let fs = conditioner.sampling_frequency();
    for (i, out) in conditioner.output().iter() {
        let raw = conditioner.input().get(i).unwrap_or(f64::NAN);
        let bp = conditioner.bandpassed().get(i).unwrap_or(f64::NAN);
        writeln!(f, "{},{:.6},{},{},{}", i, i as f64 / fs, raw, bp, out)?;
    }
    f.flush()
}

#[cfg(feature = "parquet")]
pub fn save_traces_parquet<P: AsRef<Path>>(path: P, conditioner: &SignalConditioner) -> parquet::errors::Result<()> {
    use arrow_array::{Float64Array, RecordBatch, UInt64Array};
    use arrow_schema::{DataType, Field, Schema};
    use parquet::arrow::arrow_writer::ArrowWriter;
    use parquet::file::properties::WriterProperties;

    let fs = conditioner.sampling_frequency();
    let mut idx_col: Vec<u64> = Vec::new();
    let mut time_col: Vec<f64> = Vec::new();
    let mut raw_col: Vec<f64> = Vec::new();
    let mut bp_col: Vec<f64> = Vec::new();
    let mut out_col: Vec<f64> = Vec::new();
    for (i, out) in conditioner.output().iter() {
        idx_col.push(i as u64);
        time_col.push(i as f64 / fs);
        raw_col.push(conditioner.input().get(i).unwrap_or(f64::NAN));
        bp_col.push(conditioner.bandpassed().get(i).unwrap_or(f64::NAN));
        out_col.push(out);
    }
    let schema = std::sync::Arc::new(Schema::new(vec![
        Field::new("index", DataType::UInt64, false),
        Field::new("time", DataType::Float64, false),
        Field::new("raw", DataType::Float64, false),
        Field::new("bandpassed", DataType::Float64, false),
        Field::new("output", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            std::sync::Arc::new(UInt64Array::from(idx_col)) as _,
            std::sync::Arc::new(Float64Array::from(time_col)) as _,
            std::sync::Arc::new(Float64Array::from(raw_col)) as _,
            std::sync::Arc::new(Float64Array::from(bp_col)) as _,
            std::sync::Arc::new(Float64Array::from(out_col)) as _,
        ],
    )?;
    let file = std::fs::File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
