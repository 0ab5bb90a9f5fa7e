// ============================================================
// Layer 4 - Sample Table Loader
// ============================================================
// Reads the input table: one row per sample, two columns
//
//   elements : list<string>   e.g. ["Ag", "Cu", "O"]
//   spectrum : list<float>    fixed length, positive values
//
// Supported encodings (dispatch by extension):
//   .parquet / .pq  - written by pandas `df.to_parquet()`
//   .json           - records orientation, `df.to_json(orient="records")`
//
// After loading, validate_shapes() enforces the only structural
// invariant the pipeline relies on: every spectrum has the same
// number of bins.
//
// Reference: arrow / parquet crate documentation
//            Rust Book §9 (Error Handling)

use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Builder, ListBuilder, StringBuilder},
    datatypes::{DataType, Field, Float32Type, Float64Type, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::sample::Sample;
use crate::domain::traits::SampleSource;

/// Names of the two columns the loader reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub elements: String,
    pub spectrum: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            elements: "elements".to_string(),
            spectrum: "spectrum".to_string(),
        }
    }
}

/// Loads every sample from a parquet or JSON table.
/// Implements the SampleSource trait from Layer 3.
pub struct TableLoader {
    path:    PathBuf,
    columns: ColumnNames,
}

impl TableLoader {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnNames) -> Self {
        Self { path: path.into(), columns }
    }
}

impl SampleSource for TableLoader {
    fn load_all(&self) -> Result<Vec<Sample>> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let samples = match ext.as_str() {
            "parquet" | "pq" => load_parquet(&self.path, &self.columns)?,
            "json"           => load_json(&self.path, &self.columns)?,
            other            => bail!("Unsupported data file extension: '.{other}'"),
        };

        tracing::info!(
            "Loaded {} samples from '{}'",
            samples.len(),
            self.path.display()
        );
        Ok(samples)
    }
}

// ─── Shape validation ─────────────────────────────────────────────────────────
/// Check that the table is non-empty, every spectrum has the same
/// length, and every value is finite and fits in an f32 (the network's
/// input type). Returns the spectrum length.
///
/// Non-positive values are tolerated (background-subtracted data can
/// dip below zero) but logged, since the raw format promises positives.
pub fn validate_shapes(samples: &[Sample]) -> Result<usize> {
    let Some(first) = samples.first() else {
        bail!("Dataset is empty");
    };

    let expected = first.spectrum_len();
    if expected == 0 {
        bail!("Row 0: spectrum is empty");
    }

    let mut non_positive = 0usize;
    for (row, s) in samples.iter().enumerate() {
        if s.spectrum_len() != expected {
            bail!(
                "Row {row}: spectrum has {} values, expected {expected}",
                s.spectrum_len()
            );
        }
        if let Some(j) = s.spectrum.iter().position(|v| !v.is_finite()) {
            bail!("Row {row}, spectrum[{j}]: value is not finite");
        }
        if let Some(j) = s.spectrum.iter().position(|v| v.abs() > f32::MAX as f64) {
            bail!(
                "Row {row}, spectrum[{j}]: {} is outside the f32 range",
                s.spectrum[j]
            );
        }
        non_positive += s.spectrum.iter().filter(|&&v| v <= 0.0).count();
    }

    if non_positive > 0 {
        tracing::warn!("{non_positive} spectrum values are zero or negative");
    }
    Ok(expected)
}

// ─── JSON loader ──────────────────────────────────────────────────────────────
/// Expected layout:
///
/// ```json
/// [
///   { "elements": ["Ag", "O"], "spectrum": [0.12, 0.14, ...] },
///   ...
/// ]
/// ```
///
/// Extra keys per record are ignored.
fn load_json(path: &Path, columns: &ColumnNames) -> Result<Vec<Sample>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let root: JsonValue = serde_json::from_str(&text)
        .with_context(|| format!("Cannot parse JSON in '{}'", path.display()))?;

    let records = root
        .as_array()
        .context("Expected a top-level JSON array of records")?;

    records
        .iter()
        .enumerate()
        .map(|(row, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {row} is not a JSON object"))?;

            let elements = obj
                .get(&columns.elements)
                .and_then(|v| v.as_array())
                .with_context(|| {
                    format!("Row {row}: missing or invalid '{}' array", columns.elements)
                })?
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    v.as_str().map(str::to_string).with_context(|| {
                        format!("Row {row}, {}[{j}]: not a string", columns.elements)
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let spectrum = obj
                .get(&columns.spectrum)
                .and_then(|v| v.as_array())
                .with_context(|| {
                    format!("Row {row}: missing or invalid '{}' array", columns.spectrum)
                })?
                .iter()
                .enumerate()
                .map(|(j, v)| {
                    v.as_f64().with_context(|| {
                        format!("Row {row}, {}[{j}]: not a number", columns.spectrum)
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Sample::new(elements, spectrum))
        })
        .collect()
}

// ─── Parquet loader ───────────────────────────────────────────────────────────
/// Both columns may be List or LargeList. Element symbols may be
/// Utf8 or LargeUtf8, spectra Float64 or Float32.
fn load_parquet(path: &Path, columns: &ColumnNames) -> Result<Vec<Sample>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut samples = Vec::new();

    for batch in reader {
        let batch  = batch.context("reading parquet record batch")?;
        let schema = batch.schema();

        let el_idx = schema
            .index_of(&columns.elements)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{}' column", columns.elements))?;
        let sp_idx = schema
            .index_of(&columns.spectrum)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{}' column", columns.spectrum))?;

        let el_col = batch.column(el_idx);
        let sp_col = batch.column(sp_idx);

        for row in 0..batch.num_rows() {
            // Row numbers are global across record batches
            let global = samples.len();
            let elements = extract_string_list(el_col, row)
                .with_context(|| format!("Row {global}: failed to read '{}'", columns.elements))?;
            let spectrum = extract_f64_list(sp_col, row)
                .with_context(|| format!("Row {global}: failed to read '{}'", columns.spectrum))?;
            samples.push(Sample::new(elements, spectrum));
        }
    }

    Ok(samples)
}

/// The inner values array of a List / LargeList cell
fn list_cell(col: &ArrayRef, row: usize) -> Result<ArrayRef> {
    if col.is_null(row) {
        bail!("null value in list column");
    }
    match col.data_type() {
        DataType::List(_)      => Ok(col.as_list::<i32>().value(row)),
        DataType::LargeList(_) => Ok(col.as_list::<i64>().value(row)),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    }
}

fn extract_string_list(col: &ArrayRef, row: usize) -> Result<Vec<String>> {
    let values = list_cell(col, row)?;
    let strings: Vec<Option<&str>> = match values.data_type() {
        DataType::Utf8      => values.as_string::<i32>().iter().collect(),
        DataType::LargeUtf8 => values.as_string::<i64>().iter().collect(),
        other => bail!("List inner type is {other:?}, expected Utf8"),
    };
    strings
        .into_iter()
        .map(|s| s.map(str::to_string).context("null element symbol"))
        .collect()
}

fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    let values = list_cell(col, row)?;
    let floats: Vec<Option<f64>> = match values.data_type() {
        DataType::Float64 => values.as_primitive::<Float64Type>().iter().collect(),
        DataType::Float32 => values
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| v.map(f64::from))
            .collect(),
        other => bail!("List inner type is {other:?}, expected Float64 or Float32"),
    };
    floats
        .into_iter()
        .enumerate()
        .map(|(j, v)| v.with_context(|| format!("null at position {j}")))
        .collect()
}

// ─── Parquet writer ───────────────────────────────────────────────────────────
/// Write samples in the same two-column layout the loader reads.
pub fn write_parquet(path: &Path, samples: &[Sample], columns: &ColumnNames) -> Result<()> {
    let mut el_builder = ListBuilder::new(StringBuilder::new());
    let mut sp_builder = ListBuilder::new(Float64Builder::new());

    for s in samples {
        for e in &s.elements {
            el_builder.values().append_value(e);
        }
        el_builder.append(true);

        for &v in &s.spectrum {
            sp_builder.values().append_value(v);
        }
        sp_builder.append(true);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            &columns.elements,
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
            false,
        ),
        Field::new(
            &columns.spectrum,
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(el_builder.finish()), Arc::new(sp_builder.finish())],
    )
    .context("building record batch")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    tracing::debug!("Wrote {} samples to '{}'", samples.len(), path.display());
    Ok(())
}
