//! Raw record loader.
//!
//! Parses headerless pipe-delimited files into typed tables. Only the
//! columns named in a [`ColumnSpec`] are read. The CSV reader hands back a
//! projection in file order rather than request order, so selected columns
//! are re-mapped by their original position before renaming.

use crate::cache::SnapshotCache;
use crate::config::StudyConfig;
use crate::error::{DataError, Result};
use crate::manifest::{FileKind, Manifest};
use crate::schema::{Coercion, ColumnSpec, FieldSpec};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Raw input separator.
pub const SEPARATOR: u8 = b'|';

/// Typed origination and performance tables.
#[derive(Debug, Clone)]
pub struct RawTables {
    /// One row per loan
    pub origination: DataFrame,
    /// One row per loan per reporting month
    pub performance: DataFrame,
}

/// Loads raw record files listed in a manifest.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    cache: SnapshotCache,
}

impl RecordLoader {
    /// Create a loader backed by a parse cache.
    pub const fn new(cache: SnapshotCache) -> Self {
        Self { cache }
    }

    /// Load both record kinds.
    pub fn load(&self, manifest: &Manifest, config: &StudyConfig) -> Result<RawTables> {
        let origination =
            self.load_kind(manifest, FileKind::Origination, &config.origination_columns)?;
        let performance =
            self.load_kind(manifest, FileKind::Performance, &config.performance_columns)?;
        Ok(RawTables {
            origination,
            performance,
        })
    }

    /// Load and concatenate every file of one kind.
    pub fn load_kind(
        &self,
        manifest: &Manifest,
        kind: FileKind,
        spec: &ColumnSpec,
    ) -> Result<DataFrame> {
        let files = manifest.require(kind)?;
        spec.validate()?;

        let mut frames = Vec::with_capacity(files.len());
        for path in files {
            let df = self.load_file(path, spec)?;
            tracing::info!(
                kind = %kind,
                file = %path.display(),
                rows = df.height(),
                "Loaded raw file"
            );
            frames.push(df.lazy());
        }

        let combined = concat(frames, UnionArgs::default())?.collect()?;
        tracing::info!(kind = %kind, rows = combined.height(), "Concatenated raw files");
        Ok(combined)
    }

    /// Load one file, using the parse cache when a snapshot exists.
    pub fn load_file(&self, path: &Path, spec: &ColumnSpec) -> Result<DataFrame> {
        if let Some(df) = self.cache.get(path)? {
            return Ok(df);
        }
        let df = parse_delimited(path, spec)?;
        self.cache.put(path, &df)?;
        Ok(df)
    }
}

/// Parse one headerless pipe-delimited file.
pub fn parse_delimited(path: &Path, spec: &ColumnSpec) -> Result<DataFrame> {
    spec.validate()?;
    let projection: Vec<usize> = spec.in_file_order().iter().map(|f| f.position).collect();

    // Every cell is read as text; coercion happens after selection.
    let raw = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_projection(Some(Arc::new(projection)))
        .map_parse_options(|opts| opts.with_separator(SEPARATOR).with_quote_char(None))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    select_fields(raw, spec)
}

/// Rename, reorder and coerce a file-ordered projection.
///
/// `raw` must hold exactly the selected columns in ascending position order.
pub fn select_fields(raw: DataFrame, spec: &ColumnSpec) -> Result<DataFrame> {
    spec.validate()?;
    let physical: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let file_order = spec.in_file_order();

    if physical.len() != file_order.len() {
        return Err(DataError::Parse(format!(
            "expected {} selected columns, reader returned {}",
            file_order.len(),
            physical.len()
        )));
    }

    let by_position: HashMap<usize, &str> = file_order
        .iter()
        .zip(&physical)
        .map(|(field, name)| (field.position, name.as_str()))
        .collect();

    let exprs = spec
        .fields
        .iter()
        .map(|field| {
            by_position
                .get(&field.position)
                .map(|name| coerce(col(*name), field))
                .ok_or_else(|| DataError::MissingColumn {
                    column: field.name.clone(),
                    table: "raw projection".to_string(),
                })
        })
        .collect::<Result<Vec<Expr>>>()?;

    Ok(raw.lazy().select(exprs).collect()?)
}

/// Cast a text column to the field's type; bad cells and sentinels become null.
fn coerce(expr: Expr, field: &FieldSpec) -> Expr {
    let typed = match field.coercion {
        Coercion::Text => expr.cast(DataType::String),
        Coercion::Integer => expr.cast(DataType::Int64),
        Coercion::Float => expr.cast(DataType::Float64),
    };

    let typed = match field.missing_sentinel {
        Some(sentinel) => when(typed.clone().eq(lit(sentinel)))
            .then(lit(NULL))
            .otherwise(typed),
        None => typed,
    };

    typed.alias(field.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields;
    use std::path::PathBuf;

    fn write_fixture(name: &str, lines: &[&str]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("prepay-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn small_spec() -> ColumnSpec {
        // Request order deliberately differs from file order.
        ColumnSpec::new(vec![
            FieldSpec::new("loan_id", 3, Coercion::Text),
            FieldSpec::new("score", 0, Coercion::Integer).with_sentinel(9999),
            FieldSpec::new("rate", 2, Coercion::Float),
        ])
    }

    #[test]
    fn test_select_fields_restores_request_order() {
        let raw = df!(
            "column_1" => ["720", "9999", ""],
            "column_3" => ["6.5", "x", "7.125"],
            "column_4" => ["L1", "L2", "L3"],
        )
        .unwrap();

        let df = select_fields(raw, &small_spec()).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["loan_id", "score", "rate"]);

        let score: Vec<Option<i64>> = df
            .column("score")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(score, vec![Some(720), None, None]);

        let rate: Vec<Option<f64>> = df
            .column("rate")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(rate, vec![Some(6.5), None, Some(7.125)]);
    }

    #[test]
    fn test_select_fields_rejects_wrong_width() {
        let raw = df!("column_1" => ["1"]).unwrap();
        assert!(matches!(
            select_fields(raw, &small_spec()),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_delimited_file() {
        let path = write_fixture(
            "sample_svcg_2020.txt",
            &[
                "L1|202001|100000.0|0|1|359||N|||6.5",
                "L1|202002|99000.0|0|2|358||N|01|202002|6.5",
            ],
        );

        let df = parse_delimited(&path, &ColumnSpec::performance()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names()[0].as_str(), fields::LOAN_ID);

        let codes: Vec<Option<&str>> = df
            .column(fields::ZERO_BALANCE_CODE)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![None, Some("01")]);

        let age: Vec<Option<i64>> = df
            .column(fields::LOAN_AGE)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(age, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_loader_requires_files() {
        let loader = RecordLoader::new(SnapshotCache::disabled());
        let result = loader.load(&Manifest::default(), &StudyConfig::default());
        assert!(matches!(result, Err(DataError::MissingInput { .. })));
    }
}
