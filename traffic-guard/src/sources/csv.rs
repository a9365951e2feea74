//! CSV file source implementation.

use super::TrafficSource;
use crate::prelude::*;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Maximum records read to discover the column names
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            schema_infer_max_records: 1000,
        }
    }
}

/// One or more CSV files read with DataFusion.
///
/// Each file is read twice: once to discover its column names, then again
/// with every column declared as text. Values therefore reach the table
/// exactly as written, and a column whose later rows disagree with the
/// inferred type does not fail the load.
///
/// # Examples
///
/// ```rust,no_run
/// use traffic_guard::sources::{CsvOptions, CsvSource};
///
/// let source = CsvSource::new("logs/cloudflare.csv");
///
/// let tsv = CsvSource::new("logs/edge.tsv").with_options(CsvOptions {
///     delimiter: b'\t',
///     ..Default::default()
/// });
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: Vec<String>,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a source from a single path or glob pattern.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            options: CsvOptions::default(),
        }
    }

    /// Creates a source from several paths or glob patterns.
    pub fn from_paths(paths: Vec<String>) -> Result<Self> {
        if paths.is_empty() {
            return Err(GuardError::config_invalid(
                "at least one path must be provided",
            ));
        }
        Ok(Self {
            paths,
            options: CsvOptions::default(),
        })
    }

    /// Sets custom options for this CSV source.
    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    /// The configured paths or patterns.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn read_options<'a>(&self, extension: &'a str) -> CsvReadOptions<'a> {
        CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(extension)
    }

    async fn load_file(&self, ctx: &SessionContext, path: &str) -> Result<Vec<RecordBatch>> {
        let unavailable = |e: datafusion::error::DataFusionError| {
            GuardError::source_unavailable_with_source(
                "CSV",
                format!("cannot read {path}"),
                Box::new(e),
            )
        };

        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let inferred = ctx
            .read_csv(path, self.read_options(&extension))
            .await
            .map_err(unavailable)?;
        let text_schema = Schema::new(
            inferred
                .schema()
                .fields()
                .iter()
                .map(|field| Field::new(field.name(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        );

        let batches = ctx
            .read_csv(path, self.read_options(&extension).schema(&text_schema))
            .await
            .map_err(unavailable)?
            .collect()
            .await
            .map_err(unavailable)?;

        debug!(
            source.path = %path,
            source.columns = text_schema.fields().len(),
            source.batches = batches.len(),
            "Read CSV file"
        );
        Ok(batches)
    }
}

/// Session settings that return rows in file order.
///
/// Row positions become finding subjects, so a file is never split into
/// byte ranges that could be merged back out of order.
fn ordered_scan_config() -> SessionConfig {
    SessionConfig::new()
        .with_target_partitions(1)
        .with_repartition_file_scans(false)
}

#[async_trait]
impl TrafficSource for CsvSource {
    #[instrument(skip(self), fields(
        source.type = "csv",
        source.patterns = self.paths.len(),
        csv.delimiter = %(self.options.delimiter as char),
        csv.has_header = self.options.has_header
    ))]
    async fn load(&self) -> Result<Vec<RecordBatch>> {
        let paths = super::expand_globs(&self.paths)?;
        info!(
            source.type = "csv",
            source.paths = ?paths,
            "Loading CSV data source"
        );

        let ctx = SessionContext::new_with_config(ordered_scan_config());
        let mut batches = Vec::new();
        let mut columns: Option<Vec<String>> = None;

        for path in &paths {
            let file_batches = self.load_file(&ctx, path).await?;
            if let Some(first) = file_batches.first() {
                let names: Vec<String> = first
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect();
                match &columns {
                    Some(expected) if *expected != names => {
                        return Err(GuardError::source_unavailable(
                            "CSV",
                            format!("{path} has columns {names:?}, expected {expected:?}"),
                        ));
                    }
                    Some(_) => {}
                    None => columns = Some(names),
                }
            }
            batches.extend(file_batches);
        }

        Ok(batches)
    }

    fn description(&self) -> String {
        if self.paths.len() == 1 {
            let path = &self.paths[0];
            format!("CSV file: {path}")
        } else {
            let count = self.paths.len();
            format!("CSV files: {count} patterns")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn create_test_csv() -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ClientIP,ClientRequestBytes,ClientCountry").unwrap();
        writeln!(file, "1.2.3.4,007,us").unwrap();
        writeln!(file, "5.6.7.8,,de").unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_csv_source_reads_all_columns_as_text() {
        let file = create_test_csv();
        let source = CsvSource::new(file.path().to_str().unwrap());
        let batches = source.load().await.unwrap();

        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
        for field in batches[0].schema().fields() {
            assert_eq!(field.data_type(), &DataType::Utf8);
        }
        assert!(source.description().contains("CSV file"));
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let source = CsvSource::new("/no/such/traffic.csv");
        let err = source.load().await.unwrap_err();
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn test_scan_config_keeps_one_partition() {
        let config = ordered_scan_config();
        assert_eq!(config.target_partitions(), 1);
        assert!(!config.options().optimizer.repartition_file_scans);
    }

    #[test]
    fn test_from_paths_requires_a_path() {
        assert!(CsvSource::from_paths(vec![]).is_err());
    }
}
