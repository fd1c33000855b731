//! Export job: page through a configured source into stored output files

use super::enrich::EnrichProcessor;
use super::work_paths::{with_suffix, ERRORS_SUFFIX, RECORDS_SUFFIX};
use super::writer::StagedOutputWriter;
use crate::adapters::storage::OutputStorage;
use crate::config::{PaginationMode, SourceConfig};
use crate::core::job::{keys, ChunkStep, Job, JobExecution, StopSignal};
use crate::core::pagination::{
    CursorPaginatedSource, OffsetPaginatedSource, PageFetcher, PaginatedSource,
};
use crate::core::reference::ReferenceDataCache;
use crate::domain::{FerryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Exports one configured source
///
/// The job reads the source page by page, enriches every record through the
/// reference cache, stages `<temp>.jsonl` (and `<temp>_errors.csv` when
/// records were skipped), then stores the staged files and records their
/// references under `outputFilesInStorage`.
pub struct ExportJob {
    name: String,
    source_name: String,
    source: SourceConfig,
    fetcher: Arc<dyn PageFetcher<Value>>,
    cache: Arc<ReferenceDataCache>,
    storage: Arc<dyn OutputStorage>,
}

impl ExportJob {
    pub fn new(
        source_name: impl Into<String>,
        source: SourceConfig,
        fetcher: Arc<dyn PageFetcher<Value>>,
        cache: Arc<ReferenceDataCache>,
        storage: Arc<dyn OutputStorage>,
    ) -> Self {
        let source_name = source_name.into();
        Self {
            name: format!("{source_name}-export"),
            source_name,
            source,
            fetcher,
            cache,
            storage,
        }
    }

    /// Name of the chunk step, as reported in job status
    pub fn step_name(&self) -> String {
        self.source
            .step_name
            .clone()
            .unwrap_or_else(|| format!("{}ExportStep", self.source_name))
    }

    fn build_source(&self) -> Result<Box<dyn PaginatedSource<Value>>> {
        let fetcher = Arc::clone(&self.fetcher);
        let source = &self.source;

        match source.pagination {
            PaginationMode::Offset => Ok(Box::new(
                OffsetPaginatedSource::new(fetcher, source.page_size)
                    .start_offset(source.start_offset)
                    .max_items(source.max_items)
                    .range(source.range_start.clone(), source.range_end.clone())
                    .label(&self.source_name),
            )),
            PaginationMode::Cursor => {
                let (Some(start), Some(end)) = (&source.range_start, &source.range_end) else {
                    return Err(FerryError::Configuration(format!(
                        "sources.{}: cursor pagination requires range_start and range_end",
                        self.source_name
                    )));
                };
                Ok(Box::new(
                    CursorPaginatedSource::new(fetcher, source.page_size, start, end)
                        .label(&self.source_name),
                ))
            }
        }
    }

    async fn store_staged(&self, staged: &[PathBuf]) -> Result<Vec<String>> {
        let mut stored = Vec::with_capacity(staged.len());
        for path in staged {
            let exists = tokio::fs::try_exists(path).await.map_err(|e| {
                FerryError::Io(format!("Failed to check {}: {}", path.display(), e))
            })?;
            if !exists {
                continue;
            }
            stored.push(self.storage.store(path).await?);
        }
        Ok(stored)
    }
}

#[async_trait]
impl Job for ExportJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut JobExecution, stop: StopSignal) -> Result<()> {
        let temp_path = execution
            .parameters
            .get_non_blank(keys::TEMP_OUTPUT_FILE_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| {
                FerryError::MalformedJobRequest(format!(
                    "missing {} parameter",
                    keys::TEMP_OUTPUT_FILE_PATH
                ))
            })?;

        let records_path = with_suffix(&temp_path, RECORDS_SUFFIX);
        let errors_path = with_suffix(&temp_path, ERRORS_SUFFIX);

        let writer = StagedOutputWriter::create(&records_path, &errors_path).await?;
        let processor = Arc::new(EnrichProcessor::new(
            Arc::clone(&self.cache),
            self.source.enrich.clone(),
            &self.source.id_field,
        ));

        let mut step = ChunkStep::new(
            self.step_name(),
            self.source.chunk_size,
            self.build_source()?,
            processor,
            Box::new(writer),
        );
        step.execute(execution, &stop).await?;

        if stop.is_stop_requested() {
            tracing::info!(source = %self.source_name, "Export stopped, output not stored");
            return Ok(());
        }

        let stored = self.store_staged(&[records_path, errors_path]).await?;
        tracing::info!(source = %self.source_name, files = stored.len(), "Stored export output");
        execution
            .context
            .put(keys::OUTPUT_FILES_IN_STORAGE, stored.join(";"));

        let stats = self.cache.stats();
        tracing::debug!(
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Reference cache usage"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalFileStorage;
    use crate::config::EnrichRule;
    use crate::core::job::JobParameters;
    use crate::core::pagination::{Page, PagePosition, PageRequest};
    use crate::core::reference::{Entity, ReferenceKind, ReferenceLookup};
    use crate::domain::{ExecutionId, RemoteError};
    use serde_json::json;
    use tempfile::TempDir;

    struct VecFetcher {
        records: Vec<Value>,
        fail_at: Option<u64>,
    }

    #[async_trait]
    impl PageFetcher<Value> for VecFetcher {
        async fn fetch(&self, request: &PageRequest) -> Result<Page<Value>> {
            let PagePosition::Offset(offset) = request.position else {
                panic!("offset request expected");
            };
            if self.fail_at == Some(offset) {
                return Err(RemoteError::ConnectionFailed("refused".to_string()).into());
            }
            let records = self
                .records
                .iter()
                .skip(offset as usize)
                .take(request.limit)
                .cloned()
                .collect();
            Ok(Page::last(records))
        }
    }

    struct ServicePoints;

    #[async_trait]
    impl ReferenceLookup for ServicePoints {
        async fn get_by_id(&self, kind: ReferenceKind, id: &str) -> Result<Entity> {
            if id == "sp-1" {
                Ok(json!({"id": "sp-1", "name": "Circ desk"}))
            } else {
                Err(FerryError::not_found(kind.to_string(), id))
            }
        }

        async fn get_by_query(&self, _kind: ReferenceKind, _query: &str) -> Result<Vec<Entity>> {
            Ok(Vec::new())
        }
    }

    fn source() -> SourceConfig {
        let mut source: SourceConfig = toml::from_str(r#"path = "audit-data/circulation/logs""#).unwrap();
        source.page_size = 2;
        source.chunk_size = 2;
        source.enrich = vec![EnrichRule {
            field: "servicePointId".to_string(),
            kind: ReferenceKind::ServicePoint,
            target: "servicePoint".to_string(),
        }];
        source
    }

    fn job(fetcher: VecFetcher, output: &TempDir) -> ExportJob {
        let cache = Arc::new(ReferenceDataCache::builder(Arc::new(ServicePoints)).build());
        ExportJob::new(
            "circulation-log",
            source(),
            Arc::new(fetcher),
            cache,
            Arc::new(LocalFileStorage::new(output.path())),
        )
    }

    fn execution(temp: &TempDir) -> JobExecution {
        let params = JobParameters::new()
            .with(keys::JOB_ID, "J1")
            .with(
                keys::TEMP_OUTPUT_FILE_PATH,
                temp.path().join("J1-circulation").display().to_string(),
            );
        JobExecution::new(ExecutionId::new(1), "circulation-log-export", params)
    }

    #[tokio::test]
    async fn test_export_writes_and_stores_output() {
        let temp = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let fetcher = VecFetcher {
            records: vec![
                json!({"id": "r1", "servicePointId": "sp-1"}),
                json!({"id": "r2", "servicePointId": "sp-404"}),
                json!({"id": "r3"}),
            ],
            fail_at: None,
        };
        let job = job(fetcher, &output);
        let mut execution = execution(&temp);

        job.execute(&mut execution, StopSignal::never()).await.unwrap();

        let step = execution.step("circulation-logExportStep").unwrap();
        assert_eq!(step.read_count, 3);
        assert_eq!(step.write_count, 2);
        assert_eq!(step.skip_count, 1);

        let files = execution
            .context
            .get_string(keys::OUTPUT_FILES_IN_STORAGE)
            .unwrap()
            .to_string();
        let files: Vec<&str> = files.split(';').collect();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("J1-circulation.jsonl"));
        assert!(files[1].ends_with("J1-circulation_errors.csv"));

        let records = std::fs::read_to_string(files[0]).unwrap();
        assert!(records.contains("\"servicePoint\":\"Circ desk\""));
        assert_eq!(records.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_step() {
        let temp = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let fetcher = VecFetcher {
            records: (0..5).map(|i| json!({"id": i})).collect(),
            fail_at: Some(2),
        };
        let job = job(fetcher, &output);
        let mut execution = execution(&temp);

        let err = job.execute(&mut execution, StopSignal::never()).await.unwrap_err();

        assert!(matches!(err, FerryError::Step { .. }));
        assert!(!execution.context.contains_key(keys::OUTPUT_FILES_IN_STORAGE));
    }

    #[tokio::test]
    async fn test_missing_temp_path_is_malformed_request() {
        let output = TempDir::new().unwrap();
        let job = job(
            VecFetcher {
                records: Vec::new(),
                fail_at: None,
            },
            &output,
        );
        let mut execution = JobExecution::new(
            ExecutionId::new(1),
            "export",
            JobParameters::new().with(keys::JOB_ID, "J1"),
        );

        let err = job.execute(&mut execution, StopSignal::never()).await.unwrap_err();
        assert!(matches!(err, FerryError::MalformedJobRequest(_)));
    }

    #[tokio::test]
    async fn test_store_staged_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let job = job(
            VecFetcher {
                records: Vec::new(),
                fail_at: None,
            },
            &output,
        );
        let records = temp.path().join("J1-circulation.jsonl");
        std::fs::write(&records, "{}\n").unwrap();

        let stored = job
            .store_staged(&[records, temp.path().join("J1-circulation_errors.csv")])
            .await
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with("J1-circulation.jsonl"));
    }

    #[tokio::test]
    async fn test_store_staged_reports_unreadable_path() {
        let temp = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let job = job(
            VecFetcher {
                records: Vec::new(),
                fail_at: None,
            },
            &output,
        );
        // a regular file used as a directory cannot be checked at all
        let blocker = temp.path().join("J1-circulation");
        std::fs::write(&blocker, "").unwrap();

        let err = job
            .store_staged(&[blocker.join("records.jsonl")])
            .await
            .unwrap_err();

        assert!(matches!(err, FerryError::Io(_)));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }
}
