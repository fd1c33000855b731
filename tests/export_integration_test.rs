//! End-to-end export runs against a mocked remote service

use ferry::adapters::publisher::ChannelStatusPublisher;
use ferry::adapters::remote::{RemoteClient, RestPageFetcher, RestReferenceClient};
use ferry::adapters::storage::LocalFileStorage;
use ferry::config::parse_config;
use ferry::core::export::{temp_output_path, ExportJob};
use ferry::core::job::{keys, Job, JobParameters, JobRunner};
use ferry::core::lifecycle::{
    AcknowledgementRegistry, JobCompletionNotifier, OneshotAcknowledgment,
};
use ferry::core::reference::ReferenceDataCache;
use ferry::domain::{BatchStatus, JobId};
use mockito::Matcher;
use std::sync::Arc;
use tempfile::TempDir;

fn config_toml(base_url: &str) -> String {
    format!(
        r#"
[remote]
base_url = "{base_url}"
tenant = "diku"

[remote.retry]
max_retries = 1
initial_delay_ms = 10

[sources.circulation-log]
path = "audit-data/circulation/logs"
page_size = 2
records_field = "logRecords"
step_name = "circulationLogExportStep"

[[sources.circulation-log.enrich]]
field = "servicePointId"
kind = "service-point"
target = "servicePointName"
"#
    )
}

async fn page_mock(server: &mut mockito::Server, offset: u64, body: &str) -> mockito::Mock {
    server
        .mock("GET", "/audit-data/circulation/logs")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("offset".into(), offset.to_string()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .match_header("x-okapi-tenant", "diku")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_export_publishes_completed_status_with_files() {
    let mut server = mockito::Server::new_async().await;
    let first = page_mock(
        &mut server,
        0,
        r#"{"logRecords":[{"id":"r1","servicePointId":"sp-1"},{"id":"r2","servicePointId":"sp-1"}]}"#,
    )
    .await;
    let second = page_mock(
        &mut server,
        2,
        r#"{"logRecords":[{"id":"r3","servicePointId":"sp-2"}]}"#,
    )
    .await;
    let last = page_mock(&mut server, 4, r#"{"logRecords":[]}"#).await;
    let sp1 = server
        .mock("GET", "/service-points/sp-1")
        .with_status(200)
        .with_body(r#"{"id":"sp-1","name":"Circ desk 1"}"#)
        .expect(1)
        .create_async()
        .await;
    let sp2 = server
        .mock("GET", "/service-points/sp-2")
        .with_status(200)
        .with_body(r#"{"id":"sp-2","name":"Circ desk 2"}"#)
        .create_async()
        .await;

    let config = parse_config(&config_toml(&server.url())).unwrap();
    let source = config.source("circulation-log").unwrap().clone();
    let client = Arc::new(RemoteClient::new(&config.remote).unwrap());

    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let cache = ReferenceDataCache::builder(Arc::new(RestReferenceClient::new(Arc::clone(&client))))
        .build();
    let job: Arc<dyn Job> = Arc::new(ExportJob::new(
        "circulation-log",
        source.clone(),
        Arc::new(RestPageFetcher::from_source(Arc::clone(&client), &source)),
        Arc::new(cache),
        Arc::new(LocalFileStorage::new(output.path())),
    ));

    let (publisher, mut published) = ChannelStatusPublisher::channel(8);
    let acknowledgements = Arc::new(AcknowledgementRegistry::new());
    let job_id = JobId::new("J1").unwrap();
    let (ack, acknowledged) = OneshotAcknowledgment::channel();
    acknowledgements.put(job_id.clone(), Box::new(ack));

    let notifier = JobCompletionNotifier::from_config(
        &config.notifier,
        Arc::new(publisher),
        Arc::clone(&acknowledgements),
    );
    let runner = JobRunner::new().with_listener(Arc::new(notifier));

    let temp = temp_output_path(work.path(), "ferry", &job_id, "circulation-log");
    let parameters = JobParameters::new()
        .with(keys::JOB_ID, job_id.as_str())
        .with(keys::TEMP_OUTPUT_FILE_PATH, temp.display().to_string());

    let execution = runner.run(job, parameters).await;

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = execution.step("circulationLogExportStep").unwrap();
    assert_eq!(step.read_count, 3);
    assert_eq!(step.write_count, 3);
    assert!(acknowledged.await.is_ok());
    assert!(acknowledgements.is_empty());

    let started = published.recv().await.unwrap();
    assert_eq!(started.key, job_id);
    assert_eq!(started.job.batch_status, BatchStatus::Started);

    let finished = published.recv().await.unwrap();
    assert_eq!(finished.job.batch_status, BatchStatus::Completed);
    assert_eq!(finished.job.files.len(), 1);
    assert!(finished.job.error_details.is_none());

    let stored = std::fs::read_to_string(&finished.job.files[0]).unwrap();
    let lines: Vec<serde_json::Value> = stored
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["servicePointName"], "Circ desk 1");
    assert_eq!(lines[1]["servicePointName"], "Circ desk 1");
    assert_eq!(lines[2]["servicePointName"], "Circ desk 2");

    // temp files are removed once the job has finished
    let staged = temp.with_file_name(format!(
        "{}.jsonl",
        temp.file_name().unwrap().to_string_lossy()
    ));
    assert!(!staged.exists());

    first.assert_async().await;
    second.assert_async().await;
    last.assert_async().await;
    sp1.assert_async().await;
    sp2.assert_async().await;
}

#[tokio::test]
async fn test_unknown_reference_skips_record_and_stores_errors() {
    let mut server = mockito::Server::new_async().await;
    page_mock(
        &mut server,
        0,
        r#"{"logRecords":[{"id":"r1","servicePointId":"sp-1"},{"id":"r2","servicePointId":"gone"}]}"#,
    )
    .await;
    page_mock(&mut server, 2, r#"{"logRecords":[]}"#).await;
    server
        .mock("GET", "/service-points/sp-1")
        .with_status(200)
        .with_body(r#"{"id":"sp-1","name":"Circ desk 1"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/service-points/gone")
        .with_status(404)
        .create_async()
        .await;

    let config = parse_config(&config_toml(&server.url())).unwrap();
    let source = config.source("circulation-log").unwrap().clone();
    let client = Arc::new(RemoteClient::new(&config.remote).unwrap());

    let work = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let cache = ReferenceDataCache::builder(Arc::new(RestReferenceClient::new(Arc::clone(&client))))
        .build();
    let job: Arc<dyn Job> = Arc::new(ExportJob::new(
        "circulation-log",
        source.clone(),
        Arc::new(RestPageFetcher::from_source(Arc::clone(&client), &source)),
        Arc::new(cache),
        Arc::new(LocalFileStorage::new(output.path())),
    ));

    let job_id = JobId::new("J2").unwrap();
    let temp = temp_output_path(work.path(), "ferry", &job_id, "circulation-log");
    let parameters = JobParameters::new()
        .with(keys::JOB_ID, job_id.as_str())
        .with(keys::TEMP_OUTPUT_FILE_PATH, temp.display().to_string());

    let execution = JobRunner::new().run(job, parameters).await;

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = execution.step("circulationLogExportStep").unwrap();
    assert_eq!(step.write_count, 1);
    assert_eq!(step.skip_count, 1);

    let files = execution
        .context
        .get_string(keys::OUTPUT_FILES_IN_STORAGE)
        .unwrap();
    let files: Vec<&str> = files.split(';').collect();
    assert_eq!(files.len(), 2);
    assert!(files[1].ends_with("_errors.csv"));

    let errors = std::fs::read_to_string(files[1]).unwrap();
    assert!(errors.contains("r2"));
}
