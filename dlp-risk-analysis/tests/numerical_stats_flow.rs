//! End-to-end tests of the submit, wait, fetch, and report flow.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use dlp_risk_analysis::{
    DlpJob, JobState, NumericalStatsAnalysis, RiskError, SubscriberConfig, WaitConfig,
};

fn analysis(dlp: Arc<MockDlpServiceClient>, pubsub: Arc<MockPubsubService>) -> NumericalStatsAnalysis {
    NumericalStatsAnalysis::new(dlp, pubsub)
        .with_subscriber_config(SubscriberConfig::new().with_workers(2))
}

fn output(buffer: Vec<u8>) -> Vec<String> {
    String::from_utf8(buffer)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_full_flow_prints_report() {
    let dlp = Arc::new(
        MockDlpServiceClient::new()
            .with_get_response(Ok(done_job(integer_stats(10, 30, &[10, 10, 20, 20, 20, 30])))),
    );
    let pubsub = Arc::new(MockPubsubService::new().with_messages(vec![
        notification("other", OTHER_JOB_NAME),
        notification("mine", TEST_JOB_NAME),
    ]));

    let mut out = Vec::new();
    let result = analysis(dlp.clone(), pubsub.clone())
        .run(&test_request(), &mut out)
        .await
        .unwrap();

    assert_eq!(result.quantile_values.len(), 6);
    assert_eq!(
        output(out),
        vec![
            "Value Range: [10, 30]",
            "Value at 1% quantile: 10",
            "Value at 3% quantile: 20",
            "Value at 6% quantile: 30",
        ]
    );
    assert_eq!(dlp.create_calls().len(), 1);
    assert_eq!(dlp.get_call_count(), 1);
    assert_eq!(pubsub.acked(), vec!["mine".to_string()]);
    assert_eq!(pubsub.nacked(), vec!["other".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_submitted_job_config() {
    let dlp = Arc::new(
        MockDlpServiceClient::new().with_get_response(Ok(done_job(integer_stats(1, 100, &[])))),
    );
    let pubsub = Arc::new(MockPubsubService::new().with_messages(vec![notification("mine", TEST_JOB_NAME)]));

    let mut out = Vec::new();
    analysis(dlp.clone(), pubsub).run(&test_request(), &mut out).await.unwrap();

    let calls = dlp.create_calls();
    assert_eq!(calls.len(), 1);
    let config = &calls[0];
    assert_eq!(config.source_table.to_string(), "bigquery-public-data.samples.natality");
    assert_eq!(
        config.actions[0].pub_sub.as_ref().unwrap().topic,
        "projects/calling/topics/dlp-done"
    );
    assert_eq!(output(out), vec!["Value Range: [1, 100]"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_proceeds_to_fetch() {
    let dlp = Arc::new(
        MockDlpServiceClient::new().with_get_response(Ok(done_job(integer_stats(1, 2, &[1, 2])))),
    );
    let pubsub = Arc::new(MockPubsubService::new().with_messages(vec![notification("other", OTHER_JOB_NAME)]));

    let started = tokio::time::Instant::now();
    let mut out = Vec::new();
    let result = analysis(dlp.clone(), pubsub.clone())
        .with_wait_config(WaitConfig::new().with_timeout(Duration::from_secs(30)))
        .run(&test_request(), &mut out)
        .await;

    assert!(result.is_ok());
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(dlp.get_call_count(), 1);
    assert!(pubsub.acked().is_empty());
    assert_eq!(output(out).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_running_job_is_incomplete() {
    let dlp = Arc::new(
        MockDlpServiceClient::new().with_get_response(Ok(DlpJob::new(job_name(), JobState::Running))),
    );
    let pubsub = Arc::new(MockPubsubService::new());

    let mut out = Vec::new();
    let err = analysis(dlp.clone(), pubsub)
        .with_wait_config(WaitConfig::new().with_timeout(Duration::from_secs(5)))
        .run(&test_request(), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RiskError::JobIncomplete {
            state: JobState::Running,
            ..
        }
    ));
    assert_eq!(dlp.get_call_count(), 1);
    assert!(out.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_skips_wait() {
    let dlp = Arc::new(MockDlpServiceClient::new().with_create_response(Err(RiskError::Api {
        status: 403,
        message: "Permission denied".to_string(),
        is_retriable: false,
        api_error: None,
    })));
    let pubsub = Arc::new(MockPubsubService::new());

    let mut out = Vec::new();
    let err = analysis(dlp.clone(), pubsub.clone())
        .run(&test_request(), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RiskError::Submission { .. }));
    assert_eq!(pubsub.pull_count(), 0);
    assert_eq!(dlp.get_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_reports_errors() {
    let mut failed = DlpJob::new(job_name(), JobState::Failed);
    failed.errors = vec![serde_json::from_str(
        r#"{"details": {"code": 5, "message": "Table not found"}}"#,
    )
    .unwrap()];
    let dlp = Arc::new(MockDlpServiceClient::new().with_get_response(Ok(failed)));
    let pubsub = Arc::new(MockPubsubService::new().with_messages(vec![notification("mine", TEST_JOB_NAME)]));

    let mut out = Vec::new();
    let err = analysis(dlp, pubsub)
        .run(&test_request(), &mut out)
        .await
        .unwrap_err();

    match err {
        RiskError::JobFailed { job, errors } => {
            assert_eq!(job, TEST_JOB_NAME);
            assert_eq!(errors, vec!["Table not found".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_subscription_is_reported() {
    let dlp = Arc::new(MockDlpServiceClient::new());
    let pubsub = Arc::new(MockPubsubService::new().with_pull_error(RiskError::not_found(
        "Resource not found",
        "projects/calling/subscriptions/dlp-done-sub",
    )));

    let started = tokio::time::Instant::now();
    let mut out = Vec::new();
    let err = NumericalStatsAnalysis::new(dlp.clone(), pubsub)
        .run(&test_request(), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RiskError::Subscription { .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(dlp.get_call_count(), 0);
}
