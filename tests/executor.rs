mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::RecordingEngine;
use reelcut::config::ExecutorConfig;
use reelcut::jobs::{JobEvent, JobExecutor, JobId, JobOutcome, JobRequest, JobState};
use reelcut::pipeline::{AudioPolicy, OutputSpec, PipelineDescriptor, TimeWindow, VideoPolicy};

fn trim_request(output: &str) -> JobRequest {
    let descriptor = PipelineDescriptor::builder()
        .input("in.mp4")
        .output(
            OutputSpec::new(output, VideoPolicy::Copy, AudioPolicy::Drop)
                .window(TimeWindow { start: 0.0, duration: Some(4.0) }),
        )
        .expected_duration(4.0)
        .build()
        .unwrap();
    JobRequest::new(descriptor, "Trim and mute", "Video processed successfully")
}

fn executor(engine: &Arc<RecordingEngine>) -> JobExecutor {
    JobExecutor::spawn(engine.clone(), ExecutorConfig::default())
}

#[tokio::test]
async fn test_jobs_run_in_submission_order_without_overlap() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(20)));
    let executor = executor(&engine);

    let outputs: Vec<String> = (0..5).map(|i| format!("out-{}.mp4", i)).collect();
    let handles: Vec<_> = outputs.iter().map(|o| executor.submit(trim_request(o))).collect();

    for handle in handles {
        assert_eq!(handle.wait().await, JobOutcome::success("Video processed successfully"));
    }

    let calls = engine.calls();
    let order: Vec<&str> = calls.iter().map(|c| c.output()).collect();
    assert_eq!(order, outputs.iter().map(String::as_str).collect::<Vec<_>>());
    for pair in calls.windows(2) {
        assert!(pair[0].finished <= pair[1].started, "engine runs overlapped");
    }
    assert_eq!(engine.max_active(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_are_serialized() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(5)));
    let executor = Arc::new(executor(&engine));

    let mut tasks = Vec::new();
    for submitter in 0..4 {
        let executor = Arc::clone(&executor);
        tasks.push(tokio::spawn(async move {
            let handles: Vec<_> = (0..3)
                .map(|i| executor.submit(trim_request(&format!("s{}-{}.mp4", submitter, i))))
                .collect();
            let mut outcomes = Vec::new();
            for handle in handles {
                outcomes.push(handle.wait().await);
            }
            outcomes
        }));
    }

    for task in tasks {
        let outcomes = task.await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(JobOutcome::is_success));
    }

    let calls = engine.calls();
    assert_eq!(calls.len(), 12);
    assert_eq!(engine.max_active(), 1);

    // Each submitter's own jobs still run in the order it submitted them.
    for submitter in 0..4 {
        let prefix = format!("s{}-", submitter);
        let mine: Vec<&str> = calls.iter().map(|c| c.output()).filter(|o| o.starts_with(&prefix)).collect();
        let expected: Vec<String> = (0..3).map(|i| format!("s{}-{}.mp4", submitter, i)).collect();
        assert_eq!(mine, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_every_job_finishes_exactly_once() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)));
    let executor = executor(&engine);
    let mut events = executor.subscribe();

    let ok = executor.submit(trim_request("ok.mp4"));
    let failed = executor.submit(trim_request("fail.mp4"));
    let unlaunched = executor.submit(trim_request("nolaunch.mp4"));
    let ids = [ok.id(), failed.id(), unlaunched.id()];

    assert!(ok.wait().await.is_success());
    assert_eq!(failed.wait().await.code(), Some("ENGINE_ERROR"));
    assert_eq!(unlaunched.wait().await.code(), Some("ENGINE_LAUNCH_ERROR"));
    executor.shutdown().await.unwrap();

    let mut finished: HashMap<JobId, usize> = HashMap::new();
    let mut sequence: HashMap<JobId, Vec<&'static str>> = HashMap::new();
    while let Ok(event) = events.try_recv() {
        if let JobEvent::Finished { job_id, .. } = &event {
            *finished.entry(*job_id).or_default() += 1;
        }
        if !matches!(event, JobEvent::Progress(_)) {
            sequence.entry(event.job_id()).or_default().push(event.name());
        }
    }

    for id in ids {
        assert_eq!(finished.get(&id), Some(&1));
        assert_eq!(
            sequence[&id],
            vec!["reelcut://queued", "reelcut://started", "reelcut://finished"]
        );
    }
}

#[tokio::test]
async fn test_failed_job_does_not_stop_the_queue() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)));
    let executor = executor(&engine);

    let failed = executor.submit(trim_request("fail.mp4"));
    let next = executor.submit(trim_request("after.mp4"));

    let outcome = failed.wait().await;
    assert_eq!(outcome.code(), Some("ENGINE_ERROR"));
    assert!(outcome.message().contains("rc=1"), "{}", outcome.message());
    assert!(next.wait().await.is_success());
}

#[tokio::test]
async fn test_panicking_engine_is_contained() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)));
    let executor = executor(&engine);

    let crashed = executor.submit(trim_request("panic.mp4"));
    let next = executor.submit(trim_request("after.mp4"));

    assert_eq!(crashed.wait().await.code(), Some("JOB_ABANDONED"));
    assert!(next.wait().await.is_success());
}

#[tokio::test]
async fn test_progress_is_reported_as_fraction_of_expected_duration() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)).with_progress(&[0.5, 1.0, 0.8, 2.0]));
    let executor = executor(&engine);

    let mut handle = executor.submit(trim_request("out.mp4"));
    let mut progress = handle.take_progress().unwrap();
    assert!(handle.take_progress().is_none());

    assert!(handle.wait().await.is_success());

    let mut fractions = Vec::new();
    while let Ok(update) = progress.try_recv() {
        fractions.push(update.progress());
    }
    // The regression from 1.0 to 0.8 is dropped.
    assert_eq!(fractions, vec![0.125, 0.25, 0.5]);
}

#[tokio::test]
async fn test_registry_tracks_lifecycle() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(50)));
    let executor = executor(&engine);

    let first = executor.submit(trim_request("a.mp4"));
    let second = executor.submit(trim_request("b.mp4"));
    let second_id = second.id();

    let queued = executor.status(second_id).unwrap();
    assert_eq!(queued.description, "Trim and mute");
    assert!(queued.started_at.is_none());
    assert_eq!(executor.pending(), 2);

    tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(5), first.wait()).await);
    tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(5), second.wait()).await);

    let done = executor.status(second_id).unwrap();
    assert_eq!(done.state, JobState::Succeeded);
    assert!(done.started_at.is_some());
    assert!(done.finished_at >= done.started_at);
    assert_eq!(done.outcome, Some(JobOutcome::success("Video processed successfully")));
    assert_eq!(executor.pending(), 0);
}

#[tokio::test]
async fn test_shutdown_drains_queued_jobs() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(10)));
    let executor = executor(&engine);

    let handles: Vec<_> = (0..3).map(|i| executor.submit(trim_request(&format!("{}.mp4", i)))).collect();
    executor.shutdown().await.unwrap();

    assert_eq!(engine.calls().len(), 3);
    for handle in handles {
        assert!(handle.wait().await.is_success());
    }
}

#[tokio::test]
async fn test_dropped_handle_does_not_block_later_jobs() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)));
    let executor = executor(&engine);

    drop(executor.submit(trim_request("ignored.mp4")));
    let kept = executor.submit(trim_request("kept.mp4"));

    assert!(kept.wait().await.is_success());
    assert_eq!(engine.calls().len(), 2);
}

#[tokio::test]
async fn test_status_forgets_finished_jobs_past_retention() {
    let engine = Arc::new(RecordingEngine::new(Duration::from_millis(1)));
    let config = ExecutorConfig { retain_finished: 2, ..ExecutorConfig::default() };
    let executor = JobExecutor::spawn(engine.clone(), config);

    let mut ids = Vec::new();
    for i in 0..4 {
        let handle = executor.submit(trim_request(&format!("{}.mp4", i)));
        ids.push(handle.id());
        assert!(handle.wait().await.is_success());
    }

    assert!(executor.status(ids[0]).is_none());
    assert!(executor.status(ids[1]).is_none());
    assert_eq!(executor.status(ids[2]).map(|s| s.state), Some(JobState::Succeeded));
    assert_eq!(executor.status(ids[3]).map(|s| s.state), Some(JobState::Succeeded));
    assert_eq!(executor.pending(), 0);
}
