use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;
use tokio::time::Instant;

use pagesmith_core::{CommitRef, NotificationPayload, ObjectId, TaskId};
use pagesmith_pipeline::{CallbackTransport, Notifier, PipelineError, TransportError};

/// Replays scripted responses and records when each attempt happened.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<u16, TransportError>>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<u16, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackTransport for ScriptedTransport {
    async fn post(&self, _url: &str, _payload: &NotificationPayload) -> Result<u16, TransportError> {
        self.attempts.lock().unwrap().push(Instant::now());
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(500))
    }
}

struct HangingTransport;

#[async_trait]
impl CallbackTransport for HangingTransport {
    async fn post(&self, _url: &str, _payload: &NotificationPayload) -> Result<u16, TransportError> {
        std::future::pending().await
    }
}

fn payload() -> NotificationPayload {
    NotificationPayload {
        email: "dev@example.com".to_string(),
        task: TaskId::from("quiz"),
        round: 1,
        nonce: "n-1".to_string(),
        repo_url: "https://github.com/octo/quiz-r1".to_string(),
        commit_sha: CommitRef(ObjectId::from("abc123")),
        pages_url: "https://octo.github.io/quiz-r1/".to_string(),
    }
}

fn notifier(transport: Arc<dyn CallbackTransport>) -> Notifier {
    Notifier::new(transport, 5, Duration::from_secs(1), Duration::from_secs(10))
}

#[tokio::test(start_paused = true)]
async fn always_failing_callback_gets_five_attempts_with_doubling_gaps() {
    let transport = ScriptedTransport::new(vec![]);
    let start = Instant::now();

    let err = notifier(transport.clone())
        .notify(&payload(), "http://cb.invalid/notify")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::DeliveryFailed { attempts: 5, .. }));
    let times = transport.attempt_times();
    assert_eq!(times.len(), 5);
    let gaps: Vec<u64> = times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
    assert_eq!(gaps, vec![1, 2, 4, 8]);
    // The final failure still waits its 16s.
    assert_eq!(start.elapsed(), Duration::from_secs(31));
}

#[rstest]
#[case(1, 0)]
#[case(2, 1)]
#[case(3, 3)]
#[case(5, 15)]
#[tokio::test(start_paused = true)]
async fn success_on_attempt_k_stops_there(#[case] k: usize, #[case] waited_secs: u64) {
    let mut script: Vec<Result<u16, TransportError>> = vec![Ok(503); k - 1];
    script.push(Ok(200));
    let transport = ScriptedTransport::new(script);
    let start = Instant::now();

    let receipt = notifier(transport.clone())
        .notify(&payload(), "http://cb.invalid/notify")
        .await
        .unwrap();

    assert_eq!(receipt.attempts as usize, k);
    assert_eq!(transport.attempt_times().len(), k);
    assert_eq!(start.elapsed(), Duration::from_secs(waited_secs));
}

#[tokio::test(start_paused = true)]
async fn non_200_success_codes_and_network_errors_count_as_failures() {
    let transport = ScriptedTransport::new(vec![
        Ok(201),
        Ok(204),
        Err(TransportError("connection refused".to_string())),
        Ok(302),
        Ok(200),
    ]);
    let receipt = notifier(transport.clone())
        .notify(&payload(), "http://cb.invalid/notify")
        .await
        .unwrap();
    assert_eq!(receipt.attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn each_attempt_is_cut_off_by_its_own_timeout() {
    let start = Instant::now();
    let err = notifier(Arc::new(HangingTransport))
        .notify(&payload(), "http://cb.invalid/notify")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::DeliveryFailed { attempts: 5, .. }));
    assert_eq!(start.elapsed(), Duration::from_secs(5 * 10 + 31));
}
