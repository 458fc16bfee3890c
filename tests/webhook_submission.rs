//! Webhook uploads against a local mock server.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::{Arc, Mutex};

use meetdoc::form::{DocumentType, ValidatedForm};
use meetdoc::submission::{
    FormPayload, SubmitError, UploadProgress, WebhookClient, WorkflowTrigger,
};
use tokio::sync::watch;

#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

type Received = Arc<Mutex<Vec<ReceivedPart>>>;

async fn accept_upload(State(received): State<Received>, mut multipart: Multipart) -> StatusCode {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let body = field.bytes().await.unwrap().to_vec();
        received.lock().unwrap().push(ReceivedPart {
            name,
            file_name,
            content_type,
            body,
        });
    }
    StatusCode::OK
}

async fn reject_upload() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "workflow crashed")
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/webhook/upload-audio", addr)
}

fn progress_sink() -> watch::Sender<UploadProgress> {
    watch::channel(UploadProgress::default()).0
}

fn validated_form(audio: &Path) -> ValidatedForm {
    ValidatedForm {
        document_type: DocumentType::ProcesVerbal,
        meeting_title: "Board meeting".to_string(),
        meeting_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
        main_objective: "Approve the budget".to_string(),
        participants: String::new(),
        audio_file: audio.to_path_buf(),
        language: "fr".to_string(),
        agenda: "1. Budget\n2. Hiring".to_string(),
    }
}

#[tokio::test]
async fn test_upload_sends_every_field() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/webhook/upload-audio", post(accept_upload))
        .with_state(received.clone());
    let url = spawn_server(app).await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("board.mp3");
    std::fs::write(&audio, b"ID3fake-audio").unwrap();

    let client = WebhookClient::new(&url, None).unwrap();
    let payload = FormPayload::new(validated_form(&audio), "run-42");
    let (progress, _) = watch::channel(UploadProgress::default());
    client.submit(&payload, progress).await.unwrap();

    let parts = received.lock().unwrap().clone();
    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "documentType",
            "meetingTitle",
            "meetingDate",
            "mainObjective",
            "participants",
            "audioFile",
            "language",
            "ordreJour",
            "runId",
        ]
    );

    let text = |name: &str| {
        let part = parts.iter().find(|p| p.name == name).unwrap();
        String::from_utf8(part.body.clone()).unwrap()
    };
    assert_eq!(text("documentType"), "Procès verbal");
    assert_eq!(text("meetingDate"), "2024-06-14");
    assert_eq!(text("participants"), "");
    assert_eq!(text("ordreJour"), "1. Budget\n2. Hiring");
    assert_eq!(text("runId"), "run-42");

    let audio_part = parts.iter().find(|p| p.name == "audioFile").unwrap();
    assert_eq!(audio_part.file_name.as_deref(), Some("board.mp3"));
    assert_eq!(audio_part.content_type.as_deref(), Some("audio/mpeg"));
    assert_eq!(audio_part.body, b"ID3fake-audio");
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let app = Router::new().route("/webhook/upload-audio", post(reject_upload));
    let url = spawn_server(app).await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("board.wav");
    std::fs::write(&audio, b"RIFF").unwrap();

    let client = WebhookClient::new(&url, None).unwrap();
    let err = client
        .submit(&FormPayload::new(validated_form(&audio), "run-1"), progress_sink())
        .await
        .unwrap_err();

    match err {
        SubmitError::Server { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "workflow crashed");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_no_response() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{}/webhook/upload-audio", port);

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("board.m4a");
    std::fs::write(&audio, b"data").unwrap();

    let client = WebhookClient::new(&url, None).unwrap();
    let err = client
        .submit(&FormPayload::new(validated_form(&audio), "run-1"), progress_sink())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::NoResponse { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_missing_audio_file_is_request_error() {
    let client = WebhookClient::new("http://127.0.0.1:9/unused", None).unwrap();
    let err = client
        .submit(
            &FormPayload::new(
                validated_form(Path::new("/nonexistent/meeting.mp3")),
                "run-1",
            ),
            progress_sink(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::Request(_)), "{:?}", err);
}

#[tokio::test]
async fn test_upload_progress_covers_whole_file() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/webhook/upload-audio", post(accept_upload))
        .with_state(received.clone());
    let url = spawn_server(app).await;

    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("long.wav");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&audio, &data).unwrap();

    let (progress, updates) = watch::channel(UploadProgress::default());

    let client = WebhookClient::new(&url, None).unwrap();
    client
        .submit(&FormPayload::new(validated_form(&audio), "run-7"), progress)
        .await
        .unwrap();

    let total = data.len() as u64;
    let last = *updates.borrow();
    assert_eq!(last, UploadProgress { sent: total, total });
    assert_eq!(last.percent(), 100);

    let parts = received.lock().unwrap();
    let audio_part = parts.iter().find(|p| p.name == "audioFile").unwrap();
    assert_eq!(audio_part.body, data);
}
