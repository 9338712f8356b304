//! HTTP Adapter Contract Tests
//!
//! Request format and response/error mapping for the OpenAI, Twilio and
//! Telegram clients, checked against a local mock server.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{
    basic_auth, bearer_token, body_partial_json, body_string_contains, header, method, path,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voicetask::adapters::{
    DeliveryError, NotificationDispatcher, OpenAiClient, SpeechFormat, SpeechToText,
    TelegramClient, TextToSpeech, TwilioClient, TwilioWhatsApp,
};

const MESSAGES_PATH: &str = "/2010-04-01/Accounts/AC123/Messages.json";

fn twilio(server: &MockServer) -> TwilioClient {
    TwilioClient::new("AC123".to_string(), "secret".to_string()).with_api_base(server.uri())
}

fn openai(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new("sk-test".to_string()).with_api_base(server.uri())
}

// ────────────────────────────────────────────────────────────────────────────
// Twilio
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_twilio_sends_form_with_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .and(basic_auth("AC123", "secret"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("From=whatsapp%3A%2B15550000000"))
        .and(body_string_contains("To=whatsapp%3A%2B15551111111"))
        .and(body_string_contains("Body=hello"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "sid": "SM42",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let whatsapp = TwilioWhatsApp::new(twilio(&server), "+15550000000", "+15551111111");
    whatsapp.send("hello").await.unwrap();
}

#[tokio::test]
async fn test_twilio_send_message_returns_sid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM42"})))
        .mount(&server)
        .await;

    let sid = twilio(&server)
        .send_message("whatsapp:+1", "whatsapp:+2", "Reminder")
        .await
        .unwrap();
    assert_eq!(sid, "SM42");
}

#[tokio::test]
async fn test_twilio_error_body_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 21211,
            "message": "The 'To' number is not a valid phone number.",
            "status": 400
        })))
        .mount(&server)
        .await;

    let whatsapp = TwilioWhatsApp::new(twilio(&server), "+15550000000", "bogus");
    let err = whatsapp.send("hello").await.unwrap_err();

    match err {
        DeliveryError::Api {
            service,
            status,
            message,
        } => {
            assert_eq!(service, "Twilio");
            assert_eq!(status, 400);
            assert_eq!(
                message,
                "The 'To' number is not a valid phone number. (code 21211)"
            );
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_twilio_non_json_error_keeps_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(MESSAGES_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = twilio(&server)
        .send_message("a", "b", "c")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeliveryError::Api { status: 503, ref message, .. } if message == "upstream unavailable"
    ));
}

// ────────────────────────────────────────────────────────────────────────────
// Telegram
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_telegram_posts_chat_and_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": "42",
            "text": "Reminder: Task 'pay rent'"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        TelegramClient::new("TOKEN".to_string(), "42".to_string()).with_api_base(server.uri());
    let message_id = client
        .send_message("Reminder: Task 'pay rent'")
        .await
        .unwrap();
    assert_eq!(message_id, 7);
}

#[tokio::test]
async fn test_telegram_not_ok_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let client =
        TelegramClient::new("TOKEN".to_string(), "42".to_string()).with_api_base(server.uri());
    let err = client.send("hello").await.unwrap_err();

    match err {
        DeliveryError::Api {
            service,
            status,
            message,
        } => {
            assert_eq!(service, "Telegram");
            assert_eq!(status, 400);
            assert_eq!(message, "Bad Request: chat not found");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transcription_uploads_multipart_and_trims() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(bearer_token("sk-test"))
        .and(body_string_contains("name=\"model\""))
        .and(body_string_contains("whisper-1"))
        .and(body_string_contains("filename=\"command.wav\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "  schedule a task \n"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("command.wav");
    std::fs::write(&audio, b"RIFF....WAVE").unwrap();

    let text = openai(&server).transcribe(&audio).await.unwrap();
    assert_eq!(text, "schedule a task");
}

#[tokio::test]
async fn test_transcription_error_envelope_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error"
            }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("command.wav");
    std::fs::write(&audio, b"RIFF").unwrap();

    let err = openai(&server).transcribe(&audio).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("401"), "{text}");
    assert!(text.contains("Incorrect API key provided"), "{text}");
    assert!(!text.contains("invalid_request_error"), "{text}");
}

#[tokio::test]
async fn test_speech_request_and_audio_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "tts-1",
            "voice": "nova",
            "input": "What would you like to do?",
            "response_format": "wav"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = openai(&server)
        .with_models("whisper-1", "tts-1", "nova")
        .with_speech_format(SpeechFormat::Wav);
    let audio = client.synthesize("What would you like to do?").await.unwrap();

    assert_eq!(audio.bytes, b"RIFFdata");
    assert_eq!(audio.extension, "wav");
}

#[tokio::test]
async fn test_speech_error_with_plain_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = openai(&server).synthesize("hello").await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("speech synthesis"), "{text}");
    assert!(text.contains("internal error"), "{text}");
}
