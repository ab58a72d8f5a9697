//! Voice webhook routes through the router.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use common::{feedback_interview, test_config, test_state};
use interview_gateway::core::telephony::TelephonyMode;
use interview_gateway::{InterviewPhrases, routes};

fn app(mode: TelephonyMode) -> Router {
    let mut config = test_config(None);
    config.telephony_mode = mode;
    routes::create_app(test_state(config, vec![feedback_interview()]))
}

async fn post_form(app: &Router, uri: &str, form: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let app = app(TelephonyMode::Stream);
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["telephony_mode"], "stream");
}

#[tokio::test]
async fn test_incoming_call_connects_stream() {
    let app = app(TelephonyMode::Stream);
    let (status, content_type, body) = post_form(
        &app,
        "/voice/incoming?interviewId=int-1",
        "CallSid=CA1&From=%2B358401234567&To=%2B35890000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/xml; charset=utf-8"));
    assert!(body.contains("Hetki kun yhdistän sinut tekoälyyn."));
    assert!(body.contains("Palaute"));
    assert!(body.contains("<Stream url=\"wss://gw.example.com/voice/stream\">"));
    assert!(body.contains("<Parameter name=\"interviewId\" value=\"int-1\" />"));
    assert!(!body.contains("<Hangup/>"));
}

#[tokio::test]
async fn test_incoming_call_without_id_uses_latest() {
    let app = app(TelephonyMode::Stream);
    let (status, _, body) = post_form(&app, "/voice/incoming", "CallSid=CA2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("value=\"int-1\""));
}

#[tokio::test]
async fn test_incoming_call_unknown_interview() {
    let app = app(TelephonyMode::Stream);
    let (status, _, body) =
        post_form(&app, "/voice/incoming?interviewId=missing", "CallSid=CA3").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&InterviewPhrases::default().not_found));
    assert!(body.contains("<Hangup/>"));
    assert!(!body.contains("<Stream"));
}

#[tokio::test]
async fn test_missing_call_sid_rejected() {
    let app = app(TelephonyMode::Gather);
    let (status, _, _) = post_form(&app, "/voice/turn", "SpeechResult=hei").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gather_interview_sequence() {
    let app = app(TelephonyMode::Gather);
    let phrases = InterviewPhrases::default();

    // Incoming call asks the first question and listens
    let (_, _, body) = post_form(&app, "/voice/incoming?interviewId=int-1", "CallSid=CA9").await;
    assert!(body.contains("Miten meni?"));
    assert!(body.contains(
        "action=\"https://gw.example.com/voice/turn?interviewId=int-1\""
    ));
    assert!(body.contains("timeout=\"5\""));
    assert!(body.contains(&phrases.no_answer));

    // Answer moves to the second question
    let (_, _, body) = post_form(
        &app,
        "/voice/turn?interviewId=int-1",
        "CallSid=CA9&SpeechResult=Hyvin+meni",
    )
    .await;
    assert!(body.contains("Kiitos vastauksesta. Mitä parantaisit?"));
    assert!(body.contains("<Gather"));

    // Silence repeats the pending question
    let (_, _, body) = post_form(&app, "/voice/turn", "CallSid=CA9").await;
    assert!(body.contains("Mitä parantaisit?"));
    assert!(!body.contains("Kiitos vastauksesta."));

    // Last answer closes the interview
    let (_, _, body) = post_form(&app, "/voice/turn", "CallSid=CA9&SpeechResult=Ei+mit%C3%A4%C3%A4n").await;
    assert!(body.contains(&phrases.closing));
    assert!(body.contains("<Hangup/>"));
    assert!(!body.contains("<Gather"));

    // A late webhook for a finished call only repeats the closing line
    let (_, _, body) = post_form(&app, "/voice/turn", "CallSid=CA9&SpeechResult=Hei").await;
    assert!(body.contains(&phrases.closing));
    assert!(body.contains("<Hangup/>"));
}

#[tokio::test]
async fn test_gather_unknown_interview() {
    let app = app(TelephonyMode::Gather);
    let (status, _, body) =
        post_form(&app, "/voice/turn?interviewId=missing", "CallSid=CA10").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&InterviewPhrases::default().not_found));
    assert!(body.contains("<Hangup/>"));
}
