use super::*;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok_body() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "retcode": 0, "data": null}))
}

fn transport_for(server: &MockServer, share: &TempDir) -> OneBotTransport {
    OneBotTransport::new(TransportConfig {
        http_url: server.uri(),
        chunk_chars: 10,
        chunk_delay_ms: 0,
        share_dir: share.path().to_string_lossy().into_owned(),
        remote_share_dir: "/app/share/".into(),
        ..TransportConfig::default()
    })
}

#[test]
fn test_parse_private_message() {
    let event = json!({
        "post_type": "message",
        "message_type": "private",
        "user_id": 10001,
        "raw_message": "  check disk usage  ",
        "message": "check disk usage"
    });
    let parsed = parse_event(&event).unwrap();
    assert_eq!(parsed.identity(), "10001");
    assert_eq!(parsed.text, "check disk usage");
}

#[test]
fn test_parse_ignores_non_message_posts() {
    let event = json!({"post_type": "meta_event", "meta_event_type": "heartbeat"});
    assert!(parse_event(&event).is_none());
}

#[test]
fn test_parse_ignores_empty_private_text() {
    let event = json!({
        "post_type": "message",
        "message_type": "private",
        "user_id": 1,
        "raw_message": "   "
    });
    assert!(parse_event(&event).is_none());
}

#[test]
fn test_parse_group_requires_mention_of_self() {
    let base = |message: &str| {
        json!({
            "post_type": "message",
            "message_type": "group",
            "self_id": 999,
            "group_id": 555,
            "user_id": 10001,
            "raw_message": message,
            "message": message
        })
    };

    assert!(parse_event(&base("hello everyone")).is_none());
    assert!(parse_event(&base("[CQ:at,qq=123] hello")).is_none());

    let parsed = parse_event(&base("[CQ:at,qq=999] how's the server?")).unwrap();
    assert_eq!(parsed.identity(), "group_555");
    assert_eq!(parsed.sender_id, "10001");
    assert_eq!(parsed.text, "how's the server?");
}

#[test]
fn test_parse_group_segment_array_mention() {
    let event = json!({
        "post_type": "message",
        "message_type": "group",
        "self_id": "999",
        "group_id": 555,
        "user_id": 10001,
        "raw_message": "[CQ:at,qq=999,name=bot] ping",
        "message": [
            {"type": "at", "data": {"qq": "999"}},
            {"type": "text", "data": {"text": " ping"}}
        ]
    });
    let parsed = parse_event(&event).unwrap();
    assert_eq!(parsed.text, "ping");
}

#[test]
fn test_parse_group_mention_only_is_dropped() {
    let event = json!({
        "post_type": "message",
        "message_type": "group",
        "self_id": 999,
        "group_id": 555,
        "user_id": 10001,
        "raw_message": "[CQ:at,qq=999]",
        "message": "[CQ:at,qq=999]"
    });
    assert!(parse_event(&event).is_none());
}

#[test]
fn test_id_value_numeric_and_text() {
    assert_eq!(id_value("10001"), json!(10001));
    assert_eq!(id_value("abc"), json!("abc"));
}

#[tokio::test]
async fn test_send_private_text() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .and(body_partial_json(json!({"user_id": 10001, "message": "hello"})))
        .respond_with(ok_body())
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    transport
        .send_text(&ReplyTarget::private("10001"), "hello")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_long_text_is_chunked() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .respond_with(ok_body())
        .expect(3)
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    transport
        .send_text(&ReplyTarget::private("10001"), &"x".repeat(25))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_group_reply_mentions_sender() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/send_group_msg"))
        .and(body_partial_json(
            json!({"group_id": 555, "message": "[CQ:at,qq=10001] hi"}),
        ))
        .respond_with(ok_body())
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    let target = ReplyTarget::Group {
        group_id: "555".into(),
        mention: Some("10001".into()),
    };
    transport.send_text(&target, "hi").await.unwrap();
}

#[tokio::test]
async fn test_access_token_sent_as_bearer() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ok_body())
        .expect(1)
        .mount(&server)
        .await;

    let mut config = transport_for(&server, &share).config().clone();
    config.access_token = "secret".into();
    OneBotTransport::new(config)
        .send_text(&ReplyTarget::private("1"), "x")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_nonzero_retcode_is_error() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/send_private_msg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "failed", "retcode": 1200, "message": "not a friend"})),
        )
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    let err = transport
        .send_text(&ReplyTarget::private("1"), "x")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not a friend"));
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    let err = transport
        .send_text(&ReplyTarget::private("1"), "x")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 502"));
}

#[tokio::test]
async fn test_send_missing_file() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    let transport = transport_for(&server, &share);

    let err = transport
        .send_file(
            &ReplyTarget::private("1"),
            Path::new("/definitely/not/here.log"),
            None,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("file not found"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_send_file_copies_and_uploads() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    let src_dir = TempDir::new().unwrap();
    let src = src_dir.path().join("report.txt");
    std::fs::write(&src, "disk ok").unwrap();

    Mock::given(method("POST"))
        .and(path("/upload_private_file"))
        .and(body_partial_json(json!({
            "user_id": 10001,
            "file": "/app/share/report.txt",
            "name": "report.txt"
        })))
        .respond_with(ok_body())
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    transport
        .send_file(&ReplyTarget::private("10001"), &src, None)
        .await
        .unwrap();

    let copied = share.path().join("report.txt");
    assert_eq!(std::fs::read_to_string(&copied).unwrap(), "disk ok");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&copied).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

#[tokio::test]
async fn test_send_file_upload_rejected() {
    let server = MockServer::start().await;
    let share = TempDir::new().unwrap();
    let src_dir = TempDir::new().unwrap();
    let src = src_dir.path().join("big.bin");
    std::fs::write(&src, [0u8; 16]).unwrap();

    Mock::given(method("POST"))
        .and(path("/upload_private_file"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"retcode": 1, "message": "too large"})),
        )
        .mount(&server)
        .await;

    let transport = transport_for(&server, &share);
    let err = transport
        .send_file(&ReplyTarget::private("1"), &src, Some("renamed.bin"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("too large"));
    assert!(share.path().join("renamed.bin").exists());
}
