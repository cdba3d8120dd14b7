use maxchat_core::{Backend, GenerateClient, GenerateError, Session};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session() -> Session {
    Session {
        user_id: "user-abc12345".to_string(),
        project: "Thrillers".to_string(),
    }
}

async fn client_for(server: &MockServer) -> GenerateClient {
    GenerateClient::new(&format!("{}/api/generate", server.uri()))
}

#[tokio::test]
async fn posts_session_and_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(json!({
            "userId": "user-abc12345",
            "project": "Thrillers",
            "prompt": "something tense",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Try Sicario." })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).await.generate(&session(), "something tense").await;

    assert_eq!(reply, Ok("Try Sicario.".to_string()));
}

#[tokio::test]
async fn non_success_status_keeps_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .generate(&session(), "hi")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GenerateError::Status {
            status: 500,
            body: "boom".to_string()
        }
    );
}

#[tokio::test]
async fn missing_or_empty_reply_is_empty_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "other": 1 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "" })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.generate(&session(), "a").await, Err(GenerateError::EmptyReply));
    assert_eq!(client.generate(&session(), "b").await, Err(GenerateError::EmptyReply));
}

#[tokio::test]
async fn malformed_json_is_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .generate(&session(), "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::Network(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_network_failure() {
    let client = GenerateClient::new("http://127.0.0.1:9/api/generate");
    let err = client.generate(&session(), "hi").await.unwrap_err();
    assert!(matches!(err, GenerateError::Network(_)));
}

/// Serve one request: a 500 whose body is cut off before `Content-Length` is reached
async fn truncated_error_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Read the full request so the client is waiting on the response
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + content_length {
                    break;
                }
            }
        }

        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-type: text/plain\r\ncontent-length: 100\r\n\r\nbo")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{}/api/generate", addr)
}

#[tokio::test]
async fn error_body_cut_off_is_network_failure() {
    let client = GenerateClient::new(&truncated_error_server().await);

    let err = client.generate(&session(), "hi").await.unwrap_err();

    assert!(matches!(err, GenerateError::Network(_)), "{:?}", err);
    assert_eq!(err.transcript_text(), maxchat_core::error::SERVER_ERROR_MESSAGE);
}
