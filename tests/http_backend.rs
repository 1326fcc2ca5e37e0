#![cfg(feature = "http")]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use formbridge::{
    FieldErrors, FormBackend, FormRequest, FormValues, PrecognitionBackend, RequestMethod,
    SubmitResponse, TransportError,
};
use serde_json::json;

/// Serves one canned response and hands back the raw request it received.
fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header");
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            let end = line == "\r\n";
            head.push_str(&line);
            if end {
                break;
            }
        }
        let mut payload = vec![0; content_length];
        reader.read_exact(&mut payload).expect("read body");
        head.push_str(&String::from_utf8_lossy(&payload));
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let mut stream = reader.into_inner();
        stream.write_all(response.as_bytes()).expect("write");
        let _ = tx.send(head);
    });
    (format!("http://{addr}/contacts"), rx)
}

fn request(url: String, method: RequestMethod) -> FormRequest {
    FormRequest {
        form_id: "contact-form".into(),
        method,
        url,
        data: FormValues::new()
            .with("email", "ada@example.com")
            .with("is_vip", true),
    }
}

#[tokio::test]
async fn validation_sends_precognition_headers() {
    let (url, seen) = serve_once("204 No Content", "");
    let backend = PrecognitionBackend::new().expect("client");

    let errors = backend
        .validate(
            &request(url, RequestMethod::Post),
            &["email".to_string(), "is_vip".to_string()],
        )
        .await
        .expect("answered");

    assert!(errors.is_empty());
    let raw = seen.recv().expect("request").to_ascii_lowercase();
    assert!(raw.starts_with("post /contacts"));
    assert!(raw.contains("precognition: true"));
    assert!(raw.contains("precognition-validate-only: email,is_vip"));
    assert!(raw.contains("\"email\":\"ada@example.com\""));
}

#[tokio::test]
async fn unprocessable_validation_yields_first_message_per_field() {
    let (url, _seen) = serve_once(
        "422 Unprocessable Entity",
        r#"{"message":"invalid","errors":{"email":["taken","too long"],"is_vip":"required"}}"#,
    );
    let backend = PrecognitionBackend::new().expect("client");

    let errors = backend
        .validate(&request(url, RequestMethod::Post), &["email".to_string()])
        .await
        .expect("answered");

    assert_eq!(
        errors,
        FieldErrors::new()
            .with("email", "taken")
            .with("is_vip", "required")
    );
}

#[tokio::test]
async fn get_requests_carry_data_in_the_query() {
    let (url, seen) = serve_once("200 OK", r#"{"id": 7}"#);
    let backend = PrecognitionBackend::new().expect("client");

    let response = backend
        .submit(&request(url, RequestMethod::Get))
        .await
        .expect("answered");

    assert_eq!(response, SubmitResponse::Accepted(json!({"id": 7})));
    let raw = seen.recv().expect("request");
    let request_line = raw.lines().next().unwrap_or_default();
    assert!(request_line.starts_with("GET /contacts?"));
    assert!(request_line.contains("email=ada%40example.com"));
    assert!(request_line.contains("is_vip=1"));
}

#[tokio::test]
async fn server_errors_surface_as_status() {
    let (url, _seen) = serve_once("503 Service Unavailable", "down");
    let backend = PrecognitionBackend::new().expect("client");

    let err = backend
        .submit(&request(url, RequestMethod::Post))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::Status {
            status: 503,
            body: "down".into()
        }
    );
}
