use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::auth::AuthContext;

pub const ADD_CONTENT_PATH: &str = "/api/v1/brain/user/add-content";
pub const UPLOAD_IMAGE_PATH: &str = "/api/v1/brain/user/upload-image";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not signed in; run `brain token set <TOKEN>` first")]
    MissingToken,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("upload response did not include a link")]
    MissingLink,

    #[error("reading file: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Message worth showing to the user, if the server supplied one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// JSON body of the add-content request. `image` carries the link returned by
/// the upload endpoint and is left out when no image was attached.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentPayload {
    pub title: String,
    pub link: String,
    pub tags: String,
    pub brain: String,
    pub description: String,
    pub image: Option<String>,
}

/// Backend operations the UI depends on.
pub trait BrainApi: Send + Sync {
    /// Returns the HTTP status of an accepted request. Non-2xx answers are
    /// errors.
    fn add_content(&self, payload: &ContentPayload) -> Result<u16, ApiError>;

    /// Uploads an image and returns its public link.
    fn upload_image(&self, path: &Path) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpBrainApi {
    client: Client,
    base_url: String,
    auth: AuthContext,
}

impl HttpBrainApi {
    pub fn new(base_url: &str, timeout: Duration, auth: AuthContext) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer_header() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}

impl BrainApi for HttpBrainApi {
    fn add_content(&self, payload: &ContentPayload) -> Result<u16, ApiError> {
        if !self.auth.is_authenticated() {
            return Err(ApiError::MissingToken);
        }
        let url = self.endpoint(ADD_CONTENT_PATH);
        tracing::info!(%url, title = %payload.title, "submitting content");
        let response = self
            .authorize(self.client.post(&url))
            .json(payload)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response));
        }
        tracing::info!(status = status.as_u16(), "content accepted");
        Ok(status.as_u16())
    }

    fn upload_image(&self, path: &Path) -> Result<String, ApiError> {
        let url = self.endpoint(UPLOAD_IMAGE_PATH);
        tracing::info!(%url, file = %path.display(), "uploading image");
        let form = multipart::Form::new().file("image", path)?;
        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response));
        }
        let body: Value = response
            .json()
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        body.get("link")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(ApiError::MissingLink)
    }
}

fn status_error(status: StatusCode, response: Response) -> ApiError {
    let body = response.text().unwrap_or_default();
    tracing::warn!(status = status.as_u16(), %body, "backend rejected request");
    ApiError::Status {
        status: status.as_u16(),
        message: extract_error_message(&body).unwrap_or_default(),
    }
}

/// Best-effort pull of a human readable message out of an error body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["error", "message", "msg"] {
        match value.get(key) {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                return Some(text.trim().to_string())
            }
            Some(Value::Object(inner)) => {
                if let Some(Value::String(text)) = inner.get("message") {
                    return Some(text.trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Serves exactly one request with the canned response and hands back the
    /// raw request text.
    fn one_shot_server(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let header_end = loop {
                let read = stream.read(&mut buf).expect("read");
                raw.extend_from_slice(&buf[..read]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if read == 0 {
                    break raw.len();
                }
            };
            let headers = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if headers.contains("transfer-encoding: chunked") {
                while !raw.ends_with(b"0\r\n\r\n") {
                    let read = stream.read(&mut buf).expect("read chunk");
                    if read == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..read]);
                }
            }
            while raw.len() < header_end + length {
                let read = stream.read(&mut buf).expect("read body");
                if read == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..read]);
            }
            stream.write_all(response.as_bytes()).expect("write");
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn json_response(status_line: &str, body: &str) -> &'static str {
        Box::leak(
            format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .into_boxed_str(),
        )
    }

    fn image_file(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"\x89PNG fake bytes").expect("write image");
        path
    }

    fn api(base: &str, token: Option<&str>) -> HttpBrainApi {
        HttpBrainApi::new(
            base,
            Duration::from_secs(5),
            AuthContext::new(token.map(str::to_owned)),
        )
        .expect("client")
    }

    #[test]
    fn payload_omits_missing_image() {
        let payload = ContentPayload {
            title: "Vibe coding".into(),
            link: "https://example.com".into(),
            ..ContentPayload::default()
        };
        let json = serde_json::to_value(&payload).expect("json");
        assert!(json.get("image").is_none());
        assert_eq!(json["tags"], "");

        let with_image = ContentPayload {
            image: Some("https://cdn/x.png".into()),
            ..payload
        };
        let json = serde_json::to_value(&with_image).expect("json");
        assert_eq!(json["image"], "https://cdn/x.png");
    }

    #[test]
    fn error_message_extraction_is_best_effort() {
        assert_eq!(
            extract_error_message(r#"{"error":"title taken"}"#).as_deref(),
            Some("title taken")
        );
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad link"}}"#).as_deref(),
            Some("bad link")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"nope"}"#).as_deref(),
            Some("nope")
        );
        assert_eq!(extract_error_message("<html>oops</html>"), None);
        assert_eq!(extract_error_message(r#"{"error":"  "}"#), None);
    }

    #[test]
    fn add_content_without_token_fails_fast() {
        let client = api("http://127.0.0.1:9", None);
        let result = client.add_content(&ContentPayload::default());
        assert_matches!(result, Err(ApiError::MissingToken));
    }

    #[test]
    fn add_content_sends_bearer_and_json() {
        let (base, server) =
            one_shot_server("HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let client = api(&format!("{base}/"), Some("secret"));
        let payload = ContentPayload {
            title: "Vibe coding".into(),
            link: "https://example.com".into(),
            tags: "#vibe,#fun".into(),
            brain: "Youtube".into(),
            description: "flow".into(),
            image: None,
        };
        let status = client.add_content(&payload).expect("accepted");
        assert_eq!(status, 201);

        let request = server.join().expect("server thread");
        assert!(request.starts_with(&format!("POST {ADD_CONTENT_PATH} HTTP/1.1")));
        let lowered = request.to_lowercase();
        assert!(lowered.contains("authorization: bearer secret"));
        assert!(lowered.contains("content-type: application/json"));
        assert!(request.contains(r#""title":"Vibe coding""#));
        assert!(!request.contains(r#""image""#));
    }

    #[test]
    fn add_content_surfaces_server_error_message() {
        let response = json_response("409 Conflict", r#"{"error":"Content already exists"}"#);
        let (base, server) = one_shot_server(response);
        let client = api(&base, Some("secret"));
        let err = client
            .add_content(&ContentPayload::default())
            .expect_err("conflict");
        server.join().expect("server thread");
        assert_matches!(err, ApiError::Status { status: 409, .. });
        assert_eq!(err.server_message(), Some("Content already exists"));
    }

    #[test]
    fn upload_image_posts_multipart_and_returns_link() {
        let dir = TempDir::new().expect("tempdir");
        let path = image_file(&dir);
        let (base, server) =
            one_shot_server(json_response("200 OK", r#"{"link":"https://cdn/x.png"}"#));
        let client = api(&base, Some("secret"));

        let link = client.upload_image(&path).expect("uploaded");
        assert_eq!(link, "https://cdn/x.png");

        let request = server.join().expect("server thread");
        assert!(request.starts_with(&format!("POST {UPLOAD_IMAGE_PATH} HTTP/1.1")));
        let lowered = request.to_lowercase();
        assert!(lowered.contains("content-type: multipart/form-data"));
        assert!(lowered.contains("authorization: bearer secret"));
        assert!(request.contains(r#"name="image""#));
        assert!(request.contains(r#"filename="shot.png""#));
    }

    #[test]
    fn upload_image_without_link_is_missing_link() {
        let dir = TempDir::new().expect("tempdir");
        let path = image_file(&dir);
        let (base, server) = one_shot_server(json_response("200 OK", "{}"));
        let client = api(&base, None);

        let result = client.upload_image(&path);
        let request = server.join().expect("server thread");
        assert_matches!(result, Err(ApiError::MissingLink));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[test]
    fn upload_image_server_error_is_status() {
        let dir = TempDir::new().expect("tempdir");
        let path = image_file(&dir);
        let (base, server) = one_shot_server(json_response(
            "500 Internal Server Error",
            r#"{"error":"storage offline"}"#,
        ));
        let client = api(&base, Some("secret"));

        let err = client.upload_image(&path).expect_err("server error");
        server.join().expect("server thread");
        assert_matches!(err, ApiError::Status { status: 500, .. });
        assert_eq!(err.server_message(), Some("storage offline"));
    }
}
