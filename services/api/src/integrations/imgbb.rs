//! ImgBB upload client

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const IMGBB_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

/// Images expire on the host after 180 days
pub const EXPIRATION_SECS: i64 = 15_552_000;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Server not configured")]
    NotConfigured,
    #[error("Upload timed out")]
    Timeout,
    #[error("Image host rejected the upload ({status})")]
    Rejected { status: u16 },
    #[error("Image host returned an unexpected response")]
    MalformedResponse,
    #[error("Image host unreachable: {0}")]
    Transport(#[source] reqwest::Error),
}

/// What the image host reports back for a stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub display_url: String,
    pub thumb_url: Option<String>,
    pub delete_url: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size: Option<i64>,
}

#[derive(Clone)]
pub struct ImgbbClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl ImgbbClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: IMGBB_UPLOAD_URL.to_string(),
            timeout: UPLOAD_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, timeout: Duration) -> Self {
        self.endpoint = endpoint.into();
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Upload one image as the multipart field `image`
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: String,
        content_type: &str,
    ) -> Result<UploadedImage, UploadError> {
        let api_key = self.api_key.as_deref().ok_or(UploadError::NotConfigured)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(UploadError::Transport)?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let expiration = EXPIRATION_SECS.to_string();
        let res = self
            .http
            .post(&self.endpoint)
            .query(&[("expiration", expiration.as_str()), ("key", api_key)])
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = res.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "ImgBB upload rejected");
            return Err(UploadError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: Value = res.json().await.map_err(|e| {
            if e.is_timeout() {
                UploadError::Timeout
            } else {
                UploadError::MalformedResponse
            }
        })?;

        let uploaded = parse_upload_response(&body).ok_or(UploadError::MalformedResponse)?;
        info!(url = %uploaded.display_url, "Image stored on ImgBB");
        Ok(uploaded)
    }
}

fn classify(e: reqwest::Error) -> UploadError {
    if e.is_timeout() {
        UploadError::Timeout
    } else {
        UploadError::Transport(e)
    }
}

/// Numbers sometimes arrive as strings
fn number(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract the stored image from an ImgBB response; `url` and `display_url` are required
pub fn parse_upload_response(body: &Value) -> Option<UploadedImage> {
    let data = body.get("data")?;
    Some(UploadedImage {
        url: text(&data["url"])?,
        display_url: text(&data["display_url"])?,
        thumb_url: text(&data["thumb"]["url"]),
        delete_url: text(&data["delete_url"]),
        width: number(&data["width"]).and_then(|n| i32::try_from(n).ok()),
        height: number(&data["height"]).and_then(|n| i32::try_from(n).ok()),
        size: number(&data["size"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/1/upload")
    }

    #[test]
    fn parses_mixed_number_formats() {
        let body = json!({
            "data": {
                "url": "https://i.ibb.co/abc/full.png",
                "display_url": "https://i.ibb.co/abc/display.png",
                "thumb": {"url": "https://i.ibb.co/abc/thumb.png"},
                "delete_url": "https://ibb.co/abc/delete",
                "width": "640",
                "height": 480,
                "size": 12345
            },
            "success": true
        });
        let uploaded = parse_upload_response(&body).unwrap();
        assert_eq!(uploaded.width, Some(640));
        assert_eq!(uploaded.height, Some(480));
        assert_eq!(uploaded.size, Some(12345));
        assert_eq!(uploaded.thumb_url.as_deref(), Some("https://i.ibb.co/abc/thumb.png"));
    }

    #[test]
    fn missing_urls_are_malformed() {
        assert!(parse_upload_response(&json!({"data": {"url": "x"}})).is_none());
        assert!(parse_upload_response(&json!({"error": "bad"})).is_none());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = ImgbbClient::new(reqwest::Client::new(), None);
        let err = client
            .upload(vec![1, 2, 3], "a.png".into(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }

    #[tokio::test]
    async fn upstream_error_status_is_rejected() {
        let endpoint = serve(Router::new().route(
            "/1/upload",
            post(|| async { (StatusCode::BAD_REQUEST, "bad key") }),
        ))
        .await;

        let client = ImgbbClient::new(reqwest::Client::new(), Some("key".into()))
            .with_endpoint(endpoint, Duration::from_secs(5));
        let err = client
            .upload(vec![1, 2, 3], "a.png".into(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Rejected { status: 400 }));
    }

    #[tokio::test]
    async fn successful_upload_is_parsed() {
        let endpoint = serve(Router::new().route(
            "/1/upload",
            post(|| async {
                axum::Json(json!({
                    "data": {
                        "url": "https://i.ibb.co/x/full.jpg",
                        "display_url": "https://i.ibb.co/x/display.jpg",
                        "width": 10,
                        "height": 20,
                        "size": 30
                    }
                }))
            }),
        ))
        .await;

        let client = ImgbbClient::new(reqwest::Client::new(), Some("key".into()))
            .with_endpoint(endpoint, Duration::from_secs(5));
        let uploaded = client
            .upload(vec![0xff, 0xd8], "photo.jpg".into(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(uploaded.display_url, "https://i.ibb.co/x/display.jpg");
        assert_eq!(uploaded.delete_url, None);
    }

    #[tokio::test]
    async fn slow_host_times_out() {
        let endpoint = serve(Router::new().route(
            "/1/upload",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK
            }),
        ))
        .await;

        let client = ImgbbClient::new(reqwest::Client::new(), Some("key".into()))
            .with_endpoint(endpoint, Duration::from_millis(200));
        let err = client
            .upload(vec![1], "a.png".into(), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Timeout));
    }
}
