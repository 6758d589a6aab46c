use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{BoardError, TaskGateway};
use crate::model::config::StoreConfig;
use crate::model::task::{NewTask, Task, TaskPatch, normalize_title};

/// Task store behind a PostgREST-style HTTP API (`/rest/v1/{table}`).
///
/// Every write asks for the affected rows back (`Prefer:
/// return=representation`), so an update or delete that touches no row is
/// reported as "not found" instead of silently succeeding.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    access_token: Option<String>,
}

/// Error payload returned by the data service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, BoardError> {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Build a store that sends its requests through `client`
    pub fn with_client(config: &StoreConfig, client: reqwest::Client) -> Result<Self, BoardError> {
        let base = config.url.trim();
        if base.is_empty() {
            return Err(BoardError::Validation(
                "no store url configured (set [store] url in taskboard.toml)".into(),
            ));
        }
        let raw = format!("{}/rest/v1/{}", base.trim_end_matches('/'), config.table);
        let endpoint = Url::parse(&raw)
            .map_err(|e| BoardError::Validation(format!("invalid store url '{}': {}", raw, e)))?;
        Ok(RestStore {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn list_url(&self, owner_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", owner_id))
            .append_pair("order", "created_at.desc");
        url
    }

    fn row_url(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        builder
            .header("apikey", self.api_key.as_str())
            .bearer_auth(token)
            .header("Prefer", "return=representation")
    }

    async fn rows(&self, builder: RequestBuilder) -> Result<Vec<Task>, BoardError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| BoardError::Store(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "could not read error body");
                    String::new()
                }
            };
            let err = store_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "store request failed");
            return Err(err);
        }
        response
            .json::<Vec<Task>>()
            .await
            .map_err(|e| BoardError::Store(format!("invalid response from store: {}", e)))
    }
}

/// Turn a non-success response into a store error, preferring the
/// service's own message.
fn store_error(status: u16, body: &str) -> BoardError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.msg))
        .filter(|m| !m.trim().is_empty());
    match message {
        Some(m) => BoardError::Store(m),
        None => BoardError::Store(format!("store returned HTTP {}", status)),
    }
}

#[async_trait]
impl TaskGateway for RestStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Task>, BoardError> {
        if owner_id.is_empty() {
            debug!("list called without an owner id");
            return Ok(Vec::new());
        }
        let tasks = self.rows(self.client.get(self.list_url(owner_id))).await?;
        debug!(owner_id, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    async fn create(&self, title: &str, owner_id: &str) -> Result<Task, BoardError> {
        if owner_id.is_empty() {
            return Err(BoardError::not_authenticated());
        }
        let body = [NewTask {
            title: normalize_title(title).ok_or_else(BoardError::empty_title)?,
            owner_id: owner_id.to_string(),
        }];
        let request = self.client.post(self.endpoint.clone()).json(&body);
        let task = self
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BoardError::Store("store returned no row for the new task".into()))?;
        debug!(id = %task.id, owner_id, "created task");
        Ok(task)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, BoardError> {
        if patch.is_empty() {
            return Err(BoardError::empty_patch());
        }
        let mut patch = patch.clone();
        if let Some(title) = patch.title.take() {
            patch.title = Some(normalize_title(&title).ok_or_else(BoardError::empty_title)?);
        }
        let request = self.client.patch(self.row_url(id)).json(&patch);
        let task = self
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BoardError::not_found(id))?;
        debug!(id, "updated task");
        Ok(task)
    }

    async fn delete(&self, id: &str) -> Result<(), BoardError> {
        let removed = self.rows(self.client.delete(self.row_url(id))).await?;
        if removed.is_empty() {
            return Err(BoardError::not_found(id));
        }
        debug!(id, "deleted task");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn config(url: &str) -> StoreConfig {
        StoreConfig {
            url: url.to_string(),
            api_key: "anon".into(),
            access_token: Some("jwt".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_from_config() {
        let store = RestStore::new(&config("https://demo.example.co/")).unwrap();
        assert_eq!(store.endpoint.as_str(), "https://demo.example.co/rest/v1/tasks");
    }

    #[test]
    fn test_missing_url_is_validation_error() {
        let err = RestStore::new(&config("  ")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_url() {
        let err = RestStore::new(&config("not a url")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_list_url_filters_by_owner() {
        let store = RestStore::new(&config("https://demo.example.co")).unwrap();
        let url = store.list_url("u-42");
        assert_eq!(
            url.query(),
            Some("select=*&user_id=eq.u-42&order=created_at.desc")
        );
    }

    #[test]
    fn test_row_url() {
        let store = RestStore::new(&config("https://demo.example.co")).unwrap();
        assert_eq!(store.row_url("abc").query(), Some("id=eq.abc"));
    }

    #[test]
    fn test_store_error_uses_service_message() {
        let err = store_error(401, r#"{"code":"PGRST301","message":"JWT expired"}"#);
        assert_eq!(err, BoardError::Store("JWT expired".into()));

        let err = store_error(400, r#"{"msg":"bad request"}"#);
        assert_eq!(err, BoardError::Store("bad request".into()));
    }

    #[test]
    fn test_store_error_fallback() {
        let err = store_error(503, "<html>unavailable</html>");
        assert_eq!(err, BoardError::Store("store returned HTTP 503".into()));
    }

    // -----------------------------------------------------------------------
    // Requests against a local canned server
    // -----------------------------------------------------------------------

    const ROW: &str = r#"[{"id":"t1","user_id":"u1","title":"Buy milk","is_complete":false,"created_at":"2025-03-01T09:30:00+00:00"}]"#;

    fn reply(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answer one request with `response` and hand back the raw request.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
            request
        });
        (url, handle)
    }

    fn local_store(url: &str) -> RestStore {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        RestStore::with_client(&config(url), client).unwrap()
    }

    #[tokio::test]
    async fn test_list_sends_owner_filter_and_credentials() {
        let (url, server) = serve_once(reply("200 OK", ROW)).await;
        let tasks = local_store(&url).list("u1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].owner_id, "u1");
        assert_eq!(tasks[0].title, "Buy milk");

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "GET /rest/v1/tasks?select=*&user_id=eq.u1&order=created_at.desc HTTP/1.1"
        ));
        let lower = request.to_lowercase();
        assert!(lower.contains("apikey: anon"));
        assert!(lower.contains("authorization: bearer jwt"));
        assert!(lower.contains("prefer: return=representation"));
    }

    #[tokio::test]
    async fn test_create_posts_new_row() {
        let (url, server) = serve_once(reply("201 Created", ROW)).await;
        let task = local_store(&url).create("  Buy milk ", "u1").await.unwrap();
        assert_eq!(task.id, "t1");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /rest/v1/tasks HTTP/1.1"));
        assert!(request.ends_with(r#"[{"title":"Buy milk","user_id":"u1"}]"#));
    }

    #[tokio::test]
    async fn test_create_without_row_is_store_error() {
        let (url, _server) = serve_once(reply("201 Created", "[]")).await;
        let err = local_store(&url).create("Buy milk", "u1").await.unwrap_err();
        assert_eq!(
            err,
            BoardError::Store("store returned no row for the new task".into())
        );
    }

    #[tokio::test]
    async fn test_update_without_row_is_not_found() {
        let (url, server) = serve_once(reply("200 OK", "[]")).await;
        let err = local_store(&url)
            .update("t9", &TaskPatch::complete(true))
            .await
            .unwrap_err();
        assert_eq!(err, BoardError::not_found("t9"));

        let request = server.await.unwrap();
        assert!(request.starts_with("PATCH /rest/v1/tasks?id=eq.t9 HTTP/1.1"));
        assert!(request.ends_with(r#"{"is_complete":true}"#));
    }

    #[tokio::test]
    async fn test_delete_without_row_is_not_found() {
        let (url, server) = serve_once(reply("200 OK", "[]")).await;
        let err = local_store(&url).delete("t9").await.unwrap_err();
        assert_eq!(err, BoardError::not_found("t9"));

        let request = server.await.unwrap();
        assert!(request.starts_with("DELETE /rest/v1/tasks?id=eq.t9 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_unauthorized_reports_service_message() {
        let body = r#"{"code":"PGRST301","message":"JWT expired"}"#;
        let (url, _server) = serve_once(reply("401 Unauthorized", body)).await;
        let err = local_store(&url).list("u1").await.unwrap_err();
        assert_eq!(err, BoardError::Store("JWT expired".into()));
    }

    #[tokio::test]
    async fn test_truncated_error_body_falls_back_to_status() {
        let response = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\nconnection: close\r\n\r\n{\"mess"
            .to_string();
        let (url, _server) = serve_once(response).await;
        let err = local_store(&url).delete("t1").await.unwrap_err();
        assert_eq!(err, BoardError::Store("store returned HTTP 500".into()));
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected_before_sending() {
        // nothing listens on the discard port; a request would fail differently
        let store = local_store("http://127.0.0.1:9");
        let err = store.update("t1", &TaskPatch::default()).await.unwrap_err();
        assert_eq!(err, BoardError::empty_patch());
    }
}
