//! Instagram Graph API publisher.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::PublisherConfig;

use super::{ContainerId, ContainerStatus, MediaPublisher, PostId, PublishError};

/// Publisher backed by the Instagram Graph API content publishing endpoints.
pub struct GraphApiPublisher {
    client: Client,
    config: PublisherConfig,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    message: String,
}

impl GraphApiPublisher {
    /// Create a new publisher with the given configuration.
    pub fn new(config: PublisherConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// `{endpoint_base}{path}`, tolerating a missing trailing slash on the base.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint_base.trim_end_matches('/'), path)
    }

    fn media_url(&self) -> String {
        self.url(&format!("{}/media", self.config.account_id))
    }

    fn media_publish_url(&self) -> String {
        self.url(&format!("{}/media_publish", self.config.account_id))
    }

    fn container_url(&self, container: &ContainerId) -> String {
        self.url(container.as_str())
    }

    /// Turn a non-success response into [`PublishError::Api`].
    async fn check_status(response: Response) -> Result<Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GraphErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());

        Err(PublishError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MediaPublisher for GraphApiPublisher {
    fn name(&self) -> &str {
        "instagram-graph"
    }

    async fn create_container(
        &self,
        caption: &str,
        image_url: &str,
    ) -> Result<ContainerId, PublishError> {
        let mut params = vec![
            ("caption", caption),
            ("access_token", self.config.access_token.as_str()),
            ("image_url", image_url),
        ];
        // IMAGE is the API default; other types (e.g. STORIES) must be explicit.
        if !self.config.media_type.eq_ignore_ascii_case("IMAGE") {
            params.push(("media_type", self.config.media_type.as_str()));
        }

        debug!(image_url, "Creating media container");
        let response = self
            .client
            .post(self.media_url())
            .query(&params)
            .send()
            .await?;

        let body: IdResponse = Self::check_status(response).await?.json().await?;
        Ok(ContainerId::new(body.id))
    }

    async fn container_status(
        &self,
        container: &ContainerId,
    ) -> Result<ContainerStatus, PublishError> {
        let response = self
            .client
            .get(self.container_url(container))
            .query(&[
                ("fields", "status_code"),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;

        let body: StatusResponse = Self::check_status(response).await?.json().await?;
        Ok(ContainerStatus::from_status_code(body.status_code.as_deref()))
    }

    async fn publish(&self, container: &ContainerId) -> Result<PostId, PublishError> {
        debug!(container = %container, "Publishing media container");
        let response = self
            .client
            .post(self.media_publish_url())
            .query(&[
                ("creation_id", container.as_str()),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .await?;

        let body: IdResponse = Self::check_status(response).await?.json().await?;
        Ok(PostId::new(body.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Recorded = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

    /// Fake Graph API: records every request's path and query parameters.
    async fn spawn_fake_graph(status_code: &'static str, fail_publish: bool) -> (String, Recorded) {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));

        async fn media(
            State(rec): State<Recorded>,
            Path(account): Path<String>,
            Query(q): Query<HashMap<String, String>>,
        ) -> Json<Value> {
            rec.lock().unwrap().push((format!("{}/media", account), q));
            Json(json!({ "id": "container-1" }))
        }

        let app = Router::new()
            .route("/v19.0/{account}/media", post(media))
            .route(
                "/v19.0/{account}/media_publish",
                post(
                    move |State(rec): State<Recorded>,
                          Path(account): Path<String>,
                          Query(q): Query<HashMap<String, String>>| async move {
                        rec.lock()
                            .unwrap()
                            .push((format!("{}/media_publish", account), q));
                        if fail_publish {
                            (
                                StatusCode::BAD_REQUEST,
                                Json(json!({"error": {"message": "Media ID is not available", "code": 9007}})),
                            )
                        } else {
                            (StatusCode::OK, Json(json!({ "id": "post-42" })))
                        }
                    },
                ),
            )
            .route(
                "/v19.0/{container}",
                get(
                    move |State(rec): State<Recorded>,
                          Path(container): Path<String>,
                          Query(q): Query<HashMap<String, String>>| async move {
                        rec.lock().unwrap().push((container.clone(), q));
                        Json(json!({ "status_code": status_code, "id": container }))
                    },
                ),
            )
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/v19.0/", addr), recorded)
    }

    fn publisher(endpoint_base: String) -> GraphApiPublisher {
        GraphApiPublisher::new(PublisherConfig {
            endpoint_base,
            account_id: "1784".to_string(),
            access_token: "secret-token".to_string(),
            media_type: "IMAGE".to_string(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_urls() {
        let p = publisher("https://graph.facebook.com/v19.0/".to_string());
        assert_eq!(p.media_url(), "https://graph.facebook.com/v19.0/1784/media");
        assert_eq!(
            p.media_publish_url(),
            "https://graph.facebook.com/v19.0/1784/media_publish"
        );
        assert_eq!(
            p.container_url(&ContainerId::new("c1")),
            "https://graph.facebook.com/v19.0/c1"
        );
    }

    #[tokio::test]
    async fn test_full_publish_protocol() {
        let (base, recorded) = spawn_fake_graph("FINISHED", false).await;
        let p = publisher(base);

        let container = p
            .create_container("Beep #AIArt", "https://abc.ngrok.app/dalle_a_b_vivid_1.png")
            .await
            .unwrap();
        assert_eq!(container.as_str(), "container-1");

        let status = p.container_status(&container).await.unwrap();
        assert_eq!(status, ContainerStatus::Finished);

        let post = p.publish(&container).await.unwrap();
        assert_eq!(post.as_str(), "post-42");

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 3);

        let (path, q) = &recorded[0];
        assert_eq!(path, "1784/media");
        assert_eq!(q["caption"], "Beep #AIArt");
        assert_eq!(q["image_url"], "https://abc.ngrok.app/dalle_a_b_vivid_1.png");
        assert_eq!(q["access_token"], "secret-token");
        assert!(!q.contains_key("media_type"));

        let (path, q) = &recorded[1];
        assert_eq!(path, "container-1");
        assert_eq!(q["fields"], "status_code");

        let (path, q) = &recorded[2];
        assert_eq!(path, "1784/media_publish");
        assert_eq!(q["creation_id"], "container-1");
    }

    #[tokio::test]
    async fn test_in_progress_status() {
        let (base, _) = spawn_fake_graph("IN_PROGRESS", false).await;
        let p = publisher(base);

        let status = p
            .container_status(&ContainerId::new("container-9"))
            .await
            .unwrap();
        assert_eq!(status, ContainerStatus::InProgress("IN_PROGRESS".to_string()));
    }

    #[tokio::test]
    async fn test_publish_error_status_is_api_error() {
        let (base, _) = spawn_fake_graph("FINISHED", true).await;
        let p = publisher(base);

        let err = p.publish(&ContainerId::new("container-1")).await.unwrap_err();
        match err {
            PublishError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Media ID is not available");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_api_error_without_token() {
        let (base, _) = spawn_fake_graph("FINISHED", false).await;
        let mut p = publisher(base);
        p.config.account_id = "missing/deeper".to_string();

        let err = p.create_container("c", "u").await.unwrap_err();
        assert!(err.is_api_error());
        assert!(!err.to_string().contains("secret-token"));
    }
}
