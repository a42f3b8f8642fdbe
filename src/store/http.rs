use crate::error::{DirectoryError, SubmissionError};
use crate::events::{Category, Node, TelemetryReading};
use crate::store::{IngestionSink, NodeDirectory};
use log::debug;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Client for the ingestion API
///
/// Readings are POSTed as JSON to `{endpoint}/api/telemetry`; the fleet is
/// listed from `{endpoint}/api/nodes`. Any 2xx response counts as accepted.
pub struct HttpIngestClient {
    client: Client,
    endpoint: String,
}

impl HttpIngestClient {
    /// Create a client for `endpoint`
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the ingestion API, e.g. "http://localhost:8000"
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn telemetry_url(&self) -> String {
        format!("{}/api/telemetry", self.endpoint.trim_end_matches('/'))
    }

    fn nodes_url(&self, category: Option<Category>) -> String {
        let base = format!("{}/api/nodes", self.endpoint.trim_end_matches('/'));
        match category {
            Some(category) => format!("{}?node_type={}", base, category),
            None => base,
        }
    }
}

impl IngestionSink for HttpIngestClient {
    fn submit<'a>(
        &'a self,
        reading: &'a TelemetryReading,
    ) -> Pin<Box<dyn Future<Output = Result<(), SubmissionError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.telemetry_url())
                .json(reading)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SubmissionError::Rejected(format!("{}: {}", status, body)));
            }

            debug!("Node {} reading accepted ({})", reading.node_id, status);
            Ok(())
        })
    }
}

impl NodeDirectory for HttpIngestClient {
    fn list_nodes<'a>(
        &'a self,
        category: Option<Category>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Node>, DirectoryError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self.client.get(self.nodes_url(category)).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(DirectoryError::Rejected(format!("{}: {}", status, body)));
            }

            Ok(response.json::<Vec<Node>>().await?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Field;
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn reading() -> TelemetryReading {
        TelemetryReading::new(4, Category::Industrial, Utc::now())
            .with(Field::FlowRate, 100.0)
            .with(Field::PhLevel, 11.0)
    }

    #[test]
    fn test_url_building() {
        let client = HttpIngestClient::new("http://localhost:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.telemetry_url(), "http://localhost:8000/api/telemetry");
        assert_eq!(client.nodes_url(None), "http://localhost:8000/api/nodes");
        assert_eq!(
            client.nodes_url(Some(Category::Rural)),
            "http://localhost:8000/api/nodes?node_type=rural"
        );
    }

    #[tokio::test]
    async fn test_submit_accepts_created() {
        let (endpoint, server) = serve_once("201 Created", "{}").await;
        let client = HttpIngestClient::new(endpoint, Duration::from_secs(5)).unwrap();

        client.submit(&reading()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/telemetry"));
        assert!(request.contains("\"node_id\":4"));
        assert!(request.contains("\"ph_level\":11.0"));
        assert!(!request.contains("turbidity"));
    }

    #[tokio::test]
    async fn test_submit_reports_rejection() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "{\"detail\":\"db down\"}").await;
        let client = HttpIngestClient::new(endpoint, Duration::from_secs(5)).unwrap();

        match client.submit(&reading()).await {
            Err(SubmissionError::Rejected(msg)) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("db down"));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_list_nodes_parses_api_shape() {
        let body = r#"[
            {"id": 1, "name": "Connaught Place", "latitude": 28.63, "longitude": 77.21,
             "node_type": "urban", "status": "normal", "district": "New Delhi"},
            {"id": 4, "name": "Okhla Textile Unit", "latitude": 28.53, "longitude": 77.27,
             "node_type": "industrial", "status": "critical", "facility_type": "textile"}
        ]"#;
        let (endpoint, server) = serve_once("200 OK", body).await;
        let client = HttpIngestClient::new(endpoint, Duration::from_secs(5)).unwrap();

        let nodes = client.list_nodes(Some(Category::Urban)).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].category, Category::Industrial);
        assert_eq!(nodes[1].facility_type.as_deref(), Some("textile"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/nodes?node_type=urban"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpIngestClient::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.submit(&reading()).await,
            Err(SubmissionError::Http(_))
        ));
        assert!(matches!(
            client.list_nodes(None).await,
            Err(DirectoryError::Http(_))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires running ingestion API"]
    async fn test_ingestion_api_integration() {
        let client = HttpIngestClient::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        match client.list_nodes(None).await {
            Ok(nodes) => println!("Directory returned {} nodes", nodes.len()),
            Err(e) => println!("Expected error (no API server): {:?}", e),
        }
    }
}
