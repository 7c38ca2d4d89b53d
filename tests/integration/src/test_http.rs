//! Health check, CORS and common-header integration tests.

#[cfg(test)]
mod tests {
    use selfhost_s3_http::service::S3HttpConfig;

    use crate::TestServer;

    #[tokio::test]
    async fn test_should_report_health() {
        let server = TestServer::start().await;

        let resp = reqwest::get(format!("{}/health", server.endpoint_url()))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_should_answer_cors_preflight() {
        let server = TestServer::start().await;

        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, server.object_url("any/key.txt"))
            .header("Origin", "https://app.example")
            .header("Access-Control-Request-Method", "PUT")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        };
        assert_eq!(header("access-control-allow-origin").as_deref(), Some("*"));
        assert_eq!(
            header("access-control-allow-methods").as_deref(),
            Some("GET, HEAD, PUT, DELETE, OPTIONS")
        );
        assert_eq!(header("access-control-allow-headers").as_deref(), Some("*"));
        assert_eq!(header("access-control-expose-headers").as_deref(), Some("*"));
        assert_eq!(header("access-control-max-age").as_deref(), Some("86400"));
    }

    #[tokio::test]
    async fn test_should_restrict_cors_origin() {
        let server = TestServer::start_with(
            S3HttpConfig::builder()
                .cors_origins(vec![
                    "https://a.example".to_owned(),
                    "https://b.example".to_owned(),
                ])
                .build(),
        )
        .await;
        let client = reqwest::Client::new();
        let url = format!("{}/health", server.endpoint_url());

        let resp = client
            .get(&url)
            .header("Origin", "https://b.example")
            .send()
            .await
            .expect("request");
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("https://b.example")
        );

        let resp = client
            .get(&url)
            .header("Origin", "https://evil.example")
            .send()
            .await
            .expect("request");
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("https://a.example")
        );
    }

    #[tokio::test]
    async fn test_should_add_common_headers_to_errors() {
        let server = TestServer::start().await;

        let resp = reqwest::get(server.object_url("private.txt"))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);

        let request_id = resp
            .headers()
            .get("x-amz-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("request id header");
        assert_eq!(request_id.len(), 36, "request id should be a UUID");
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("SelfhostS3")
        );
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );

        let text = resp.text().await.expect("body");
        assert!(text.contains(&format!("<RequestId>{request_id}</RequestId>")));
    }
}
