//! Authentication and public-read integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;

    use crate::{ACCESS_KEY, BUCKET, TestServer};

    #[tokio::test]
    async fn test_should_reject_wrong_secret() {
        let server = TestServer::start().await;
        let client = server.s3_client_with(ACCESS_KEY, "not-the-secret");

        let err = client
            .put_object()
            .bucket(BUCKET)
            .key("file.txt")
            .body(ByteStream::from_static(b"data"))
            .send()
            .await
            .expect_err("wrong secret should fail");

        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(403));
        assert!(!server.bucket_dir().join("file.txt").exists());
    }

    #[tokio::test]
    async fn test_should_reject_unknown_access_key() {
        let server = TestServer::start().await;
        let client = server.s3_client_with("someone-else", "whatever");

        let err = client
            .list_objects_v2()
            .bucket(BUCKET)
            .send()
            .await
            .expect_err("unknown access key should fail");

        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(403));
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_private_read() {
        let server = TestServer::start().await;
        server
            .s3_client()
            .put_object()
            .bucket(BUCKET)
            .key("private/secret.txt")
            .body(ByteStream::from_static(b"classified"))
            .send()
            .await
            .expect("put_object");

        let resp = reqwest::get(server.object_url("private/secret.txt"))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        let text = resp.text().await.expect("body");
        assert!(text.contains("<Code>AccessDenied</Code>"));
    }

    #[tokio::test]
    async fn test_should_serve_public_read_without_signature() {
        let server = TestServer::start().await;
        server
            .s3_client()
            .put_object()
            .bucket(BUCKET)
            .key("public/logo.svg")
            .body(ByteStream::from_static(b"<svg/>"))
            .send()
            .await
            .expect("put_object");

        let resp = reqwest::get(server.object_url("public/logo.svg"))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("cache-control")
                .and_then(|v| v.to_str().ok()),
            Some("public, max-age=31536000")
        );
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("image/svg+xml")
        );
        assert_eq!(resp.bytes().await.expect("body").as_ref(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_should_add_content_disposition_on_download() {
        let server = TestServer::start().await;
        server
            .s3_client()
            .put_object()
            .bucket(BUCKET)
            .key("public/docs/manual.pdf")
            .body(ByteStream::from_static(b"%PDF-1.4"))
            .send()
            .await
            .expect("put_object");

        let resp = reqwest::get(format!(
            "{}?download=1",
            server.object_url("public/docs/manual.pdf")
        ))
        .await
        .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("content-disposition")
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"manual.pdf\"")
        );
    }

    #[tokio::test]
    async fn test_should_require_signature_for_public_writes() {
        let server = TestServer::start().await;

        let resp = reqwest::Client::new()
            .put(server.object_url("public/upload.txt"))
            .body("anonymous")
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
        assert!(!server.bucket_dir().join("public").join("upload.txt").exists());

        let resp = reqwest::Client::new()
            .delete(server.object_url("public/anything.txt"))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_should_return_no_such_key_for_missing_public_object() {
        let server = TestServer::start().await;

        let resp = reqwest::get(server.object_url("public/missing.png"))
            .await
            .expect("request");
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let text = resp.text().await.expect("body");
        assert!(text.contains("<Code>NoSuchKey</Code>"));
    }
}
