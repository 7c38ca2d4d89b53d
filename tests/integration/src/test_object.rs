//! Object CRUD integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;
    use selfhost_s3_http::service::S3HttpConfig;

    use crate::{BUCKET, TestServer};

    #[tokio::test]
    async fn test_should_put_and_get_object() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let body = b"hello, selfhost!";
        let put = client
            .put_object()
            .bucket(BUCKET)
            .key("docs/greeting.txt")
            .body(ByteStream::from_static(body))
            .content_type("text/plain")
            .send()
            .await
            .expect("put_object");
        let put_etag = put.e_tag().map(ToOwned::to_owned);
        assert!(put_etag.is_some(), "put should return an etag");

        let resp = client
            .get_object()
            .bucket(BUCKET)
            .key("docs/greeting.txt")
            .send()
            .await
            .expect("get_object");

        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.content_length(), Some(16));
        assert_eq!(resp.e_tag().map(ToOwned::to_owned), put_etag);
        assert!(resp.last_modified().is_some());

        let data = resp
            .body
            .collect()
            .await
            .expect("collect body")
            .into_bytes();
        assert_eq!(data.as_ref(), body);
    }

    #[tokio::test]
    async fn test_should_round_trip_one_mebibyte() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let body: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
        client
            .put_object()
            .bucket(BUCKET)
            .key("blobs/large.bin")
            .body(ByteStream::from(body.clone()))
            .send()
            .await
            .expect("put_object");

        let resp = client
            .get_object()
            .bucket(BUCKET)
            .key("blobs/large.bin")
            .send()
            .await
            .expect("get_object");
        let data = resp
            .body
            .collect()
            .await
            .expect("collect body")
            .into_bytes();
        assert_eq!(data.len(), body.len());
        assert_eq!(data.as_ref(), body.as_slice());
    }

    #[tokio::test]
    async fn test_should_head_object() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        client
            .put_object()
            .bucket(BUCKET)
            .key("data.json")
            .body(ByteStream::from_static(b"{\"a\":1}"))
            .send()
            .await
            .expect("put_object");

        let resp = client
            .head_object()
            .bucket(BUCKET)
            .key("data.json")
            .send()
            .await
            .expect("head_object");

        assert_eq!(resp.content_type(), Some("application/json"));
        assert!(resp.e_tag().is_some(), "etag should be present");
        assert!(resp.last_modified().is_some());
    }

    #[tokio::test]
    async fn test_should_return_no_such_key_on_get() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let err = client
            .get_object()
            .bucket(BUCKET)
            .key("missing.txt")
            .send()
            .await
            .expect_err("get of missing key should fail");

        assert!(err.into_service_error().is_no_such_key());
    }

    #[tokio::test]
    async fn test_should_return_not_found_on_head() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let err = client
            .head_object()
            .bucket(BUCKET)
            .key("missing.txt")
            .send()
            .await
            .expect_err("head of missing key should fail");

        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(404));
    }

    #[tokio::test]
    async fn test_should_reject_other_bucket() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let err = client
            .put_object()
            .bucket("other-bucket")
            .key("file.txt")
            .body(ByteStream::from_static(b"data"))
            .send()
            .await
            .expect_err("put to another bucket should fail");

        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(404));
    }

    #[tokio::test]
    async fn test_should_delete_object_and_prune_directories() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        client
            .put_object()
            .bucket(BUCKET)
            .key("tmp/nested/file.txt")
            .body(ByteStream::from_static(b"bye"))
            .send()
            .await
            .expect("put_object");

        for _ in 0..2 {
            client
                .delete_object()
                .bucket(BUCKET)
                .key("tmp/nested/file.txt")
                .send()
                .await
                .expect("delete_object should be idempotent");
        }

        let err = client
            .head_object()
            .bucket(BUCKET)
            .key("tmp/nested/file.txt")
            .send()
            .await
            .expect_err("deleted object should be gone");
        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(404));
        assert!(!server.bucket_dir().join("tmp").exists());
    }

    #[tokio::test]
    async fn test_should_overwrite_object() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        for body in [&b"first version"[..], &b"second"[..]] {
            client
                .put_object()
                .bucket(BUCKET)
                .key("notes.txt")
                .body(ByteStream::from(body.to_vec()))
                .send()
                .await
                .expect("put_object");
        }

        let data = client
            .get_object()
            .bucket(BUCKET)
            .key("notes.txt")
            .send()
            .await
            .expect("get_object")
            .body
            .collect()
            .await
            .expect("collect body")
            .into_bytes();
        assert_eq!(data.as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_should_create_folder_marker() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        client
            .put_object()
            .bucket(BUCKET)
            .key("albums/2024/")
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .expect("put folder marker");

        assert!(server.bucket_dir().join("albums").join("2024").is_dir());

        let resp = client
            .list_objects_v2()
            .bucket(BUCKET)
            .prefix("albums/")
            .send()
            .await
            .expect("list_objects_v2");
        let keys: Vec<&str> = resp.contents().iter().filter_map(|o| o.key()).collect();
        assert_eq!(keys, vec!["albums/", "albums/2024/"]);
    }

    #[tokio::test]
    async fn test_should_reject_oversized_upload() {
        let server =
            TestServer::start_with(S3HttpConfig::builder().max_file_size(1024).build()).await;
        let client = server.s3_client();

        let err = client
            .put_object()
            .bucket(BUCKET)
            .key("too-big.bin")
            .body(ByteStream::from(vec![0u8; 2048]))
            .send()
            .await
            .expect_err("oversized upload should fail");

        assert_eq!(err.raw_response().map(|r| r.status().as_u16()), Some(413));
        assert!(!server.bucket_dir().join("too-big.bin").exists());
    }
}
