//! List objects integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::primitives::ByteStream;

    use crate::{BUCKET, TestServer};

    async fn populate_bucket(client: &aws_sdk_s3::Client) {
        let keys = [
            "photos/2024/img1.jpg",
            "photos/2024/img2.jpg",
            "documents/report.pdf",
            "root.txt",
        ];
        for key in keys {
            client
                .put_object()
                .bucket(BUCKET)
                .key(key)
                .body(ByteStream::from_static(b"x"))
                .send()
                .await
                .unwrap_or_else(|e| panic!("put {key}: {e}"));
        }
    }

    #[tokio::test]
    async fn test_should_list_objects_v2() {
        let server = TestServer::start().await;
        let client = server.s3_client();
        populate_bucket(&client).await;

        let resp = client
            .list_objects_v2()
            .bucket(BUCKET)
            .send()
            .await
            .expect("list_objects_v2");

        let keys: Vec<&str> = resp.contents().iter().filter_map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec![
                "documents/",
                "documents/report.pdf",
                "photos/",
                "photos/2024/",
                "photos/2024/img1.jpg",
                "photos/2024/img2.jpg",
                "root.txt",
            ]
        );
        assert_eq!(resp.key_count(), Some(7));
        assert_eq!(resp.max_keys(), Some(1000));
        assert_eq!(resp.is_truncated(), Some(false));
        assert_eq!(resp.name(), Some(BUCKET));
    }

    #[tokio::test]
    async fn test_should_list_with_prefix() {
        let server = TestServer::start().await;
        let client = server.s3_client();
        populate_bucket(&client).await;

        let resp = client
            .list_objects_v2()
            .bucket(BUCKET)
            .prefix("photos/2024/")
            .send()
            .await
            .expect("list with prefix");

        let keys: Vec<&str> = resp.contents().iter().filter_map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec!["photos/2024/", "photos/2024/img1.jpg", "photos/2024/img2.jpg"]
        );
        assert_eq!(resp.prefix(), Some("photos/2024/"));
    }

    #[tokio::test]
    async fn test_should_report_sizes_and_etags() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        client
            .put_object()
            .bucket(BUCKET)
            .key("sized.txt")
            .body(ByteStream::from_static(b"twelve bytes"))
            .send()
            .await
            .expect("put_object");

        let resp = client
            .list_objects_v2()
            .bucket(BUCKET)
            .send()
            .await
            .expect("list_objects_v2");

        let object = resp
            .contents()
            .iter()
            .find(|o| o.key() == Some("sized.txt"))
            .expect("listed object");
        assert_eq!(object.size(), Some(12));
        assert!(object.e_tag().is_some());
        assert!(object.last_modified().is_some());
    }

    #[tokio::test]
    async fn test_should_list_empty_bucket() {
        let server = TestServer::start().await;
        let client = server.s3_client();

        let resp = client
            .list_objects_v2()
            .bucket(BUCKET)
            .send()
            .await
            .expect("list_objects_v2");

        assert!(resp.contents().is_empty());
        assert_eq!(resp.key_count(), Some(0));
    }
}
