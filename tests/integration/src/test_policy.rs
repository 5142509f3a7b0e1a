//! Policies signed outside the uploader.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use s3post_http::{FormFile, PutOptions, UploadError, Uploader};
    use s3post_policy::{UploadPolicy, UploadRequestOptions, generate};

    use crate::mock::MockS3;
    use crate::{ACCESS_KEY, BUCKET, SECRET_KEY, init_tracing, test_config};

    fn server_signed(key: &str) -> UploadPolicy {
        let options = UploadRequestOptions::new()
            .key(key)
            .bucket(BUCKET)
            .content_type("text/plain")
            .region("us-east-1")
            .date(Utc::now())
            .access_key(ACCESS_KEY)
            .secret_key(SECRET_KEY)
            .acl("private");
        generate(&options).expect("server-side policy")
    }

    fn uploader_without_secret(endpoint: &str) -> Uploader {
        init_tracing();
        let mut config = test_config(endpoint);
        config.access_key = None;
        config.secret_key = None;
        Uploader::new(config)
    }

    #[tokio::test]
    async fn test_should_upload_with_server_signed_policy() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = uploader_without_secret(&mock.endpoint());
        let file = FormFile::new("notes.txt", "text/plain", "hello");

        let response = uploader
            .put_with_policy(server_signed("shared/notes.txt"), file, PutOptions::default())
            .await
            .expect("upload");

        assert_eq!(response.status, 201);
        assert_eq!(
            response.body.and_then(|b| b.key).as_deref(),
            Some("shared/notes.txt")
        );
        assert_eq!(mock.objects()[0].data.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_should_reject_tampered_field() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = uploader_without_secret(&mock.endpoint());
        let mut fields = server_signed("shared/notes.txt").into_fields();
        fields[0].1 = "shared/other.txt".to_owned();

        let response = uploader
            .put_with_policy(
                UploadPolicy::from_fields(fields),
                FormFile::new("notes.txt", "text/plain", "hello"),
                PutOptions::default(),
            )
            .await
            .expect("answered request");

        assert_eq!(response.status, 403);
        assert!(
            response
                .text
                .as_deref()
                .is_some_and(|t| t.contains("Policy Condition failed"))
        );
        assert!(mock.objects().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_extra_field() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = uploader_without_secret(&mock.endpoint());
        let mut fields = server_signed("shared/notes.txt").into_fields();
        fields.push(("x-amz-meta-owner".to_owned(), "mallory".to_owned()));

        let response = uploader
            .put_with_policy(
                UploadPolicy::from_fields(fields),
                FormFile::new("notes.txt", "text/plain", "hello"),
                PutOptions::default(),
            )
            .await
            .expect("answered request");

        assert_eq!(response.status, 403);
        assert!(
            response
                .text
                .as_deref()
                .is_some_and(|t| t.contains("Extra input fields: x-amz-meta-owner"))
        );
    }

    #[tokio::test]
    async fn test_should_require_policy_fields() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = uploader_without_secret(&mock.endpoint());
        let policy = UploadPolicy::from_fields([("key", "shared/notes.txt")]);

        let err = uploader
            .put_with_policy(
                policy,
                FormFile::new("notes.txt", "text/plain", "hello"),
                PutOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingPolicy));
    }
}
