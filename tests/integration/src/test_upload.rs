//! Upload flow tests against the mock endpoint.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};
    use parking_lot::Mutex;
    use s3post_http::{
        AbortHandle, FixedClock, FormFile, HttpTransport, PutOptions, TransportError, UploadError,
        Uploader,
    };
    use s3post_xml::PostResponse;

    use crate::mock::MockS3;
    use crate::{ACCESS_KEY, BUCKET, SECRET_KEY, init_tracing, test_config, test_uploader};

    fn image() -> FormFile {
        FormFile::new("image.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10])
    }

    #[tokio::test]
    async fn test_should_upload_and_parse_post_response() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = test_uploader(&mock.endpoint());

        let response = uploader.put(image()).await.expect("upload");

        assert_eq!(response.status, 201);
        let body = response.body.expect("PostResponse body");
        assert_eq!(body.key.as_deref(), Some("uploads/image.jpg"));
        assert_eq!(body.bucket.as_deref(), Some(BUCKET));
        assert_eq!(body.etag.as_deref().map(str::len), Some(32));
        assert!(
            body.location
                .as_deref()
                .is_some_and(|l| l.ends_with("/my-s3-bucket/uploads%2Fimage.jpg"))
        );

        let objects = mock.objects();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "uploads/image.jpg");
        assert_eq!(objects[0].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(objects[0].data.as_ref(), &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]);
    }

    #[tokio::test]
    async fn test_should_upload_with_metadata_and_session_token() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let mut config = test_config(&mock.endpoint());
        config.session_token = Some("FQoDYXdzEJr".to_owned());
        let uploader = Uploader::new(config);

        let response = uploader
            .put_with(
                image(),
                PutOptions::default()
                    .metadata_entry("owner", "alice")
                    .metadata_entry("album", "2017"),
            )
            .await
            .expect("upload");
        assert_eq!(response.status, 201);

        let object = &mock.objects()[0];
        assert_eq!(object.security_token.as_deref(), Some("FQoDYXdzEJr"));
        assert_eq!(object.metadata.get("owner").map(String::as_str), Some("alice"));
        assert_eq!(object.metadata.get("album").map(String::as_str), Some("2017"));
    }

    #[tokio::test]
    async fn test_should_resolve_with_empty_body_for_empty_response() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let mut config = test_config(&mock.endpoint());
        config.success_action_status = Some("204".to_owned());
        let uploader = Uploader::new(config);

        let response = uploader.put(image()).await.expect("upload");
        assert_eq!(response.status, 204);
        assert_eq!(response.text.as_deref(), Some(""));
        assert_eq!(response.body, Some(PostResponse::default()));
        assert_eq!(mock.objects().len(), 1);
    }

    #[tokio::test]
    async fn test_should_return_rejection_as_response() {
        let mock = MockS3::start(ACCESS_KEY, "another-secret").await;
        let uploader = test_uploader(&mock.endpoint());

        let response = uploader.put(image()).await.expect("answered request");
        assert_eq!(response.status, 403);
        assert!(
            response
                .text
                .as_deref()
                .is_some_and(|t| t.contains("<Code>SignatureDoesNotMatch</Code>"))
        );
        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.status, 403);
        assert!(mock.objects().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_expired_policy() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = test_uploader(&mock.endpoint())
            .with_clock(FixedClock(Utc::now() - TimeDelta::minutes(10)));

        let response = uploader.put(image()).await.expect("answered request");
        assert_eq!(response.status, 403);
        assert!(
            response
                .text
                .as_deref()
                .is_some_and(|t| t.contains("Policy expired"))
        );
    }

    #[tokio::test]
    async fn test_should_compensate_clock_skew_with_time_delta() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let slow_clock = FixedClock(Utc::now() - TimeDelta::minutes(6));

        let uploader = test_uploader(&mock.endpoint()).with_clock(slow_clock);
        assert_eq!(uploader.put(image()).await.unwrap().status, 403);

        let mut config = test_config(&mock.endpoint());
        config.time_delta_ms = -3 * 60 * 1000;
        let uploader = Uploader::new(config).with_clock(slow_clock);
        assert_eq!(uploader.put(image()).await.unwrap().status, 201);
    }

    #[tokio::test]
    async fn test_should_report_progress_over_the_wire() {
        init_tracing();
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = Uploader::with_transport(
            test_config(&mock.endpoint()),
            HttpTransport::new().chunk_size(256),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let file = FormFile::new("big.bin", "application/octet-stream", vec![42u8; 4096]);

        let response = uploader
            .put_with(file, PutOptions::default().on_progress(move |p| sink.lock().push(p)))
            .await
            .expect("upload");
        assert_eq!(response.status, 201);

        let seen = seen.lock();
        assert!(seen.len() > 1);
        assert!(seen.windows(2).all(|w| w[0].loaded < w[1].loaded));
        let last = seen.last().unwrap();
        assert_eq!(last.loaded, last.total);
        assert!((last.percent - 1.0).abs() < f64::EPSILON);
        assert_eq!(mock.objects()[0].data.len(), 4096);
    }

    #[tokio::test]
    async fn test_should_fail_with_status_zero_when_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let endpoint = format!("http://{}", listener.local_addr().expect("address"));
        drop(listener);

        let uploader = test_uploader(&endpoint);
        let err = uploader.put(image()).await.unwrap_err();
        assert_eq!(err.status(), 0);
        assert!(matches!(err, UploadError::Transport(TransportError::Network { .. })));
    }

    #[tokio::test]
    async fn test_should_abort_upload() {
        let mock = MockS3::start(ACCESS_KEY, SECRET_KEY).await;
        let uploader = test_uploader(&mock.endpoint());
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let err = uploader
            .put_with(image(), PutOptions::default().abort_registration(registration))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(TransportError::Aborted)));
        assert_eq!(err.status(), 0);
        assert!(mock.objects().is_empty());
    }
}
