use std::time::Duration;

use jobwatch_core::{JobStatus, ViewState};
use jobwatch_engine::{
    CancellationToken, FailureKind, GatewaySettings, JobsGateway, ReqwestGateway,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(server: &MockServer) -> ReqwestGateway {
    ReqwestGateway::new(
        &format!("{}/dash", server.uri()),
        "csrf-123",
        GatewaySettings::default(),
    )
    .expect("gateway")
}

#[tokio::test]
async fn fetch_posts_filters_with_csrf_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .and(header("X-CSRFToken", "csrf-123"))
        .and(body_partial_json(json!({
            "perPage": 250,
            "currPage": 1,
            "sortBy": "job_type",
            "sortDesc": false,
            "jobType": [],
            "activeDateRange": {"startDate": null, "endDate": null},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [
                {"id": 1, "job_type": "assignment", "pid": null, "start": null, "end": null, "message": ""},
                {"id": 2, "job_type": "assignment", "pid": 31, "start": "2024-01-01T00:00:00+00:00", "end": null, "message": ""},
            ],
            "total_jobs": 17,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = ViewState::default().filter_payload();
    let page = gateway(&server)
        .fetch(&payload, &CancellationToken::new())
        .await
        .expect("fetch ok");

    assert_eq!(page.total, Some(17));
    let statuses: Vec<_> = page.jobs.iter().map(|job| job.status()).collect();
    assert_eq!(statuses, vec![JobStatus::Pending, JobStatus::Running]);
}

#[tokio::test]
async fn missing_total_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs": []})))
        .mount(&server)
        .await;

    let page = gateway(&server)
        .fetch(&ViewState::default().filter_payload(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(page.jobs.is_empty());
    assert_eq!(page.total, None);
}

#[tokio::test]
async fn http_error_maps_to_status_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .fetch(&ViewState::default().filter_payload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .fetch(&ViewState::default().filter_payload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn cancelling_abandons_a_slow_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({"jobs": []})),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = gateway(&server)
        .fetch(&ViewState::default().filter_payload(), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/filterjobs/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"jobs": []})),
        )
        .mount(&server)
        .await;

    let settings = GatewaySettings {
        request_timeout: Duration::from_millis(50),
        ..GatewaySettings::default()
    };
    let gateway = ReqwestGateway::new(&server.uri(), "csrf-123", settings).unwrap();
    let err = gateway
        .fetch(&ViewState::default().filter_payload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn restart_posts_job_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/resetjobs/"))
        .and(header("X-CSRFToken", "csrf-123"))
        .and(body_json(json!({"job_ids": [4, 8]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reset": true})))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server).restart_jobs(&[4, 8]).await.expect("restart ok");
}

#[tokio::test]
async fn chart_data_is_a_status_count_map() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dash/api/jobschartdata/"))
        .and(body_partial_json(json!({"jobType": ["assignment"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"failed": 2, "completed": 40})),
        )
        .mount(&server)
        .await;

    let mut view = ViewState::default();
    view.job_type = vec!["assignment".to_string()];
    let counts = gateway(&server)
        .fetch_chart_data(&view.chart_payload())
        .await
        .unwrap();
    assert_eq!(counts.get("failed"), Some(&2));
    assert_eq!(counts.get("completed"), Some(&40));
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = ReqwestGateway::new("not a url", "token", GatewaySettings::default()).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[test]
fn control_characters_in_token_are_rejected() {
    let err = ReqwestGateway::new("http://localhost/", "bad\ntoken", GatewaySettings::default())
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidToken);
}
