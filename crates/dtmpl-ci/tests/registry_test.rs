use dtmpl_ci::payload::{BuildRequest, DEFAULT_PAYLOAD_TEMPLATE, render_payload};
use dtmpl_ci::registry::{
    ApiError, ApiResponse, BuildTrigger, RegistryApi, RegistrySettings, TriggerError,
};
use mockall::mock;
use secrecy::{ExposeSecret, SecretString};

mock! {
    Api {}

    impl RegistryApi for Api {
        async fn post_json(
            &self,
            url: &str,
            token: &SecretString,
            body: String,
        ) -> Result<ApiResponse, ApiError>;
    }
}

fn settings(token: Option<&str>) -> RegistrySettings {
    RegistrySettings {
        host: "quay.io".to_owned(),
        access_token: token.map(|t| SecretString::from(t.to_owned())),
    }
}

fn request() -> BuildRequest {
    BuildRequest {
        repository: "acme/ruby".to_owned(),
        dockerfile_url: "https://example.com/2.1/Dockerfile".to_owned(),
        tag: "2.1".to_owned(),
        pull_robot: "acme+builder".to_owned(),
    }
}

const ACCEPTED: &str = r#"{"id": "b-123", "phase": "waiting", "repository": {"namespace": "acme", "name": "ruby"}}"#;

// ── Payload ──

#[test]
fn default_payload_is_valid_json() {
    let body = render_payload(DEFAULT_PAYLOAD_TEMPLATE, &request()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(value["archive_url"], "https://example.com/2.1/Dockerfile");
    assert_eq!(value["docker_tags"], serde_json::json!(["2.1"]));
    assert_eq!(value["pull_robot"], "acme+builder");
}

#[test]
fn payload_escapes_quotes() {
    let mut req = request();
    req.tag = r#"we"ird"#.to_owned();

    let body = render_payload(DEFAULT_PAYLOAD_TEMPLATE, &req).unwrap();
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(value["docker_tags"][0], r#"we"ird"#);
}

#[test]
fn custom_payload_template() {
    let body = render_payload(r#"{"tag": "{{ tag }}-custom"}"#, &request()).unwrap();
    assert_eq!(body, r#"{"tag": "2.1-custom"}"#);
}

#[test]
fn broken_payload_template_fails() {
    assert!(render_payload("{{ tag", &request()).is_err());
}

// ── Trigger ──

#[test]
fn build_url_uses_host_and_repository() {
    let trigger = BuildTrigger::with_api(MockApi::new(), settings(Some("t")));
    assert_eq!(
        trigger.build_url("/acme/ruby/"),
        "https://quay.io/api/v1/repository/acme/ruby/build/"
    );
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let mut mock = MockApi::new();
    mock.expect_post_json().never();

    let trigger = BuildTrigger::with_api(mock, settings(None));
    let err = trigger.trigger(&request()).await.unwrap_err();

    assert!(matches!(
        err,
        TriggerError::MissingAccessToken { var } if var == "QUAYIO_ACCESSTOKEN"
    ));
}

#[tokio::test]
async fn accepted_build_returns_status_url() {
    let mut mock = MockApi::new();
    mock.expect_post_json()
        .withf(|url, token, body| {
            url == "https://quay.io/api/v1/repository/acme/ruby/build/"
                && token.expose_secret() == "secret-token"
                && body.contains("acme+builder")
        })
        .times(1)
        .returning(|_, _, _| {
            Ok(ApiResponse {
                status: 201,
                body: ACCEPTED.to_owned(),
            })
        });

    let trigger = BuildTrigger::with_api(mock, settings(Some("secret-token")));
    let result = trigger.trigger(&request()).await.unwrap();

    assert_eq!(result.id, "b-123");
    assert_eq!(
        result.status_url("quay.io"),
        "https://quay.io/repository/acme/ruby/build/b-123"
    );
    let pretty = result.pretty_body().unwrap();
    assert!(pretty.contains("\"phase\": \"waiting\""));
}

#[tokio::test]
async fn rejected_build_carries_response_body() {
    let mut mock = MockApi::new();
    mock.expect_post_json().returning(|_, _, _| {
        Ok(ApiResponse {
            status: 403,
            body: r#"{"error": "unauthorized"}"#.to_owned(),
        })
    });

    let trigger = BuildTrigger::with_api(mock, settings(Some("t")));
    let err = trigger.trigger(&request()).await.unwrap_err();

    match err {
        TriggerError::Rejected { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("unauthorized"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn response_without_build_fields_is_invalid() {
    let mut mock = MockApi::new();
    mock.expect_post_json().returning(|_, _, _| {
        Ok(ApiResponse {
            status: 200,
            body: r#"{"ok": true}"#.to_owned(),
        })
    });

    let trigger = BuildTrigger::with_api(mock, settings(Some("t")));
    let err = trigger.trigger(&request()).await.unwrap_err();

    assert!(matches!(err, TriggerError::InvalidResponse { .. }));
}

#[tokio::test]
async fn custom_template_is_sent() {
    let mut mock = MockApi::new();
    mock.expect_post_json()
        .withf(|_, _, body| body == r#"{"docker_tags": ["2.1"]}"#)
        .times(1)
        .returning(|_, _, _| {
            Ok(ApiResponse {
                status: 201,
                body: ACCEPTED.to_owned(),
            })
        });

    let trigger = BuildTrigger::with_api(mock, settings(Some("t")))
        .with_payload_template(r#"{"docker_tags": ["{{ tag }}"]}"#);
    trigger.trigger(&request()).await.unwrap();
}

#[test]
fn settings_debug_redacts_token() {
    let printed = format!("{:?}", settings(Some("super-secret")));
    assert!(!printed.contains("super-secret"));
    assert!(printed.contains("REDACTED"));
}
