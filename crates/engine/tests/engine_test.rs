use moxter_core::config::EngineConfig;
use moxter_core::error::Error;
use moxter_core::model::HttpMethod;
use moxter_engine::{
    CallOptions, CallOutcome, Credentials, Moxter, RawResponse, RequestBody, StubExecutor,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const SCOPE: &str = "api::pets::OwnerApiTest";

const ROOT_FIXTURES: &str = r#"
vars:
  species: dog
  ownerName: Default Owner
fixtures:
  - name: create_owner
    method: POST
    endpoint: /api/owners
    payload:
      name: "{{ownerName}}"
      city: Springfield
    expectedStatus: 201
    save:
      ownerId: $.id
  - name: get_owner
    method: GET
    endpoint: "/api/owners/{{ownerId}}"
    expectedStatus: 200
  - name: ping
    method: GET
    endpoint: /ping
"#;

const PETS_FIXTURES: &str = r#"
vars:
  ownerName: Alice
fixtures:
  - name: ping
    method: GET
    endpoint: /pets/ping
  - name: create_owner
    basedOn: create_owner
    headers:
      X-Trace: pets
  - name: create_pet
    method: POST
    endpoint: "/api/owners/{{ownerId}}/pets"
    payload:
      name: Rex
      type:
        name: "{{species}}"
      birthDate: "2020-01-01"
    expectedStatus: [201, 200]
    save:
      petId: $.id
  - name: create_puppy
    basedOn: create_pet
    payload:
      name: Bolt
  - name: missing_endpoint
    method: GET
    endpoint: /nowhere
  - name: setup
    fixtures: [create_owner, create_pet]
  - name: flaky
    fixtures: [create_owner, missing_endpoint, get_owner]
  - name: broken_group
    fixtures: [create_owner, missing_endpoint, ghost, get_owner]
  - name: full_setup
    fixtures: [setup, get_owner]
  - name: owner_then_ping
    fixtures: [create_owner, ping]
  - name: partial_save
    method: GET
    endpoint: /api/owners/1
    save:
      firstId: $.id
      missing: $.nope
  - name: save_pair
    method: GET
    endpoint: /api/owners/1
    save:
      freshId: $.id
      taken: $.id
  - name: loop_a
    fixtures: [loop_b]
  - name: loop_b
    fixtures: [loop_a]
"#;

fn fixture_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "fixtures.yaml", ROOT_FIXTURES);
    write(dir.path(), "api/pets/fixtures.yaml", PETS_FIXTURES);
    dir
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn petclinic_stub() -> Arc<StubExecutor> {
    let next_owner = Arc::new(AtomicU64::new(7));
    Arc::new(
        StubExecutor::new()
            .route(HttpMethod::Post, "/api/owners", move |req| {
                let id = next_owner.fetch_add(1, Ordering::SeqCst);
                let name = match &req.body {
                    Some(RequestBody::Json(body)) => body["name"].clone(),
                    _ => Value::Null,
                };
                RawResponse::json(201, &json!({"id": id, "name": name}))
            })
            .json(HttpMethod::Post, "/api/owners/*/pets", 201, json!({"id": 42}))
            .json(HttpMethod::Get, "/api/owners/*", 200, json!({"id": 7}))
            .status(HttpMethod::Get, "/pets/ping", 200)
            .status(HttpMethod::Get, "/ping", 200),
    )
}

fn engine(root: &Path, stub: &Arc<StubExecutor>, config: EngineConfig) -> Moxter {
    Moxter::builder(SCOPE)
        .config(config)
        .root(root)
        .executor(stub.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_closest_scope_definition_wins() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let report = moxter.call("ping").await.unwrap();
    assert!(report.is_success());
    assert!(stub.last_request_to("/pets/ping").is_some());
    assert!(stub.last_request_to("/ping").is_none());

    let names = moxter.fixture_names();
    assert!(names["ping"].ends_with("api/pets/fixtures.yaml"));
    assert!(names["get_owner"].ends_with("fixtures.yaml"));
    assert!(!names["get_owner"].ends_with("pets/fixtures.yaml"));
}

#[tokio::test]
async fn test_self_based_fixture_extends_inherited_one() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let merged = moxter.materialized("create_owner").unwrap();
    assert_eq!(merged.lineage, vec!["create_owner", "create_owner"]);

    moxter.call("create_owner").await.unwrap();
    let request = stub.last_request_to("/api/owners").unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.header("X-Trace"), Some("pets"));
    assert_eq!(
        request.body,
        Some(RequestBody::Json(json!({"name": "Alice", "city": "Springfield"})))
    );
    assert_eq!(moxter.var("ownerId"), Some(&json!(7)));
}

#[tokio::test]
async fn test_group_runs_members_and_chains_saved_values() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let report = moxter.call("setup").await.unwrap();
    assert_eq!(report.len(), 2);
    assert!(report.is_success());
    assert_eq!(report.last_response().map(|r| r.status()), Some(201));
    assert_eq!(moxter.var("ownerId"), Some(&json!(7)));
    assert_eq!(moxter.var("petId"), Some(&json!(42)));

    let pet = stub.last_request_to("/api/owners/7/pets").unwrap();
    assert_eq!(
        pet.body,
        Some(RequestBody::Json(json!({
            "name": "Rex",
            "type": {"name": "dog"},
            "birthDate": "2020-01-01"
        })))
    );
}

#[tokio::test]
async fn test_based_on_payload_is_a_superset() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());
    moxter.set_var("ownerId", 1).unwrap();

    moxter.call("create_puppy").await.unwrap();
    let request = stub.last_request_to("/api/owners/1/pets").unwrap();
    assert_eq!(
        request.body,
        Some(RequestBody::Json(json!({
            "name": "Bolt",
            "type": {"name": "dog"},
            "birthDate": "2020-01-01"
        })))
    );
}

#[tokio::test]
async fn test_lax_group_runs_every_member() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let report = moxter
        .call_with("broken_group", CallOptions::lax())
        .await
        .unwrap();

    let names: Vec<&str> = report.calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["create_owner", "missing_endpoint", "ghost", "get_owner"]);
    assert!(!report.is_success());

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].0, "missing_endpoint");
    assert!(failures[0].1.contains("404"));
    assert_eq!(failures[1].0, "ghost");
    assert!(failures[1].1.contains("Unknown fixture"));

    assert!(matches!(report.calls[3].outcome, CallOutcome::Passed(_)));
    assert_eq!(stub.request_count(), 3);
}

#[tokio::test]
async fn test_strict_group_stops_at_first_failure() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    match moxter.call("flaky").await.unwrap_err() {
        Error::StatusMismatch {
            name,
            expected,
            actual,
            body,
        } => {
            assert_eq!(name, "missing_endpoint");
            assert_eq!(expected, "2xx");
            assert_eq!(actual, 404);
            assert_eq!(body, "no stub route");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stub.request_count(), 2);
}

#[tokio::test]
async fn test_engine_wide_lax_mode_from_config() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let config = EngineConfig {
        strict: false,
        ..EngineConfig::default()
    };
    let mut moxter = engine(dir.path(), &stub, config);

    let report = moxter.call("missing_endpoint").await.unwrap();
    assert_eq!(report.failures().len(), 1);

    let strict = moxter
        .call_with("missing_endpoint", CallOptions::strict())
        .await;
    assert!(matches!(strict, Err(Error::StatusMismatch { .. })));
}

#[tokio::test]
async fn test_resolution_errors_fail_in_lax_mode() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let unknown = moxter.call_with("ghost", CallOptions::lax()).await;
    match unknown.unwrap_err() {
        Error::UnknownFixture { name, searched } => {
            assert_eq!(name, "ghost");
            assert_eq!(searched.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    match moxter.call_with("loop_a", CallOptions::lax()).await.unwrap_err() {
        Error::CyclicBasedOn { trace } => assert_eq!(trace, vec!["loop_a", "loop_b", "loop_a"]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stub.request_count(), 0);
}

#[tokio::test]
async fn test_strict_overwrite_raises() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    moxter.call("create_owner").await.unwrap();
    let second = moxter.call("create_owner").await;
    assert!(matches!(second, Err(Error::VariableOverwrite { ref key }) if key == "ownerId"));

    let lax = moxter
        .call_with("create_owner", CallOptions::lax())
        .await
        .unwrap();
    let failures = lax.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "create_owner");
    assert!(failures[0].1.contains("already set"));
    assert_eq!(moxter.var("ownerId"), Some(&json!(7)));
}

#[tokio::test]
async fn test_lax_group_continues_past_overwrite() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());
    moxter.set_var("ownerId", 1).unwrap();

    let report = moxter
        .call_with("owner_then_ping", CallOptions::lax())
        .await
        .unwrap();

    let names: Vec<&str> = report.calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["create_owner", "ping"]);
    assert!(matches!(report.calls[0].outcome, CallOutcome::Failed(_)));
    assert!(matches!(report.calls[1].outcome, CallOutcome::Passed(_)));
    assert!(stub.last_request_to("/pets/ping").is_some());
    assert_eq!(moxter.var("ownerId"), Some(&json!(1)));
}

#[tokio::test]
async fn test_failed_extraction_saves_nothing() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    match moxter.call("partial_save").await.unwrap_err() {
        Error::Extraction { path, .. } => assert_eq!(path, "$.nope"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(moxter.var("firstId"), None);
    assert!(moxter.vars().is_empty());
}

#[tokio::test]
async fn test_strict_overwrite_saves_nothing() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());
    moxter.set_var("taken", "before").unwrap();

    let err = moxter.call("save_pair").await.unwrap_err();
    assert!(matches!(err, Error::VariableOverwrite { ref key } if key == "taken"));
    assert_eq!(moxter.var("freshId"), None);
    assert_eq!(moxter.var("taken"), Some(&json!("before")));
}

#[tokio::test]
async fn test_nested_group_runs_in_order() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());

    let report = moxter.call("full_setup").await.unwrap();
    assert!(report.is_success());

    let names: Vec<&str> = report.calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["create_owner", "create_pet", "get_owner"]);

    let paths: Vec<String> = stub.requests().iter().map(|r| r.path().to_string()).collect();
    assert_eq!(paths, vec!["/api/owners", "/api/owners/7/pets", "/api/owners/7"]);
    assert_eq!(moxter.var("ownerId"), Some(&json!(7)));
    assert_eq!(moxter.var("petId"), Some(&json!(42)));
}

#[tokio::test]
async fn test_warn_policy_overwrites() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let config = EngineConfig {
        strict_vars: false,
        ..EngineConfig::default()
    };
    let mut moxter = engine(dir.path(), &stub, config);

    moxter.call("create_owner").await.unwrap();
    moxter.call("create_owner").await.unwrap();
    assert_eq!(moxter.var("ownerId"), Some(&json!(8)));
}

#[tokio::test]
async fn test_call_scoped_vars_do_not_leak() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut moxter = engine(dir.path(), &stub, EngineConfig::default());
    moxter.set_var("ownerId", 5).unwrap();

    moxter
        .call_with("get_owner", CallOptions::new().var("ownerId", 99))
        .await
        .unwrap();
    assert!(stub.last_request_to("/api/owners/99").is_some());
    assert_eq!(moxter.var("ownerId"), Some(&json!(5)));

    moxter.call("get_owner").await.unwrap();
    assert!(stub.last_request_to("/api/owners/5").is_some());
}

#[tokio::test]
async fn test_auth_and_csrf_are_attached() {
    let dir = fixture_tree();
    let stub = petclinic_stub();
    let mut config = EngineConfig::default();
    config.auth.bearer_token = Some("secret".to_string());
    config.csrf.enabled = true;
    config.csrf.token = Some("csrf-token".to_string());
    let mut moxter = engine(dir.path(), &stub, config);

    moxter.call("setup").await.unwrap();
    moxter.call("get_owner").await.unwrap();

    let post = stub.last_request_to("/api/owners").unwrap();
    assert_eq!(post.credentials, Some(Credentials::Bearer("secret".to_string())));
    assert_eq!(post.header("X-CSRF-TOKEN"), Some("csrf-token"));

    let get = stub.last_request_to("/api/owners/7").unwrap();
    assert_eq!(get.credentials, Some(Credentials::Bearer("secret".to_string())));
    assert_eq!(get.header("X-CSRF-TOKEN"), None);
}

#[test]
fn test_invalid_config_is_rejected_at_build() {
    let dir = fixture_tree();
    let mut config = EngineConfig::default();
    config.http.base_url = "localhost".to_string();
    let result = Moxter::builder(SCOPE)
        .config(config)
        .root(dir.path())
        .executor(petclinic_stub())
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_duplicate_names_fail_at_load() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "fixtures.yaml",
        "fixtures:\n  - name: a\n    method: GET\n    endpoint: /a\n  - name: a\n    method: GET\n    endpoint: /b\n",
    );
    let result = Moxter::builder(SCOPE)
        .root(dir.path())
        .executor(petclinic_stub())
        .build();
    assert!(matches!(result, Err(Error::DuplicateFixture { ref name, .. }) if name == "a"));
}
