//! Integration tests against a wiremock server.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use courier::{
    Client, Config, CookieJar, File, MemoryCookieJar, Method, Transport, TransportConfig,
};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{
        body_json, body_string, body_string_contains, header, header_regex, method, path,
        query_param,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

fn client_for(server: &MockServer) -> Arc<Client> {
    let mut client = Client::new();
    client.set_base_url(server.uri());
    client.into_shared()
}

#[tokio::test]
async fn test_get_with_base_url_and_params() {
    let server = MockServer::start().await;
    let user = User {
        id: 1,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(query_param("expand", "teams"))
        .and(query_param("lang", "en"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&server)
        .await;

    let mut client = Client::new();
    client
        .set_base_url(server.uri())
        .set_header("X-Api-Key", "secret")
        .set_param("lang", "en");
    let client = client.into_shared();

    let response = client
        .r()
        .set_path_param("id", "1")
        .set_param("expand", "teams")
        .get("/users/:id")
        .await
        .expect("response");

    assert!(response.is_success());
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.status(), "OK");
    assert_eq!(response.json::<User>().expect("json"), user);
    assert!(response.request().is_some());
    response.close();
}

#[tokio::test]
async fn test_post_json() {
    let server = MockServer::start().await;
    let input = User {
        id: 0,
        name: "Bob".to_string(),
    };
    let output = User {
        id: 42,
        name: "Bob".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .r()
        .set_json(input)
        .post("/users")
        .await
        .expect("response");

    assert_eq!(response.status_code(), 201);
    assert_eq!(response.json::<User>().expect("json"), output);
}

#[tokio::test]
async fn test_send_with_config() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/users/7"))
        .and(query_param("notify", "true"))
        .and(header("user-agent", "config-agent"))
        .and(body_json(serde_json::json!({ "name": "Carol" })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut config = Config {
        user_agent: Some("config-agent".to_string()),
        json: Some(serde_json::json!({ "name": "Carol" })),
        ..Config::default()
    };
    config.params.set("notify", "true");
    config.path_params.set("id", "7");

    let response = client
        .send(Method::Put, "/users/:id", config)
        .await
        .expect("response");
    assert_eq!(response.status_code(), 204);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn test_form_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("user=alice&scope=read&scope=write"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .r()
        .set_form_data("user", "alice")
        .add_form_data("scope", "read")
        .add_form_data("scope", "write")
        .post("/login")
        .await
        .expect("response");
    assert!(response.is_success());
}

#[tokio::test]
async fn test_multipart_upload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_regex(
            "content-type",
            "^multipart/form-data; boundary=--CourierFormBoundary[A-Za-z0-9]{16}$",
        ))
        .and(body_string_contains("name=\"description\""))
        .and(body_string_contains("quarterly numbers"))
        .and(body_string_contains("filename=\"report.csv\""))
        .and(body_string_contains("a,b,c"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let file_path = dir.path().join("report.csv");
    let mut file = std::fs::File::create(&file_path).expect("create");
    file.write_all(b"a,b,c\n1,2,3\n").expect("write");
    drop(file);

    let client = client_for(&server);
    let response = client
        .r()
        .set_form_data("description", "quarterly numbers")
        .add_file(File::from_path(&file_path).with_field_name("report"))
        .post("/upload")
        .await
        .expect("response");
    assert!(response.is_success());
}

#[tokio::test]
async fn test_missing_file_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .r()
        .add_file(File::from_path("/definitely/not/here.txt"))
        .post("/upload")
        .await
        .expect_err("missing file");
    assert!(matches!(error, courier::Error::Io { op: "open file", .. }));
}

#[tokio::test]
async fn test_cookie_jar_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "session=abc123; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .mount(&server)
        .await;

    let jar = Arc::new(MemoryCookieJar::new());
    let mut client = Client::new();
    client
        .set_base_url(server.uri())
        .set_cookie_jar(Arc::clone(&jar) as Arc<dyn CookieJar>);
    let client = client.into_shared();

    let login = client.post("/login").await.expect("login");
    assert_eq!(login.cookies().len(), 1);
    assert!(!jar.is_empty());

    let profile = client.get("/profile").await.expect("profile");
    assert_eq!(profile.text(), "welcome");
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut client = Client::new();
    client
        .set_base_url(server.uri())
        .set_timeout(Duration::from_secs(10));
    let client = client.into_shared();

    let error = client
        .r()
        .set_timeout(Duration::from_millis(50))
        .get("/slow")
        .await
        .expect_err("timeout");
    assert!(error.is_timeout());
}

#[tokio::test]
async fn test_transport_timeout_caps_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = TransportConfig::builder()
        .timeout(Duration::from_millis(50))
        .build();
    let mut client = Client::new();
    client
        .set_base_url(server.uri())
        .set_timeout(Duration::from_secs(120))
        .set_transport(Transport::hyper(config));
    let client = client.into_shared();

    let error = client.get("/slow").await.expect_err("timeout");
    assert!(error.is_timeout());
}

#[tokio::test]
async fn test_connection_refused() {
    let client = Client::new().into_shared();
    let error = client
        .get("http://127.0.0.1:1/unreachable")
        .await
        .expect_err("connection error");
    assert!(error.is_connection());
}

#[tokio::test]
async fn test_default_client_replace() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let _restore = courier::default::replace(client_for(&server));
    let response = courier::get("/ping").await.expect("response");
    assert_eq!(response.text(), "pong");
}

#[tokio::test]
async fn test_save_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.get("/download").await.expect("response");

    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("out/data.bin");
    response.save(&target).expect("save");
    assert_eq!(std::fs::read(&target).expect("read"), b"payload");
}
