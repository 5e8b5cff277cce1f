//! End-to-end invocation tests against a wiremock server
//!
//! Every test runs the full pipeline with the default reqwest transport:
//! request chain, executor and response chain.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wirelink::error::{RequestError, ResponseError};
use wirelink::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: u64,
    first_name: String,
    last_name: String,
    age: u32,
    immortal: bool,
}

#[derive(Debug, Serialize)]
struct NewNote {
    title: String,
    pinned: bool,
}

fn user_json() -> serde_json::Value {
    json!({"id": 1, "firstName": "A", "lastName": "B", "age": 10, "immortal": false})
}

fn endpoint(server: &MockServer) -> EndpointDefinition {
    EndpointDefinition::builder("Api")
        .host(server.uri())
        .header("X-Client", "wirelink-tests")
        .serializer(SerializerRef::json())
        .deserializer(DeserializerRef::json())
        .operation(Operation::get("user", "/json").returns(ReturnType::model::<User>()))
        .operation(
            Operation::get("user_raw", "/json")
                .detach(Detachable::Deserializer)
                .returns(ReturnType::Text),
        )
        .operation(
            Operation::get("status", "/status/:code")
                .param(ParamRole::path("code"))
                .returns(ReturnType::model::<User>()),
        )
        .operation(
            Operation::post("note", "/users/:id/notes")
                .param(ParamRole::path("id"))
                .param(ParamRole::header("X-Api-Key"))
                .param(ParamRole::query("notify"))
                .param(ParamRole::Entity)
                .returns(ReturnType::Text),
        )
        .operation(
            Operation::post("login", "/login")
                .form_const("grant_type", "password")
                .param(ParamRole::form("username"))
                .param(ParamRole::FormMap),
        )
        .operation(
            Operation::get("search", "/search")
                .param(ParamRole::query("q"))
                .param(ParamRole::QueryMap)
                .returns(ReturnType::Text),
        )
        .operation(
            Operation::put("upload", "/upload")
                .param(ParamRole::Entity)
                .returns(ReturnType::Text),
        )
        .operation(
            Operation::get("etag", "/etag")
                .param(ParamRole::response_header("ETag"))
                .param(ParamRole::response_header("X-Missing")),
        )
        .operation(Operation::get("raw", "/raw").returns(ReturnType::RawResponse))
        .build()
        .unwrap()
}

async fn proxy(server: &MockServer) -> (ClientContext, EndpointProxy) {
    let context = ClientContext::init(ContextConfig::default()).unwrap();
    let proxy = context.proxy(endpoint(server)).unwrap();
    (context, proxy)
}

#[tokio::test]
async fn test_get_json_user_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .and(header("X-Client", "wirelink-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let user = api
        .invoke("user", Vec::new())
        .await
        .unwrap()
        .into_model::<User>()
        .unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            first_name: "A".into(),
            last_name: "B".into(),
            age: 10,
            immortal: false,
        }
    );
}

#[tokio::test]
async fn test_detached_deserializer_returns_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(user_json().to_string()))
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let text = api
        .invoke("user_raw", Vec::new())
        .await
        .unwrap()
        .into_text()
        .unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), user_json());
}

#[tokio::test]
async fn test_no_content_statuses_return_nothing() {
    let server = MockServer::start().await;
    for code in [204u16, 205] {
        Mock::given(method("GET"))
            .and(path(format!("/status/{code}")))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;
    }

    let (_context, api) = proxy(&server).await;
    for code in ["204", "205"] {
        let reply = api.invoke("status", vec![Argument::text(code)]).await.unwrap();
        assert!(reply.is_none(), "status {code}");
    }
}

#[tokio::test]
async fn test_unsuccessful_status_keeps_a_readable_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let mut err = api
        .invoke("status", vec![Argument::text("404")])
        .await
        .unwrap_err();
    assert!(err.is_response_failure());
    assert!(matches!(
        err.response_error(),
        Some(ResponseError::UnsuccessfulStatus { status: 404 })
    ));
    assert_eq!(err.operation(), Some("status"));
    assert_eq!(err.arguments(), ["Text(\"404\")"]);

    let mut response = err.take_response().unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.body.text().await.unwrap(), "no such user");
}

#[tokio::test]
async fn test_post_with_path_header_query_and_json_entity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/42/notes"))
        .and(header("X-Api-Key", "secret"))
        .and(header("Content-Type", "application/json"))
        .and(query_param("notify", "true"))
        .and(body_json(json!({"title": "hello", "pinned": true})))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let reply = api
        .invoke(
            "note",
            vec![
                Argument::text("42"),
                Argument::text("secret"),
                Argument::Boolean(true),
                Argument::model(NewNote {
                    title: "hello".into(),
                    pinned: true,
                }),
            ],
        )
        .await
        .unwrap();
    assert_eq!(reply.into_text().as_deref(), Some("created"));
}

#[tokio::test]
async fn test_form_parameters_are_url_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "grant_type=password&username=ann%20lee&scope=read&scope=write",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let reply = api
        .invoke(
            "login",
            vec![
                Argument::text("ann lee"),
                Argument::params([("scope", "read"), ("scope", "write")]),
            ],
        )
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_multi_valued_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("tag", "a"))
        .and(query_param("tag", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .expect(1)
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let reply = api
        .invoke(
            "search",
            vec![
                Argument::text("rust"),
                Argument::params([("tag", "a"), ("tag", "b")]),
            ],
        )
        .await
        .unwrap();
    assert_eq!(reply.into_text().as_deref(), Some("found"));
}

#[tokio::test]
async fn test_file_entity_is_streamed_with_guessed_type() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload"))
        .and(header("Content-Type", "text/plain"))
        .and(body_string("file contents"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("note.txt");
    std::fs::File::create(&file)
        .unwrap()
        .write_all(b"file contents")
        .unwrap();

    let (_context, api) = proxy(&server).await;
    let reply = api.invoke("upload", vec![Argument::file(&file)]).await.unwrap();
    assert_eq!(reply.into_text().as_deref(), Some("stored"));
}

#[tokio::test]
async fn test_large_file_entity_arrives_intact() {
    let contents = "0123456789abcdef".repeat(4096);
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload"))
        .and(body_string(contents.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("large.bin");
    std::fs::write(&file, &contents).unwrap();

    let (_context, api) = proxy(&server).await;
    let reply = api.invoke("upload", vec![Argument::file(&file)]).await.unwrap();
    assert_eq!(reply.into_text().as_deref(), Some("stored"));
}

#[tokio::test]
async fn test_response_headers_fill_slots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/etag"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"v7\""))
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let etag = HeaderSlot::new();
    let untouched = HeaderSlot::with_value("previous");
    api.invoke(
        "etag",
        vec![
            Argument::HeaderSlot(etag.clone()),
            Argument::HeaderSlot(untouched.clone()),
        ],
    )
    .await
    .unwrap();
    assert_eq!(etag.get().as_deref(), Some("\"v7\""));
    assert_eq!(untouched.get().as_deref(), Some("previous"));
}

#[tokio::test]
async fn test_raw_response_is_returned_for_any_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let (_context, api) = proxy(&server).await;
    let mut response = api
        .invoke("raw", Vec::new())
        .await
        .unwrap()
        .into_response()
        .unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.body.text().await.unwrap(), "oops");
}

#[tokio::test]
async fn test_request_build_failure_carries_the_partial_request() {
    let server = MockServer::start().await;
    let (_context, api) = proxy(&server).await;

    let err = api
        .invoke(
            "note",
            vec![
                Argument::text("42"),
                Argument::text("secret"),
                Argument::Absent,
                Argument::Absent,
            ],
        )
        .await
        .unwrap_err();
    assert!(err.is_request_failure());
    assert!(matches!(
        err.request_error(),
        Some(RequestError::EntityResolutionFailed { .. })
    ));
    let request = err.request().unwrap();
    assert_eq!(request.header_values("x-api-key"), vec!["secret"]);
    assert!(request.url().unwrap().path().ends_with("/users/42/notes"));
}

#[tokio::test]
async fn test_connection_failure_is_a_transport_error() {
    let definition = EndpointDefinition::builder("Closed")
        .host("http://127.0.0.1:1")
        .operation(Operation::get("ping", "/ping"))
        .build()
        .unwrap();
    let context = ClientContext::init(ContextConfig::default()).unwrap();
    let closed = context.proxy(definition).unwrap();

    let err = closed.invoke("ping", Vec::new()).await.unwrap_err();
    assert!(err.is_transport_failure());
    assert_eq!(
        err.request().and_then(|r| r.url()).map(|u| u.as_str()),
        Some("http://127.0.0.1:1/ping")
    );
}
