use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{ClientConfig, ClientError, QueryClient};
use crate::filter::{FilterParams, SearchForm};
use crate::rows::{RecordId, LONG_TEXT_PLACEHOLDER};
use crate::tui::{Command, Message, Model, Outcome};
use crate::view::{self, Action, CellKind, ViewBinder};

fn client_for(server: &MockServer) -> QueryClient {
    QueryClient::new(ClientConfig::new(format!("{}/dserve", server.uri()), "1000")).unwrap()
}

#[tokio::test]
async fn search_normalizes_rows_from_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dserve"))
        .and(query_param("db", "1000"))
        .and(query_param("op", "search"))
        .and(query_param("showid", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [1, "a", null, "c", "d", "e", "long text"],
            [2, "b"]
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = view::refresh(&client_for(&server), &FilterParams::new())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    let first = rows.get(0).unwrap();
    assert_eq!(first.id, Some(RecordId::new("1")));
    assert_eq!(first.cells[2], "");
    assert_eq!(first.cells[6], LONG_TEXT_PLACEHOLDER);
    assert_eq!(rows.get(1).unwrap().cells[6], "");
}

#[tokio::test]
async fn filter_params_reach_the_search_without_empty_pairs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("op", "search"))
        .and(query_param("bar", "baz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[7, "x"]])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let filter = FilterParams::parse("foo=&bar=baz&empty=");
    let rows = view::refresh(&client, &filter).await.unwrap();
    assert_eq!(rows.len(), 1);

    let received = server.received_requests().await.unwrap();
    let query = received[0].url.query().unwrap_or_default().to_string();
    assert!(query.ends_with("showid=yes&bar=baz"), "{query}");
    assert!(!query.contains("foo="));
}

#[tokio::test]
async fn error_flagged_search_yields_no_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["no such database"])))
        .mount(&server)
        .await;

    let rows = view::refresh(&client_for(&server), &FilterParams::new())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn custom_detector_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "fail"})))
        .mount(&server)
        .await;

    let detector = |payload: &serde_json::Value| {
        (payload.get("status") == Some(&json!("fail"))).then(|| "fail".to_string())
    };
    let client = QueryClient::with_detector(
        ClientConfig::new(format!("{}/dserve", server.uri()), "1000"),
        detector,
    )
    .unwrap();
    assert!(client.search(&FilterParams::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_success_status_is_an_error_and_keeps_rendered_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut binder = ViewBinder::default();
    binder.render(crate::rows::RowSet::from_records(
        &crate::rows::records_from_payload(json!([[1, "kept"]])),
    ));
    binder.begin_fetch();
    match view::refresh(&client_for(&server), binder.active_filter()).await {
        Err(ClientError::Status { status, .. }) => {
            assert_eq!(status, 500);
            binder.fetch_failed();
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(binder.rows().len(), 1);
}

#[tokio::test]
async fn delete_then_refresh_with_active_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("op", "delete"))
        .and(query_param("recids", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("op", "search"))
        .and(query_param("fld", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[42, "a"], [43, "b"]])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut binder = ViewBinder::default();
    let form = SearchForm {
        fld: "1".to_string(),
        ..Default::default()
    };
    let filter = binder.submit_filter(&form, "").unwrap();
    binder.render(view::refresh(&client, &filter).await.unwrap());

    let Action::Delete(id) = binder.dispatch(0, CellKind::Delete) else {
        panic!("expected delete");
    };
    assert_eq!(id, RecordId::new("42"));

    client.remove(&id).await.unwrap();
    binder.begin_fetch();
    let refreshed = view::refresh(&client, binder.active_filter()).await.unwrap();
    binder.render(refreshed);
    assert_eq!(binder.rows().len(), 2);

    let received = server.received_requests().await.unwrap();
    let delete = received
        .iter()
        .find(|r| r.url.query().unwrap_or_default().contains("op=delete"))
        .unwrap();
    assert!(delete
        .url
        .query()
        .unwrap_or_default()
        .ends_with("op=delete&recids=42"));
}

#[tokio::test]
async fn delete_reply_with_error_flag_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("op", "delete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["record not found"])))
        .mount(&server)
        .await;

    assert!(client_for(&server).remove(&RecordId::new("9")).await.is_ok());
}

#[tokio::test]
async fn fetch_record_returns_every_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("op", "search"))
        .and(query_param("recids", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([[5, "a", 2, 3, 4, 5, "the body", 8]])),
        )
        .mount(&server)
        .await;

    let record = client_for(&server)
        .fetch_record(&RecordId::new("5"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.len(), 8);
    assert_eq!(record.field(6), Some(&json!("the body")));
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search(&FilterParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

#[tokio::test]
async fn browse_model_drives_requests_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("op", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[42, "a"], [43, "b"]])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("op", "delete"))
        .and(query_param("recids", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut model = Model::new("html/data.html");
    let mut queue = model.start(SearchForm::default(), "");

    let mut searches = 0;
    while let Some(command) = queue.pop() {
        let outcome = match command {
            Command::Search(filter) => {
                searches += 1;
                Outcome::Rows(view::refresh(&client, &filter).await.map_err(|e| e.to_string()))
            }
            Command::Delete(id) => {
                let result = client.remove(&id).await.map_err(|e| e.to_string());
                Outcome::Deleted { id, result }
            }
            Command::FetchRecord(id) => {
                let result = client.fetch_record(&id).await.map_err(|e| e.to_string());
                Outcome::Record { id, result }
            }
        };
        queue.extend(model.apply(outcome));
        if searches == 1 && queue.is_empty() {
            queue.extend(model.update(Message::Delete));
        }
    }

    assert_eq!(searches, 2);
    assert_eq!(model.binder().rows().len(), 2);
    assert!(!model.is_fetching());
}
