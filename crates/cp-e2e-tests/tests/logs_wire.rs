//! E2E tests for the CloudWatch Logs query against a wiremock endpoint.
//!
//! `FilterLogEvents` pages are chained by `nextToken`; these check that the
//! whole window is read, bounded by the page limit.

mod helpers;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cp_cloud_tools::aws::MAX_LOG_PAGES;
use cp_cloud_tools::{
    AwsLogQuery, ExecutorConfig, LogFilter, LogQuery, MockResourceControl, OperationExecutor,
};
use cp_protocol::ToolInvocationRequest;
use helpers::local_sdk_config;

const GROUP: &str = "/aws/lambda/auth-service";

fn event(minutes_ago: i64, message: &str) -> Value {
    let ts = (Utc::now() - Duration::minutes(minutes_ago)).timestamp_millis();
    json!({
        "logStreamName": "2024/01/01/[$LATEST]abc",
        "timestamp": ts,
        "message": format!("{message}\n"),
        "ingestionTime": ts,
        "eventId": format!("{ts}-{minutes_ago}")
    })
}

fn page(events: Vec<Value>, next_token: Option<&str>) -> ResponseTemplate {
    let mut body = json!({"events": events, "searchedLogStreams": []});
    if let Some(token) = next_token {
        body["nextToken"] = json!(token);
    }
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/x-amz-json-1.1")
        .set_body_json(body)
}

fn filter_call() -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(header("x-amz-target", "Logs_20140328.FilterLogEvents"))
}

async fn mount_page(server: &MockServer, token: Option<&str>, response: ResponseTemplate) {
    match token {
        Some(token) => {
            filter_call()
                .and(body_partial_json(json!({"nextToken": token})))
                .respond_with(response)
                .with_priority(1)
                .mount(server)
                .await
        }
        None => filter_call().respond_with(response).mount(server).await,
    }
}

fn window() -> LogFilter {
    LogFilter {
        log_group: GROUP.into(),
        start: Utc::now() - Duration::hours(1),
        end: Utc::now(),
        pattern: Some("ERROR".into()),
    }
}

/// An empty first page with a token does not hide later matches.
#[tokio::test]
async fn e2e_logs_follow_next_token() {
    let server = MockServer::start().await;
    mount_page(&server, None, page(vec![], Some("page-2"))).await;
    mount_page(
        &server,
        Some("page-2"),
        page(
            vec![event(30, "ERROR token signature invalid"), event(20, "ERROR cache miss storm")],
            Some("page-3"),
        ),
    )
    .await;
    mount_page(&server, Some("page-3"), page(vec![event(5, "ERROR database timeout")], None)).await;

    let sdk_config = local_sdk_config(&server.uri()).await;
    let executor = OperationExecutor::new(
        Arc::new(MockResourceControl::new()),
        Arc::new(AwsLogQuery::new(&sdk_config)),
        ExecutorConfig::default(),
    );
    let result = executor
        .execute(&ToolInvocationRequest::new(
            "tooluse_1",
            "cloudwatch_logs",
            json!({"function_name": "auth-service"}),
        ))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(
        result.message.as_deref(),
        Some("Found 3 matching log events in /aws/lambda/auth-service over the last 1h")
    );
    let events = result.payload.as_ref().unwrap().as_array().unwrap();
    assert_eq!(events.last().unwrap()["message"], "ERROR database timeout");

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["logGroupName"], GROUP);
    assert_eq!(first["filterPattern"], "ERROR");
    assert!(first.get("nextToken").is_none());
}

/// A token that never changes ends the query instead of looping.
#[tokio::test]
async fn e2e_logs_repeated_token_stops() {
    let server = MockServer::start().await;
    mount_page(&server, None, page(vec![event(10, "ERROR a")], Some("same"))).await;
    mount_page(&server, Some("same"), page(vec![event(5, "ERROR b")], Some("same"))).await;

    let logs = AwsLogQuery::new(&local_sdk_config(&server.uri()).await);
    let events = logs.filter_events(&window()).await.unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].message, "ERROR b");
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
}

/// An endless chain of pages is cut off at the page limit.
#[tokio::test]
async fn e2e_logs_page_limit() {
    let server = MockServer::start().await;
    mount_page(&server, None, page(vec![event(50, "ERROR p0")], Some("p1"))).await;
    for i in 1..=MAX_LOG_PAGES + 2 {
        let token = format!("p{i}");
        let next = format!("p{}", i + 1);
        mount_page(
            &server,
            Some(&token),
            page(vec![event(40 - i as i64, &format!("ERROR p{i}"))], Some(&next)),
        )
        .await;
    }

    let logs = AwsLogQuery::new(&local_sdk_config(&server.uri()).await);
    let events = logs.filter_events(&window()).await.unwrap();

    assert_eq!(events.len(), MAX_LOG_PAGES);
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        MAX_LOG_PAGES
    );
}
