//! Batch patch executor tests: batching, bounded retry and partial-update accounting.

mod common;

use care_shim::care::BatchPatchExecutor;
use care_shim::store::{PatchOperation, RecordStore, StoreError};
use common::{store_config, TABLE_PATH};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn operations(count: usize) -> Vec<PatchOperation> {
    (0..count)
        .map(|i| {
            let mut fields = Map::new();
            fields.insert("Care Status".to_string(), Value::from("PROVIDED"));
            PatchOperation {
                record_id: format!("rec{}", i),
                field_updates: fields,
            }
        })
        .collect()
}

fn patch_sizes(requests: &[Request]) -> Vec<usize> {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["records"].as_array().unwrap().len()
        })
        .collect()
}

#[tokio::test]
async fn test_operations_sent_in_batches_of_ten_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
        .expect(3)
        .mount(&server)
        .await;

    let config = store_config(&server);
    let store = RecordStore::new(&config).unwrap();
    let applied = BatchPatchExecutor::new(&store, &config)
        .apply(operations(23))
        .await
        .unwrap();

    assert_eq!(applied, operations(23));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(patch_sizes(&requests), vec![10, 10, 3]);

    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["records"][0]["id"], "rec0");
    assert_eq!(first["records"][0]["fields"]["Care Status"], "PROVIDED");
}

#[tokio::test]
async fn test_five_failures_then_success_completes() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(5)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = store_config(&server);
    let store = RecordStore::new(&config).unwrap();
    let applied = BatchPatchExecutor::new(&store, &config)
        .apply(operations(4))
        .await
        .unwrap();

    assert_eq!(applied.len(), 4);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(patch_sizes(&requests), vec![4; 6]);
}

#[tokio::test]
async fn test_sixth_consecutive_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(6)
        .mount(&server)
        .await;

    let config = store_config(&server);
    let store = RecordStore::new(&config).unwrap();
    let aborted = BatchPatchExecutor::new(&store, &config)
        .apply(operations(15))
        .await
        .unwrap_err();

    assert_eq!(aborted.attempts, 6);
    assert_eq!(aborted.batch_index, 0);
    assert!(aborted.applied.is_empty());
    assert_eq!(aborted.unapplied, operations(15));
    assert_eq!(
        aborted.last_error,
        StoreError::Upstream {
            status: 503,
            message: "overloaded".to_string()
        }
    );
}

#[tokio::test]
async fn test_abort_on_later_batch_reports_applied_prefix() {
    let server = MockServer::start().await;
    // The second batch starts at rec10.
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(body_partial_json(json!({"records": [{"id": "rec10"}]})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = store_config(&server);
    config.max_retries = 2;
    let store = RecordStore::new(&config).unwrap();
    let aborted = BatchPatchExecutor::new(&store, &config)
        .apply(operations(25))
        .await
        .unwrap_err();

    let all = operations(25);
    assert_eq!(aborted.batch_index, 1);
    assert_eq!(aborted.attempts, 3);
    assert_eq!(aborted.applied, all[..10].to_vec());
    assert_eq!(aborted.unapplied, all[10..].to_vec());
    assert_eq!(aborted.applied.len() + aborted.unapplied.len(), all.len());
}

#[tokio::test]
async fn test_transport_failure_counts_as_attempt() {
    // Nothing listens here, so every attempt fails at the network layer.
    let mut config = store_config(&MockServer::start().await);
    config.base_url = "http://127.0.0.1:9".to_string();
    config.max_retries = 1;
    let store = RecordStore::new(&config).unwrap();

    let aborted = BatchPatchExecutor::new(&store, &config)
        .apply(operations(1))
        .await
        .unwrap_err();

    assert_eq!(aborted.attempts, 2);
    assert!(matches!(aborted.last_error, StoreError::Network(_)));
}

#[tokio::test]
async fn test_no_operations_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = store_config(&server);
    let store = RecordStore::new(&config).unwrap();
    let applied = BatchPatchExecutor::new(&store, &config)
        .apply(Vec::new())
        .await
        .unwrap();
    assert!(applied.is_empty());
}
