//! Assertions and polling for job records.

use std::time::Duration;

use serde_json::Value;

use super::client::TestClient;

/// Polls the status endpoint until the job reaches `status`.
pub async fn wait_for_status(client: &TestClient, id: &str, status: &str) -> Value {
    let uri = format!("/api/v1/git/status/{id}");
    for _ in 0..200 {
        let record: Value = client.get_authorized(&uri).await.json();
        if record["status"] == status {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached {}", id, status);
}

/// Asserts the shape every job record shares.
pub fn assert_job_record(record: &Value) {
    for field in ["id", "url", "status", "path", "createdAt"] {
        assert!(
            record.get(field).is_some(),
            "record is missing '{}': {}",
            field,
            record
        );
    }
    assert!(record["leaks"].is_array(), "leaks must be a list: {}", record);
}

/// Asserts a `{status, path, url}` outcome.
pub fn assert_outcome(record: &Value, status: &str) {
    let result = &record["result"];
    assert_eq!(result["status"], status, "unexpected outcome: {}", result);
    assert!(result["path"].is_string());
    assert!(result["url"].is_string());
}
