#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The in-process client over the stock policies.

use std::sync::Arc;

use permission::PermissionModule;
use permission_sdk::{Payload, PermissionClient, PermissionError};
use serde_json::{Value, json};
use static_datastore_plugin::Service as StaticDatastore;
use tokio_util::sync::CancellationToken;

fn client() -> Arc<dyn PermissionClient> {
    let Value::Object(fixture) = json!({
        "meeting/1": {"user_ids": [2, 3], "committee_id": 4},
        "committee/4/manager_ids": [5],
        "user/2/group_$1_ids": [6],
        "user/3/group_$1_ids": [7],
        "group/6/permissions": ["motion.can_manage"],
        "group/7/permissions": ["motion.can_see"],
        "motion/8": {"meeting_id": 1, "state_id": 9, "submitter_ids": []},
        "motion_state/9": {"meeting_id": 1, "restrictions": ["motion.can_see_internal"]},
        "motion_block/10": {"meeting_id": 1, "internal": true},
    }) else {
        unreachable!()
    };
    let provider = Arc::new(StaticDatastore::from_fixture(&fixture).unwrap());
    PermissionModule::new(provider).unwrap().client()
}

fn payload(value: Value) -> Payload {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn manage_implies_see() {
    let client = client();
    let cancel = CancellationToken::new();
    let fields = vec!["motion/8/title".to_owned(), "motion_block/10/title".to_owned()];

    let manager = client.restrict_fq_fields(&cancel, 2, fields.clone()).await.unwrap();
    assert!(manager.values().all(|&visible| visible));

    let viewer = client.restrict_fq_fields(&cancel, 3, fields.clone()).await.unwrap();
    assert!(viewer.values().all(|&visible| !visible));

    let committee_manager = client.restrict_fq_fields(&cancel, 5, fields).await.unwrap();
    assert!(committee_manager.values().all(|&visible| visible));
}

#[tokio::test]
async fn batch_is_denied_as_a_whole() {
    let client = client();
    let cancel = CancellationToken::new();

    let allowed = client
        .is_allowed(
            &cancel,
            "motion.update",
            2,
            vec![payload(json!({"id": 8}))],
        )
        .await
        .unwrap();
    assert!(allowed);

    let allowed = client
        .is_allowed(
            &cancel,
            "motion.update",
            3,
            vec![payload(json!({"id": 8})), payload(json!({"id": 8}))],
        )
        .await
        .unwrap();
    assert!(!allowed);
}

#[tokio::test]
async fn errors_map_to_the_public_kinds() {
    let client = client();
    let cancel = CancellationToken::new();

    let err = client
        .is_allowed(&cancel, "nothing.here", 2, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionError::UnknownRoute(_)));

    let err = client
        .is_allowed(&cancel, "motion.update", 2, vec![payload(json!({}))])
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionError::InvalidInput(_)));

    let err = client
        .restrict_fq_fields(&cancel, 2, vec!["motion/x".to_owned()])
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionError::InvalidInput(_)));

    cancel.cancel();
    let err = client
        .restrict_fq_fields(&cancel, 2, vec!["motion/8/title".to_owned()])
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionError::Cancelled));
}
