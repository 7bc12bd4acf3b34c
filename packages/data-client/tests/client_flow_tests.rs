mod common;

use common::{create_schema, memory_clients, memory_settings, raw_count};
use data_client::extensions::accelerate::CacheStats;
use data_client::{custom_client, Action, ClientError, ClientOverrides, Operation};
use serde_json::{json, Value};
use test_support::unique_str;

#[tokio::test]
async fn booking_reference_delete_is_soft_on_primary() {
    let clients = memory_clients().await;
    let refs = clients.primary.model("BookingReference");

    let created = refs
        .create(json!({ "bookingId": 1, "type": "zoom" }))
        .await
        .unwrap();
    assert!(created["uid"].as_str().is_some_and(|uid| !uid.is_empty()));

    refs.delete(json!({ "id": created["id"] })).await.unwrap();

    assert_eq!(refs.find_many(json!({})).await.unwrap(), json!([]));
    assert_eq!(refs.count(json!({ "where": { "deleted": true } })).await.unwrap(), 1);
    assert_eq!(raw_count(clients.base.connection(), "BookingReference").await, 1);
}

#[tokio::test]
async fn factory_client_deletes_for_real() {
    let client = custom_client(&memory_settings(), &ClientOverrides::default())
        .await
        .unwrap();
    create_schema(client.connection()).await;
    let refs = client.model("BookingReference");

    let created = refs
        .create(json!({ "bookingId": 1, "type": "zoom", "uid": "manual" }))
        .await
        .unwrap();
    refs.delete(json!({ "id": created["id"] })).await.unwrap();

    assert_eq!(raw_count(client.connection(), "BookingReference").await, 0);
}

#[tokio::test]
async fn teams_pending_payment_are_hidden() {
    let clients = memory_clients().await;
    let teams = clients.primary.model("Team");
    teams
        .create(json!({ "slug": "paid", "pendingPayment": false }))
        .await
        .unwrap();
    teams
        .create(json!({ "slug": "pending", "pendingPayment": true }))
        .await
        .unwrap();

    let visible = teams.find_many(json!({})).await.unwrap();
    let slugs: Vec<&str> = visible
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["slug"].as_str())
        .collect();
    assert_eq!(slugs, vec!["paid"]);
    assert_eq!(
        teams.count(json!({ "where": { "pendingPayment": true } })).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn accepted_booking_gets_idempotency_key() {
    let clients = memory_clients().await;
    let bookings = clients.primary.model("Booking");
    let data = json!({
        "status": "ACCEPTED",
        "startTime": "2026-03-02T10:00:00Z",
        "endTime": "2026-03-02T10:30:00Z",
        "userId": 5
    });

    let booking = bookings.create(data.clone()).await.unwrap();
    assert!(booking["idempotencyKey"].is_string());
    assert_eq!(clients.primary.usage().count("Booking"), 1);

    // Same slot and host: the unique key rejects the retry.
    let retry = bookings.create(data).await;
    assert!(matches!(retry, Err(ClientError::Db(_))));
    assert_eq!(clients.primary.usage().count("Booking"), 1);
}

#[tokio::test]
async fn single_record_writes_refuse_duplicate_matches() {
    let clients = memory_clients().await;
    let teams = clients.primary.model("Team");
    let slug = unique_str("dup");
    for _ in 0..3 {
        teams.create(json!({ "slug": slug })).await.unwrap();
    }

    let deleted = teams.delete(json!({ "slug": slug })).await;
    assert!(matches!(
        deleted,
        Err(ClientError::AmbiguousTarget { matched: 3, .. })
    ));

    let updated = teams
        .update(json!({ "slug": slug }), json!({ "pendingPayment": true }))
        .await;
    assert!(matches!(
        updated,
        Err(ClientError::AmbiguousTarget { matched: 3, .. })
    ));

    assert_eq!(raw_count(clients.base.connection(), "Team").await, 3);
    assert_eq!(
        teams.count(json!({ "where": { "slug": slug } })).await.unwrap(),
        3
    );
}

#[tokio::test]
async fn duplicate_booking_references_are_not_all_soft_deleted() {
    let clients = memory_clients().await;
    let refs = clients.primary.model("BookingReference");
    for _ in 0..2 {
        refs.create(json!({ "bookingId": 7, "type": "zoom" }))
            .await
            .unwrap();
    }

    let res = refs.delete(json!({ "bookingId": 7 })).await;
    assert!(matches!(res, Err(ClientError::AmbiguousTarget { .. })));
    assert_eq!(
        refs.count(json!({ "where": { "bookingId": 7 } })).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn out_of_range_filter_is_rejected_not_panicking() {
    let clients = memory_clients().await;
    let res = clients
        .primary
        .model("Team")
        .find_many(json!({ "where": { "id": u64::MAX } }))
        .await;
    assert!(matches!(res, Err(ClientError::InvalidArguments { .. })));
}

#[tokio::test]
async fn unfiltered_bulk_delete_is_rejected() {
    let clients = memory_clients().await;
    let teams = clients.primary.model("Team");
    teams
        .create(json!({ "slug": unique_str("keep") }))
        .await
        .unwrap();

    let res = teams.delete_many(json!({})).await;
    assert!(matches!(res, Err(ClientError::UnsafeMutation { .. })));
    assert_eq!(raw_count(clients.base.connection(), "Team").await, 1);
}

#[tokio::test]
async fn cached_reads_invalidate_on_write() {
    let clients = memory_clients().await;
    let teams = clients.primary.model("Team");
    let slug = unique_str("acme");
    let cached = || json!({ "where": { "slug": slug }, "cacheStrategy": { "ttl": 60 } });

    teams.create(json!({ "slug": slug })).await.unwrap();
    let first = teams.find_many(cached()).await.unwrap();
    let second = teams.find_many(cached()).await.unwrap();
    assert_eq!(first, second);

    teams.create(json!({ "slug": slug })).await.unwrap();
    let third = teams.find_many(cached()).await.unwrap();
    assert_eq!(third.as_array().map(Vec::len), Some(2));

    assert_eq!(
        clients.primary.accelerate().stats(),
        CacheStats {
            hits: 1,
            misses: 2,
            invalidations: 2
        }
    );
}

#[tokio::test]
async fn readonly_client_reads_but_never_writes() {
    let clients = memory_clients().await;
    clients
        .primary
        .model("Team")
        .create(json!({ "slug": "acme" }))
        .await
        .unwrap();

    assert!(clients.readonly.shares_client_with(&clients.primary));
    assert_eq!(
        clients.readonly.model("Team").count(json!({})).await.unwrap(),
        1
    );

    let res = clients
        .readonly
        .execute(Operation::new(
            "Team",
            Action::DeleteMany,
            json!({ "where": { "slug": "acme" } }),
        ))
        .await;
    assert!(matches!(res, Err(ClientError::ReadOnly { .. })));
    assert_eq!(raw_count(clients.base.connection(), "Team").await, 1);
}

#[tokio::test]
async fn find_unique_missing_row_is_null() {
    let clients = memory_clients().await;
    let out = clients
        .primary
        .model("Team")
        .find_unique(json!({ "where": { "id": 404 } }))
        .await
        .unwrap();
    assert_eq!(out, Value::Null);
}
