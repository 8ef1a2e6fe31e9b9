//! Tests against a running server backed by PostgreSQL.
//!
//! Start the server, then run with: cargo test -- --ignored

use chrono::{Duration, Utc};
use library_service::models::UserClaims;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Sign a token with the secret the server is configured with
fn token(user_id: i32, is_staff: bool) -> String {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("live{}@library.test", user_id),
        user_id,
        email: format!("live{}@library.test", user_id),
        is_staff,
        exp: now + 600,
        iat: now,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

async fn create_book(client: &Client, inventory: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token(9001, true))
        .json(&json!({
            "title": "Live test book",
            "author": "Test Author",
            "cover": "Hard",
            "inventory": inventory,
            "daily_fee": "1.50"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book ID")
}

async fn delete_book(client: &Client, id: i64) {
    let _ = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(token(9001, true))
        .send()
        .await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_ready() {
    let response = Client::new()
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let expected = (Utc::now().date_naive() + Duration::days(7)).to_string();

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(token(9002, false))
        .json(&json!({ "book_id": book_id, "expected_return_date": expected }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let borrowing: Value = response.json().await.expect("Failed to parse response");

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .bearer_auth(token(9003, false))
        .json(&json!({ "book_id": book_id, "expected_return_date": expected }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["book"], "Live test book is out of stock");

    let response = client
        .post(format!("{}/borrowings/{}/return", BASE_URL, borrowing["id"]))
        .bearer_auth(token(9002, false))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    delete_book(&client, book_id).await;
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_on_last_copy() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    let expected = (Utc::now().date_naive() + Duration::days(7)).to_string();

    let requests = (0..8).map(|i| {
        let client = client.clone();
        let expected = expected.clone();
        tokio::spawn(async move {
            client
                .post(format!("{}/borrowings", BASE_URL))
                .bearer_auth(token(9100 + i, false))
                .json(&json!({ "book_id": book_id, "expected_return_date": expected }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        })
    });

    let mut created = 0;
    for handle in requests.collect::<Vec<_>>() {
        if handle.await.expect("task panicked") == 201 {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["inventory"], 0);

    delete_book(&client, book_id).await;
}
