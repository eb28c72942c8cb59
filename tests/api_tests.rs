//! API integration tests
//!
//! These run against a live server with a seeded admin account
//! (admin@libris.local / admin). Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}+{}@example.com", prefix, nanos)
}

async fn admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@libris.local",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register a member and activate it through the admin status endpoint,
/// returning the member's token.
async fn active_member_token(client: &Client, admin: &str) -> String {
    let email = unique_email("member");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "Test Member"
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let user_id = body["id"].as_str().expect("No user id").to_string();

    let response = client
        .put(format!("{}/users/{}/status", BASE_URL, user_id))
        .bearer_auth(admin)
        .json(&json!({ "status": "Active" }))
        .send()
        .await
        .expect("Failed to activate");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to login");
    let body: Value = response.json().await.expect("Failed to parse response");
    body["token"].as_str().expect("No token").to_string()
}

async fn create_book(client: &Client, admin: &str, title: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "isbn": "978-0-0000-0000-0",
            "category": "Fiction",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore]
async fn test_seeded_admin_account() {
    let client = Client::new();

    // The bootstrap admin exists on a fresh database and is already Active
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@libris.local",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["role"], "Admin");
    assert_eq!(body["user"]["status"], "Active");

    // Admin-only routes are reachable with its token
    let token = body["token"].as_str().expect("No token");
    let response = client
        .get(format!("{}/users", BASE_URL))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to list users");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let email = unique_email("register");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "New Member"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "PendingVerification");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@libris.local",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_anonymous_catalog_browsing() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books"].is_array());
    assert!(body["categories"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_pending_member_cannot_borrow() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, "Pending Borrow Test", 1).await;

    let email = unique_email("pending");
    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "Pending Member"
        }))
        .send()
        .await
        .expect("Failed to register");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to login");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["token"].as_str().unwrap();

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit_enforced() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = active_member_token(&client, &admin).await;

    // Borrow three distinct books
    for i in 0..3 {
        let book_id = create_book(&client, &admin, &format!("Limit Test {}", i), 2).await;
        let response = client
            .post(format!("{}/borrows", BASE_URL))
            .bearer_auth(&member)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("Failed to borrow");
        assert_eq!(response.status(), 201);
    }

    // The fourth borrow is rejected with the limit reason
    let book_id = create_book(&client, &admin, "Limit Test 3", 2).await;
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "MaxBorrowsReached");
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = active_member_token(&client, &admin).await;
    let book_id = create_book(&client, &admin, "Return Cycle Test", 1).await;

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&member)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to borrow");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrow_id = body["id"].as_i64().unwrap();
    assert_eq!(body["available_copies"], 0);

    // Second borrow of the same book cannot succeed
    let other = active_member_token(&client, &admin).await;
    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .bearer_auth(&other)
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BookUnavailable");

    // Return frees the copy
    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, borrow_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to return");
    assert!(response.status().is_success());

    // Returning twice is rejected
    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, borrow_id))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_of_last_copy() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, "Concurrency Test", 1).await;

    let member_a = active_member_token(&client, &admin).await;
    let member_b = active_member_token(&client, &admin).await;

    let borrow = |token: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/borrows", BASE_URL))
                .bearer_auth(token)
                .json(&json!({ "book_id": book_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }
    };

    let (status_a, status_b) = tokio::join!(borrow(member_a), borrow(member_b));

    // Exactly one request wins the last copy
    let successes = [status_a, status_b]
        .iter()
        .filter(|s| s.is_success())
        .count();
    assert_eq!(successes, 1);

    // Availability never goes negative
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available_copies"], 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_by_same_user_respect_limit() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = active_member_token(&client, &admin).await;

    // Two open borrows, one slot left under the limit
    for i in 0..2 {
        let book_id = create_book(&client, &admin, &format!("User Race Test {}", i), 2).await;
        let response = client
            .post(format!("{}/borrows", BASE_URL))
            .bearer_auth(&member)
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("Failed to borrow");
        assert_eq!(response.status(), 201);
    }

    let book_c = create_book(&client, &admin, "User Race Test C", 2).await;
    let book_d = create_book(&client, &admin, "User Race Test D", 2).await;

    let borrow = |book_id: i64| {
        let client = client.clone();
        let token = member.clone();
        async move {
            client
                .post(format!("{}/borrows", BASE_URL))
                .bearer_auth(token)
                .json(&json!({ "book_id": book_id }))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }
    };

    // Simultaneous borrows of different books still cannot exceed the limit
    let (status_c, status_d) = tokio::join!(borrow(book_c), borrow(book_d));
    let successes = [status_c, status_d]
        .iter()
        .filter(|s| s.is_success())
        .count();
    assert_eq!(successes, 1);
}

#[tokio::test]
#[ignore]
async fn test_not_found_error_codes() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = active_member_token(&client, &admin).await;

    let response = client
        .get(format!("{}/books/2147483646", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoSuchBook");

    let response = client
        .post(format!("{}/borrows/2147483646/return", BASE_URL))
        .bearer_auth(&member)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoSuchBorrow");

    let response = client
        .get(format!(
            "{}/users/00000000-0000-0000-0000-000000000000",
            BASE_URL
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoSuchUser");
}

#[tokio::test]
#[ignore]
async fn test_status_transition_rules() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let email = unique_email("transition");
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "password123",
            "full_name": "Transition Test"
        }))
        .send()
        .await
        .expect("Failed to register");
    let body: Value = response.json().await.expect("Failed to parse response");
    let user_id = body["id"].as_str().unwrap().to_string();

    // PendingVerification -> Suspended is not in the table
    let response = client
        .put(format!("{}/users/{}/status", BASE_URL, user_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "Suspended" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "IllegalTransition");

    // PendingVerification -> Active is allowed
    let response = client
        .put(format!("{}/users/{}/status", BASE_URL, user_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "Active" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Active -> Banned is allowed and terminal
    let response = client
        .put(format!("{}/users/{}/status", BASE_URL, user_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "Banned" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/users/{}/status", BASE_URL, user_id))
        .bearer_auth(&admin)
        .json(&json!({ "status": "Active" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}
