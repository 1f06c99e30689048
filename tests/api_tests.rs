//! API integration tests
//!
//! These tests run against a live server (`cargo run`) with a migrated
//! database and an existing admin account (admin@librarium.org / admin).
//! Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so repeated runs do not trip uniqueness constraints
fn unique() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

/// Helper to get an admin token
async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@librarium.org",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Create an author and return its id
async fn create_author(client: &Client, token: &str, name: &str) -> i64 {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "name": name,
            "biography": "Test biography",
            "birth_date": "1950-06-15"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No author ID")
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
async fn test_register_login_me() {
    let client = Client::builder().cookie_store(true).build().unwrap();
    let n = unique();
    let email = format!("user{}@example.org", n);

    // Register
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "phone_number": format!("+1555{}", n % 10_000_000),
            "first_name": "Test",
            "last_name": "User",
            "email": email,
            "password": "hunter22"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Login sets the access-token cookie
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");

    // Cookie authenticates /auth/me
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], email.as_str());
    // Password digest must never be serialized
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_duplicate_registration_conflict() {
    let client = Client::new();
    let n = unique();
    let email = format!("dup{}@example.org", n);
    let payload = json!({
        "phone_number": format!("+1666{}", n % 10_000_000),
        "first_name": "Dup",
        "last_name": "User",
        "email": email,
        "password": "hunter22"
    });

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_invalid_credentials_do_not_leak_registration() {
    let client = Client::new();
    let n = unique();
    let email = format!("leak{}@example.org", n);

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "phone_number": format!("+1777{}", n % 10_000_000),
            "first_name": "Leak",
            "last_name": "Check",
            "email": email,
            "password": "hunter22"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Wrong password for a registered email
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
    let wrong_password: Value = response.json().await.expect("Failed to parse response");

    // Unregistered email
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": format!("nobody{}@example.org", n), "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
    let unknown_email: Value = response.json().await.expect("Failed to parse response");

    // Both causes must be externally indistinguishable
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
#[ignore]
async fn test_requests_without_token_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/authors", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_non_admin_cannot_write() {
    let client = Client::new();
    let n = unique();
    let email = format!("plain{}@example.org", n);

    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "phone_number": format!("+1888{}", n % 10_000_000),
            "first_name": "Plain",
            "last_name": "User",
            "email": email,
            "password": "hunter22"
        }))
        .send()
        .await
        .expect("Failed to send request");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let token = body["token"].as_str().unwrap().to_string();

    // Reads are allowed
    let response = client
        .get(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Writes are not
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": format!("Denied {}", n), "birth_date": "1950-06-15" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_author_crud_round_trip() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let n = unique();
    let name = format!("Author {}", n);

    let author_id = create_author(&client, &token, &name).await;

    // Created record is readable and equal
    let response = client
        .get(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], name.as_str());
    assert_eq!(body["biography"], "Test biography");
    assert_eq!(body["birth_date"], "1950-06-15");

    // Partial update only touches the given field
    let response = client
        .put(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "biography": "Rewritten" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["name"], name.as_str());
    assert_eq!(body["biography"], "Rewritten");

    // Empty update leaves the record unchanged
    let response = client
        .put(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["biography"], "Rewritten");

    // Delete removes the record
    let response = client
        .delete(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    // Second delete finds nothing
    let response = client
        .delete(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_genre_conflict() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let name = format!("Genre {}", unique());

    let response = client
        .post(format!("{}/genres", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/genres", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_list_pagination_and_count() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let n = unique();

    for i in 0..3 {
        create_author(&client, &token, &format!("Paged {} {}", n, i)).await;
    }

    let response = client
        .get(format!("{}/authors?page=1&per_page=2", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].as_array().unwrap().len() <= 2);
    assert!(body["total"].as_i64().unwrap() >= 3);

    // Exact-match filter narrows to one
    let response = client
        .get(format!("{}/authors", BASE_URL))
        .query(&[("name", format!("Paged {} 0", n))])
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total"], 1);

    // Unknown filter keys are ignored, not an error
    let response = client
        .get(format!("{}/authors?bogus_filter=1", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_flow() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let n = unique();

    let author_id = create_author(&client, &token, &format!("Loan Author {}", n)).await;

    // One copy only
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": format!("Loanable Book {}", n),
            "publication_date": "2001-01-01",
            "author_id": author_id,
            "available_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/readers", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "name": format!("Reader {}", n),
            "email": format!("reader{}@example.org", n)
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let reader: Value = response.json().await.expect("Failed to parse response");
    let reader_id = reader["id"].as_i64().unwrap();

    // Borrow the only copy
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "reader_id": reader_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loan["id"].as_i64().unwrap();
    assert!(loan["return_date"].is_null());

    // No copies left
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "reader_id": reader_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Return restores the copy
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert!(returned["return_date"].is_string());

    // Double return is rejected
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Borrowing works again
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "reader_id": reader_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    // Reader's loans include both records
    let response = client
        .get(format!("{}/readers/{}/loans", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let loans: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loans.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_delete_author_with_books_forbidden() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let n = unique();

    let author_id = create_author(&client, &token, &format!("Busy Author {}", n)).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": format!("Busy Book {}", n),
            "publication_date": "2010-05-01",
            "author_id": author_id
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .delete(format!("{}/authors/{}", BASE_URL, author_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_book_genres_association() {
    let client = Client::new();
    let token = get_admin_token(&client).await;
    let n = unique();

    let author_id = create_author(&client, &token, &format!("Genre Author {}", n)).await;

    let mut genre_ids = Vec::new();
    for name in ["Fantasy", "History"] {
        let response = client
            .post(format!("{}/genres", BASE_URL))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "name": format!("{} {}", name, n) }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
        let genre: Value = response.json().await.expect("Failed to parse response");
        genre_ids.push(genre["id"].as_i64().unwrap());
    }

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": format!("Tagged Book {}", n),
            "publication_date": "1999-09-09",
            "author_id": author_id,
            "genre_ids": genre_ids
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["genres"].as_array().unwrap().len(), 2);

    // Replace the genre set
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book["id"].as_i64().unwrap()))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "genre_ids": [genre_ids[0]] }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let book: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(book["genres"].as_array().unwrap().len(), 1);

    // Genre lists the book
    let response = client
        .get(format!("{}/genres/{}/books", BASE_URL, genre_ids[0]))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let books: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(books.as_array().unwrap().len(), 1);
}
