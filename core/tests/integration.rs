//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `MailchimpClient`
//! with its real `UreqTransport` over HTTP. The endpoint template has no
//! `<dc>` placeholder so every data center resolves to the local server.

use std::time::Duration;

use mailchimp_core::{member_path, ClientOptions, HttpMethod, MailchimpClient, Outcome};
use mock_server::{DEFAULT_API_KEY, REGIONS_CATEGORY_ID, TOPICS_CATEGORY_ID, UPDATES_LIST_ID, WEEKLY_LIST_ID};
use serde_json::json;

/// Start the mock server on a background thread and return its base URL.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, DEFAULT_API_KEY).await
        })
        .unwrap();
    });

    format!("http://{addr}/3.0")
}

fn client_for(endpoint: &str, key: &str) -> MailchimpClient {
    MailchimpClient::with_options(key, ClientOptions::with_endpoint(endpoint)).unwrap()
}

#[test]
fn lookups_resolve_seeded_resources() {
    let endpoint = start_server();
    let client = client_for(&endpoint, DEFAULT_API_KEY);

    assert_eq!(client.resolve_list_id("Weekly Digest").as_deref(), Some(WEEKLY_LIST_ID));
    assert_eq!(client.resolve_list_id("Product Updates").as_deref(), Some(UPDATES_LIST_ID));
    assert_eq!(client.resolve_list_id("No Such List"), None);
    assert!(client.success(), "the lookup call itself succeeded");

    assert_eq!(
        client.resolve_interest_category_id("Regions", WEEKLY_LIST_ID).as_deref(),
        Some(REGIONS_CATEGORY_ID)
    );
    assert_eq!(client.resolve_interest_category_id("Topics", UPDATES_LIST_ID), None);

    let interests = client
        .list_interests_in_category(WEEKLY_LIST_ID, TOPICS_CATEGORY_ID)
        .unwrap();
    assert_eq!(interests.len(), 2);
    assert_eq!(interests["9143cf3bd1"], "Rust");
    assert_eq!(interests["3a2b1c0d9e"], "Databases");
}

#[test]
fn get_sends_args_as_query() {
    let endpoint = start_server();
    let client = client_for(&endpoint, DEFAULT_API_KEY);

    let exchange = client.get("lists", &json!({"count": 1, "offset": 1}));
    assert!(exchange.success());
    assert!(exchange.request.url.ends_with("/lists?count=1&offset=1"));

    let lists = exchange.value().unwrap()["lists"].as_array().unwrap().clone();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0]["id"], UPDATES_LIST_ID);
}

#[test]
fn wrong_key_is_an_api_error() {
    let endpoint = start_server();
    let client = client_for(&endpoint, "ffffffffffffffff-us6");

    let exchange = client.get("lists", &json!({}));
    assert!(!exchange.success());
    assert_eq!(exchange.response.status, Some(401));
    assert_eq!(exchange.value().unwrap()["title"], "API Key Invalid");
    assert!(client.last_error().starts_with("401: "));
    assert_eq!(client.resolve_list_id("Weekly Digest"), None);
}

#[test]
fn member_lifecycle() {
    let endpoint = start_server();
    let client = client_for(&endpoint, DEFAULT_API_KEY);
    let email = "Dana@Example.com";
    let path = member_path(WEEKLY_LIST_ID, email);

    // Step 1: unknown member is a 404 problem document.
    let exchange = client.get(&path, &json!({}));
    assert!(!exchange.success());
    assert_eq!(client.last_error(), "404: The requested resource could not be found.");

    // Step 2: create.
    let exchange = client.post(
        &format!("lists/{WEEKLY_LIST_ID}/members"),
        &json!({"email_address": email, "status": "subscribed"}),
    );
    assert!(exchange.success(), "create failed: {}", exchange.error());
    assert_eq!(exchange.value().unwrap()["id"], MailchimpClient::<mailchimp_core::UreqTransport>::subscriber_hash(email));
    assert_eq!(
        client.last_request().unwrap().body.as_deref(),
        Some(r#"{"email_address":"Dana@Example.com","status":"subscribed"}"#)
    );

    // Step 3: creating twice is rejected by the API.
    client.post(
        &format!("lists/{WEEKLY_LIST_ID}/members"),
        &json!({"email_address": email, "status": "subscribed"}),
    );
    assert!(!client.success());
    assert!(client.last_error().starts_with("400: "));

    // Step 4: patch; the member's own `status` field is not an error.
    let exchange = client.patch(&path, &json!({"status": "unsubscribed"}));
    assert!(exchange.success());
    assert_eq!(exchange.value().unwrap()["status"], "unsubscribed");

    // Step 5: put with an explicit timeout.
    let exchange = client.request(
        HttpMethod::Put,
        &path,
        &json!({"email_address": email, "merge_fields": {"FNAME": "Dana"}}),
        Duration::from_secs(5),
    );
    assert!(exchange.success());
    assert_eq!(exchange.value().unwrap()["merge_fields"]["FNAME"], "Dana");
    assert_eq!(client.last_request().unwrap().timeout, Duration::from_secs(5));

    // Step 6: delete answers 204 with no body: neither success nor error.
    let exchange = client.delete(&path, &json!({}));
    assert_eq!(exchange.outcome, Outcome::Empty);
    assert_eq!(exchange.response.status, Some(204));
    assert!(!client.success());
    assert_eq!(client.last_error(), "");
    assert_eq!(client.last_response().body.as_deref(), Some(""));

    // Step 7: gone.
    client.get(&path, &json!({}));
    assert!(client.last_error().starts_with("404: "));
}

#[test]
fn unreachable_server_is_a_transport_failure() {
    let client = client_for("http://127.0.0.1:1/3.0", DEFAULT_API_KEY);

    let exchange = client.get("lists", &json!({}));
    assert!(matches!(exchange.outcome, Outcome::Transport(_)));
    assert!(exchange.value().is_none());
    assert!(!client.success());
    assert!(!client.last_error().is_empty());
    assert!(client.last_response().body.is_none());
    assert!(client.last_request().is_some());
}
