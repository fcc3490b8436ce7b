//! In-memory imitation of the Mailchimp marketing API 3.0.
//!
//! Serves the subset the client and its tests touch: lists, interest
//! categories, interests and list members. Errors are problem documents
//! (`type`, `title`, `status`, `detail`, `instance`) like the real API, and
//! DELETE answers 204 with no body.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

/// Key accepted by `app()`.
pub const DEFAULT_API_KEY: &str = "0123456789abcdef0123456789abcdef-us6";

pub const WEEKLY_LIST_ID: &str = "4ca5becb8d";
pub const UPDATES_LIST_ID: &str = "7c1e2f9a3b";
pub const TOPICS_CATEGORY_ID: &str = "b7c3d9e1f0";
pub const REGIONS_CATEGORY_ID: &str = "c0ffee1234";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct List {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestCategory {
    pub id: String,
    pub list_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interest {
    pub id: String,
    pub category_id: String,
    pub list_id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: String,
    pub email_address: String,
    pub status: String,
    pub list_id: String,
    pub merge_fields: Value,
    pub interests: BTreeMap<String, bool>,
}

/// Writable member fields. `status_if_new` only applies to PUT.
#[derive(Debug, Default, Deserialize)]
pub struct MemberInput {
    pub email_address: Option<String>,
    pub status: Option<String>,
    pub status_if_new: Option<String>,
    pub merge_fields: Option<Value>,
    pub interests: Option<BTreeMap<String, bool>>,
}

impl Member {
    fn apply(&mut self, input: MemberInput) {
        if let Some(email) = input.email_address {
            self.email_address = email;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        if let Some(merge_fields) = input.merge_fields {
            self.merge_fields = merge_fields;
        }
        if let Some(interests) = input.interests {
            self.interests.extend(interests);
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub lists: Vec<List>,
    pub categories: Vec<InterestCategory>,
    pub interests: Vec<Interest>,
    /// Keyed by `(list_id, subscriber_hash)`.
    pub members: HashMap<(String, String), Member>,
}

impl Store {
    /// Two lists; the first has two interest categories with three
    /// interests between them.
    pub fn seeded() -> Self {
        let list = |id: &str, name: &str| List {
            id: id.to_string(),
            name: name.to_string(),
        };
        let category = |id: &str, title: &str| InterestCategory {
            id: id.to_string(),
            list_id: WEEKLY_LIST_ID.to_string(),
            title: title.to_string(),
            kind: "checkboxes".to_string(),
        };
        let interest = |id: &str, category_id: &str, name: &str| Interest {
            id: id.to_string(),
            category_id: category_id.to_string(),
            list_id: WEEKLY_LIST_ID.to_string(),
            name: name.to_string(),
        };

        Self {
            lists: vec![
                list(WEEKLY_LIST_ID, "Weekly Digest"),
                list(UPDATES_LIST_ID, "Product Updates"),
            ],
            categories: vec![
                category(TOPICS_CATEGORY_ID, "Topics"),
                category(REGIONS_CATEGORY_ID, "Regions"),
            ],
            interests: vec![
                interest("9143cf3bd1", TOPICS_CATEGORY_ID, "Rust"),
                interest("3a2b1c0d9e", TOPICS_CATEGORY_ID, "Databases"),
                interest("5e6f7a8b9c", REGIONS_CATEGORY_ID, "Europe"),
            ],
            members: HashMap::new(),
        }
    }

    fn has_list(&self, list_id: &str) -> bool {
        self.lists.iter().any(|list| list.id == list_id)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub api_key: Arc<str>,
}

/// Error document in the shape the API returns.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

impl Problem {
    fn new(status: StatusCode, title: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: "https://mailchimp.com/developer/marketing/docs/errors/".to_string(),
            title: title.to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "API Key Invalid",
            "Your API key may be invalid, or you've attempted to access the wrong datacenter.",
        )
    }

    fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Resource Not Found",
            "The requested resource could not be found.",
        )
    }

    fn invalid_resource(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid Resource", detail)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

pub fn subscriber_hash(email: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(email.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

pub fn app() -> Router {
    app_with_key(DEFAULT_API_KEY)
}

/// Router that accepts only `Authorization: apikey <api_key>`.
pub fn app_with_key(api_key: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::seeded())),
        api_key: Arc::from(api_key),
    };

    let api = Router::new()
        .route("/lists", get(list_lists))
        .route("/lists/{list_id}/interest-categories", get(list_categories))
        .route(
            "/lists/{list_id}/interest-categories/{category_id}/interests",
            get(list_interests),
        )
        .route("/lists/{list_id}/members", post(create_member))
        .route(
            "/lists/{list_id}/members/{subscriber_hash}",
            get(get_member)
                .put(upsert_member)
                .patch(update_member)
                .delete(delete_member),
        );

    Router::new().nest("/3.0", api).with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Problem> {
    let expected = format!("apikey {}", state.api_key);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(Problem::unauthorized()),
    }
}

fn parse_input(body: &[u8]) -> Result<MemberInput, Problem> {
    if body.is_empty() {
        return Ok(MemberInput::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        Problem::invalid_resource(format!("The resource submitted could not be validated: {e}"))
    })
}

#[derive(Debug, Deserialize)]
pub struct Page {
    pub count: Option<usize>,
    pub offset: Option<usize>,
}

async fn list_lists(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<Page>,
) -> Result<Json<Value>, Problem> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let lists: Vec<&List> = store
        .lists
        .iter()
        .skip(page.offset.unwrap_or(0))
        .take(page.count.unwrap_or(10))
        .collect();
    Ok(Json(json!({ "lists": lists, "total_items": store.lists.len() })))
}

async fn list_categories(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Problem> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    if !store.has_list(&list_id) {
        return Err(Problem::not_found());
    }
    let categories: Vec<&InterestCategory> =
        store.categories.iter().filter(|c| c.list_id == list_id).collect();
    Ok(Json(json!({
        "list_id": list_id,
        "categories": categories,
        "total_items": categories.len(),
    })))
}

async fn list_interests(
    State(state): State<AppState>,
    Path((list_id, category_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, Problem> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    let category_exists = store
        .categories
        .iter()
        .any(|c| c.id == category_id && c.list_id == list_id);
    if !category_exists {
        return Err(Problem::not_found());
    }
    let interests: Vec<&Interest> = store
        .interests
        .iter()
        .filter(|i| i.list_id == list_id && i.category_id == category_id)
        .collect();
    Ok(Json(json!({
        "list_id": list_id,
        "category_id": category_id,
        "interests": interests,
        "total_items": interests.len(),
    })))
}

async fn create_member(
    State(state): State<AppState>,
    Path(list_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Member>, Problem> {
    authorize(&state, &headers)?;
    let input = parse_input(&body)?;
    let mut store = state.db.write().await;
    if !store.has_list(&list_id) {
        return Err(Problem::not_found());
    }

    let (Some(email), Some(status)) = (input.email_address.clone(), input.status.clone()) else {
        return Err(Problem::invalid_resource(
            "The resource submitted could not be validated. email_address and status are required.",
        ));
    };

    let hash = subscriber_hash(&email);
    let key = (list_id.clone(), hash.clone());
    if store.members.contains_key(&key) {
        return Err(Problem::new(
            StatusCode::BAD_REQUEST,
            "Member Exists",
            format!("{email} is already a list member. Use PUT to insert or update list members."),
        ));
    }

    let mut member = Member {
        id: hash,
        email_address: email,
        status,
        list_id,
        merge_fields: json!({}),
        interests: BTreeMap::new(),
    };
    member.apply(MemberInput {
        email_address: None,
        status: None,
        ..input
    });
    info!(list_id = %member.list_id, member = %member.id, "member created");
    store.members.insert(key, member.clone());
    Ok(Json(member))
}

async fn get_member(
    State(state): State<AppState>,
    Path((list_id, hash)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Member>, Problem> {
    authorize(&state, &headers)?;
    let store = state.db.read().await;
    store
        .members
        .get(&(list_id, hash))
        .cloned()
        .map(Json)
        .ok_or_else(Problem::not_found)
}

async fn upsert_member(
    State(state): State<AppState>,
    Path((list_id, hash)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Member>, Problem> {
    authorize(&state, &headers)?;
    let mut input = parse_input(&body)?;
    let mut store = state.db.write().await;
    if !store.has_list(&list_id) {
        return Err(Problem::not_found());
    }

    let key = (list_id.clone(), hash.clone());
    if let Some(member) = store.members.get_mut(&key) {
        input.status_if_new = None;
        member.apply(input);
        debug!(list_id = %list_id, member = %hash, "member updated");
        return Ok(Json(member.clone()));
    }

    let status = input.status.clone().or_else(|| input.status_if_new.clone());
    let (Some(email), Some(status)) = (input.email_address.clone(), status) else {
        return Err(Problem::invalid_resource(
            "The resource submitted could not be validated. email_address and status_if_new are required.",
        ));
    };
    let mut member = Member {
        id: hash,
        email_address: email,
        status,
        list_id,
        merge_fields: json!({}),
        interests: BTreeMap::new(),
    };
    member.apply(MemberInput {
        email_address: None,
        status: None,
        ..input
    });
    info!(list_id = %member.list_id, member = %member.id, "member created by upsert");
    store.members.insert(key, member.clone());
    Ok(Json(member))
}

async fn update_member(
    State(state): State<AppState>,
    Path((list_id, hash)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Member>, Problem> {
    authorize(&state, &headers)?;
    let input = parse_input(&body)?;
    let mut store = state.db.write().await;
    let member = store
        .members
        .get_mut(&(list_id, hash))
        .ok_or_else(Problem::not_found)?;
    member.apply(input);
    Ok(Json(member.clone()))
}

async fn delete_member(
    State(state): State<AppState>,
    Path((list_id, hash)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, Problem> {
    authorize(&state, &headers)?;
    let mut store = state.db.write().await;
    store
        .members
        .remove(&(list_id, hash))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(Problem::not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_serializes_type_field() {
        let json = serde_json::to_value(Problem::not_found()).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["title"], "Resource Not Found");
        assert!(json["type"].as_str().unwrap().starts_with("https://"));
    }

    #[test]
    fn seeded_store_has_lists_and_interests() {
        let store = Store::seeded();
        assert_eq!(store.lists.len(), 2);
        assert!(store.has_list(WEEKLY_LIST_ID));
        assert!(!store.has_list("missing"));
        assert_eq!(
            store.interests.iter().filter(|i| i.category_id == TOPICS_CATEGORY_ID).count(),
            2
        );
    }

    #[test]
    fn member_input_fields_are_optional() {
        let input: MemberInput = serde_json::from_str("{}").unwrap();
        assert!(input.email_address.is_none());
        assert!(input.status.is_none());
    }

    #[test]
    fn apply_merges_interests() {
        let mut member = Member {
            id: "x".to_string(),
            email_address: "a@b.c".to_string(),
            status: "pending".to_string(),
            list_id: WEEKLY_LIST_ID.to_string(),
            merge_fields: json!({}),
            interests: BTreeMap::from([("i1".to_string(), true)]),
        };
        member.apply(MemberInput {
            status: Some("subscribed".to_string()),
            interests: Some(BTreeMap::from([("i2".to_string(), false)])),
            ..MemberInput::default()
        });
        assert_eq!(member.status, "subscribed");
        assert_eq!(member.interests.len(), 2);
    }

    #[test]
    fn subscriber_hash_lowercases() {
        assert_eq!(subscriber_hash("Foo@Bar.com"), "f3ada405ce890b6f8204094deb12d8a8");
    }
}
