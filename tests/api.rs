//! HTTP integration tests for the question board API

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Duration;
use serde_json::{json, Value};

use tutome::api::{build_router, AppState};
use tutome::config::RulesConfig;
use tutome::db::repositories::{SessionRepository, SqlxSessionRepository, SqlxTagRepository, TagRepository};
use tutome::db::{create_test_pool, migrations};
use tutome::models::Session;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";
const STALE: &str = "stale-token";

// Tag ids follow insertion order
const ALGEBRA: i64 = 1;
const GEOMETRY: i64 = 2;
const CALCULUS: i64 = 3;
const EASY: i64 = 4;
const HARD: i64 = 5;
const STARTED: i64 = 6;
const SOLVED: i64 = 7;

async fn setup() -> TestServer {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("INSERT INTO users (username) VALUES ('alice'), ('bob')")
        .execute(pool.as_sqlite().unwrap())
        .await
        .expect("Failed to create users");

    let sessions = SqlxSessionRepository::new(pool.clone());
    for session in [
        Session::new(ALICE, 1, Duration::hours(1)),
        Session::new(BOB, 2, Duration::hours(1)),
        Session::new(STALE, 1, Duration::hours(-1)),
    ] {
        sessions.create(&session).await.expect("Failed to create session");
    }

    let tags = SqlxTagRepository::new(pool.clone());
    for (name, category) in [
        ("Algebra", "subject"),
        ("Geometry", "subject"),
        ("Calculus", "subject"),
        ("Easy", "difficulty"),
        ("Hard", "difficulty"),
        ("Started", "progress"),
        ("Solved", "progress"),
    ] {
        tags.create(name, category).await.expect("Failed to seed tag");
    }

    let state = AppState::new(pool, RulesConfig::default());
    let app = build_router(state, "http://localhost:5173").expect("Failed to build router");
    TestServer::new(app).expect("Failed to start test server")
}

async fn create_question(server: &TestServer, token: &str, tag_ids: &[i64]) -> Value {
    let response = server
        .post("/api/v1/questions")
        .authorization_bearer(token)
        .json(&json!({
            "title": "How do I factor this?",
            "content": "x^2 - 5x + 6",
            "tag_ids": tag_ids,
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

async fn question_total(server: &TestServer) -> i64 {
    let body = server.get("/api/v1/questions").await.json::<Value>();
    body["total"].as_i64().unwrap()
}

fn question_ids(body: &Value) -> Vec<i64> {
    body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_returns_question_with_sorted_tags() {
    let server = setup().await;

    let body = create_question(&server, ALICE, &[STARTED, GEOMETRY, EASY, ALGEBRA]).await;

    assert_eq!(body["author_id"], 1);
    assert_eq!(body["title"], "How do I factor this?");
    let names: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Algebra", "Easy", "Geometry", "Started"]);
    assert_eq!(body["tags"][0]["category"], "subject");
}

#[tokio::test]
async fn create_requires_a_live_session() {
    let server = setup().await;
    let payload = json!({ "title": "t", "content": "c", "tag_ids": [ALGEBRA, EASY, STARTED] });

    let anonymous = server.post("/api/v1/questions").json(&payload).await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    let stale = server
        .post("/api/v1/questions")
        .authorization_bearer(STALE)
        .json(&payload)
        .await;
    assert_eq!(stale.status_code(), StatusCode::UNAUTHORIZED);

    let unknown = server
        .post("/api/v1/questions")
        .authorization_bearer("nobody")
        .json(&payload)
        .await;
    assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);

    assert_eq!(question_total(&server).await, 0);
}

#[tokio::test]
async fn create_accepts_session_cookie() {
    let server = setup().await;

    let response = server
        .post("/api/v1/questions")
        .add_header(header::COOKIE, HeaderValue::from_static("session=bob-token"))
        .json(&json!({ "title": "t", "content": "c", "tag_ids": [CALCULUS, HARD, SOLVED] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["author_id"], 2);
}

#[tokio::test]
async fn create_missing_required_category_is_rejected() {
    let server = setup().await;

    let response = server
        .post("/api/v1/questions")
        .authorization_bearer(ALICE)
        .json(&json!({ "title": "t", "content": "c", "tag_ids": [ALGEBRA, EASY] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "MISSING_REQUIRED_CATEGORY");
    assert_eq!(body["error"]["details"]["category"], "progress");
    assert_eq!(body["error"]["details"]["min"], 1);
    assert_eq!(question_total(&server).await, 0);
}

#[tokio::test]
async fn create_above_maximum_is_rejected() {
    let server = setup().await;

    let response = server
        .post("/api/v1/questions")
        .authorization_bearer(ALICE)
        .json(&json!({
            "title": "t",
            "content": "c",
            "tag_ids": [ALGEBRA, GEOMETRY, CALCULUS, EASY, STARTED],
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "ABOVE_MAXIMUM");
    assert_eq!(body["error"]["details"]["category"], "subject");
    assert_eq!(body["error"]["details"]["max"], 2);
    assert_eq!(body["error"]["details"]["count"], 3);
    assert_eq!(question_total(&server).await, 0);
}

#[tokio::test]
async fn create_unknown_tag_commits_nothing() {
    let server = setup().await;

    let response = server
        .post("/api/v1/questions")
        .authorization_bearer(ALICE)
        .json(&json!({ "title": "t", "content": "c", "tag_ids": [ALGEBRA, EASY, STARTED, 99] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "UNKNOWN_TAG");
    assert_eq!(body["error"]["details"]["unknown_ids"], json!([99]));
    assert_eq!(question_total(&server).await, 0);
}

#[tokio::test]
async fn create_missing_field_is_a_bad_request() {
    let server = setup().await;

    let response = server
        .post("/api/v1/questions")
        .authorization_bearer(ALICE)
        .json(&json!({ "content": "c", "tag_ids": [ALGEBRA, EASY, STARTED] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_matches_questions_carrying_all_tags() {
    let server = setup().await;
    let both = create_question(&server, ALICE, &[ALGEBRA, GEOMETRY, EASY, STARTED]).await;
    let only_algebra = create_question(&server, ALICE, &[ALGEBRA, HARD, SOLVED]).await;
    let both_id = both["id"].as_i64().unwrap();
    let only_id = only_algebra["id"].as_i64().unwrap();

    let pair = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", format!("{},{}", ALGEBRA, GEOMETRY))
        .await;
    assert_eq!(pair.status_code(), StatusCode::OK);
    let pair = pair.json::<Value>();
    assert_eq!(question_ids(&pair), vec![both_id]);
    assert_eq!(pair["total"], 1);
    assert_eq!(pair["search_tags"], json!([ALGEBRA, GEOMETRY]));
    assert_eq!(pair["tag_categories"][ALGEBRA.to_string()], "subject");

    let single = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", ALGEBRA)
        .await
        .json::<Value>();
    assert_eq!(question_ids(&single), vec![only_id, both_id]);
    assert_eq!(single["total"], 2);
}

#[tokio::test]
async fn search_accepts_json_body() {
    let server = setup().await;
    let question = create_question(&server, BOB, &[CALCULUS, HARD, SOLVED]).await;

    let response = server
        .post("/api/v1/questions/search")
        .json(&json!({ "tag_ids": [CALCULUS, HARD] }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(question_ids(&body), vec![question["id"].as_i64().unwrap()]);
    assert_eq!(body["tag_categories"][HARD.to_string()], "difficulty");
}

#[tokio::test]
async fn search_total_counts_every_page() {
    let server = setup().await;
    for _ in 0..5 {
        create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;
    }
    create_question(&server, ALICE, &[GEOMETRY, EASY, STARTED]).await;

    let body = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", format!("{},{}", ALGEBRA, EASY))
        .add_query_param("page", 2)
        .add_query_param("limit", 3)
        .await
        .json::<Value>();

    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 5);
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 3);
}

#[tokio::test]
async fn search_violation_reports_counts() {
    let server = setup().await;

    let response = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", EASY)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "MISSING_REQUIRED_CATEGORY");
    assert_eq!(body["error"]["details"]["category"], "subject");
    assert_eq!(body["error"]["details"]["counts"]["difficulty"], 1);
}

#[tokio::test]
async fn search_rejects_unknown_and_malformed_ids() {
    let server = setup().await;

    let unknown = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", format!("{},404", ALGEBRA))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
    let body = unknown.json::<Value>();
    assert_eq!(body["error"]["code"], "UNKNOWN_TAG");
    assert_eq!(body["error"]["details"]["unknown_ids"], json!([404]));

    let malformed = server
        .get("/api/v1/questions/search")
        .add_query_param("tags", "1,abc")
        .await;
    assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(malformed.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn search_without_tags_lists_newest_first() {
    let server = setup().await;
    let first = create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;
    let second = create_question(&server, BOB, &[GEOMETRY, HARD, SOLVED]).await;

    let body = server.get("/api/v1/questions/search").await.json::<Value>();

    assert_eq!(
        question_ids(&body),
        vec![second["id"].as_i64().unwrap(), first["id"].as_i64().unwrap()]
    );
    assert_eq!(body["total"], 2);
    assert_eq!(body["search_tags"], json!([]));
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
async fn tags_are_listed_and_grouped() {
    let server = setup().await;

    let list = server.get("/api/v1/tags").await.json::<Value>();
    let names: Vec<&str> = list["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["Algebra", "Calculus", "Easy", "Geometry", "Hard", "Solved", "Started"]
    );

    let grouped = server.get("/api/v1/tags/grouped").await.json::<Value>();
    assert_eq!(
        grouped["subject"],
        json!([
            { "id": ALGEBRA, "name": "Algebra" },
            { "id": CALCULUS, "name": "Calculus" },
            { "id": GEOMETRY, "name": "Geometry" },
        ])
    );
    assert_eq!(grouped["progress"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn tag_questions_endpoint() {
    let server = setup().await;
    let tagged = create_question(&server, ALICE, &[CALCULUS, EASY, STARTED]).await;
    create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;

    let body = server
        .get(&format!("/api/v1/tags/{}/questions", CALCULUS))
        .await
        .json::<Value>();
    assert_eq!(question_ids(&body), vec![tagged["id"].as_i64().unwrap()]);

    let unknown = server.get("/api/v1/tags/77/questions").await;
    assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.json::<Value>()["error"]["code"], "UNKNOWN_TAG");

    let invalid = server.get("/api/v1/tags/0/questions").await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(invalid.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

// ============================================================================
// Listing, lookup and delete
// ============================================================================

#[tokio::test]
async fn list_filters_by_tag_and_author() {
    let server = setup().await;
    let alice = create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;
    let bob = create_question(&server, BOB, &[GEOMETRY, EASY, STARTED]).await;
    let alice_id = alice["id"].as_i64().unwrap();
    let bob_id = bob["id"].as_i64().unwrap();

    let by_tag = server
        .get("/api/v1/questions")
        .add_query_param("tag_id", GEOMETRY)
        .await
        .json::<Value>();
    assert_eq!(question_ids(&by_tag), vec![bob_id]);

    let by_user = server.get("/api/v1/questions/user/1").await.json::<Value>();
    assert_eq!(question_ids(&by_user), vec![alice_id]);

    let mine = server
        .get("/api/v1/questions/mine")
        .authorization_bearer(BOB)
        .await
        .json::<Value>();
    assert_eq!(question_ids(&mine), vec![bob_id]);

    let anonymous = server.get("/api/v1/questions/mine").await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_question_by_id() {
    let server = setup().await;
    let created = create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;
    let id = created["id"].as_i64().unwrap();

    let found = server.get(&format!("/api/v1/questions/{}", id)).await;
    assert_eq!(found.status_code(), StatusCode::OK);
    assert_eq!(found.json::<Value>()["tags"], created["tags"]);

    let missing = server.get("/api/v1/questions/999").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn only_the_author_may_delete() {
    let server = setup().await;
    let created = create_question(&server, ALICE, &[ALGEBRA, EASY, STARTED]).await;
    let path = format!("/api/v1/questions/{}", created["id"].as_i64().unwrap());

    let anonymous = server.delete(&path).await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let forbidden = server.delete(&path).authorization_bearer(BOB).await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(forbidden.json::<Value>()["error"]["code"], "FORBIDDEN");

    let deleted = server.delete(&path).authorization_bearer(ALICE).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    assert_eq!(server.get(&path).await.status_code(), StatusCode::NOT_FOUND);
    let again = server.delete(&path).authorization_bearer(ALICE).await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_tag_lists_are_client_errors() {
    let server = setup().await;
    let too_many: Vec<i64> = (1..=40_000).collect();

    let create = server
        .post("/api/v1/questions")
        .authorization_bearer(ALICE)
        .json(&json!({ "title": "t", "content": "c", "tag_ids": &too_many }))
        .await;
    assert_eq!(create.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(create.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(question_total(&server).await, 0);

    let search = server
        .post("/api/v1/questions/search")
        .json(&json!({ "tag_ids": &too_many }))
        .await;
    assert_eq!(search.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(search.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}
