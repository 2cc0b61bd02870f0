mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{id_of, unique_email, TestApp};

fn unique_digits() -> String {
    Uuid::new_v4().as_u128().to_string().chars().take(9).collect()
}

fn unique_phone() -> String {
    format!("+65 9{}", unique_digits())
}

fn new_profile(first_name: &str, last_name: &str, email: &str) -> Value {
    json!({
        "first_name": first_name,
        "last_name": last_name,
        "date_of_birth": "1990-04-12",
        "gender": "F",
        "email": email,
        "phone_number": unique_phone(),
        "address": "12 Orchard Road",
        "city": "Singapore",
        "state": "Central",
        "country": "Singapore",
        "postal": "238823",
    })
}

fn names(body: &Value) -> Vec<String> {
    let mut names: Vec<String> = body["data"]["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["first_name"].as_str().map(String::from)).collect())
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn create_normalizes_phone_and_starts_inactive() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);

    let digits = unique_digits();
    let mut body = new_profile("Nora", "Tan", &unique_email("nora"));
    body["phone_number"] = json!(format!("+65 9{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]));
    let (status, created) = app.post("/api/profiles", &agent, body).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["phone_number"], format!("+659{digits}"));
    assert_eq!(created["data"]["status"], "Inactive");
    Ok(())
}

#[tokio::test]
async fn underage_profile_is_rejected() -> Result<()> {
    let app = TestApp::without_database();
    let agent = app.token(Uuid::new_v4(), &[]);

    let mut body = new_profile("Kid", "Tan", &unique_email("kid"));
    body["date_of_birth"] = json!(chrono::Utc::now().date_naive().to_string());
    let (status, body) = app.post("/api/profiles", &agent, body).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["date_of_birth"].is_string());
    Ok(())
}

#[tokio::test]
async fn strict_search_requires_every_supplied_field() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);
    app.post("/api/profiles", &agent, new_profile("Ana", "Lim", &unique_email("a"))).await?;
    app.post("/api/profiles", &agent, new_profile("Ana", "Koh", &unique_email("b"))).await?;
    app.post("/api/profiles", &agent, new_profile("Ben", "Lim", &unique_email("c"))).await?;

    let (status, strict) = app
        .get("/api/profiles/search/fields?first_name=ana&last_name=LIM", &agent)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&strict), vec!["Ana"]);
    assert_eq!(strict["data"]["items"][0]["last_name"], "Lim");
    Ok(())
}

#[tokio::test]
async fn loose_search_matches_any_supplied_field() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);
    app.post("/api/profiles", &agent, new_profile("Ana", "Lim", &unique_email("a"))).await?;
    app.post("/api/profiles", &agent, new_profile("Ana", "Koh", &unique_email("b"))).await?;
    app.post("/api/profiles", &agent, new_profile("Ben", "Lim", &unique_email("c"))).await?;
    app.post("/api/profiles", &agent, new_profile("Cy", "Ong", &unique_email("d"))).await?;

    let (status, loose) = app
        .get("/api/profiles/search/fields?first_name=an&last_name=li&mode=loose", &agent)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&loose), vec!["Ana", "Ana", "Ben"]);
    Ok(())
}

#[tokio::test]
async fn email_search_is_case_insensitive_equality() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);
    let email = unique_email("mei");
    app.post("/api/profiles", &agent, new_profile("Mei", "Wong", &email)).await?;

    let uri = format!("/api/profiles/search/fields?email={}", email.to_uppercase());
    let (_, exact) = app.get(&uri, &agent).await?;
    assert_eq!(names(&exact), vec!["Mei"]);

    let (status, longer) = app.get(&format!("/api/profiles/search/fields?email=x{email}"), &agent).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(names(&longer).is_empty());
    Ok(())
}

#[tokio::test]
async fn search_never_crosses_owners() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let owner = app.token(Uuid::new_v4(), &[]);
    let other = app.token(Uuid::new_v4(), &[]);
    app.post("/api/profiles", &owner, new_profile("Zed", "Quill", &unique_email("z"))).await?;

    let (_, own) = app.get("/api/profiles/search?q=quill", &owner).await?;
    assert_eq!(names(&own), vec!["Zed"]);

    let (_, foreign) = app.get("/api/profiles/search?q=quill", &other).await?;
    assert!(names(&foreign).is_empty());
    let (_, fields) = app.get("/api/profiles/search/fields?last_name=Quill", &other).await?;
    assert!(names(&fields).is_empty());
    Ok(())
}

#[tokio::test]
async fn like_wildcards_in_search_are_literal() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);
    app.post("/api/profiles", &agent, new_profile("Ivy", "Chua", &unique_email("i"))).await?;

    let (status, body) = app.get("/api/profiles/search/fields?first_name=%25&mode=loose", &agent).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(names(&body).is_empty());
    Ok(())
}

#[tokio::test]
async fn transfer_moves_profile_between_agents() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let to_id = Uuid::new_v4();
    let from = app.token(Uuid::new_v4(), &[]);
    let to = app.token(to_id, &[]);
    let (_, created) = app.post("/api/profiles", &from, new_profile("Tia", "Ng", &unique_email("t"))).await?;
    let id = id_of(&created);

    let (status, moved) = app
        .patch(&format!("/api/profiles/{id}"), &from, json!({ "new_agent_id": to_id, "city": "Johor" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["data"]["city"], "Johor");

    let (_, theirs) = app.get("/api/profiles", &to).await?;
    assert_eq!(names(&theirs), vec!["Tia"]);
    let (_, mine) = app.get("/api/profiles", &from).await?;
    assert!(names(&mine).is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_live_email_conflicts_until_deleted() -> Result<()> {
    let Some(app) = TestApp::with_database().await? else { return Ok(()) };
    let agent = app.token(Uuid::new_v4(), &[]);
    let email = unique_email("dup");

    let (_, first) = app.post("/api/profiles", &agent, new_profile("Dee", "One", &email)).await?;
    let (status, _) = app.post("/api/profiles", &agent, new_profile("Dee", "Two", &email)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = id_of(&first);
    let (status, _) = app.delete(&format!("/api/profiles/{id}"), &agent).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/profiles", &agent, new_profile("Dee", "Two", &email)).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}
