/// End-to-end API tests against PostgreSQL
///
/// Ignored by default. Run with:
/// cargo test -p birgedo-api --test api_flow_tests -- --ignored

mod common;

use axum::http::{header, Method, StatusCode};
use axum::Router;
use common::{body_of, call, live_app, request, send, unique_email};
use serde_json::{json, Value};

struct Account {
    id: i64,
    token: String,
}

async fn register(app: &Router, name: &str) -> (i64, String) {
    let email = unique_email(name);
    let response = call(
        app,
        Method::POST,
        "/v1/users",
        None,
        Some(json!({ "name": name, "email": email, "password": "pa55word" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert!(response.body["user"].get("password_hash").is_none());
    (response.body["user"]["id"].as_i64().unwrap(), email)
}

async fn login(app: &Router, email: &str) -> common::TestResponse {
    call(
        app,
        Method::POST,
        "/v1/tokens/authentication",
        None,
        Some(json!({ "email": email, "password": "pa55word" })),
    )
    .await
}

async fn account(app: &Router, name: &str) -> Account {
    let (id, email) = register(app, name).await;
    let response = login(app, &email).await;
    assert_eq!(response.status, StatusCode::CREATED);

    Account {
        id,
        token: response.body["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string(),
    }
}

async fn create_room(app: &Router, owner: &Account, title: &str) -> i64 {
    let response = call(
        app,
        Method::POST,
        "/v1/room",
        Some(&owner.token),
        Some(json!({ "title": title })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let id = response.body["room"]["id"].as_i64().unwrap();
    assert_eq!(response.headers[header::LOCATION], format!("/v1/room/{id}").as_str());
    id
}

fn task_state(tasks: &Value, task_id: i64) -> Option<bool> {
    tasks
        .as_array()?
        .iter()
        .find(|t| t["taskID"] == task_id)
        .and_then(|t| t["done"].as_bool())
}

#[tokio::test]
#[ignore]
async fn test_full_collaboration_scenario() {
    let (_pool, app) = live_app().await;
    let alice = account(&app, "alice").await;
    let bob = account(&app, "bob").await;

    let room_id = create_room(&app, &alice, "Sprint").await;

    let members = json!({ "userID": bob.id, "roomID": room_id });
    let added = call(&app, Method::POST, "/v1/addUser", Some(&alice.token), Some(members.clone())).await;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.body["membership"]["status"], "added");

    let again = call(&app, Method::POST, "/v1/addUser", Some(&alice.token), Some(members)).await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["membership"]["status"], "already_exists");

    let created = call(
        &app,
        Method::POST,
        "/v1/task",
        Some(&alice.token),
        Some(json!({ "title": "Plan sprint", "roomID": room_id })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["task"]["assigned"], 2);
    let task_id = created.body["task"]["task"]["id"].as_i64().unwrap();

    let toggled = call(&app, Method::GET, &format!("/v1/task/{task_id}"), Some(&alice.token), None).await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["task"]["done"], true);

    let mine = call(&app, Method::GET, "/v1/mytasks", Some(&alice.token), None).await;
    assert_eq!(task_state(&mine.body["tasks"], task_id), Some(true));

    let bobs = call(&app, Method::GET, "/v1/mytasks", Some(&bob.token), None).await;
    assert_eq!(task_state(&bobs.body["tasks"], task_id), Some(false));

    let detail = call(&app, Method::GET, &format!("/v1/room/{room_id}"), Some(&bob.token), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["room"]["title"], "Sprint");
    assert_eq!(detail.body["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(detail.body["members"].as_array().unwrap().len(), 2);
    assert_eq!(detail.body["userTasks"].as_array().unwrap().len(), 2);

    let rooms = call(&app, Method::GET, "/v1/myrooms", Some(&bob.token), None).await;
    assert!(rooms.body["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == room_id));
}

#[tokio::test]
#[ignore]
async fn test_room_access_is_limited_to_members() {
    let (_pool, app) = live_app().await;
    let alice = account(&app, "alice").await;
    let mallory = account(&app, "mallory").await;
    let room_id = create_room(&app, &alice, "Private").await;

    let detail = call(&app, Method::GET, &format!("/v1/room/{room_id}"), Some(&mallory.token), None).await;
    assert_eq!(detail.status, StatusCode::FORBIDDEN);

    let rename = call(
        &app,
        Method::PATCH,
        &format!("/v1/room/{room_id}"),
        Some(&mallory.token),
        Some(json!({ "title": "Mine now" })),
    )
    .await;
    assert_eq!(rename.status, StatusCode::FORBIDDEN);

    let task = call(
        &app,
        Method::POST,
        "/v1/task",
        Some(&mallory.token),
        Some(json!({ "title": "Sneaky", "roomID": room_id })),
    )
    .await;
    assert_eq!(task.status, StatusCode::FORBIDDEN);

    let join = call(
        &app,
        Method::POST,
        "/v1/addUser",
        Some(&mallory.token),
        Some(json!({ "userID": mallory.id, "roomID": room_id })),
    )
    .await;
    assert_eq!(join.status, StatusCode::FORBIDDEN);

    let missing = call(&app, Method::GET, "/v1/room/999999999", Some(&alice.token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let bad_id = call(&app, Method::GET, "/v1/room/abc", Some(&alice.token), None).await;
    assert_eq!(bad_id.status, StatusCode::NOT_FOUND);

    let unknown_room = call(
        &app,
        Method::POST,
        "/v1/task",
        Some(&alice.token),
        Some(json!({ "title": "Nowhere", "roomID": 999999999 })),
    )
    .await;
    assert_eq!(unknown_room.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown_room.body["error"]["roomID"][0], "doesn't exist with this id");

    let renamed = call(
        &app,
        Method::PATCH,
        &format!("/v1/room/{room_id}"),
        Some(&alice.token),
        Some(json!({ "title": "Shared" })),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["room"]["title"], "Shared");
}

#[tokio::test]
#[ignore]
async fn test_membership_and_task_removal() {
    let (_pool, app) = live_app().await;
    let alice = account(&app, "alice").await;
    let bob = account(&app, "bob").await;
    let room_id = create_room(&app, &alice, "Removal").await;

    let unknown_user = call(
        &app,
        Method::POST,
        "/v1/addUser",
        Some(&alice.token),
        Some(json!({ "userID": 999999999, "roomID": room_id })),
    )
    .await;
    assert_eq!(unknown_user.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(unknown_user.body["error"]["userID"].is_array());

    call(
        &app,
        Method::POST,
        "/v1/addUser",
        Some(&alice.token),
        Some(json!({ "userID": bob.id, "roomID": room_id })),
    )
    .await;
    let created = call(
        &app,
        Method::POST,
        "/v1/task",
        Some(&alice.token),
        Some(json!({ "title": "Vacuum", "roomID": room_id })),
    )
    .await;
    let task_id = created.body["task"]["task"]["id"].as_i64().unwrap();

    let membership = json!({ "userID": bob.id, "roomID": room_id });
    let removed = call(&app, Method::POST, "/v1/removeUser", Some(&alice.token), Some(membership.clone())).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["membership"]["status"], "removed");

    let bobs = call(&app, Method::GET, "/v1/mytasks", Some(&bob.token), None).await;
    assert_eq!(task_state(&bobs.body["tasks"], task_id), None);

    let toggle = call(&app, Method::GET, &format!("/v1/task/{task_id}"), Some(&bob.token), None).await;
    assert_eq!(toggle.status, StatusCode::FORBIDDEN);

    let twice = call(&app, Method::POST, "/v1/removeUser", Some(&alice.token), Some(membership)).await;
    assert_eq!(twice.status, StatusCode::NOT_FOUND);

    let task = json!({ "taskID": task_id, "roomID": room_id });
    let gone = call(&app, Method::POST, "/v1/removeTask", Some(&alice.token), Some(task.clone())).await;
    assert_eq!(gone.status, StatusCode::OK);

    let again = call(&app, Method::POST, "/v1/removeTask", Some(&alice.token), Some(task)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let toggle = call(&app, Method::GET, &format!("/v1/task/{task_id}"), Some(&alice.token), None).await;
    assert_eq!(toggle.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_registration_and_login_failures() {
    let (_pool, app) = live_app().await;
    let (_, email) = register(&app, "carol").await;

    let duplicate = call(
        &app,
        Method::POST,
        "/v1/users",
        None,
        Some(json!({ "name": "Carol", "email": email.to_uppercase(), "password": "pa55word" })),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let wrong_password = call(
        &app,
        Method::POST,
        "/v1/tokens/authentication",
        None,
        Some(json!({ "email": email, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["error"], "invalid authentication credentials");

    let unknown = login(&app, &unique_email("nobody")).await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_jwt_identity_and_account_update() {
    let (_pool, app) = live_app().await;
    let (id, email) = register(&app, "dave").await;
    let session = login(&app, &email).await;
    let jwt = session.body["authentication_token"]["jwt"].as_str().unwrap().to_string();

    let me = call(&app, Method::GET, "/v1/users", Some(&jwt), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["id"], id);
    let version = me.body["user"]["version"].as_i64().unwrap();

    let updated = call(
        &app,
        Method::PATCH,
        "/v1/users/me",
        Some(&jwt),
        Some(json!({ "name": "David", "version": version })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["user"]["name"], "David");

    let stale = call(
        &app,
        Method::PATCH,
        "/v1/users/me",
        Some(&jwt),
        Some(json!({ "name": "Dave", "version": version })),
    )
    .await;
    assert_eq!(stale.status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_cookie_session_requires_csrf_and_logout_revokes() {
    let (_pool, app) = live_app().await;
    let (_, email) = register(&app, "erin").await;

    let session = login(&app, &email).await;
    let token = session.cookie("token").expect("token cookie");
    let csrf = session.cookie("csrf_token").expect("csrf cookie");
    assert!(session
        .set_cookies()
        .iter()
        .any(|c| c.starts_with("token=") && c.contains("HttpOnly")));

    let cookies = format!("token={token}; csrf_token={csrf}");
    let with_cookies = |method: Method, uri: &str, csrf_header: Option<&str>, body: Option<Value>| {
        let mut builder = request(method, uri, body.clone()).header(header::COOKIE, cookies.as_str());
        if let Some(value) = csrf_header {
            builder = builder.header("x-csrf-token", value);
        }
        builder.body(body_of(body)).unwrap()
    };

    let rooms = send(&app, with_cookies(Method::GET, "/v1/myrooms", None, None)).await;
    assert_eq!(rooms.status, StatusCode::OK);
    assert_eq!(rooms.body["rooms"], json!([]));

    let title = Some(json!({ "title": "Cookie room" }));
    let blocked = send(&app, with_cookies(Method::POST, "/v1/room", None, title.clone())).await;
    assert_eq!(blocked.status, StatusCode::FORBIDDEN);

    let allowed = send(&app, with_cookies(Method::POST, "/v1/room", Some(&csrf), title)).await;
    assert_eq!(allowed.status, StatusCode::CREATED);
    let room_id = allowed.body["room"]["id"].as_i64().unwrap();

    let created = send(
        &app,
        with_cookies(
            Method::POST,
            "/v1/task",
            Some(&csrf),
            Some(json!({ "title": "Water plants", "roomID": room_id })),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let toggle_uri = format!("/v1/task/{}", created.body["task"]["task"]["id"]);

    // A link on another site would send only the cookie
    let cross_site = send(&app, with_cookies(Method::GET, &toggle_uri, None, None)).await;
    assert_eq!(cross_site.status, StatusCode::FORBIDDEN);

    let toggled = send(&app, with_cookies(Method::GET, &toggle_uri, Some(&csrf), None)).await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["task"]["done"], true);

    let logout = send(
        &app,
        with_cookies(Method::DELETE, "/v1/tokens/authentication", Some(&csrf), None),
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookies().iter().any(|c| c.contains("Max-Age=0")));

    let after = send(&app, with_cookies(Method::GET, "/v1/myrooms", None, None)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}
