use axum::{
    http::{self, Request, StatusCode},
    Router,
};
use gamejolt_mock::{app, signature, API_ROOT, GAME_ID, PRIVATE_KEY};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const HOST: &str = "localhost:3000";

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// A POST to `endpoint` with `params`, signed with `key` the way a client
/// would sign it.
fn signed_request(endpoint: &str, params: &str, key: &str) -> Request<String> {
    let mut url = format!("{API_ROOT}{endpoint}?format=json&game_id={GAME_ID}");
    if !params.is_empty() {
        url.push('&');
        url.push_str(params);
    }
    let sig = signature(&format!("http://{HOST}{url}"), key);
    Request::builder()
        .method("POST")
        .uri(format!("{url}&signature={sig}"))
        .header(http::header::HOST, HOST)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body("{}".to_string())
        .unwrap()
}

/// Send a signed request and return the `response` object.
async fn call(app: &Router, endpoint: &str, params: &str) -> Value {
    let resp = app
        .clone()
        .oneshot(signed_request(endpoint, params, PRIVATE_KEY))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["response"].clone()
}

const ALICE: &str = "username=alice&user_token=alice-token";

// --- signing ---

#[tokio::test]
async fn wrong_key_is_rejected() {
    let resp = app()
        .oneshot(signed_request("/time/", "", "wrong-key"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["response"]["success"], "false");
    assert_eq!(
        body["response"]["message"],
        "The signature you entered for the request is invalid."
    );
}

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri(format!("{API_ROOT}/time/?format=json&game_id={GAME_ID}"))
                .header(http::header::HOST, HOST)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["response"]["success"], "false");
}

#[tokio::test]
async fn get_is_accepted_too() {
    let mut req = signed_request("/scores/tables/", "", PRIVATE_KEY);
    *req.method_mut() = http::Method::GET;
    let body = body_json(app().oneshot(req).await.unwrap()).await;
    assert_eq!(body["response"]["success"], "true");
}

// --- users ---

#[tokio::test]
async fn auth_checks_token() {
    let app = app();
    assert_eq!(call(&app, "/users/auth/", ALICE).await["success"], "true");

    let bad = call(&app, "/users/auth/", "username=alice&user_token=nope").await;
    assert_eq!(bad["success"], "false");
    assert_eq!(bad["message"], "No such user could be found.");

    let missing = call(&app, "/users/auth/", "username=alice").await;
    assert_eq!(missing["message"], "You must enter the user_token parameter.");
}

#[tokio::test]
async fn users_by_name_and_ids() {
    let app = app();
    let one = call(&app, "/users/", "username=bob").await;
    assert_eq!(one["users"][0]["id"], "2");
    assert_eq!(one["users"][0]["type"], "User");

    let many = call(&app, "/users/", "user_id=1%2C2").await;
    assert_eq!(many["users"].as_array().unwrap().len(), 2);
    assert!(many["users"][0].get("token").is_none());
}

#[tokio::test]
async fn friends_of_alice() {
    let body = call(&app(), "/friends/", ALICE).await;
    assert_eq!(body["friends"][0]["friend_id"], "2");
}

// --- sessions ---

#[tokio::test]
async fn session_lifecycle() {
    let app = app();
    assert_eq!(call(&app, "/sessions/check/", ALICE).await["success"], "false");
    assert_eq!(call(&app, "/sessions/ping/", ALICE).await["success"], "false");

    assert_eq!(call(&app, "/sessions/open/", ALICE).await["success"], "true");
    assert_eq!(call(&app, "/sessions/check/", ALICE).await["success"], "true");
    let ping = call(&app, "/sessions/ping/", &format!("{ALICE}&status=idle")).await;
    assert_eq!(ping["success"], "true");

    assert_eq!(call(&app, "/sessions/close/", ALICE).await["success"], "true");
    assert_eq!(call(&app, "/sessions/check/", ALICE).await["success"], "false");
}

// --- time ---

#[tokio::test]
async fn time_has_calendar_fields() {
    let body = call(&app(), "/time/", "").await;
    assert_eq!(body["success"], "true");
    assert!(body["year"].as_i64().unwrap() >= 2024);
    assert!((1..=12).contains(&body["month"].as_i64().unwrap()));
    assert_eq!(body["timezone"], "UTC");
}

// --- trophies ---

#[tokio::test]
async fn trophy_achievement_lifecycle() {
    let app = app();
    let all = call(&app, "/trophies/", ALICE).await;
    assert_eq!(all["trophies"].as_array().unwrap().len(), 2);
    assert_eq!(all["trophies"][0]["achieved"], "false");

    let add = call(&app, "/trophies/add-achieved/", &format!("{ALICE}&trophy_id=1")).await;
    assert_eq!(add["success"], "true");
    let again = call(&app, "/trophies/add-achieved/", &format!("{ALICE}&trophy_id=1")).await;
    assert_eq!(again["message"], "The user already has this trophy.");

    let achieved = call(&app, "/trophies/", &format!("{ALICE}&achieved=true")).await;
    let list = achieved["trophies"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], "1");

    let by_id = call(&app, "/trophies/", &format!("{ALICE}&trophy_id=2")).await;
    assert_eq!(by_id["trophies"][0]["title"], "Completionist");

    let remove = call(&app, "/trophies/remove-achieved/", &format!("{ALICE}&trophy_id=1")).await;
    assert_eq!(remove["success"], "true");
    let unknown = call(&app, "/trophies/add-achieved/", &format!("{ALICE}&trophy_id=99")).await;
    assert_eq!(unknown["message"], "Incorrect trophy ID: 99.");
}

// --- scores ---

#[tokio::test]
async fn guest_and_user_scores() {
    let app = app();
    let guest = call(&app, "/scores/add/", "score=500%20Jumps&sort=500&guest=Zed").await;
    assert_eq!(guest["success"], "true");
    let user = call(&app, "/scores/add/", &format!("score=10&sort=10&{ALICE}&table_id=2")).await;
    assert_eq!(user["success"], "true");
    let nobody = call(&app, "/scores/add/", "score=1&sort=1").await;
    assert_eq!(nobody["message"], "You must pass in either a user or a guest.");

    let primary = call(&app, "/scores/", "").await;
    let scores = primary["scores"].as_array().unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0]["guest"], "Zed");
    assert_eq!(scores[1]["user"], "bob");

    let speedrun = call(&app, "/scores/", &format!("table_id=2&{ALICE}")).await;
    assert_eq!(speedrun["scores"][0]["user_id"], "1");

    let worse = call(&app, "/scores/", "worse_than=400").await;
    assert_eq!(worse["scores"].as_array().unwrap().len(), 1);

    let rank = call(&app, "/scores/get-rank/", "sort=400").await;
    assert_eq!(rank["rank"], 2);
}

#[tokio::test]
async fn tables_list_primary() {
    let body = call(&app(), "/scores/tables/", "").await;
    assert_eq!(body["tables"][0]["primary"], "1");
    assert_eq!(body["tables"][1]["name"], "Speedrun");
}

// --- data store ---

#[tokio::test]
async fn global_data_lifecycle() {
    let app = app();
    assert_eq!(call(&app, "/data-store/", "key=motd").await["data"], "Welcome!");

    assert_eq!(call(&app, "/data-store/set/", "key=coins&data=10").await["success"], "true");
    let updated = call(&app, "/data-store/update/", "key=coins&operation=add&value=5").await;
    assert_eq!(updated["data"], "15");

    let keys = call(&app, "/data-store/get-keys/", "pattern=co%2A").await;
    assert_eq!(keys["keys"].as_array().unwrap().len(), 1);
    assert_eq!(keys["keys"][0]["key"], "coins");

    assert_eq!(call(&app, "/data-store/remove/", "key=coins").await["success"], "true");
    let gone = call(&app, "/data-store/", "key=coins").await;
    assert_eq!(gone["message"], "There is no item with the key passed in.");
}

#[tokio::test]
async fn user_data_is_separate() {
    let app = app();
    call(&app, "/data-store/set/", &format!("key=save&data=a&{ALICE}")).await;
    assert_eq!(
        call(&app, "/data-store/", &format!("key=save&{ALICE}")).await["data"],
        "a"
    );
    assert_eq!(call(&app, "/data-store/", "key=save").await["success"], "false");

    let bob = call(&app, "/data-store/get-keys/", "username=bob&user_token=bob-token").await;
    assert!(bob["keys"].as_array().unwrap().is_empty());
}
