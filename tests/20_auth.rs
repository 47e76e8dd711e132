mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn delete_requires_a_token() -> Result<()> {
    let server = common::spawn_server().await?;
    let created = server.create_user("johan", "123").await?;
    let id = created["_id"].as_str().expect("id");

    let res = server.client.delete(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let still_there: Value = server
        .client
        .get(server.url(&format!("/users/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(still_there, created);

    Ok(())
}

#[tokio::test]
async fn other_users_cannot_modify_a_record() -> Result<()> {
    let server = common::spawn_server().await?;
    let target = server.create_user("johan", "123").await?;
    server.create_user("elaine", "456").await?;
    let id = target["_id"].as_str().expect("id");
    let token = server.login("elaine", "456").await?;

    let res = server
        .client
        .put(server.url(&format!("/users/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "password": "pwned" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "no permission to perform this operation");

    let res = server
        .client
        .delete(server.url(&format!("/users/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let unchanged: Value = server
        .client
        .get(server.url(&format!("/users/{}", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(unchanged, target);

    Ok(())
}

#[tokio::test]
async fn owner_delete_removes_the_record() -> Result<()> {
    let server = common::spawn_server().await?;
    let created = server.create_user("johan", "123").await?;
    let id = created["_id"].as_str().expect("id");
    let token = server.login("johan", "123").await?;

    let res = server
        .client
        .delete(server.url(&format!("/users/{}", id)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.text().await?.is_empty());

    let res = server.client.get(server.url(&format!("/users/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "null");

    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    server.create_user("johan", "123").await?;

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "username": "johan", "password": "wrong" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn unmatched_paths_get_json_404() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.get(server.url("/nope/nothing-here")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], 404);

    Ok(())
}
