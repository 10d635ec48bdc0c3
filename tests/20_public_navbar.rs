mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestApp, NAVBAR_TOKEN};

#[tokio::test]
async fn requires_navbar_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    let url = app.url("/api/public-navbar");

    let res = app.client.get(&url).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = app.client.get(&url).bearer_auth("wrong-token").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // A staff session is not the navbar token.
    let staff = app.staff_token().await?;
    let res = app.client.get(&url).bearer_auth(&staff).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.client.get(&url).bearer_auth(NAVBAR_TOKEN).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unconfigured_token_refuses_reads() -> Result<()> {
    let app = TestApp::spawn_with(|config| config.security.navbar_api_token = None).await?;

    let res = app.public_navbar("").send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn returns_items_and_tree() -> Result<()> {
    let app = TestApp::spawn().await?;
    let staff = app.staff_token().await?;

    let about = app.create_item(&staff, json!({"label": "About", "href": "/about"})).await?;
    let team = app
        .create_item(&staff, json!({"label": "Team", "href": "/about/team", "parentId": about["id"]}))
        .await?;
    app.create_item(&staff, json!({"label": "Blog", "href": "https://blog.example.com"})).await?;

    let data = common::data(app.public_navbar("").send().await?).await?;
    assert_eq!(data["items"].as_array().map(Vec::len), Some(3));

    let tree = data["tree"].as_array().cloned().unwrap_or_default();
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0]["label"], "About");
    assert_eq!(tree[0]["order"], 1);
    assert_eq!(tree[0]["children"][0]["id"], team["id"]);
    assert_eq!(tree[0]["children"][0]["parentId"], about["id"]);
    assert_eq!(tree[1]["label"], "Blog");
    assert_eq!(tree[1]["parentId"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn visible_filter_prunes_hidden_subtrees() -> Result<()> {
    let app = TestApp::spawn().await?;
    let staff = app.staff_token().await?;

    let about = app
        .create_item(&staff, json!({"label": "About", "href": "/about", "visible": false}))
        .await?;
    app.create_item(&staff, json!({"label": "Team", "href": "/team", "parentId": about["id"]}))
        .await?;
    app.create_item(&staff, json!({"label": "Contact", "href": "/contact"})).await?;

    let all = common::data(app.public_navbar("").send().await?).await?;
    assert_eq!(all["items"].as_array().map(Vec::len), Some(3));

    let visible = common::data(app.public_navbar("?visible=true").send().await?).await?;
    let labels: Vec<&str> = visible["items"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|i| i["label"].as_str())
        .collect();
    assert_eq!(labels, vec!["Contact"]);
    assert_eq!(visible["tree"].as_array().map(Vec::len), Some(1));

    let res = app.public_navbar("?visible=maybe").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
