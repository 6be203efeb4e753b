mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

async fn setup() -> Result<Option<(reqwest::Client, String, String)>> {
    let server = common::ensure_server().await?;
    if !common::db_ready(&server.base_url).await {
        eprintln!("skipping: database unavailable");
        return Ok(None);
    }
    let client = reqwest::Client::new();
    let email = common::unique_email("products");
    let token = common::register_and_login(&client, &server.base_url, &email, "hunter22").await?;
    Ok(Some((client, server.base_url.clone(), token)))
}

#[tokio::test]
async fn create_then_get_round_trips_all_visible_fields() -> Result<()> {
    let Some((client, base_url, token)) = setup().await? else {
        return Ok(());
    };

    let res = client
        .post(format!("{}/api/products", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Espresso Cup",
            "slug": "espresso-cup",
            "price": 12.5,
            "description": "A small cup",
            "image": "https://example.com/cup.png",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<serde_json::Value>().await?;
    let id = created["data"]["id"].as_str().expect("id").to_string();

    // Owner comes from the session, creation time from the store.
    let whoami = client
        .get(format!("{}/api/auth/whoami", base_url))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(created["data"]["user_id"], whoami["data"]["id"]);
    assert!(!created["data"]["created_at"].as_str().unwrap_or("").is_empty());

    let res = client
        .get(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched = res.json::<serde_json::Value>().await?;
    assert_eq!(fetched["data"]["name"], "Espresso Cup");
    assert_eq!(fetched["data"]["slug"], "espresso-cup");
    assert_eq!(fetched["data"]["price"], 12.5);
    assert_eq!(fetched["data"]["description"], "A small cup");
    assert_eq!(fetched["data"]["image"], "https://example.com/cup.png");

    Ok(())
}

#[tokio::test]
async fn invalid_payload_reports_field_errors_and_never_persists() -> Result<()> {
    let Some((client, base_url, token)) = setup().await? else {
        return Ok(());
    };

    let res = client
        .post(format!("{}/api/products", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "",
            "slug": "Bad Slug",
            "price": -1,
            "image": "not-a-url",
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    for field in ["name", "slug", "price", "image"] {
        assert!(body["field_errors"][field].is_string(), "field {}", field);
    }

    // Nothing reached the store: this fresh user still has zero products.
    let res = client
        .get(format!("{}/api/products", base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["total_count"], 0);

    Ok(())
}

#[tokio::test]
async fn update_is_a_full_replace() -> Result<()> {
    let Some((client, base_url, token)) = setup().await? else {
        return Ok(());
    };

    let res = client
        .post(format!("{}/api/products", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Espresso Cup",
            "slug": "espresso-cup",
            "price": 12.5,
            "description": "A small cup",
            "image": "https://example.com/cup.png",
        }))
        .send()
        .await?;
    let id = res.json::<serde_json::Value>().await?["data"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    // Full replace: omitted optional fields are cleared, not kept.
    let res = client
        .put(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Lungo Cup",
            "slug": "lungo-cup",
            "price": 14.0,
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let fetched = client
        .get(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .send()
        .await?
        .json::<serde_json::Value>()
        .await?;
    assert_eq!(fetched["data"]["name"], "Lungo Cup");
    assert_eq!(fetched["data"]["slug"], "lungo-cup");
    assert_eq!(fetched["data"]["price"], 14.0);
    assert!(fetched["data"]["description"].is_null());
    assert!(fetched["data"]["image"].is_null());

    Ok(())
}

#[tokio::test]
async fn delete_is_explicit_about_repeats() -> Result<()> {
    let Some((client, base_url, token)) = setup().await? else {
        return Ok(());
    };

    let res = client
        .post(format!("{}/api/products", base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "Doomed", "slug": "doomed", "price": 1.0 }))
        .send()
        .await?;
    let id = res.json::<serde_json::Value>().await?["data"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    let res = client
        .delete(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // A second delete reports NotFound rather than succeeding silently.
    let res = client
        .delete(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn products_are_invisible_across_owners() -> Result<()> {
    let Some((client, base_url, token_a)) = setup().await? else {
        return Ok(());
    };
    let email_b = common::unique_email("owner-b");
    let token_b = common::register_and_login(&client, &base_url, &email_b, "hunter22").await?;

    let res = client
        .post(format!("{}/api/products", base_url))
        .bearer_auth(&token_a)
        .json(&json!({ "name": "Private Mug", "slug": "private-mug", "price": 5.0 }))
        .send()
        .await?;
    let id = res.json::<serde_json::Value>().await?["data"]["id"]
        .as_str()
        .expect("id")
        .to_string();

    // Reads hide the row entirely.
    let res = client
        .get(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token_b)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Writes against someone else's row are forbidden.
    let res = client
        .put(format!("{}/api/products/{}", base_url, id))
        .bearer_auth(&token_b)
        .json(&json!({ "name": "Hijacked", "slug": "hijacked", "price": 9.0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // And the listing never leaks across owners.
    let res = client
        .get(format!("{}/api/products", base_url))
        .bearer_auth(&token_b)
        .send()
        .await?;
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["total_count"], 0);

    Ok(())
}
