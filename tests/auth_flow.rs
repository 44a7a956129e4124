mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use portal_gtr::domain::UserRole;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct AnalistaInfo {
    id: i32,
    email: String,
    role: UserRole,
    esta_activo: bool,
}

#[tokio::test]
async fn register_login_and_me_roundtrip() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app
        .post_json(
            "/register",
            &json!({
                "nombre": "Ana",
                "apellido": "Perez",
                "email": "a@x.com",
                "bms_id": 12345,
                "role": "ANALISTA",
                "password": "s3cret"
            }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Wrong password is rejected before any token is issued.
    let response = app
        .post_json(
            "/token",
            &json!({ "username": "a@x.com", "password": "wrong" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = app.login_token("a@x.com", "s3cret").await?;
    let claims = app.state.jwt.verify_token(&token)?;
    assert_eq!(claims.sub, "a@x.com");
    assert_eq!(claims.role, UserRole::Analista);

    let response = app.get("/users/me", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let me: AnalistaInfo = serde_json::from_slice(&body)?;
    assert_eq!(me.email, "a@x.com");
    assert_eq!(me.role, UserRole::Analista);
    assert!(me.esta_activo);
    assert!(me.id > 0);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_bms_id() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Ana", "dup@x.com", 22222, UserRole::Analista, "pw")
        .await?;

    let duplicate_email = app
        .post_json(
            "/register",
            &json!({
                "nombre": "Otra",
                "apellido": "Persona",
                "email": "dup@x.com",
                "bms_id": 33333,
                "role": "ANALISTA",
                "password": "pw"
            }),
            None,
        )
        .await?;
    assert_eq!(duplicate_email.status(), StatusCode::BAD_REQUEST);

    let duplicate_bms = app
        .post_json(
            "/register",
            &json!({
                "nombre": "Otra",
                "apellido": "Persona",
                "email": "otra@x.com",
                "bms_id": 22222,
                "role": "ANALISTA",
                "password": "pw"
            }),
            None,
        )
        .await?;
    assert_eq!(duplicate_bms.status(), StatusCode::BAD_REQUEST);

    // bms_id must have at least four digits.
    let short_bms = app
        .post_json(
            "/register",
            &json!({
                "nombre": "Otra",
                "apellido": "Persona",
                "email": "corta@x.com",
                "bms_id": 999,
                "role": "ANALISTA",
                "password": "pw"
            }),
            None,
        )
        .await?;
    assert_eq!(short_bms.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn inactive_account_cannot_login() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let supervisor_id = app
        .insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    let analista_id = app
        .insert_analista("Ana", "ana@x.com", 10002, UserRole::Analista, "pw")
        .await?;
    assert!(supervisor_id > 0);

    let supervisor_token = app.login_token("super@x.com", "pw").await?;
    let response = app
        .delete(&format!("/analistas/{analista_id}"), Some(&supervisor_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json(
            "/token",
            &json!({ "username": "ana@x.com", "password": "pw" }),
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_token() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/users/me", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/tareas", Some("not-a-token")).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}
