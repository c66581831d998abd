mod common;

use axum::http::{Method, StatusCode};
use common::{leaks_credentials, token, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (status, body) = app.send(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_admin_login_and_profile_hide_credentials() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let login = app
        .login("administrative", json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .await?;

    assert!(!token(&login, "access_token").is_empty());
    assert!(!token(&login, "refresh_token").is_empty());
    assert_eq!(login["user"]["email"], ADMIN_EMAIL);
    assert!(!leaks_credentials(&login));

    let (status, profile) = app
        .get("/api/v1/administrative/account/profile", &token(&login, "access_token"))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["roles"], json!(["super_admin"]));
    assert!(profile.get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn test_bad_credentials_share_one_code() -> anyhow::Result<()> {
    let app = TestApp::new().await?;

    let (status, body) = app
        .post(
            "/api/v1/administrative/account/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrongpass1" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "USER_NOT_FOUND");
    assert_eq!(body["status_code"], 404);

    let (status, body) = app
        .post(
            "/api/v1/administrative/account/login",
            None,
            json!({ "email": "nobody@clinic.test", "password": ADMIN_PASSWORD }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "USER_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn test_missing_or_foreign_tokens_are_rejected() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    let (doctor, _) = app.doctor(&admin, "cuddy").await?;

    let (status, body) = app
        .send(Method::GET, "/api/v1/administrative/doctor", None, None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "UNAUTHORIZED");

    // A doctor token means nothing on staff routes, and the reverse
    let (status, _) = app.get("/api/v1/administrative/doctor", &doctor).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/v1/doctor/account/profile", &admin).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access tokens cannot be used to refresh
    let (status, _) = app.get("/api/v1/doctor/account/refresh", &doctor).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_role_guards() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;

    let (status, created) = app
        .post(
            "/api/v1/administrative/account/staff",
            Some(&admin),
            json!({
                "username": "desk",
                "email": "desk@clinic.test",
                "password": "frontdesk1",
                "confirm_password": "frontdesk1",
                "roles": ["staff"]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!leaks_credentials(&created));

    let login = app
        .login("administrative", json!({ "email": "desk@clinic.test", "password": "frontdesk1" }))
        .await?;
    let desk = token(&login, "access_token");

    // Plain staff can read but not register
    let (status, _) = app.get("/api/v1/administrative/doctor", &desk).await?;
    assert_eq!(status, StatusCode::OK);
    let doctor = json!({
        "username": "foreman",
        "email": "foreman@clinic.org",
        "password": "doctor123",
        "confirm_password": "doctor123",
        "first_name": "Eric",
        "last_name": "Foreman",
        "phone_number": "+16095550133",
        "specialization": "Neurology"
    });
    let (status, body) = app
        .post("/api/v1/administrative/doctor/register", Some(&desk), doctor.clone())
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "YOU_ARE_NOT_AUTHORIZED_TO_PERFORM_THIS_ACTION");
    let (status, _) = app
        .post("/api/v1/administrative/doctor/register", Some(&admin), doctor)
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    // Only the super admin creates staff, and never another super admin
    let (status, _) = app
        .post(
            "/api/v1/administrative/account/staff",
            Some(&desk),
            json!({
                "username": "sneaky",
                "email": "sneaky@clinic.test",
                "password": "sneaky123",
                "confirm_password": "sneaky123",
                "roles": ["admin"]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/v1/administrative/account/staff",
            Some(&admin),
            json!({
                "username": "boss",
                "email": "boss@clinic.test",
                "password": "bossman12",
                "confirm_password": "bossman12",
                "roles": ["super_admin"]
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_refresh_until_logout() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    app.patient(&admin, "wilson").await?;

    let login = app
        .login("patient", json!({ "username": "wilson", "password": "patient123" }))
        .await?;
    let access = token(&login, "access_token");
    let refresh = token(&login, "refresh_token");

    let (status, body) = app.get("/api/v1/patient/account/refresh", &refresh).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(!token(&body, "access_token").is_empty());

    let (status, _) = app.get("/api/v1/patient/account/logout", &access).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/patient/account/refresh", &refresh).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_reset_password() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.admin_token().await?;
    let (doctor, _) = app.doctor(&admin, "chase").await?;

    let (status, body) = app
        .post(
            "/api/v1/doctor/account/reset-password",
            Some(&doctor),
            json!({ "email": "chase@clinic.org", "password": "doctor123", "confirm_password": "doctor123" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "PASSWORD_HAS_BEEN_USED_RECENTLY");

    let (status, _) = app
        .post(
            "/api/v1/doctor/account/reset-password",
            Some(&doctor),
            json!({ "email": "chase@clinic.org", "password": "surgeon42", "confirm_password": "surgeon42" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    app.login("doctor", json!({ "username": "chase", "password": "surgeon42" }))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_gets_json_error() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (status, body) = app
        .post("/api/v1/doctor/account/login", None, json!({ "username": "house" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    Ok(())
}
