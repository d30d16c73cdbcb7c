//! Profile dialog routes against the seeded in-memory backend.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use unit_admin::services::{Operation, UserService};
use unit_admin_integration_tests::TestApp;

#[tokio::test]
async fn test_edit_dialog_for_existing_user() {
    let app = TestApp::new();
    let ada = app.user_id("Ada").await;

    let res = app.get(&format!("/users/{ada}/profile?mode=edit")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("data-profile-dialog"));
    assert!(res.body.contains("width: 800px"));
    assert!(res.body.contains(r#"value="Ada""#));
    assert!(res.body.contains("Edit profile"));
}

#[tokio::test]
async fn test_edit_dialog_defaults_to_edit_mode() {
    let app = TestApp::new();
    let ada = app.user_id("Ada").await;

    let res = app.get(&format!("/users/{ada}/profile")).await;
    assert!(res.body.contains(r#"name="mode" value="edit""#));
}

#[tokio::test]
async fn test_edit_dialog_for_unknown_user() {
    let app = TestApp::new();
    let res = app.get("/users/4040/profile?mode=edit").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_and_new_dialogs_are_blank() {
    let app = TestApp::new();

    for mode in ["create", "new"] {
        let res = app.get(&format!("/users/profile?mode={mode}")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.contains("Create user"));
        assert!(res.body.contains(&format!(r#"name="mode" value="{mode}""#)));
        assert!(res.body.contains(r#"name="user_id" value="""#));
    }
}

#[tokio::test]
async fn test_blank_dialog_rejects_edit_and_unknown_modes() {
    let app = TestApp::new();
    assert_eq!(
        app.get("/users/profile?mode=edit").await.status,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get("/users/profile?mode=delete").await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_save_creates_account() {
    let app = TestApp::new();

    let res = app
        .post_form(
            "/users/profile",
            "mode=create&user_id=&first_name=Margaret&last_name=Hamilton&username=mhamilton&email=&system_role=Tutor",
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());
    assert_eq!(
        res.notifications(),
        vec![("success".to_string(), "Profile saved".to_string())]
    );
    let users = app.backend.get_tutors().await.unwrap();
    let margaret = users.iter().find(|u| u.username == "mhamilton").unwrap();
    assert!(margaret.id.is_some());
    assert_eq!(margaret.email, None);
}

#[tokio::test]
async fn test_failed_save_redisplays_form() {
    let app = TestApp::new();
    let ada = app.user_id("Ada").await;
    app.backend.fail_next(Operation::SaveUser);

    let res = app
        .post_form(
            "/users/profile",
            &format!(
                "mode=edit&user_id={ada}&first_name=Augusta&last_name=King&username=aking&email=ada%40example.com&system_role=Convenor"
            ),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains(r#"value="Augusta""#));
    assert!(res.body.contains("ada@example.com"));
    assert_eq!(res.notifications().first().unwrap().0, "error");

    let unchanged = app.backend.get_user(ada).await.unwrap();
    assert_eq!(unchanged.first_name, "Ada");
}
