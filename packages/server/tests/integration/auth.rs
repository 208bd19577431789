use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use server::entity::user;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn new_user_can_register_with_valid_credentials() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app
            .post(
                &client,
                routes::REGISTER,
                &json!({
                    "name": "Alice",
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "securepass",
                }),
            )
            .await;

        assert_eq!(res.status, 201);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["is_email_verified"], false);
        assert!(
            res.body.get("password").is_none(),
            "password hash leaked: {}",
            res.text
        );
    }

    #[tokio::test]
    async fn registration_sends_verification_and_welcome_emails() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.post(
            &client,
            routes::REGISTER,
            &json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }),
        )
        .await;

        let sent = app.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].subject.contains("Verify"));
        assert!(sent[1].subject.contains("Welcome"));
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_username() {
        let app = TestApp::spawn().await;
        let client = app.client();
        let body = json!({
            "name": "Alice",
            "username": "alice",
            "email": "alice@example.com",
            "password": "securepass",
        });

        let first = app.post(&client, routes::REGISTER, &body).await;
        assert_eq!(first.status, 201, "First registration failed: {}", first.text);

        let mut second = body.clone();
        second["email"] = json!("other@example.com");
        let res = app.post(&client, routes::REGISTER, &second).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");

        let count = user::Entity::find()
            .filter(user::Column::Email.eq("other@example.com"))
            .one(&app.db)
            .await
            .unwrap();
        assert!(count.is_none(), "conflicting registration created a row");
    }

    #[tokio::test]
    async fn cannot_register_with_an_already_taken_email() {
        let app = TestApp::spawn().await;
        let client = app.client();
        let body = json!({
            "name": "Alice",
            "username": "alice",
            "email": "alice@example.com",
            "password": "securepass",
        });

        app.post(&client, routes::REGISTER, &body).await;

        let mut second = body.clone();
        second["username"] = json!("alice2");
        let res = app.post(&client, routes::REGISTER, &second).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn invalid_fields_are_aggregated_into_one_validation_error() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app
            .post(
                &client,
                routes::REGISTER,
                &json!({
                    "name": "",
                    "username": "no spaces!",
                    "email": "not-an-email",
                    "password": "short",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let message = res.body["message"].as_str().unwrap();
        assert!(message.contains("Name"), "missing name problem: {message}");
        assert!(message.contains("Username"));
        assert!(message.contains("Email"));
        assert!(message.contains("Password"));
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn unverified_account_cannot_log_in_even_with_the_right_password() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.post(
            &client,
            routes::REGISTER,
            &json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }),
        )
        .await;

        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice", "password": "securepass"}),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "EMAIL_NOT_VERIFIED");
    }

    #[tokio::test]
    async fn verified_account_can_log_in_by_username_or_email() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.post(
            &client,
            routes::REGISTER,
            &json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }),
        )
        .await;
        app.verify_email_of("alice@example.com").await;

        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice", "password": "securepass"}),
            )
            .await;
        assert_eq!(res.status, 200, "Login by username failed: {}", res.text);

        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice@example.com", "password": "securepass"}),
            )
            .await;
        assert_eq!(res.status, 200, "Login by email failed: {}", res.text);
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;
        app.signup("alice").await;

        let client = app.client();
        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice", "password": "wrongwrong"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_identifier_gets_the_same_error_as_a_wrong_password() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "ghost", "password": "whatever1"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn login_cookies_authenticate_follow_up_requests() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn me_without_cookies_is_unauthorized() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let res = app.post_empty(&client, routes::LOGOUT).await;
        assert_eq!(res.status, 200);

        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 401);
    }
}

mod refresh {
    use super::*;

    #[tokio::test]
    async fn refresh_reissues_a_working_access_token() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let res = app.post_empty(&client, routes::REFRESH_TOKEN).await;
        assert_eq!(res.status, 200, "Refresh failed: {}", res.text);

        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn refresh_without_a_cookie_fails_closed() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app.post_empty(&client, routes::REFRESH_TOKEN).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn refresh_with_a_garbage_cookie_fails_closed() {
        let app = TestApp::spawn().await;

        // Plain client so the hand-rolled Cookie header is the only one sent.
        let client = reqwest::Client::new();
        let res = client
            .post(app.url(routes::REFRESH_TOKEN))
            .header("X-API-Client", "mobile")
            .header("Cookie", "refreshToken=not.a.token")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn an_access_token_is_not_accepted_as_a_refresh_token() {
        let app = TestApp::spawn().await;
        app.signup("alice").await;

        // Log in on a plain client to capture the raw access cookie, then
        // replay it as a refresh cookie.
        let plain = reqwest::Client::new();
        let login = plain
            .post(app.url(routes::LOGIN))
            .header("X-API-Client", "mobile")
            .json(&json!({"identifier": "alice", "password": "securepass"}))
            .send()
            .await
            .unwrap();
        let access_cookie = login
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("accessToken="))
            .expect("no access cookie set")
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let access_token = access_cookie.trim_start_matches("accessToken=").to_string();

        let res = plain
            .post(app.url(routes::REFRESH_TOKEN))
            .header("X-API-Client", "mobile")
            .header("Cookie", format!("refreshToken={access_token}"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }
}

mod email_verification {
    use super::*;

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app
            .get(
                &client,
                &format!("{}?token=deadbeef", routes::VERIFY_EMAIL),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn token_is_single_use() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.post(
            &client,
            routes::REGISTER,
            &json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }),
        )
        .await;

        let stored = user::Entity::find()
            .filter(user::Column::Email.eq("alice@example.com"))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let token = stored.email_verification_token.unwrap();

        let first = app
            .get(&client, &format!("{}?token={token}", routes::VERIFY_EMAIL))
            .await;
        assert_eq!(first.status, 200);

        let second = app
            .get(&client, &format!("{}?token={token}", routes::VERIFY_EMAIL))
            .await;
        assert_eq!(second.status, 400);
    }

    #[tokio::test]
    async fn resend_rotates_the_token() {
        let app = TestApp::spawn().await;
        let client = app.client();

        app.post(
            &client,
            routes::REGISTER,
            &json!({
                "name": "Alice",
                "username": "alice",
                "email": "alice@example.com",
                "password": "securepass",
            }),
        )
        .await;

        let before = user::Entity::find()
            .filter(user::Column::Email.eq("alice@example.com"))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .email_verification_token
            .unwrap();

        let res = app
            .post(
                &client,
                routes::RESEND_VERIFICATION,
                &json!({"email": "alice@example.com"}),
            )
            .await;
        assert_eq!(res.status, 200);

        let after = user::Entity::find()
            .filter(user::Column::Email.eq("alice@example.com"))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .email_verification_token
            .unwrap();

        assert_ne!(before, after);
    }
}

mod password_reset {
    use super::*;

    #[tokio::test]
    async fn full_reset_flow_replaces_the_password() {
        let app = TestApp::spawn().await;
        app.signup("alice").await;

        let client = app.client();
        let res = app
            .post(
                &client,
                routes::REQUEST_PASSWORD_RESET,
                &json!({"email": "alice@example.com"}),
            )
            .await;
        assert_eq!(res.status, 200);

        let code = app.reset_code_for("alice@example.com");

        let res = app
            .post(
                &client,
                routes::RESET_PASSWORD,
                &json!({
                    "email": "alice@example.com",
                    "code": code,
                    "new_password": "brandnewpass",
                }),
            )
            .await;
        assert_eq!(res.status, 200, "Reset failed: {}", res.text);

        // Old password no longer works, new one does.
        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice", "password": "securepass"}),
            )
            .await;
        assert_eq!(res.status, 401);

        let res = app
            .post(
                &client,
                routes::LOGIN,
                &json!({"identifier": "alice", "password": "brandnewpass"}),
            )
            .await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn a_reset_code_is_single_use() {
        let app = TestApp::spawn().await;
        app.signup("alice").await;

        let client = app.client();
        app.post(
            &client,
            routes::REQUEST_PASSWORD_RESET,
            &json!({"email": "alice@example.com"}),
        )
        .await;
        let code = app.reset_code_for("alice@example.com");

        let body = json!({
            "email": "alice@example.com",
            "code": code,
            "new_password": "brandnewpass",
        });
        let first = app.post(&client, routes::RESET_PASSWORD, &body).await;
        assert_eq!(first.status, 200);

        let second = app.post(&client, routes::RESET_PASSWORD, &body).await;
        assert_eq!(second.status, 400);
    }

    #[tokio::test]
    async fn a_wrong_code_is_rejected() {
        let app = TestApp::spawn().await;
        app.signup("alice").await;

        let client = app.client();
        app.post(
            &client,
            routes::REQUEST_PASSWORD_RESET,
            &json!({"email": "alice@example.com"}),
        )
        .await;
        let code = app.reset_code_for("alice@example.com");
        // Any different 6-digit string.
        let wrong = if code == "111111" { "222222" } else { "111111" };

        let res = app
            .post(
                &client,
                routes::RESET_PASSWORD,
                &json!({
                    "email": "alice@example.com",
                    "code": wrong,
                    "new_password": "brandnewpass",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn unknown_email_gets_a_generic_success_response() {
        let app = TestApp::spawn().await;
        let client = app.client();

        let res = app
            .post(
                &client,
                routes::REQUEST_PASSWORD_RESET,
                &json!({"email": "ghost@example.com"}),
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(app.last_email_to("ghost@example.com").is_none());
    }
}

mod avatar {
    use super::*;

    const UPLOAD_AVATAR: &str = "/api/v1/auth/upload-avatar";

    #[tokio::test]
    async fn an_avatar_can_be_uploaded_and_served_back() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let png: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let part = reqwest::multipart::Part::bytes(png.clone())
            .file_name("me.png")
            .mime_str("image/png")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("avatar", part);

        let res = client
            .post(app.url(UPLOAD_AVATAR))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        let body: serde_json::Value = res.json().await.unwrap();
        let avatar = body["avatar"].as_str().unwrap().to_string();
        assert!(avatar.starts_with("/uploads/avatars/"), "{avatar}");

        // The profile reflects it and the file is served back.
        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.body["avatar"], avatar);

        let res = client.get(app.url(&avatar)).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(&res.bytes().await.unwrap()[..], &png[..]);
    }

    #[tokio::test]
    async fn non_image_uploads_are_rejected() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let part = reqwest::multipart::Part::bytes(b"just text".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("avatar", part);

        let res = client
            .post(app.url(UPLOAD_AVATAR))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn a_missing_field_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let form = reqwest::multipart::Form::new().text("something_else", "value");
        let res = client
            .post(app.url(UPLOAD_AVATAR))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
    }
}

mod update_email {
    use super::*;

    #[tokio::test]
    async fn changing_email_requires_reverification() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        let res = app
            .post(
                &client,
                routes::UPDATE_EMAIL,
                &json!({"email": "alice-new@example.com"}),
            )
            .await;
        assert_eq!(res.status, 200, "Update email failed: {}", res.text);
        assert_eq!(res.body["email"], "alice-new@example.com");
        assert_eq!(res.body["is_email_verified"], false);

        // The account is unverified again, so ordinary routes reject it.
        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "EMAIL_NOT_VERIFIED");

        // Verifying the new address restores access.
        app.verify_email_of("alice-new@example.com").await;
        let res = app.get(&client, routes::ME).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["email"], "alice-new@example.com");
    }

    #[tokio::test]
    async fn cannot_take_an_email_that_is_already_registered() {
        let app = TestApp::spawn().await;
        app.signup("bob").await;
        let client = app.signup("alice").await;

        let res = app
            .post(
                &client,
                routes::UPDATE_EMAIL,
                &json!({"email": "bob@example.com"}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn the_old_address_is_notified() {
        let app = TestApp::spawn().await;
        let client = app.signup("alice").await;

        app.post(
            &client,
            routes::UPDATE_EMAIL,
            &json!({"email": "alice-new@example.com"}),
        )
        .await;

        let notice = app
            .last_email_to("alice@example.com")
            .expect("old address not notified");
        assert!(notice.subject.contains("email address was changed"));
    }
}
