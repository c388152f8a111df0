use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use parklot_server::auth::{JwtManager, hash_password};
use parklot_server::lifecycle::BookingClock;
use parklot_server::routes::{AppState, build_router};
use parklot_server::storage::ParkingDatabase;

struct TestApp {
    router: axum::Router,
    db: ParkingDatabase,
}

async fn test_app() -> TestApp {
    let db = ParkingDatabase::open_in_memory().await.unwrap();
    let state = AppState {
        db: db.clone(),
        jwt: Arc::new(JwtManager::new(b"integration-test-secret", 3600)),
        clock: BookingClock::utc(),
    };
    TestApp {
        router: build_router(state),
        db,
    }
}

impl TestApp {
    /// Send a request and return (status, JSON body).
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn login(&self, login: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "login": login, "password": password })),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        let hash = hash_password("admin123").unwrap();
        self.db.create_admin("admin", &hash).await.unwrap();
        let (status, body) = self.login("admin", "admin123").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["role"], "admin");
        body["token"].as_str().unwrap().to_string()
    }

    async fn user_token(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/register",
                None,
                Some(json!({
                    "full_name": name,
                    "email": email,
                    "password": "secret1",
                    "confirm_password": "secret1",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let (status, body) = self.login(email, "secret1").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Create a lot and return (lot id, first spot id).
    async fn create_lot(&self, admin: &str, price: f64, max_spots: i64) -> (i64, i64) {
        let (status, body) = self
            .post(
                "/admin/add_lot",
                admin,
                json!({
                    "location_name": "Central",
                    "address": "1 Main St",
                    "pin_code": "560001",
                    "price_per_hour": price,
                    "max_spots": max_spots,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let lot_id = body["lot"]["id"].as_i64().unwrap();
        let (_, spots) = self.get(&format!("/api/spots?lot_id={lot_id}"), admin).await;
        let spot_id = spots["spots"][0]["id"].as_i64().unwrap();
        (lot_id, spot_id)
    }

    async fn book(&self, user: &str, spot_id: i64, start: &str, end: &str) -> (StatusCode, Value) {
        self.post(
            "/book",
            user,
            json!({
                "spot_id": spot_id,
                "vehicle_number": "ka01ab1234",
                "start_time": start,
                "end_time": end,
            }),
        )
        .await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = test_app().await;
    app.user_token("Alice", "Alice@Example.com").await;

    let register = |email: &str, confirm: &str| {
        json!({
            "full_name": "Bob",
            "email": email,
            "password": "secret1",
            "confirm_password": confirm,
        })
    };

    let (status, body) = app
        .send(Method::POST, "/register", None, Some(register("alice@example.com", "secret1")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered.");

    let (status, body) = app
        .send(Method::POST, "/register", None, Some(register("bob@example.com", "other1")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Passwords do not match.");

    // Login by full name works too.
    let (status, body) = app.login("Alice", "secret1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "user");

    let (status, _) = app.login("alice@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn simultaneous_registrations_for_one_email_get_one_account() {
    let app = test_app().await;
    let form = |name: &str| {
        json!({
            "full_name": name,
            "email": "carol@example.com",
            "password": "secret1",
            "confirm_password": "secret1",
        })
    };

    let (first, second) = tokio::join!(
        app.send(Method::POST, "/register", None, Some(form("Carol"))),
        app.send(Method::POST, "/register", None, Some(form("Caroline"))),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort_unstable_by_key(StatusCode::as_u16);
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    let rejected = if first.0 == StatusCode::BAD_REQUEST { first.1 } else { second.1 };
    assert_eq!(rejected["error"], "Email already registered.");
    assert!(app.db.user_email_exists("carol@example.com").await.unwrap());
}

#[tokio::test]
async fn roles_are_enforced() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;

    let (status, _) = app.send(Method::GET, "/api/lots", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/lots", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/lots", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = app.get("/admin/dashboard", &user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/book", &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/lots", &admin).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = test_app().await;
    let user = app.user_token("Alice", "alice@example.com").await;

    let (status, _) = app.get("/user/dashboard", &user).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/logout", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "You have been logged out.");

    let (status, _) = app.get("/user/dashboard", &user).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn book_and_release_flow() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (lot_id, spot_id) = app.create_lot(&admin, 20.0, 2).await;

    let (status, body) = app
        .book(&user, spot_id, "2030-01-01 10:00", "2030-01-01 11:30")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reservation_id = body["reservation"]["id"].as_i64().unwrap();
    assert_eq!(body["reservation"]["status"], "booked");
    assert_eq!(body["reservation"]["vehicle_number"], "KA01AB1234");
    assert!((body["reservation"]["cost"].as_f64().unwrap() - 30.0).abs() < 1e-9);

    let (_, occupied) = app.get("/api/spots?status=occupied", &admin).await;
    assert_eq!(occupied["spots"].as_array().unwrap().len(), 1);
    assert_eq!(occupied["spots"][0]["is_available"], false);

    // Same spot cannot be booked twice.
    let (status, _) = app
        .book(&user, spot_id, "2030-01-01 12:00", "2030-01-01 13:00")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Occupied spot cannot be toggled and its lot cannot be deleted.
    let (status, _) = app
        .get(&format!("/admin/spots/{spot_id}/toggle"), &admin)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = app
        .post(&format!("/admin/delete_lot/{lot_id}"), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot delete lot: some spots are occupied");

    let (status, dashboard) = app.get("/user/dashboard", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["active_booking"]["id"], reservation_id);

    let (status, body) = app
        .post(&format!("/release/{reservation_id}"), &user, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reservation"]["status"], "completed");
    // Released before the booked start: nothing is charged.
    assert_eq!(body["reservation"]["cost"].as_f64(), Some(0.0));

    let (status, _) = app
        .post(&format!("/release/{reservation_id}"), &user, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, available) = app.get("/api/spots?status=available", &admin).await;
    assert_eq!(available["spots"].as_array().unwrap().len(), 2);

    let (status, history) = app.get("/user/booking_history", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["reservations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_input_is_validated() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (_, spot_id) = app.create_lot(&admin, 10.0, 1).await;

    let (status, body) = app.book(&user, spot_id, "tomorrow", "11:00 AM").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid time format"));

    let (status, _) = app.book(&user, spot_id, "11:00 AM", "10:00 AM").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.book(&user, 999, "10:00 AM", "11:00 AM").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inactive_lots_and_unavailable_spots_cannot_be_booked() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (lot_id, spot_id) = app.create_lot(&admin, 10.0, 2).await;

    let (status, body) = app
        .get(&format!("/admin/spots/{spot_id}/toggle"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spot"]["status"], "unavailable");

    let (status, _) = app.book(&user, spot_id, "10:00 AM", "11:00 AM").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post("/admin/spots", &admin, json!({ "status": "unavailable" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spots"].as_array().unwrap().len(), 1);
    assert_eq!(body["selected_status"], "unavailable");

    let (status, body) = app.post("/admin/lots", &admin, json!({ "lot_id": lot_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lot"]["is_active"], false);

    let (_, page) = app.get("/book", &user).await;
    assert!(page["lots"].as_array().unwrap().is_empty());
    assert!(page["spots"].as_array().unwrap().is_empty());

    let (status, body) = app.book(&user, spot_id + 1, "10:00 AM", "11:00 AM").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("inactive"));
}

#[tokio::test]
async fn users_cannot_release_others_bookings() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let alice = app.user_token("Alice", "alice@example.com").await;
    let bob = app.user_token("Bob", "bob@example.com").await;
    let (_, spot_id) = app.create_lot(&admin, 10.0, 1).await;

    let (_, body) = app
        .book(&alice, spot_id, "2030-01-01 10:00", "2030-01-01 11:00")
        .await;
    let id = body["reservation"]["id"].as_i64().unwrap();

    let (status, _) = app.post(&format!("/release/{id}"), &bob, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&format!("/release/{id}"), &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sweep_expires_overdue_bookings() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (_, spot_id) = app.create_lot(&admin, 10.0, 1).await;

    let (status, body) = app
        .book(&user, spot_id, "2020-01-01 10:00", "2020-01-01 12:00")
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app.post("/admin/sweep", &admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 1);

    let (_, spots) = app.get("/api/spots?status=available", &admin).await;
    assert_eq!(spots["spots"].as_array().unwrap().len(), 1);

    let (_, reservations) = app.get("/api/reservations", &admin).await;
    assert_eq!(reservations["reservations"][0]["status"], "completed");
    assert!((reservations["reservations"][0]["cost"].as_f64().unwrap() - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn deleting_a_user_frees_spots_and_ends_sessions() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (_, spot_id) = app.create_lot(&admin, 10.0, 1).await;
    app.book(&user, spot_id, "2030-01-01 10:00", "2030-01-01 11:00")
        .await;

    let (_, users) = app.get("/admin/users", &admin).await;
    let user_id = users["users"][0]["id"].as_i64().unwrap();
    assert!(users["users"][0].get("password_hash").is_none());

    let (status, body) = app
        .post(&format!("/admin/users/{user_id}/delete"), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["released_spots"], 1);

    let (_, spots) = app.get("/api/spots?status=available", &admin).await;
    assert_eq!(spots["spots"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/user/dashboard", &user).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_dashboard_and_lot_maintenance() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let user = app.user_token("Alice", "alice@example.com").await;
    let (lot_id, spot_id) = app.create_lot(&admin, 10.0, 2).await;
    app.book(&user, spot_id, "2030-01-01 10:00", "2030-01-01 11:00")
        .await;

    let (status, body) = app.get("/admin/dashboard", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["spot_status"]["occupied"], 1);
    assert_eq!(body["spot_status"]["available"], 1);
    assert_eq!(body["spot_status"]["unavailable"], 0);
    assert_eq!(body["top_users"][0]["name"], "Alice");
    assert_eq!(body["bookings_by_lot"][0]["count"], 1);
    assert_eq!(body["bookings_by_date"][0]["date"], "2030-01-01");

    // Raising capacity leaves existing spots; add_spots fills the gap.
    let (status, _) = app
        .post(
            &format!("/admin/edit_lot/{lot_id}"),
            &admin,
            json!({
                "location_name": "Central",
                "address": "1 Main St",
                "pin_code": "560001",
                "price_per_hour": 10.0,
                "max_spots": 4,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .post(&format!("/admin/add_spots/{lot_id}"), &admin, json!({}))
        .await;
    assert_eq!(body["added"], 2);
    let (_, body) = app
        .post(&format!("/admin/add_spots/{lot_id}"), &admin, json!({}))
        .await;
    assert_eq!(body["added"], 0);

    let (_, spots) = app.get(&format!("/api/spots?lot_id={lot_id}"), &admin).await;
    let labels: Vec<&str> = spots["spots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["spot_number"].as_str().unwrap())
        .collect();
    assert_eq!(labels, ["S1", "S2", "S3", "S4"]);
}

#[tokio::test]
async fn empty_lot_can_be_deleted() {
    let app = test_app().await;
    let admin = app.admin_token().await;
    let (lot_id, _) = app.create_lot(&admin, 10.0, 3).await;

    let (status, _) = app
        .post(&format!("/admin/delete_lot/{lot_id}"), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/admin/edit_lot/{lot_id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, spots) = app.get("/api/spots", &admin).await;
    assert!(spots["spots"].as_array().unwrap().is_empty());
}
