//! In-process fake of the LimeSurvey remote control endpoint.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use limesurvey_rpc::{
    STATUS_INVALID_CREDENTIALS, STATUS_INVALID_SESSION_KEY, STATUS_NO_PARTICIPANT_FOUND,
};
use limesurvey_session::{remote_control_url, Config};
use serde_json::{json, Value};

pub const API_USER: &str = "edx";
pub const API_PASSWORD: &str = "secret";

/// State of the fake LimeSurvey installation.
#[derive(Debug, Default)]
pub struct FakeLimeSurvey {
    /// Key currently accepted for authenticated calls.
    pub valid_key: Option<String>,
    /// Number of keys issued so far.
    pub issued_keys: u32,
    /// Registered participants.
    pub participants: Vec<Value>,
    /// Every method called, in order.
    pub methods: Vec<String>,
    /// When set, every request is answered with this HTTP status and body.
    pub failure: Option<(u16, String)>,
}

impl FakeLimeSurvey {
    pub fn count(&self, method: &str) -> usize {
        self.methods.iter().filter(|m| *m == method).count()
    }

    fn dispatch(&mut self, method: &str, params: &[Value]) -> Value {
        if method == "get_session_key" {
            if params == [json!(API_USER), json!(API_PASSWORD)] {
                self.issued_keys += 1;
                let key = format!("key-{}", self.issued_keys);
                self.valid_key = Some(key.clone());
                return json!(key);
            }
            return json!({ "status": STATUS_INVALID_CREDENTIALS });
        }

        let authorized = self
            .valid_key
            .as_deref()
            .is_some_and(|key| params.first().and_then(Value::as_str) == Some(key));
        if !authorized {
            return json!({ "status": STATUS_INVALID_SESSION_KEY });
        }

        match method {
            "get_summary" => json!({
                "token_count": self.participants.len().to_string(),
                "completed_responses": "0",
            }),
            "list_participants" => {
                let wanted = &params[6]["attribute_1"];
                let matches: Vec<Value> = self
                    .participants
                    .iter()
                    .filter(|p| &p["attribute_1"] == wanted)
                    .cloned()
                    .collect();
                if matches.is_empty() {
                    json!({ "status": STATUS_NO_PARTICIPANT_FOUND })
                } else {
                    Value::Array(matches)
                }
            }
            "add_participants" => {
                let mut added = Vec::new();
                for mut participant in params[2].as_array().cloned().unwrap_or_default() {
                    let tid = self.participants.len() + 1;
                    let token = format!("TOKEN-{}", participant["attribute_1"].as_str().unwrap_or(""));
                    participant["tid"] = json!(tid.to_string());
                    participant["token"] = json!(token);
                    self.participants.push(participant.clone());
                    added.push(participant);
                }
                Value::Array(added)
            }
            "get_participant_properties" => {
                let wanted = &params[2]["attribute_1"];
                self.participants
                    .iter()
                    .find(|p| &p["attribute_1"] == wanted)
                    .cloned()
                    .unwrap_or_else(|| json!({ "status": "Error: No token matched" }))
            }
            _ => json!({ "status": "Error: Invalid method" }),
        }
    }
}

pub type SharedFake = Arc<Mutex<FakeLimeSurvey>>;

async fn remote_control(State(fake): State<SharedFake>, Json(request): Json<Value>) -> Response {
    let mut fake = fake.lock().expect("fake lock poisoned");
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].as_array().cloned().unwrap_or_default();
    fake.methods.push(method.clone());

    if let Some((status, body)) = fake.failure.clone() {
        let status = StatusCode::from_u16(status).expect("valid status code");
        return (status, body).into_response();
    }

    let result = fake.dispatch(&method, &params);
    Json(json!({ "id": request["id"], "result": result, "error": null })).into_response()
}

/// A running fake server.
pub struct FakeServer {
    pub base_url: String,
    pub fake: SharedFake,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    /// Process defaults pointing at this server.
    pub fn config(&self) -> Config {
        Config {
            limesurvey_url: Some(self.base_url.clone()),
            internal_api: Some(remote_control_url(&self.base_url)),
            api_user: Some(API_USER.to_string()),
            api_password: Some(API_PASSWORD.to_string()),
            ..Config::default()
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.fake.lock().expect("fake lock poisoned").methods.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.fake.lock().expect("fake lock poisoned").count(method)
    }

    pub fn with_fake<T>(&self, f: impl FnOnce(&mut FakeLimeSurvey) -> T) -> T {
        f(&mut self.fake.lock().expect("fake lock poisoned"))
    }
}

/// Spawns a fake LimeSurvey server on an ephemeral port.
pub async fn spawn_fake_limesurvey() -> FakeServer {
    let fake: SharedFake = Arc::new(Mutex::new(FakeLimeSurvey::default()));
    let router = Router::new()
        .route("/index.php/admin/remotecontrol", post(remote_control))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    FakeServer {
        base_url: format!("http://{addr}"),
        fake,
        _handle: handle,
    }
}
