use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::GateConfig;

/// Dashboard session data
///
/// One browser session can hold several gates, one per successful login.
#[derive(Debug, Clone)]
pub struct Session {
    /// Gates this session has unlocked
    pub gates: HashSet<String>,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Password form for a gate
#[derive(Debug, Deserialize)]
pub struct GateCredentials {
    pub password: String,
}

lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Hash a gate password using Argon2
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Returns
/// * `Result<String, String>` - The PHC-format hash or an error
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored hash
///
/// # Returns
/// * `Result<bool, String>` - True if the password matches, false if not, or
///   an error when the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Unlock a gate, extending an existing session or creating a new one
///
/// # Arguments
/// * `existing` - Session id from the request cookie, if any
/// * `gate` - Gate that was just passed
///
/// # Returns
/// * `String` - The session id to send back
pub fn grant_gate(existing: Option<&str>, gate: &str) -> String {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    let now = SystemTime::now();
    sessions.retain(|_, s| s.expires_at > now);

    if let Some(id) = existing {
        if let Some(session) = sessions.get_mut(id) {
            session.gates.insert(gate.to_string());
            return id.to_string();
        }
    }

    let session_id = Uuid::new_v4().to_string();
    sessions.insert(
        session_id.clone(),
        Session {
            gates: HashSet::from([gate.to_string()]),
            expires_at: now + Duration::from_secs(SESSION_DURATION),
        },
    );
    session_id
}

/// Whether a session id is live and has unlocked `gate`
pub fn session_has_gate(session_id: &str, gate: &str) -> bool {
    let sessions = SESSIONS.read().unwrap_or_else(|e| e.into_inner());
    sessions
        .get(session_id)
        .is_some_and(|s| s.expires_at > SystemTime::now() && s.gates.contains(gate))
}

/// Drop a session
pub fn end_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.remove(session_id);
}

/// Check the request cookie against a gate
pub fn jar_has_gate(jar: &CookieJar, gate: &str) -> bool {
    jar.get(SESSION_COOKIE)
        .is_some_and(|cookie| session_has_gate(cookie.value(), gate))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Login page listing every configured gate with a password field
pub fn login_page_html(gates: &[GateConfig]) -> String {
    let mut forms = String::new();
    for gate in gates {
        forms.push_str(&format!(
            r#"<form method="post" action="/login/{action}"><h2>{name}</h2><input type="password" name="password" placeholder="Password"><button type="submit">Unlock</button></form>"#,
            action = html_escape(&urlencoding::encode(&gate.name)),
            name = html_escape(&gate.name)
        ));
    }
    format!(
        "<!DOCTYPE html><html><head><title>Portal Login</title><link rel=\"stylesheet\" href=\"/static/portal.css\"></head><body><h1>Portal Login</h1>{}</body></html>",
        forms
    )
}

/// Serve the login page HTML
pub async fn serve_login_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(login_page_html(&state.config.gates))
}

/// Handle a gate login
///
/// # Arguments
/// * `gate` - Path parameter naming the gate
/// * `credentials` - Form data containing the password
///
/// # Returns
/// * `Response` - Redirect to the home page with the session cookie set, or 401
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    AxumPath(gate): AxumPath<String>,
    jar: CookieJar,
    Form(credentials): Form<GateCredentials>,
) -> Response {
    let Some(gate_config) = state.config.gate(&gate) else {
        return (StatusCode::NOT_FOUND, "Unknown dashboard").into_response();
    };

    match verify_password(&credentials.password, &gate_config.password_hash) {
        Ok(true) => {
            let existing = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
            let session_id = grant_gate(existing.as_deref(), &gate);
            info!("Gate \"{}\" unlocked", gate);
            let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookie.set_same_site(SameSite::Lax);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Ok(false) => {
            warn!("Wrong password for gate \"{}\"", gate);
            (StatusCode::UNAUTHORIZED, "Invalid password").into_response()
        }
        Err(e) => {
            warn!("Gate \"{}\" has a bad password hash: {}", gate, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
        }
    }
}

/// Handle logout
///
/// Ends the server-side session and clears the cookie.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        end_session(cookie.value());
    }
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    (jar.remove(cookie), Redirect::to("/login"))
}
