//! End-to-end CAS flow against an in-process CAS server

use axum::{
    body::{to_bytes, Body},
    extract::{Query, State},
    http::{header, Request, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use cas_gateway::{cas::TicketValidator, config::Config, web::create_router, AppState};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const GATEWAY_HOST: &str = "localhost:3000";
const EXPECTED_SERVICE: &str = "http://localhost:3000/auth/callback";

/// Tickets the fake CAS will still accept; each one can be redeemed once
type Tickets = Arc<Mutex<HashSet<String>>>;

async fn service_validate(
    State(tickets): State<Tickets>,
    Query(params): Query<HashMap<String, String>>,
) -> String {
    let service = params.get("service").map(String::as_str);
    let ticket = params.get("ticket").cloned().unwrap_or_default();

    if service != Some(EXPECTED_SERVICE) {
        return failure("INVALID_SERVICE", "Service does not match the ticket");
    }
    if !tickets.lock().unwrap().remove(&ticket) {
        return failure("INVALID_TICKET", &format!("Ticket {} not recognized", ticket));
    }

    r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>alice</cas:user>
    <cas:attributes>
      <cas:email>alice%40example.edu</cas:email>
      <cas:displayName>Alice Liddell</cas:displayName>
    </cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#
        .to_string()
}

fn failure(code: &str, message: &str) -> String {
    format!(
        r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="{}">{}</cas:authenticationFailure>
</cas:serviceResponse>"#,
        code, message
    )
}

async fn spawn_cas(tickets: &[&str]) -> String {
    let tickets: Tickets = Arc::new(Mutex::new(
        tickets.iter().map(|t| t.to_string()).collect(),
    ));
    let router = Router::new()
        .route("/cas/serviceValidate", get(service_validate))
        .with_state(tickets);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/cas", addr)
}

fn gateway(cas_url: &str) -> Router {
    let config = Config::new(cas_url, "https://chat.example.com");
    let validator = TicketValidator::from_config(&config).unwrap();
    create_router(Arc::new(AppState {
        config: Arc::new(config),
        validator: Arc::new(validator),
    }))
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", GATEWAY_HOST);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(body).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Cookie header a browser would send back after these Set-Cookie values
fn returned_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|c| !c.contains("Max-Age=0"))
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_login_callback_and_replay() {
    let cas = spawn_cas(&["ST-1"]).await;
    let app = gateway(&cas);

    // Unauthenticated page request goes to CAS with our callback as service
    let resp = app
        .clone()
        .oneshot(request("GET", "/", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    let login = url::Url::parse(&location(&resp)).unwrap();
    assert_eq!(login.path(), "/cas/login");
    let service: String = login
        .query_pairs()
        .find(|(k, _)| k == "service")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(service, EXPECTED_SERVICE);

    // CAS sends the browser back with a ticket
    let resp = app
        .clone()
        .oneshot(request("GET", "/auth/callback?ticket=ST-1", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let cookies = returned_cookies(&resp);
    assert!(cookies.contains("session_user=alice"));
    assert!(cookies.contains("session_user_data="));

    // The session now opens the landing page and the session endpoint
    let resp = app
        .clone()
        .oneshot(request("GET", "/", Some(&cookies), Body::empty()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request("GET", "/api/auth/session", Some(&cookies), Body::empty()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session = body_json(resp).await;
    assert_eq!(session["username"], "alice");
    assert_eq!(session["attributes"]["email"], "alice@example.edu");
    assert_eq!(session["attributes"]["displayName"], "Alice Liddell");
    assert!(session["loginTime"].is_string());

    // Tickets are single use
    let resp = app
        .clone()
        .oneshot(request("GET", "/auth/callback?ticket=ST-1", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let cleared = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|v| v.to_str().unwrap_or_default().contains("Max-Age=0"))
        .count();
    assert_eq!(cleared, 4);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("Ticket ST-1 not recognized"));
}

#[tokio::test]
async fn test_validate_endpoint() {
    let cas = spawn_cas(&["ST-2"]).await;
    let app = gateway(&cas);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/validate",
            None,
            Body::from(r#"{"ticket":"ST-2"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(returned_cookies(&resp).contains("session_user=alice"));
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["user"], "alice");
    assert_eq!(json["attributes"]["email"], "alice@example.edu");
    assert!(json.get("error").is_none());

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/validate",
            None,
            Body::from(r#"{"ticket":"ST-2"}"#),
        ))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Ticket ST-2 not recognized");

    let resp = app
        .oneshot(request(
            "POST",
            "/api/auth/validate",
            None,
            Body::from(r#"{"ticket":""}"#),
        ))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "missing ticket");
}

#[tokio::test]
async fn test_logout_hands_off_to_cas() {
    let cas = spawn_cas(&[]).await;
    let app = gateway(&cas);

    let resp = app
        .oneshot(request(
            "POST",
            "/auth/logout",
            Some("session_user=alice"),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp),
        format!("{}/logout?service=http%3A%2F%2Flocalhost%3A3000", cas)
    );
    assert_eq!(returned_cookies(&resp), "");
}

#[tokio::test]
async fn test_unreachable_cas_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let app = gateway(&format!("http://{}/cas", addr));

    let resp = app
        .oneshot(request(
            "POST",
            "/api/auth/validate",
            None,
            Body::from(r#"{"ticket":"ST-3"}"#),
        ))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("network error"));
}
