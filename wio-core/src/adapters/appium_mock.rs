//! Mock Appium server for testing
//!
//! Speaks just enough W3C WebDriver to drive `AppiumSession` end to end:
//! - POST /session returns `{ value: { sessionId, capabilities } }`
//! - POST /session/{id}/elements returns every configured element
//! - element attribute, rect and click endpoints
//! - window rect, actions, back and session deletion
//!
//! Every request is recorded so tests can assert on what the client sent.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

use super::appium::AppiumSession;
use crate::config::AppiumSettings;

const SESSION_ID: &str = "mock-session-1";
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// One element served by the mock
#[derive(Debug, Clone)]
pub struct MockElement {
    pub id: String,
    pub attributes: HashMap<String, JsonValue>,
    pub rect: (i64, i64, i64, i64),
    pub stale: bool,
}

impl MockElement {
    pub fn text(id: &str, value: &str, y: i64) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("value".to_string(), json!(value));
        attributes.insert("label".to_string(), json!(value));
        attributes.insert("visible".to_string(), json!("true"));
        Self {
            id: id.to_string(),
            attributes,
            rect: (16, y, 358, 72),
            stale: false,
        }
    }
}

/// Configuration for the mock device
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub elements: Vec<MockElement>,
    pub window: (i64, i64),
    /// Every session-scoped command answers `invalid session id`
    pub lose_session: bool,
    /// Refuse to create sessions
    pub reject_session: bool,
    /// Hold back every answer about these elements, by element id
    pub element_delays: HashMap<String, Duration>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            elements: vec![
                MockElement::text("e1", "SUN, 5 OCTOBER", 120),
                MockElement::text("e2", "Bowlito\nRestaurant\n-47.24 AED\n-415.00 THB", 160),
                MockElement::text("e3", "Careem\nTransport\n-18.00 AED", 240),
            ],
            window: (390, 844),
            lose_session: false,
            reject_session: false,
            element_delays: HashMap::new(),
        }
    }
}

/// A request as received: method, path, JSON body (Null when empty)
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: JsonValue,
}

/// Mock Appium server for testing
pub struct MockAppiumServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockAppiumServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let running_clone = Arc::clone(&running);
        let requests_clone = Arc::clone(&requests);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let log = Arc::clone(&requests_clone);
                        thread::spawn(move || handle_connection(stream, &cfg, &log));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Settings pointing at this server
    pub fn settings(&self) -> AppiumSettings {
        AppiumSettings {
            server_url: self.base_url(),
            request_timeout_secs: 5,
            ..AppiumSettings::default()
        }
    }

    pub fn connect(&self) -> crate::domain::result::Result<AppiumSession> {
        AppiumSession::connect(&self.settings())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Recorded `METHOD path` lines, in order
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockAppiumServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request, honouring Content-Length for the body
fn read_request(stream: &mut TcpStream) -> Option<(String, String, String)> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let body = String::from_utf8_lossy(&data[header_end..]).to_string();
    Some((method, path, body))
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, log: &Mutex<Vec<Recorded>>) {
    let _ = stream.set_nonblocking(false);
    let Some((method, path, body)) = read_request(&mut stream) else {
        return;
    };

    let body: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
    if let Ok(mut requests) = log.lock() {
        requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            body,
        });
    }

    let delay = config
        .element_delays
        .iter()
        .find(|(id, _)| path.contains(&format!("/element/{id}/")))
        .map(|(_, delay)| *delay);
    if let Some(delay) = delay {
        thread::sleep(delay);
    }

    let (status, value) = route(config, &method, &path);
    send_response(&mut stream, status, &json!({ "value": value }).to_string());
}

fn error(code: &str, message: &str) -> JsonValue {
    json!({ "error": code, "message": message, "stacktrace": "" })
}

fn route(config: &MockConfig, method: &str, path: &str) -> (u16, JsonValue) {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match (method, parts.as_slice()) {
        ("POST", ["session"]) if config.reject_session => (
            500,
            error("session not created", "No device connected"),
        ),
        ("POST", ["session"]) => (
            200,
            json!({ "sessionId": SESSION_ID, "capabilities": { "platformName": "iOS" } }),
        ),
        (_, ["session", id, ..]) if *id != SESSION_ID || config.lose_session => (
            404,
            error("invalid session id", "A session is either terminated or not started"),
        ),
        ("DELETE", ["session", _]) => (200, JsonValue::Null),
        ("POST", ["session", _, "elements"]) => {
            let refs: Vec<JsonValue> = config
                .elements
                .iter()
                .map(|e| json!({ ELEMENT_KEY: e.id }))
                .collect();
            (200, JsonValue::Array(refs))
        }
        ("GET", ["session", _, "window", "rect"]) => (
            200,
            json!({ "x": 0, "y": 0, "width": config.window.0, "height": config.window.1 }),
        ),
        ("POST", ["session", _, "actions"]) | ("DELETE", ["session", _, "actions"]) => {
            (200, JsonValue::Null)
        }
        ("POST", ["session", _, "back"]) => (200, JsonValue::Null),
        (_, ["session", _, "element", element_id, rest @ ..]) => {
            element_route(config, method, element_id, rest)
        }
        _ => (404, error("unknown command", path)),
    }
}

fn element_route(config: &MockConfig, method: &str, element_id: &str, rest: &[&str]) -> (u16, JsonValue) {
    let Some(element) = config.elements.iter().find(|e| e.id == element_id) else {
        return (404, error("no such element", element_id));
    };
    if element.stale {
        return (404, error("stale element reference", element_id));
    }

    match (method, rest) {
        ("GET", ["attribute", name]) => (
            200,
            element.attributes.get(*name).cloned().unwrap_or(JsonValue::Null),
        ),
        ("GET", ["rect"]) => {
            let (x, y, width, height) = element.rect;
            (200, json!({ "x": x, "y": y, "width": width, "height": height }))
        }
        ("POST", ["click"]) => (200, JsonValue::Null),
        _ => (404, error("unknown command", element_id)),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;
    use crate::domain::{Rect, Swipe, Viewport};
    use crate::ports::{ElementAttributes, UiTreeAccessor};
    use crate::services::visibility::VisibilityFilter;

    #[test]
    fn test_connect_sends_always_match_capabilities() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();
        assert_eq!(session.session_id(), SESSION_ID);

        let create = &server.requests()[0];
        assert_eq!(create.path, "/session");
        let caps = &create.body["capabilities"]["alwaysMatch"];
        assert_eq!(caps["platformName"], "iOS");
        assert_eq!(caps["appium:automationName"], "XCUITest");
    }

    #[test]
    fn test_rejected_session_is_fatal() {
        let server = MockAppiumServer::start(MockConfig {
            reject_session: true,
            ..MockConfig::default()
        })
        .unwrap();
        let err = server.connect().unwrap_err();
        assert!(matches!(err, Error::Automation(_)));
        assert!(err.to_string().contains("session not created"));
    }

    #[test]
    fn test_unreachable_server_is_session_error() {
        // Grab a free port and release it so nothing listens there
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let settings = AppiumSettings {
            server_url: format!("http://127.0.0.1:{port}"),
            request_timeout_secs: 2,
            ..AppiumSettings::default()
        };
        let err = AppiumSession::connect(&settings).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_slow_element_times_out_without_losing_session() {
        let mut config = MockConfig::default();
        config
            .element_delays
            .insert("e3".to_string(), Duration::from_millis(1500));
        let server = MockAppiumServer::start(config).unwrap();
        let session = AppiumSession::connect(&AppiumSettings {
            request_timeout_secs: 1,
            ..server.settings()
        })
        .unwrap();

        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();
        let err = elements[2].text().unwrap_err();
        assert!(matches!(err, Error::Automation(_)));
        assert!(!err.is_fatal());
        assert!(elements[1].text().unwrap().starts_with("Bowlito"));

        // A discovery pass drops e3 and keeps going
        let viewport = session.viewport_size().unwrap();
        let candidates = VisibilityFilter::new("AED").filter(elements, viewport);
        let ids: Vec<&str> = candidates.iter().map(|c| c.element.id()).collect();
        assert_eq!(ids, vec!["e2"]);
    }

    #[test]
    fn test_find_and_read_elements() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();

        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[1].id(), "e2");
        assert_eq!(elements[1].rect().unwrap(), Rect::new(16, 160, 358, 72));
        assert!(elements[1].is_visible().unwrap());
        assert_eq!(elements[2].text().unwrap(), "Careem\nTransport\n-18.00 AED");
        assert_eq!(elements[2].attribute("UID").unwrap(), None);
        assert_eq!(session.viewport_size().unwrap(), Viewport::new(390, 844));

        let lines = server.request_lines();
        assert!(lines.contains(&"POST /session/mock-session-1/elements".to_string()));
        assert!(lines.contains(&"GET /session/mock-session-1/element/e2/rect".to_string()));
    }

    #[test]
    fn test_visibility_filter_over_http() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();

        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();
        let viewport = session.viewport_size().unwrap();
        let candidates = VisibilityFilter::new("AED").filter(elements, viewport);

        let ids: Vec<&str> = candidates.iter().map(|c| c.element.id()).collect();
        assert_eq!(ids, vec!["e2", "e3"]);
    }

    #[test]
    fn test_stale_element_maps_to_stale_error() {
        let mut config = MockConfig::default();
        config.elements[1].stale = true;
        let server = MockAppiumServer::start(config).unwrap();
        let session = server.connect().unwrap();

        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();
        assert!(matches!(elements[1].rect(), Err(Error::StaleElement(_))));
        assert!(elements[2].rect().is_ok());
    }

    #[test]
    fn test_lost_session_is_fatal() {
        let server = MockAppiumServer::start(MockConfig {
            lose_session: true,
            ..MockConfig::default()
        })
        .unwrap();
        let session = server.connect().unwrap();

        let err = session.find_all("//XCUIElementTypeStaticText").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_swipe_posts_touch_actions_then_releases() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();

        let gesture = Swipe {
            start_x: 195,
            start_y: 633,
            end_x: 195,
            end_y: 338,
            duration_ms: 800,
        };
        session.swipe(&gesture).unwrap();

        let requests = server.requests();
        let actions = requests
            .iter()
            .find(|r| r.method == "POST" && r.path.ends_with("/actions"))
            .unwrap();
        let pointer = &actions.body["actions"][0];
        assert_eq!(pointer["parameters"]["pointerType"], "touch");
        assert_eq!(pointer["actions"][0]["y"], 633);
        assert_eq!(pointer["actions"][3]["y"], 338);
        assert_eq!(pointer["actions"][3]["duration"], 800);
        assert!(server
            .request_lines()
            .contains(&"DELETE /session/mock-session-1/actions".to_string()));
    }

    #[test]
    fn test_element_scroll_uses_element_origins() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();
        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();

        session
            .scroll(&elements[2], &elements[1], Duration::from_millis(500))
            .unwrap();

        let requests = server.requests();
        let actions = requests.iter().find(|r| r.path.ends_with("/actions")).unwrap();
        let steps = &actions.body["actions"][0]["actions"];
        assert_eq!(steps[0]["origin"][ELEMENT_KEY], "e3");
        assert_eq!(steps[3]["origin"][ELEMENT_KEY], "e2");
    }

    #[test]
    fn test_click_and_back() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();
        let elements = session.find_all("//XCUIElementTypeStaticText").unwrap();

        elements[1].click().unwrap();
        session.navigate_back().unwrap();

        let lines = server.request_lines();
        assert!(lines.contains(&"POST /session/mock-session-1/element/e2/click".to_string()));
        assert!(lines.contains(&"POST /session/mock-session-1/back".to_string()));
    }

    #[test]
    fn test_close_deletes_session_once() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        let session = server.connect().unwrap();

        session.close().unwrap();
        session.close().unwrap();
        drop(session);

        let deletes = server
            .request_lines()
            .iter()
            .filter(|l| *l == "DELETE /session/mock-session-1")
            .count();
        assert_eq!(deletes, 1);
    }

    #[test]
    fn test_drop_deletes_session() {
        let server = MockAppiumServer::start(MockConfig::default()).unwrap();
        drop(server.connect().unwrap());

        assert!(server
            .request_lines()
            .contains(&"DELETE /session/mock-session-1".to_string()));
    }
}
