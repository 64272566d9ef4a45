//! Appium WebDriver client
//!
//! Talks W3C WebDriver to an Appium server driving the Wio app over XCUITest.
//! Only the handful of endpoints the scraper needs are covered:
//!
//! - `POST /session`, `DELETE /session/{id}`
//! - `POST /session/{id}/elements` (xpath)
//! - `GET .../element/{eid}/attribute/{name}`, `GET .../element/{eid}/rect`,
//!   `POST .../element/{eid}/click`
//! - `GET /session/{id}/window/rect`
//! - `POST /session/{id}/actions` and `DELETE /session/{id}/actions`
//! - `POST /session/{id}/back`
//!
//! WebDriver error codes become typed errors so the scrape loop can tell a
//! detached element from a dead session.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::config::AppiumSettings;
use crate::domain::result::{Error, Result};
use crate::domain::{Rect, Swipe, Viewport};
use crate::ports::{ElementAttributes, UiTreeAccessor};

/// W3C web element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
/// JSON Wire Protocol key still sent by some servers
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Pause between touch down and the drag, so the list registers a press
const PRESS_MS: u64 = 100;

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WireRect {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    width: f64,
    height: f64,
}

impl From<WireRect> for Rect {
    fn from(r: WireRect) -> Self {
        Rect::new(
            r.x.round() as i64,
            r.y.round() as i64,
            r.width.round() as i64,
            r.height.round() as i64,
        )
    }
}

/// HTTP plumbing shared by the session and its element handles
#[derive(Debug)]
struct WebDriverClient {
    http: Client,
    base_url: String,
    session_id: String,
    closed: Cell<bool>,
}

impl WebDriverClient {
    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    fn get(&self, path: &str) -> Result<JsonValue> {
        send(self.http.get(self.url(path)))
    }

    fn post(&self, path: &str, body: JsonValue) -> Result<JsonValue> {
        send(self.http.post(self.url(path)).json(&body))
    }

    fn delete(&self, path: &str) -> Result<JsonValue> {
        send(self.http.delete(self.url(path)))
    }
}

/// Send a request and unwrap the `value` member of the WebDriver envelope
fn send(request: RequestBuilder) -> Result<JsonValue> {
    let response = request.send().map_err(map_request_error)?;
    let status = response.status();

    let body: JsonValue = response
        .json()
        .map_err(|e| Error::automation(format!("invalid WebDriver response (HTTP {status}): {e}")))?;

    let value = match body {
        JsonValue::Object(mut map) => map.remove("value").unwrap_or(JsonValue::Null),
        _ => JsonValue::Null,
    };

    if status.is_success() {
        Ok(value)
    } else {
        Err(map_webdriver_error(status, &value))
    }
}

/// Only an unreachable server loses the session; a slow or broken exchange
/// fails just the call it belongs to
fn map_request_error(error: reqwest::Error) -> Error {
    if error.is_connect() {
        Error::session(format!("Unable to connect to Appium server: {error}"))
    } else if error.is_timeout() {
        Error::automation(format!("Appium request timed out: {error}"))
    } else {
        Error::automation(format!("Appium request failed: {error}"))
    }
}

/// Map a W3C error payload to the error taxonomy
fn map_webdriver_error(status: StatusCode, value: &JsonValue) -> Error {
    let code = value.get("error").and_then(JsonValue::as_str).unwrap_or("unknown error");
    let message = value.get("message").and_then(JsonValue::as_str).unwrap_or_default();
    let detail = format!("{code}: {message}");

    match code {
        "stale element reference" => Error::stale(detail),
        "no such element" => Error::attribute_unavailable(detail),
        "invalid session id" => Error::session(detail),
        _ => Error::automation(format!("HTTP {}: {detail}", status.as_u16())),
    }
}

fn element_id(value: &JsonValue) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(JsonValue::as_str)
        .map(String::from)
}

fn attribute_string(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// A live Appium session
///
/// Deleted on `close`, or on drop if never closed.
#[derive(Debug)]
pub struct AppiumSession {
    client: Rc<WebDriverClient>,
}

impl AppiumSession {
    /// Create a session with the capabilities from `settings`
    pub fn connect(settings: &AppiumSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::session(format!("Failed to create HTTP client: {e}")))?;
        let base_url = settings.server_url.trim_end_matches('/').to_string();

        info!(server = %base_url, udid = %settings.udid, "Creating Appium session");
        let body = json!({ "capabilities": { "alwaysMatch": settings.to_capabilities() } });
        let value = send(http.post(format!("{base_url}/session")).json(&body))?;
        let created: NewSession = serde_json::from_value(value)
            .map_err(|e| Error::session(format!("No session id in response: {e}")))?;

        info!(session = %created.session_id, "Appium session ready");
        Ok(Self {
            client: Rc::new(WebDriverClient {
                http,
                base_url,
                session_id: created.session_id,
                closed: Cell::new(false),
            }),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.client.session_id
    }

    /// Delete the server-side session. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.client.closed.replace(true) {
            return Ok(());
        }
        info!(session = %self.client.session_id, "Closing Appium session");
        send(self.client.http.delete(format!(
            "{}/session/{}",
            self.client.base_url, self.client.session_id
        )))?;
        Ok(())
    }

    fn perform(&self, actions: JsonValue) -> Result<()> {
        self.client.post("/actions", json!({ "actions": [actions] }))?;
        // Release leaves no pointer held if the app swallowed the up event
        if let Err(e) = self.client.delete("/actions") {
            if e.is_fatal() {
                return Err(e);
            }
            debug!(error = %e, "releasing actions failed");
        }
        Ok(())
    }
}

impl Drop for AppiumSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close Appium session");
        }
    }
}

fn touch_pointer(steps: Vec<JsonValue>) -> JsonValue {
    json!({
        "type": "pointer",
        "id": "finger1",
        "parameters": { "pointerType": "touch" },
        "actions": steps,
    })
}

impl UiTreeAccessor for AppiumSession {
    type Element = AppiumElement;

    fn find_all(&self, xpath: &str) -> Result<Vec<AppiumElement>> {
        let value = self
            .client
            .post("/elements", json!({ "using": "xpath", "value": xpath }))?;

        let refs = value
            .as_array()
            .ok_or_else(|| Error::automation("find elements did not return a list"))?;

        Ok(refs
            .iter()
            .filter_map(element_id)
            .map(|id| AppiumElement {
                client: Rc::clone(&self.client),
                id,
            })
            .collect())
    }

    fn viewport_size(&self) -> Result<Viewport> {
        let rect: WireRect = serde_json::from_value(self.client.get("/window/rect")?)
            .map_err(|e| Error::automation(format!("bad window rect: {e}")))?;
        Ok(Viewport::new(rect.width.round() as i64, rect.height.round() as i64))
    }

    fn swipe(&self, swipe: &Swipe) -> Result<()> {
        self.perform(touch_pointer(vec![
            json!({ "type": "pointerMove", "duration": 0, "x": swipe.start_x, "y": swipe.start_y }),
            json!({ "type": "pointerDown", "button": 0 }),
            json!({ "type": "pause", "duration": PRESS_MS }),
            json!({ "type": "pointerMove", "duration": swipe.duration_ms, "x": swipe.end_x, "y": swipe.end_y }),
            json!({ "type": "pointerUp", "button": 0 }),
        ]))
    }

    fn scroll(&self, from: &AppiumElement, to: &AppiumElement, duration: Duration) -> Result<()> {
        self.perform(touch_pointer(vec![
            json!({ "type": "pointerMove", "duration": 0, "origin": from.reference(), "x": 0, "y": 0 }),
            json!({ "type": "pointerDown", "button": 0 }),
            json!({ "type": "pause", "duration": PRESS_MS }),
            json!({
                "type": "pointerMove",
                "duration": duration.as_millis() as u64,
                "origin": to.reference(),
                "x": 0,
                "y": 0,
            }),
            json!({ "type": "pointerUp", "button": 0 }),
        ]))
    }

    fn navigate_back(&self) -> Result<()> {
        self.client.post("/back", json!({}))?;
        Ok(())
    }
}

/// Handle onto a server-side element
#[derive(Debug, Clone)]
pub struct AppiumElement {
    client: Rc<WebDriverClient>,
    id: String,
}

impl AppiumElement {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn reference(&self) -> JsonValue {
        json!({ ELEMENT_KEY: self.id })
    }
}

impl ElementAttributes for AppiumElement {
    fn attribute(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .client
            .get(&format!("/element/{}/attribute/{}", self.id, name))?;
        Ok(attribute_string(value))
    }

    fn rect(&self) -> Result<Rect> {
        let value = self.client.get(&format!("/element/{}/rect", self.id))?;
        let rect: WireRect = serde_json::from_value(value)
            .map_err(|e| Error::attribute_unavailable(format!("bad rect for {}: {e}", self.id)))?;
        Ok(rect.into())
    }

    fn click(&self) -> Result<()> {
        self.client
            .post(&format!("/element/{}/click", self.id), json!({}))?;
        Ok(())
    }
}
