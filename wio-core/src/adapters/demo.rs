//! Demo UI tree - an in-memory Wio transaction list
//!
//! Stands in for a device in tests and `wio scrape --demo`:
//! - day headers and transaction rows laid out top to bottom
//! - every row stays attached however far it scrolled, like the real app
//! - a balance banner pinned at the very top of the screen
//! - clicking a row opens its detail view until `navigate_back`
//!
//! Only a small XPath subset is understood: `//Type`, optionally followed by
//! `[contains(@attr, "needle") or ...]`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::domain::result::{Error, Result};
use crate::domain::{Rect, Swipe, Viewport};
use crate::ports::{ElementAttributes, UiTreeAccessor};

const STATIC_TEXT: &str = "XCUIElementTypeStaticText";

const CONTENT_TOP: i64 = 120;
const HEADER_HEIGHT: i64 = 40;
const ROW_HEIGHT: i64 = 80;
const BOTTOM_PADDING: i64 = 40;
const ROW_X: i64 = 16;

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^//(\w+)").expect("valid type regex"));

static CONTAINS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"contains\(@(\w+),\s*"([^"]*)"\)"#).expect("valid predicate regex"));

/// One transaction in the demo feed
#[derive(Debug, Clone, PartialEq)]
pub struct DemoRow {
    /// Multi-line preview text as the list renders it
    pub text: String,
    pub reference: String,
    /// Booking time shown in the detail view
    pub booked_at: String,
}

#[derive(Debug, Clone, PartialEq)]
enum FeedItem {
    Header(String),
    Row(DemoRow),
}

/// Ordered list content, newest first
#[derive(Debug, Clone, Default)]
pub struct DemoFeed {
    items: Vec<FeedItem>,
}

impl DemoFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, title: &str) -> Self {
        self.items.push(FeedItem::Header(title.to_string()));
        self
    }

    pub fn row(mut self, text: &str, reference: &str, booked_at: &str) -> Self {
        self.items.push(FeedItem::Row(DemoRow {
            text: text.to_string(),
            reference: reference.to_string(),
            booked_at: booked_at.to_string(),
        }));
        self
    }

    pub fn rows(&self) -> impl Iterator<Item = &DemoRow> {
        self.items.iter().filter_map(|item| match item {
            FeedItem::Row(row) => Some(row),
            FeedItem::Header(_) => None,
        })
    }

    /// Four days of typical account activity
    ///
    /// 20 rows, 16 of them spending. Two Starbucks rows on the same day are
    /// identical in preview and differ only by reference.
    pub fn sample() -> Self {
        Self::new()
            .header("SUN, 5 OCTOBER")
            .row("Bowlito\nRestaurant\n-47.24 AED\n-415.00 THB", "AE-5001", "5 Oct 2025, 21:14")
            .row("Careem\nTransport\n-18.00 AED", "AE-5002", "5 Oct 2025, 19:02")
            .row("Starbucks\nCafe\n-21.00 AED", "AE-5003", "5 Oct 2025, 10:41")
            .row("Starbucks\nCafe\n-21.00 AED", "AE-5004", "5 Oct 2025, 08:15")
            .row("Salary\nIncome\n+12,500.00 AED", "AE-5005", "5 Oct 2025, 06:00")
            .header("SAT, 4 OCTOBER")
            .row("Spinneys\nGroceries\n-99.35 AED", "AE-5006", "4 Oct 2025, 20:33")
            .row("Illia Pivtoraiko to Temp\n-151,000.00 AED", "AE-5007", "4 Oct 2025, 17:48")
            .row("Noon\nShopping\n-310.50 AED", "AE-5008", "4 Oct 2025, 15:20")
            .row("Cashback\n+5.20 AED", "AE-5009", "4 Oct 2025, 12:00")
            .row("Talabat\nFood delivery\n-64.75 AED", "AE-5010", "4 Oct 2025, 09:37")
            .header("FRI, 3 OCTOBER")
            .row("Netflix\nEntertainment\n-39.00 AED\n-10.62 USD", "AE-5011", "3 Oct 2025, 23:59")
            .row("ENOC\nFuel\n-120.00 AED", "AE-5012", "3 Oct 2025, 18:26")
            .row("Dubai Metro\nTransport\n-7.50 AED", "AE-5013", "3 Oct 2025, 08:04")
            .row("Carrefour\nGroceries\n-233.10 AED", "AE-5014", "3 Oct 2025, 07:45")
            .row("Transfer from Savings\n+2,000.00 AED", "AE-5015", "3 Oct 2025, 07:00")
            .header("TUE, 30 SEPTEMBER")
            .row("Amazon\nShopping\n-1,249.00 AED", "AE-5016", "30 Sep 2025, 22:10")
            .row("DEWA\nUtilities\n-412.80 AED", "AE-5017", "30 Sep 2025, 14:55")
            .row("Emirates\nTravel\n-2,350.00 AED\n-640.00 USD", "AE-5018", "30 Sep 2025, 11:30")
            .row("Gym Nation\nFitness\n-99.00 AED", "AE-5019", "30 Sep 2025, 07:12")
            .row("Refund Noon\n+310.50 AED", "AE-5020", "30 Sep 2025, 06:45")
    }

    /// Total height of the laid-out list, in content coordinates
    fn content_bottom(&self) -> i64 {
        self.items.iter().fold(CONTENT_TOP, |y, item| y + item_height(item)) + BOTTOM_PADDING
    }
}

fn item_height(item: &FeedItem) -> i64 {
    match item {
        FeedItem::Header(_) => HEADER_HEIGHT,
        FeedItem::Row(_) => ROW_HEIGHT,
    }
}

/// State shared between the tree and the element handles it gave out
#[derive(Debug, Default)]
struct Device {
    offset: Cell<i64>,
    calls: Cell<usize>,
    session_limit: Cell<Option<usize>>,
    open_detail: RefCell<Option<DemoRow>>,
}

impl Device {
    /// Count one backend call, failing once the session budget is spent
    fn call(&self) -> Result<()> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        match self.session_limit.get() {
            Some(limit) if n >= limit => Err(Error::session("demo session terminated")),
            _ => Ok(()),
        }
    }
}

/// Snapshot handle onto one demo element
#[derive(Debug, Clone)]
pub struct DemoElement {
    kind: String,
    attributes: HashMap<String, String>,
    rect: Rect,
    stale: bool,
    opens: Option<DemoRow>,
    device: Option<Rc<Device>>,
}

impl DemoElement {
    /// A free-standing visible static text, not attached to any tree
    pub fn new(text: &str, rect: Rect) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("value".to_string(), text.to_string());
        attributes.insert("visible".to_string(), "true".to_string());
        Self {
            kind: STATIC_TEXT.to_string(),
            attributes,
            rect,
            stale: false,
            opens: None,
            device: None,
        }
    }

    pub fn hidden(self) -> Self {
        self.with_attribute("visible", "false")
    }

    /// Every read fails as if the element detached
    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    fn attached(mut self, device: &Rc<Device>) -> Self {
        self.device = Some(Rc::clone(device));
        self
    }

    fn matches(&self, query: &Query) -> bool {
        if query.kind.as_deref().is_some_and(|kind| kind != self.kind) {
            return false;
        }
        query.any_of.is_empty()
            || query.any_of.iter().any(|(attr, needle)| {
                self.attributes
                    .get(attr)
                    .is_some_and(|value| value.contains(needle.as_str()))
            })
    }

    fn check(&self) -> Result<()> {
        if let Some(device) = &self.device {
            device.call()?;
        }
        if self.stale {
            return Err(Error::stale(format!("{} at y={}", self.kind, self.rect.y)));
        }
        Ok(())
    }
}

impl ElementAttributes for DemoElement {
    fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.attributes.get(name).cloned())
    }

    fn rect(&self) -> Result<Rect> {
        self.check()?;
        Ok(self.rect)
    }

    fn click(&self) -> Result<()> {
        self.check()?;
        if let (Some(row), Some(device)) = (&self.opens, &self.device) {
            *device.open_detail.borrow_mut() = Some(row.clone());
        }
        Ok(())
    }
}

/// Parsed form of the supported XPath subset
#[derive(Debug)]
struct Query {
    kind: Option<String>,
    any_of: Vec<(String, String)>,
}

impl Query {
    fn parse(xpath: &str) -> Self {
        let kind = TYPE_RE
            .captures(xpath)
            .map(|caps| caps[1].to_string())
            .filter(|kind| kind != "*");
        let any_of = CONTAINS_RE
            .captures_iter(xpath)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
            .collect();
        Self { kind, any_of }
    }
}

/// In-memory accessibility tree over a `DemoFeed`
#[derive(Debug)]
pub struct DemoUiTree {
    feed: DemoFeed,
    viewport: Viewport,
    device: Rc<Device>,
    swipes: RefCell<Vec<Swipe>>,
    failing_gestures: bool,
    stuck: bool,
    empty_queries: Cell<usize>,
    stale_references: Vec<String>,
}

impl DemoUiTree {
    pub fn new(feed: DemoFeed, viewport: Viewport) -> Self {
        Self {
            feed,
            viewport,
            device: Rc::new(Device::default()),
            swipes: RefCell::new(Vec::new()),
            failing_gestures: false,
            stuck: false,
            empty_queries: Cell::new(0),
            stale_references: Vec::new(),
        }
    }

    /// Every gesture is rejected by the backend
    pub fn failing_gestures(mut self) -> Self {
        self.failing_gestures = true;
        self
    }

    /// Gestures are accepted but the list never moves
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// The session dies after `calls` successful backend calls
    pub fn lose_session_after(self, calls: usize) -> Self {
        self.device.session_limit.set(Some(calls));
        self
    }

    /// The next `queries` lookups find nothing, as while the app is loading
    pub fn empty_queries(self, queries: usize) -> Self {
        self.empty_queries.set(queries);
        self
    }

    /// The row with this reference detaches whenever it is read
    pub fn stale_row(mut self, reference: &str) -> Self {
        self.stale_references.push(reference.to_string());
        self
    }

    pub fn feed(&self) -> &DemoFeed {
        &self.feed
    }

    /// Gestures delivered through `swipe`, in order
    pub fn swipes(&self) -> Vec<Swipe> {
        self.swipes.borrow().clone()
    }

    /// How far the list has scrolled
    pub fn offset(&self) -> i64 {
        self.device.offset.get()
    }

    pub fn max_offset(&self) -> i64 {
        (self.feed.content_bottom() - self.viewport.height).max(0)
    }

    pub fn detail_open(&self) -> bool {
        self.device.open_detail.borrow().is_some()
    }

    /// Backend calls made so far
    pub fn calls(&self) -> usize {
        self.device.calls.get()
    }

    fn move_by(&self, delta: i64) {
        if self.stuck {
            return;
        }
        let offset = (self.offset() + delta).clamp(0, self.max_offset());
        self.device.offset.set(offset);
    }

    fn text_element(&self, text: &str, rect: Rect) -> DemoElement {
        let on_screen = rect.y + rect.height > 0 && rect.y < self.viewport.height;
        DemoElement::new(text, rect)
            .with_attribute("label", text)
            .with_attribute("visible", if on_screen { "true" } else { "false" })
            .attached(&self.device)
    }

    fn list_elements(&self) -> Vec<DemoElement> {
        let width = self.viewport.width - 2 * ROW_X;
        let offset = self.offset();

        // Pinned above the list, outside any scroll offset
        let mut elements = vec![self.text_element(
            "Available balance\n48,120.55 AED",
            Rect::new(ROW_X, 0, width, 60),
        )];

        let mut y = CONTENT_TOP;
        for item in &self.feed.items {
            let height = item_height(item);
            let rect = Rect::new(ROW_X, y - offset, width, height);
            y += height;

            let element = match item {
                FeedItem::Header(title) => self.text_element(title, rect),
                FeedItem::Row(row) => {
                    let mut element = self
                        .text_element(&row.text, rect)
                        .with_attribute("name", "transaction")
                        .with_attribute("UID", &row.reference);
                    element.opens = Some(row.clone());
                    element.stale = self.stale_references.contains(&row.reference);
                    element
                }
            };
            elements.push(element);
        }
        elements
    }

    fn detail_elements(&self, row: &DemoRow) -> Vec<DemoElement> {
        let width = self.viewport.width - 2 * ROW_X;
        let title = row.text.lines().next().unwrap_or_default();
        vec![
            self.text_element(title, Rect::new(ROW_X, 140, width, 40)),
            self.text_element(&row.booked_at, Rect::new(ROW_X, 200, width, 30))
                .with_attribute("name", "Date"),
            self.text_element(
                &format!("Reference number\n{}", row.reference),
                Rect::new(ROW_X, 260, width, 50),
            ),
        ]
    }
}

impl UiTreeAccessor for DemoUiTree {
    type Element = DemoElement;

    fn find_all(&self, xpath: &str) -> Result<Vec<DemoElement>> {
        self.device.call()?;

        let pending = self.empty_queries.get();
        if pending > 0 {
            self.empty_queries.set(pending - 1);
            return Ok(Vec::new());
        }

        let query = Query::parse(xpath);
        let pool = match self.device.open_detail.borrow().as_ref() {
            Some(row) => self.detail_elements(row),
            None => self.list_elements(),
        };
        Ok(pool.into_iter().filter(|e| e.matches(&query)).collect())
    }

    fn viewport_size(&self) -> Result<Viewport> {
        self.device.call()?;
        Ok(self.viewport)
    }

    fn swipe(&self, swipe: &Swipe) -> Result<()> {
        self.device.call()?;
        if self.failing_gestures {
            return Err(Error::automation("swipe rejected"));
        }
        self.swipes.borrow_mut().push(*swipe);
        self.move_by(swipe.start_y - swipe.end_y);
        Ok(())
    }

    fn scroll(&self, from: &DemoElement, to: &DemoElement, _duration: Duration) -> Result<()> {
        self.device.call()?;
        if self.failing_gestures {
            return Err(Error::automation("scroll rejected"));
        }
        self.move_by(from.rect.y - to.rect.y);
        Ok(())
    }

    fn navigate_back(&self) -> Result<()> {
        self.device.call()?;
        match self.device.open_detail.borrow_mut().take() {
            Some(_) => Ok(()),
            None => Err(Error::automation("no detail view to leave")),
        }
    }
}
