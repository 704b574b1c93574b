//! In-process model of the hotel booking application
//!
//! [`SimulatedHotel`] implements [`UiDriver`] directly. Each page is a flat
//! list of nodes addressed by the selectors the real UI uses, and every API
//! call a page makes goes through an [`InterceptionLog`], so the engine sees
//! the same calls it would capture from a browser. [`Faults`] make the
//! application misbehave in the ways scenarios are meant to catch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

use staycheck_engine::credentials::Credentials;
use staycheck_engine::driver::{BackgroundError, DriverFactory, UiDriver};
use staycheck_engine::form::Pick;
use staycheck_engine::{
    EngineError, EngineResult, InFlight, Interception, InterceptionLog, Locator, RouteSpec,
};

pub const ORIGIN: &str = "http://hotel.local";

pub const CONTACT_NAME: &str = r#"[data-testid="ContactName"]"#;
pub const CONTACT_EMAIL: &str = r#"[data-testid="ContactEmail"]"#;
pub const CONTACT_PHONE: &str = r#"[data-testid="ContactPhone"]"#;
pub const CONTACT_SUBJECT: &str = r#"[data-testid="ContactSubject"]"#;
pub const CONTACT_DESCRIPTION: &str = r#"[data-testid="ContactDescription"]"#;
pub const SUBMIT_CONTACT: &str = "#submitContact";

pub const USERNAME: &str = r#"[data-testid="username"]"#;
pub const PASSWORD: &str = r#"[data-testid="password"]"#;
pub const LOGIN: &str = r#"[data-testid="submit"]"#;

pub const ROOM_NAME: &str = r#"[data-testid="roomName"]"#;
pub const ROOM_TYPE: &str = "#type";
pub const ROOM_ACCESSIBLE: &str = "#accessible";
pub const ROOM_PRICE: &str = "#roomPrice";
pub const CREATE_ROOM: &str = "#createRoom";
pub const ROOM_LISTING: &str = r#"[data-testid="roomlisting"]"#;
pub const ROOM_DETAILS: &str = ".room-details";

pub const ALERT: &str = ".alert-danger";

pub const ROOM_TYPES: &[&str] = &["Single", "Twin", "Double", "Family", "Suite"];
pub const ROOM_FEATURES: &[&str] = &["WiFi", "TV", "Radio", "Refreshments", "Safe", "Views"];
const BOOLEANS: &[&str] = &["false", "true"];

const WELCOME: &str = "Welcome to Shady Meadows B&B.";

/// Credentials the simulated admin account accepts unless told otherwise
pub fn default_admin() -> Credentials {
    Credentials {
        username: "admin".to_string(),
        password: "password".to_string(),
    }
}

/// Ways the simulated application can misbehave
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// The API accepts submissions with missing or malformed fields
    pub skip_validation: bool,

    /// Submit buttons never reach the API
    pub silent_submit: bool,

    /// Created rooms are stored but never returned by `GET /room`
    pub hide_created_rooms: bool,

    /// Raised on every page load
    pub background: Vec<BackgroundError>,

    /// Delay before API calls complete
    pub latency: Duration,
}

/// A room as the API stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: u64,
    pub name: String,
    pub kind: String,
    pub accessible: bool,
    pub price: u32,
    pub features: Vec<String>,
    hidden: bool,
}

impl Room {
    fn to_json(&self) -> Value {
        json!({
            "roomid": self.id,
            "roomName": self.name,
            "type": self.kind,
            "accessible": self.accessible,
            "roomPrice": self.price,
            "features": self.features,
        })
    }

    fn summary(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name,
            self.kind,
            self.accessible,
            self.price,
            self.features.join(", ")
        )
    }

    fn details(&self) -> String {
        format!(
            "Room: {} Type: {} Accessible: {} Price: {} Features: {}",
            self.name,
            self.kind,
            self.accessible,
            self.price,
            self.features.join(", ")
        )
    }
}

/// Server-side state shared by every session of one application
#[derive(Debug)]
pub struct Backend {
    rooms: Vec<Room>,
    messages: Vec<Value>,
    next_room_id: u64,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            rooms: vec![Room {
                id: 1,
                name: "101".to_string(),
                kind: "Single".to_string(),
                accessible: true,
                price: 100,
                features: vec!["WiFi".to_string(), "TV".to_string()],
                hidden: false,
            }],
            messages: Vec::new(),
            next_room_id: 2,
        }
    }
}

impl Backend {
    fn listing(&self) -> Value {
        let rooms: Vec<Value> = self
            .rooms
            .iter()
            .filter(|r| !r.hidden)
            .map(Room::to_json)
            .collect();
        json!({ "rooms": rooms })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Page {
    #[default]
    Blank,
    Contact,
    Login,
    Rooms,
    RoomDetail(u64),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Text,
    Input,
    Select(&'static [&'static str]),
    Checkbox,
    Button,
    /// Clicking opens the room with this id
    Listing(u64),
}

#[derive(Debug, Clone)]
struct Node {
    selector: String,
    text: String,
    kind: NodeKind,
}

fn node(selector: &str, kind: NodeKind, text: impl Into<String>) -> Node {
    Node {
        selector: selector.to_string(),
        text: text.into(),
        kind,
    }
}

fn checkbox_selector(value: &str) -> String {
    format!(r#"[value="{}"]"#, value)
}

/// Browser-side state of one session
#[derive(Debug, Default)]
struct Session {
    page: Page,
    logged_in: bool,
    inputs: HashMap<String, String>,
    checked: Vec<String>,
    alert: Vec<String>,
    /// Name and subject of the message just sent
    sent: Option<(String, String)>,
    background: Vec<BackgroundError>,
    /// Every input the session typed into, selected or checked
    touched: Vec<String>,
}

impl Session {
    fn input(&self, selector: &str) -> String {
        self.inputs.get(selector).cloned().unwrap_or_default()
    }

    fn touch(&mut self, selector: &str) {
        if !self.touched.iter().any(|s| s == selector) {
            self.touched.push(selector.to_string());
        }
    }

    fn reset_form(&mut self) {
        self.inputs.clear();
        self.checked.clear();
        self.alert.clear();
        self.sent = None;
        self.inputs.insert(ROOM_TYPE.to_string(), ROOM_TYPES[0].to_string());
        self.inputs.insert(ROOM_ACCESSIBLE.to_string(), BOOLEANS[0].to_string());
    }
}

/// An API call the page made
struct Call {
    method: &'static str,
    path: &'static str,
    status: u16,
    request: Value,
    response: Value,
}

impl Call {
    fn url(&self) -> String {
        format!("{}{}", ORIGIN, self.path)
    }
}

/// One browser session against the simulated application
pub struct SimulatedHotel {
    backend: Arc<Mutex<Backend>>,
    session: Mutex<Session>,
    log: Arc<InterceptionLog>,
    admin: Credentials,
    faults: Faults,
}

impl Default for SimulatedHotel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHotel {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self::with_backend(Arc::new(Mutex::new(Backend::default())), default_admin(), faults)
    }

    pub fn with_backend(backend: Arc<Mutex<Backend>>, admin: Credentials, faults: Faults) -> Self {
        Self {
            backend,
            session: Mutex::new(Session::default()),
            log: Arc::new(InterceptionLog::new()),
            admin,
            faults,
        }
    }

    /// Rooms stored by the API, including any the listing hides
    pub fn rooms(&self) -> Vec<Room> {
        self.backend.lock().rooms.clone()
    }

    /// Selectors of every input this session has filled in, in first-use order
    pub fn touched(&self) -> Vec<String> {
        self.session.lock().touched.clone()
    }

    /// Bodies of every accepted contact message
    pub fn messages(&self) -> Vec<Value> {
        self.backend.lock().messages.clone()
    }

    fn nodes(&self, session: &Session) -> Vec<Node> {
        let mut nodes = Vec::new();

        match session.page {
            Page::Blank => {}
            Page::NotFound => nodes.push(node("h1", NodeKind::Text, "Page not found")),
            Page::Contact => {
                nodes.push(node("p", NodeKind::Text, WELCOME));
                match &session.sent {
                    Some((name, subject)) => {
                        nodes.push(node(
                            "h2",
                            NodeKind::Text,
                            format!("Thanks for getting in touch {}!", name),
                        ));
                        nodes.push(node("p", NodeKind::Text, "We'll get back to you about"));
                        nodes.push(node("p", NodeKind::Text, subject.clone()));
                        nodes.push(node("p", NodeKind::Text, "as soon as possible."));
                    }
                    None => {
                        nodes.push(node("h2", NodeKind::Text, "Send Us a Message"));
                        for selector in [
                            CONTACT_NAME,
                            CONTACT_EMAIL,
                            CONTACT_PHONE,
                            CONTACT_SUBJECT,
                            CONTACT_DESCRIPTION,
                        ] {
                            nodes.push(node(selector, NodeKind::Input, ""));
                        }
                        nodes.push(node(SUBMIT_CONTACT, NodeKind::Button, "Submit"));
                    }
                }
            }
            Page::Login => {
                nodes.push(node("h2", NodeKind::Text, "Log into your account"));
                nodes.push(node(USERNAME, NodeKind::Input, ""));
                nodes.push(node(PASSWORD, NodeKind::Input, ""));
                nodes.push(node(LOGIN, NodeKind::Button, "Login"));
            }
            Page::Rooms => {
                let backend = self.backend.lock();
                for room in backend.rooms.iter().filter(|r| !r.hidden) {
                    nodes.push(node(ROOM_LISTING, NodeKind::Listing(room.id), room.summary()));
                }
                nodes.push(node(ROOM_NAME, NodeKind::Input, ""));
                nodes.push(node(ROOM_TYPE, NodeKind::Select(ROOM_TYPES), ""));
                nodes.push(node(ROOM_ACCESSIBLE, NodeKind::Select(BOOLEANS), ""));
                nodes.push(node(ROOM_PRICE, NodeKind::Input, ""));
                for feature in ROOM_FEATURES {
                    nodes.push(node(&checkbox_selector(feature), NodeKind::Checkbox, *feature));
                }
                nodes.push(node(CREATE_ROOM, NodeKind::Button, "Create"));
            }
            Page::RoomDetail(id) => {
                let backend = self.backend.lock();
                match backend.rooms.iter().find(|r| r.id == id) {
                    Some(room) => nodes.push(node(ROOM_DETAILS, NodeKind::Text, room.details())),
                    None => nodes.push(node("h1", NodeKind::Text, "Room not found")),
                }
            }
        }

        if !session.alert.is_empty() {
            nodes.push(node(ALERT, NodeKind::Text, session.alert.join("\n")));
        }
        nodes
    }

    fn locate(&self, session: &Session, locator: &Locator) -> Option<Node> {
        let mut matching = self
            .nodes(session)
            .into_iter()
            .filter(|n| n.selector == locator.selector)
            .filter(|n| match &locator.has_text {
                Some(text) => n.text.contains(text.as_str()),
                None => true,
            });
        match locator.pick {
            Pick::First => matching.next(),
            Pick::Last => matching.last(),
        }
    }

    fn require(&self, session: &Session, locator: &Locator) -> EngineResult<Node> {
        self.locate(session, locator).ok_or_else(|| {
            EngineError::Driver(format!("no element matches {} on {:?}", locator, session.page))
        })
    }

    /// Deliver the calls a page made, in order
    ///
    /// Requests go out now; responses arrive after the configured latency.
    fn dispatch(&self, calls: Vec<Call>) {
        if calls.is_empty() {
            return;
        }
        let started: Vec<(InFlight, Call)> = calls
            .into_iter()
            .map(|call| (self.log.begin(call.method, &call.url()), call))
            .collect();

        if self.faults.latency.is_zero() {
            complete_all(&self.log, started);
        } else {
            let log = Arc::clone(&self.log);
            let latency = self.faults.latency;
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                complete_all(&log, started);
            });
        }
    }

    fn list_rooms(&self) -> Call {
        Call {
            method: "GET",
            path: "/room",
            status: 200,
            request: Value::Null,
            response: self.backend.lock().listing(),
        }
    }

    fn submit_contact(&self, session: &mut Session) -> Vec<Call> {
        if self.faults.silent_submit {
            return Vec::new();
        }

        let body = json!({
            "name": session.input(CONTACT_NAME),
            "email": session.input(CONTACT_EMAIL),
            "phone": session.input(CONTACT_PHONE),
            "subject": session.input(CONTACT_SUBJECT),
            "description": session.input(CONTACT_DESCRIPTION),
        });

        let errors = if self.faults.skip_validation {
            Vec::new()
        } else {
            validate_contact(session)
        };

        if !errors.is_empty() {
            session.alert = errors.clone();
            return vec![Call {
                method: "POST",
                path: "/message",
                status: 400,
                request: body,
                response: json!({ "errors": errors }),
            }];
        }

        let id = {
            let mut backend = self.backend.lock();
            backend.messages.push(body.clone());
            backend.messages.len()
        };
        session.alert.clear();
        session.sent = Some((session.input(CONTACT_NAME), session.input(CONTACT_SUBJECT)));

        vec![Call {
            method: "POST",
            path: "/message",
            status: 201,
            request: body.clone(),
            response: json!({ "messageid": id, "message": body }),
        }]
    }

    fn login(&self, session: &mut Session) -> Vec<Call> {
        let body = json!({
            "username": session.input(USERNAME),
            "password": session.input(PASSWORD),
        });

        if session.input(USERNAME) != self.admin.username
            || session.input(PASSWORD) != self.admin.password
        {
            session.alert = vec!["Invalid credentials".to_string()];
            return vec![Call {
                method: "POST",
                path: "/auth/login",
                status: 403,
                request: body,
                response: Value::Null,
            }];
        }

        session.logged_in = true;
        session.page = Page::Rooms;
        session.reset_form();
        vec![
            Call {
                method: "POST",
                path: "/auth/login",
                status: 200,
                request: body,
                response: json!({ "token": "sim-token" }),
            },
            self.list_rooms(),
        ]
    }

    fn create_room(&self, session: &mut Session) -> Vec<Call> {
        if self.faults.silent_submit {
            return Vec::new();
        }

        // Checkboxes are sent in page order, not click order
        let features: Vec<String> = ROOM_FEATURES
            .iter()
            .filter(|f| session.checked.iter().any(|c| c == *f))
            .map(|f| f.to_string())
            .collect();
        let body = json!({
            "roomName": session.input(ROOM_NAME),
            "type": session.input(ROOM_TYPE),
            "accessible": session.input(ROOM_ACCESSIBLE),
            "roomPrice": session.input(ROOM_PRICE),
            "features": features,
        });

        let errors = if self.faults.skip_validation {
            Vec::new()
        } else {
            validate_room(session)
        };

        let created = if errors.is_empty() {
            let mut backend = self.backend.lock();
            let room = Room {
                id: backend.next_room_id,
                name: session.input(ROOM_NAME),
                kind: session.input(ROOM_TYPE),
                accessible: session.input(ROOM_ACCESSIBLE) == "true",
                price: session.input(ROOM_PRICE).trim().parse().unwrap_or(0),
                features,
                hidden: self.faults.hide_created_rooms,
            };
            backend.next_room_id += 1;
            backend.rooms.push(room.clone());
            Call {
                method: "POST",
                path: "/room",
                status: 201,
                request: body,
                response: room.to_json(),
            }
        } else {
            Call {
                method: "POST",
                path: "/room",
                status: 400,
                request: body,
                response: json!({ "errors": errors }),
            }
        };

        if errors.is_empty() {
            session.reset_form();
        } else {
            session.alert = errors;
        }

        // The room list is refreshed after every create attempt
        vec![created, self.list_rooms()]
    }

    fn open_room(&self, session: &mut Session, id: u64) -> Vec<Call> {
        session.page = Page::RoomDetail(id);
        session.alert.clear();
        vec![self.list_rooms()]
    }
}

fn complete_all(log: &InterceptionLog, started: Vec<(InFlight, Call)>) {
    for (in_flight, call) in started {
        log.complete(in_flight, call.status, call.request, call.response);
    }
}

fn validate_contact(session: &Session) -> Vec<String> {
    let mut errors = Vec::new();
    let mut length = |label: &str, value: &str, min: usize, max: usize| {
        let len = value.chars().count();
        if value.trim().is_empty() {
            errors.push(format!("{} may not be blank", label));
        } else if len < min || len > max {
            errors.push(format!("{} must be between {} and {} characters.", label, min, max));
        }
    };

    length("Name", &session.input(CONTACT_NAME), 1, 100);
    length("Phone", &session.input(CONTACT_PHONE), 11, 21);
    length("Subject", &session.input(CONTACT_SUBJECT), 5, 100);
    length("Message", &session.input(CONTACT_DESCRIPTION), 20, 2000);

    let email = session.input(CONTACT_EMAIL);
    if email.trim().is_empty() {
        errors.push("Email may not be blank".to_string());
    } else if !email.contains('@') {
        errors.push("must be a well-formed email address".to_string());
    }
    errors
}

fn validate_room(session: &Session) -> Vec<String> {
    let mut errors = Vec::new();
    if session.input(ROOM_NAME).trim().is_empty() {
        errors.push("Room name must be set".to_string());
    }
    match session.input(ROOM_PRICE).trim().parse::<u32>() {
        Ok(price) if price >= 1 => {}
        _ => errors.push("must be greater than or equal to 1".to_string()),
    }
    errors
}

#[async_trait]
impl UiDriver for SimulatedHotel {
    async fn visit(&self, path: &str) -> EngineResult<()> {
        debug!("sim: visit {}", path);
        let mut session = self.session.lock();
        session.reset_form();
        session.page = match path {
            "" | "/" => Page::Contact,
            "/#/admin" | "/admin" if session.logged_in => Page::Rooms,
            "/#/admin" | "/admin" => Page::Login,
            _ => Page::NotFound,
        };
        let background = self.faults.background.clone();
        session.background.extend(background);

        let calls = if session.page == Page::Rooms {
            vec![self.list_rooms()]
        } else {
            Vec::new()
        };
        drop(session);
        self.dispatch(calls);
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> EngineResult<()> {
        let mut session = self.session.lock();
        let target = self.require(&session, locator)?;
        if target.kind != NodeKind::Input {
            return Err(EngineError::Driver(format!("{} is not a text input", locator)));
        }
        session.touch(&target.selector);
        session.inputs.entry(target.selector).or_default().push_str(text);
        Ok(())
    }

    async fn select(&self, locator: &Locator, value: &str) -> EngineResult<()> {
        let mut session = self.session.lock();
        let target = self.require(&session, locator)?;
        let NodeKind::Select(options) = target.kind else {
            return Err(EngineError::Driver(format!("{} is not a select", locator)));
        };
        if !options.contains(&value) {
            return Err(EngineError::Driver(format!(
                "{} has no option '{}'",
                locator, value
            )));
        }
        session.touch(&target.selector);
        session.inputs.insert(target.selector, value.to_string());
        Ok(())
    }

    async fn check(&self, locator: &Locator) -> EngineResult<()> {
        let mut session = self.session.lock();
        let target = self.require(&session, locator)?;
        if target.kind != NodeKind::Checkbox {
            return Err(EngineError::Driver(format!("{} is not a checkbox", locator)));
        }
        session.touch(&target.selector);
        if !session.checked.contains(&target.text) {
            session.checked.push(target.text);
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> EngineResult<()> {
        let mut session = self.session.lock();
        let target = self.require(&session, locator)?;
        debug!("sim: click {}", target.selector);

        let calls = match (&target.kind, target.selector.as_str()) {
            (NodeKind::Button, SUBMIT_CONTACT) => self.submit_contact(&mut session),
            (NodeKind::Button, LOGIN) => self.login(&mut session),
            (NodeKind::Button, CREATE_ROOM) => self.create_room(&mut session),
            (NodeKind::Listing(id), _) => self.open_room(&mut session, *id),
            _ => Vec::new(),
        };
        drop(session);
        self.dispatch(calls);
        Ok(())
    }

    async fn contains_text(&self, locator: &Locator, text: &str) -> EngineResult<bool> {
        let session = self.session.lock();
        Ok(self
            .locate(&session, locator)
            .map(|n| n.text.contains(text))
            .unwrap_or(false))
    }

    async fn is_visible(&self, locator: &Locator) -> EngineResult<bool> {
        let session = self.session.lock();
        Ok(self.locate(&session, locator).is_some())
    }

    async fn exists(&self, locator: &Locator) -> EngineResult<bool> {
        let session = self.session.lock();
        Ok(self.locate(&session, locator).is_some())
    }

    async fn register_interception(&self, route: &RouteSpec) -> EngineResult<()> {
        self.log.register(route)
    }

    async fn await_interception(
        &self,
        alias: &str,
        timeout: Duration,
    ) -> EngineResult<Interception> {
        self.log.next(alias, timeout).await
    }

    async fn drain_background_errors(&self) -> Vec<BackgroundError> {
        std::mem::take(&mut self.session.lock().background)
    }
}

/// Opens sessions against one shared simulated backend
#[derive(Clone)]
pub struct SimFactory {
    backend: Arc<Mutex<Backend>>,
    admin: Credentials,
    faults: Faults,
}

impl Default for SimFactory {
    fn default() -> Self {
        Self::new(default_admin())
    }
}

impl SimFactory {
    pub fn new(admin: Credentials) -> Self {
        Self {
            backend: Arc::new(Mutex::new(Backend::default())),
            admin,
            faults: Faults::default(),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.backend.lock().rooms.clone()
    }

    pub fn session(&self) -> SimulatedHotel {
        SimulatedHotel::with_backend(
            Arc::clone(&self.backend),
            self.admin.clone(),
            self.faults.clone(),
        )
    }
}

#[async_trait]
impl DriverFactory for SimFactory {
    async fn open(&self) -> EngineResult<Box<dyn UiDriver>> {
        Ok(Box::new(self.session()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staycheck_engine::driver::DriverExt;

    #[tokio::test]
    async fn test_contact_validation_messages() {
        let hotel = SimulatedHotel::new();
        hotel.register_interception(&RouteSpec::new("POST", "/message", "msg")).await.unwrap();
        hotel.visit("/").await.unwrap();
        hotel.find(Locator::css(CONTACT_PHONE)).type_text("123").await.unwrap();
        hotel.find(Locator::css(SUBMIT_CONTACT)).click().await.unwrap();

        let call = hotel.await_interception("msg", Duration::from_millis(50)).await.unwrap();
        assert_eq!(call.status, 400);
        assert_eq!(call.url, "http://hotel.local/message");

        let alert = Locator::css(ALERT);
        assert!(hotel.contains_text(&alert, "Name may not be blank").await.unwrap());
        assert!(hotel
            .contains_text(&alert, "Phone must be between 11 and 21 characters.")
            .await
            .unwrap());
        assert!(hotel.messages().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_stays_on_login() {
        let hotel = SimulatedHotel::new();
        hotel.visit("/#/admin").await.unwrap();
        hotel.find(Locator::css(USERNAME)).type_text("admin").await.unwrap();
        hotel.find(Locator::css(PASSWORD)).type_text("nope").await.unwrap();
        hotel.find(Locator::css(LOGIN)).click().await.unwrap();

        assert!(hotel.is_visible(&Locator::css(ALERT)).await.unwrap());
        assert!(!hotel.exists(&Locator::css(CREATE_ROOM)).await.unwrap());
    }

    #[tokio::test]
    async fn test_select_rejects_unknown_option() {
        let hotel = SimulatedHotel::new();
        hotel.visit("/#/admin").await.unwrap();
        hotel.find(Locator::css(USERNAME)).type_text("admin").await.unwrap();
        hotel.find(Locator::css(PASSWORD)).type_text("password").await.unwrap();
        hotel.find(Locator::css(LOGIN)).click().await.unwrap();

        let err = hotel
            .select(&Locator::css(ROOM_TYPE), "Penthouse")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Driver(_)));
    }

    #[tokio::test]
    async fn test_missing_element_is_a_driver_error() {
        let hotel = SimulatedHotel::new();
        hotel.visit("/").await.unwrap();
        let err = hotel.click(&Locator::css(CREATE_ROOM)).await.unwrap_err();
        assert!(matches!(err, EngineError::Driver(_)));
    }

    #[test]
    fn test_listing_shape() {
        let listing = Backend::default().listing();
        let room = &listing["rooms"][0];
        assert_eq!(room["roomName"], "101");
        assert_eq!(room["roomPrice"], 100);
        assert_eq!(room["accessible"], true);
    }
}
