//! In-memory transport and fixtures shared by the resolver integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tileseek_geo::Point;
use tileseek_resolver::{FetchError, Fetcher, ResolutionResult, ResolverConfig, Transport, Url};

pub const INDEX: &str = "https://index.test/arcgis/rest/services/lpc/MapServer/0/query";

#[derive(Clone)]
pub enum Route {
    Body(String),
    Status(u16),
    Hang,
}

#[derive(Debug, Clone)]
pub struct FetchRecord {
    pub session: usize,
    pub url: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Default)]
struct Web {
    routes: HashMap<String, Route>,
    delay: Duration,
    sessions: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches: Mutex<Vec<FetchRecord>>,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    web: Arc<Web>,
}

pub struct FakeSession {
    id: usize,
    web: Arc<Web>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub fn new(routes: Vec<(String, Route)>, delay: Duration) -> Self {
        Self {
            web: Arc::new(Web {
                routes: routes.into_iter().collect(),
                delay,
                ..Default::default()
            }),
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.web.sessions.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.web.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<FetchRecord> {
        self.web.fetches.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    type Session = FakeSession;

    fn open_session(&self) -> Result<FakeSession, FetchError> {
        let id = self.web.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            id,
            web: Arc::clone(&self.web),
        })
    }
}

#[async_trait]
impl Fetcher for FakeSession {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let started = Instant::now();
        let now = self.web.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.web.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.web.in_flight);

        let mut key = url.clone();
        key.set_query(None);
        let route = self.web.routes.get(key.as_str()).cloned();

        if !self.web.delay.is_zero() {
            tokio::time::sleep(self.web.delay).await;
        }

        let result = match route {
            Some(Route::Body(body)) => Ok(body),
            Some(Route::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Route::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        };

        self.web.fetches.lock().unwrap().push(FetchRecord {
            session: self.id,
            url: url.to_string(),
            started,
            finished: Instant::now(),
        });
        result
    }
}

pub fn index_response(links: &[&str]) -> String {
    let features: Vec<_> = links
        .iter()
        .map(|link| serde_json::json!({ "attributes": { "lpc_link": link, "project": "test" } }))
        .collect();
    serde_json::json!({ "features": features }).to_string()
}

pub fn catalog_page(files: &[&str]) -> String {
    let anchors: String = files
        .iter()
        .map(|f| format!("<a href=\"{f}\">{f}</a>\n"))
        .collect();
    format!("<html><body><h1>Index of /metadata</h1>\n<a href=\"../\">Parent</a>\n{anchors}</body></html>")
}

pub fn descriptor(west: f64, east: f64, north: f64, south: f64, link: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <idinfo><spdom><bounding>
    <westbc>{west}</westbc><eastbc>{east}</eastbc><northbc>{north}</northbc><southbc>{south}</southbc>
  </bounding></spdom></idinfo>
  <distinfo><stdorder><digform><digtopt><onlinopt><computer><networka>
    <networkr>{link}</networkr>
  </networka></computer></onlinopt></digtopt></digform></stdorder></distinfo>
</metadata>"#
    )
}

pub fn body(s: impl Into<String>) -> Route {
    Route::Body(s.into())
}

pub fn config() -> ResolverConfig {
    ResolverConfig {
        index_endpoint: INDEX.to_string(),
        fetch_timeout_secs: 5,
        ..Default::default()
    }
}

pub fn point() -> Point {
    Point::lon_lat(-82.5, 40.5)
}

/// One project, three tiles; only `A` covers the point.
pub fn ohio_routes() -> Vec<(String, Route)> {
    vec![
        (INDEX.to_string(), body(index_response(&["https://data.test/OH_Statewide/"]))),
        (
            "https://data.test/OH_Statewide/metadata".to_string(),
            body(catalog_page(&["A.xml", "B.xml", "C.xml"])),
        ),
        (
            "https://data.test/OH_Statewide/metadata/A.xml".to_string(),
            body(descriptor(-83.0, -82.0, 41.0, 40.0, "https://data.test/OH_Statewide/laz/a.laz")),
        ),
        (
            "https://data.test/OH_Statewide/metadata/B.xml".to_string(),
            body(descriptor(-81.0, -80.0, 41.0, 40.0, "https://data.test/OH_Statewide/laz/b.laz")),
        ),
        (
            "https://data.test/OH_Statewide/metadata/C.xml".to_string(),
            body(descriptor(-83.0, -82.0, 43.0, 42.0, "https://data.test/OH_Statewide/laz/c.laz")),
        ),
    ]
}

pub fn links(result: &ResolutionResult) -> BTreeSet<String> {
    result.data_links().map(|l| l.to_string()).collect()
}


/// Descriptor routes for `count` tiles of project `P`, all covering [`point`].
pub fn project_routes(count: usize) -> Vec<(String, Route)> {
    let files: Vec<String> = (0..count).map(|i| format!("t{i}.xml")).collect();
    let file_refs: Vec<&str> = files.iter().map(String::as_str).collect();

    let mut routes = vec![
        (INDEX.to_string(), body(index_response(&["https://data.test/P"]))),
        ("https://data.test/P/metadata".to_string(), body(catalog_page(&file_refs))),
    ];
    for i in 0..count {
        routes.push((
            format!("https://data.test/P/metadata/t{i}.xml"),
            body(descriptor(-83.0, -82.0, 41.0, 40.0, &format!("t{i}.laz"))),
        ));
    }
    routes
}

/// Fetch count per session, and whether each session's first fetch started
/// after every fetch of the previous session had finished.
pub fn session_profile(fetches: &[FetchRecord], sessions: &[usize]) -> (Vec<usize>, bool) {
    let sizes = sessions
        .iter()
        .map(|s| fetches.iter().filter(|f| f.session == *s).count())
        .collect();

    let sequential = sessions.windows(2).all(|pair| {
        let previous_end = fetches
            .iter()
            .filter(|f| f.session == pair[0])
            .map(|f| f.finished)
            .max();
        let next_start = fetches
            .iter()
            .filter(|f| f.session == pair[1])
            .map(|f| f.started)
            .min();
        match (previous_end, next_start) {
            (Some(end), Some(start)) => start >= end,
            _ => false,
        }
    });

    (sizes, sequential)
}
