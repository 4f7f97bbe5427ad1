//! In-memory navigation history

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::Navigator;

/// Parameters passed along with a navigation
pub type RouteParams = BTreeMap<String, String>;

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "professional/signup")]
    ProfessionalSignup,
    #[serde(rename = "professional/patients")]
    PatientManager,
    #[serde(rename = "professional/patient")]
    PatientDetails,
    /// Lock screen in front of the journal
    #[serde(rename = "journal/cover")]
    JournalCover,
    /// Journal writing screen
    #[serde(rename = "journal/body")]
    JournalBody,
    /// Thoughts of the day
    #[serde(rename = "journal/back")]
    JournalBack,
    #[serde(rename = "chat")]
    Chat,
}

impl Route {
    /// Stable route identifier
    pub fn id(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::ProfessionalSignup => "professional/signup",
            Route::PatientManager => "professional/patients",
            Route::PatientDetails => "professional/patient",
            Route::JournalCover => "journal/cover",
            Route::JournalBody => "journal/body",
            Route::JournalBack => "journal/back",
            Route::Chat => "chat",
        }
    }

    /// Title for breadcrumb
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::ProfessionalSignup => "Professional Signup",
            Route::PatientManager => "Patients",
            Route::PatientDetails => "Patient Details",
            Route::JournalCover => "Journal",
            Route::JournalBody => "Write",
            Route::JournalBack => "Thoughts of the Day",
            Route::Chat => "Chat",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let route = match s {
            "login" => Route::Login,
            "professional/signup" => Route::ProfessionalSignup,
            "professional/patients" => Route::PatientManager,
            "professional/patient" => Route::PatientDetails,
            "journal/cover" => Route::JournalCover,
            "journal/body" => Route::JournalBody,
            "journal/back" => Route::JournalBack,
            "chat" => Route::Chat,
            other => return Err(format!("unknown route: {}", other)),
        };
        Ok(route)
    }
}

/// One call made against the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    GoTo {
        route: Route,
        params: Option<RouteParams>,
    },
    Back,
}

/// Most recent navigation calls kept for inspection
const MAX_LOGGED_ACTIONS: usize = 100;

#[derive(Debug, Default)]
struct RouterInner {
    /// Navigation history stack
    history: Vec<Route>,
    /// Most recent calls received, oldest first
    log: VecDeque<NavigationAction>,
}

impl RouterInner {
    fn record(&mut self, action: NavigationAction) {
        if self.log.len() >= MAX_LOGGED_ACTIONS {
            self.log.pop_front();
        }
        self.log.push_back(action);
    }
}

/// Router manages navigation history
#[derive(Debug)]
pub struct Router {
    inner: Mutex<RouterInner>,
    /// Maximum history depth
    max_depth: usize,
}

impl Router {
    /// Create a router with an empty history
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RouterInner::default()),
            max_depth: 20,
        }
    }

    /// Create a router already showing `route`
    pub fn starting_at(route: Route) -> Self {
        let router = Self::new();
        if let Ok(mut inner) = router.inner.lock() {
            inner.history.push(route);
        }
        router
    }

    /// Get the current route
    pub fn current(&self) -> Option<Route> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.history.last().copied())
    }

    /// Get the breadcrumb trail
    pub fn breadcrumb(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .map(|inner| inner.history.iter().map(Route::title).collect())
            .unwrap_or_default()
    }

    /// The most recent navigation calls, oldest first
    pub fn actions(&self) -> Vec<NavigationAction> {
        self.inner
            .lock()
            .map(|inner| inner.log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of recent navigations to `route`
    pub fn visits(&self, route: Route) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, NavigationAction::GoTo { route: r, .. } if *r == route))
            .count()
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.history.len() > 1)
            .unwrap_or(false)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for Router {
    fn go_to(&self, route: Route, params: Option<RouteParams>) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.history.len() >= self.max_depth {
                inner.history.remove(0);
            }
            inner.history.push(route);
            inner.record(NavigationAction::GoTo { route, params });
        }
        tracing::debug!("Navigated to {}", route);
    }

    fn go_back(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.history.len() > 1 {
                inner.history.pop();
            }
            inner.record(NavigationAction::Back);
        }
        tracing::debug!("Navigated back");
    }
}
