//! Navigation and notification collaborators
//!
//! The controller only talks to these through the traits below. Both calls
//! are fire-and-forget: nothing is awaited and no result flows back.

mod notification;
mod router;

pub use notification::{Notice, NoticeLevel, NotificationCenter};
pub use router::{NavigationAction, Route, RouteParams, Router};

/// Moves the user between screens
pub trait Navigator: Send + Sync {
    /// Go to a route, optionally with parameters
    fn go_to(&self, route: Route, params: Option<RouteParams>);

    /// Return to the previous screen
    fn go_back(&self);
}

/// Shows user-visible messages
pub trait Notifier: Send + Sync {
    /// Show a titled message
    fn show(&self, title: &str, message: &str);
}
