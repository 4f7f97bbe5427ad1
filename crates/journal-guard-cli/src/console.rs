//! Terminal-backed collaborators

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use journal_guard_core::{
    AuthResult, DeviceAuthenticator, GuardError, Navigator, Notice, Route, RouteParams, Router,
};

/// Stands in for a biometric sensor by asking on stdin
pub struct ConsoleAuthenticator;

#[async_trait]
impl DeviceAuthenticator for ConsoleAuthenticator {
    async fn has_hardware(&self) -> journal_guard_core::Result<bool> {
        Ok(true)
    }

    async fn is_enrolled(&self) -> journal_guard_core::Result<bool> {
        Ok(true)
    }

    async fn authenticate(&self, prompt: &str) -> journal_guard_core::Result<AuthResult> {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            print!("{} [y/N]: ", prompt);
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| GuardError::Device(e.to_string()))??;

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(AuthResult::success()),
            _ => Ok(AuthResult::failure("user_cancel")),
        }
    }

    fn method_name(&self) -> &'static str {
        "Console Confirmation"
    }
}

/// Router that echoes every move to the terminal
pub struct ConsoleNavigator {
    router: Router,
}

impl ConsoleNavigator {
    pub fn new(start: Route) -> Self {
        Self {
            router: Router::starting_at(start),
        }
    }
}

impl Navigator for ConsoleNavigator {
    fn go_to(&self, route: Route, params: Option<RouteParams>) {
        self.router.go_to(route, params);
        println!("→ {}", self.router.breadcrumb().join(" / "));
    }

    fn go_back(&self) {
        self.router.go_back();
        println!("← {}", self.router.breadcrumb().join(" / "));
    }
}

/// Prints notices to stderr
pub struct ConsoleNotifier;

impl journal_guard_core::Notifier for ConsoleNotifier {
    fn show(&self, title: &str, message: &str) {
        eprintln!("{}", Notice::new(title, message));
    }
}
