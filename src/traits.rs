//! Abstractions for user-facing side effects to enable testing.
//!
//! This module provides traits for:
//! - `Notifier`: blocking user alerts (validation failures, server errors)
//! - `LoadingIndicator`: the busy indicator shown while a request is in flight

use std::sync::{Arc, Mutex};

use anyhow::Result;

// ==================== Notifier Trait ====================

/// Trait for abstracting user alerts.
pub trait Notifier: Send + Sync {
    /// Show an alert with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Console notifier writing alerts to stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        eprintln!("[{}] {}", title, body);
        Ok(())
    }
}

/// Desktop notifier implementation using notify-rust.
#[cfg(feature = "desktop")]
#[derive(Debug, Clone, Default)]
pub struct SystemNotifier;

#[cfg(feature = "desktop")]
impl Notifier for SystemNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("Forecast Console")
            .show()?;
        Ok(())
    }
}

/// Mock notifier for testing that records all alerts.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all alerts that have been shown.
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    /// Bodies of all alerts, in order.
    pub fn bodies(&self) -> Vec<String> {
        self.get_notifications()
            .into_iter()
            .map(|(_, body)| body)
            .collect()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }

    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ==================== Loading Indicator ====================

/// Trait for the busy indicator.
pub trait LoadingIndicator: Send + Sync {
    fn set_visible(&self, visible: bool);
}

/// Console indicator logging state changes to stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLoadingIndicator;

impl LoadingIndicator for ConsoleLoadingIndicator {
    fn set_visible(&self, visible: bool) {
        if visible {
            eprintln!("Loading...");
        }
    }
}

/// Mock indicator recording every visibility change.
#[derive(Debug, Clone, Default)]
pub struct MockLoadingIndicator {
    transitions: Arc<Mutex<Vec<bool>>>,
}

impl MockLoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<bool> {
        self.transitions.lock().unwrap().clone()
    }

    /// Whether the indicator is currently shown.
    pub fn is_visible(&self) -> bool {
        self.transitions.lock().unwrap().last().copied().unwrap_or(false)
    }
}

impl LoadingIndicator for MockLoadingIndicator {
    fn set_visible(&self, visible: bool) {
        self.transitions.lock().unwrap().push(visible);
    }
}

/// Keeps the indicator visible until dropped.
pub struct LoadingGuard<'a> {
    indicator: &'a dyn LoadingIndicator,
}

impl<'a> LoadingGuard<'a> {
    pub fn show(indicator: &'a dyn LoadingIndicator) -> Self {
        indicator.set_visible(true);
        Self { indicator }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.indicator.set_visible(false);
    }
}
