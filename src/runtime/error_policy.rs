//! # Error Policy
//!
//! Classification and restart delays for source watch stream errors.

use crate::controller::backoff::FibonacciBackoff;
use std::time::Duration;
use tracing::{error, warn};

/// Broad category of a watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version too old, normal after restarts
    Expired,
    /// 429: API server throttling or storage reinitializing
    Throttled,
    /// 404: the watched resource type or namespace is missing
    NotFound,
    Other,
}

/// Classify a watch error from its rendered form
///
/// 404 is checked before 401, since a 404 returned as plain text surfaces
/// as a decode error that can mention unrelated status words.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    let is_401 =
        (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found;
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");

    if is_401 {
        WatchErrorClass::Unauthorized
    } else if is_410 {
        WatchErrorClass::Expired
    } else if is_429 {
        WatchErrorClass::Throttled
    } else if is_not_found {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// How long to wait before restarting the watch, `None` to restart at once
pub fn restart_delay(
    class: WatchErrorClass,
    error_string: &str,
    backoff: &mut FibonacciBackoff,
    watch_restart_delay: Duration,
) -> Option<Duration> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "source.watch.error",
        error.class = ?class
    );
    let _error_guard = error_span.enter();

    match class {
        WatchErrorClass::Unauthorized => {
            error!(
                "❌ Service watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("🔍 Verify the controller's ServiceAccount can still list and watch services:");
            error!("      kubectl auth can-i watch services --as=system:serviceaccount:<namespace>:<serviceaccount> --all-namespaces");
            warn!(
                "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay.as_secs()
            );
            Some(watch_restart_delay)
        }
        WatchErrorClass::Expired => {
            warn!("Watch resource version expired (410) - watch will restart with a fresh listing");
            None
        }
        WatchErrorClass::Throttled => {
            let delay = backoff.next_backoff();
            warn!(
                "API server throttling (429), backing off for {}ms before restart...",
                delay.as_millis()
            );
            Some(delay)
        }
        WatchErrorClass::NotFound => {
            warn!(
                "Watched resource not found (404) - the watch namespace may not exist yet. Error: {}",
                error_string
            );
            Some(watch_restart_delay)
        }
        WatchErrorClass::Other => {
            error!("Service watch stream error: {}", error_string);
            Some(watch_restart_delay)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorClass::Unauthorized
        );
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorClass::Expired
        );
        assert_eq!(
            classify_watch_error("ApiError: storage is (re)initializing: TooManyRequests (429)"),
            WatchErrorClass::Throttled
        );
        assert_eq!(
            classify_watch_error("namespaces \"missing\" not found"),
            WatchErrorClass::NotFound
        );
        assert_eq!(
            classify_watch_error("connection reset by peer"),
            WatchErrorClass::Other
        );
    }

    #[test]
    fn test_not_found_checked_before_unauthorized() {
        assert_eq!(
            classify_watch_error("WatchFailed: invalid type: integer `404`, Unauthorized"),
            WatchErrorClass::NotFound
        );
    }

    #[test]
    fn test_throttling_uses_backoff() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let restart = Duration::from_secs(5);

        let first = restart_delay(WatchErrorClass::Throttled, "429", &mut backoff, restart);
        let second = restart_delay(WatchErrorClass::Throttled, "429", &mut backoff, restart);
        let third = restart_delay(WatchErrorClass::Throttled, "429", &mut backoff, restart);
        assert_eq!(first, Some(Duration::from_secs(1)));
        assert_eq!(second, Some(Duration::from_secs(1)));
        assert_eq!(third, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_expired_restarts_immediately() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(
            restart_delay(WatchErrorClass::Expired, "410", &mut backoff, Duration::from_secs(5)),
            None
        );
    }
}
