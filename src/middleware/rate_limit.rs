use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::RETRY_AFTER, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-second window shared by every request of a router group.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self::starting_at(rps, Instant::now())
    }

    fn starting_at(rps: u32, start: Instant) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(WindowState { start, count: 0 })),
        }
    }

    /// Counts a request at `now`. Returns the wait until the window resets
    /// when the budget is spent.
    fn check_at(&self, now: Instant) -> Result<(), Duration> {
        let mut guard = match self.window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let elapsed = now.saturating_duration_since(guard.start);
        if elapsed >= WINDOW {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            Ok(())
        } else {
            Err(WINDOW.saturating_sub(elapsed))
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(wait) = limiter.check_at(Instant::now()) {
        tracing::debug!(path = %req.uri().path(), "Request rate limited");
        let retry_after = wait.as_secs().max(1);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_resets_each_window() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(2, t0);
        assert!(limiter.check_at(t0).is_ok());
        assert!(limiter.check_at(t0).is_ok());
        let wait = limiter.check_at(t0 + Duration::from_millis(400)).unwrap_err();
        assert_eq!(wait, Duration::from_millis(600));
        assert!(limiter.check_at(t0 + WINDOW).is_ok());
    }

    #[test]
    fn late_first_request_opens_a_fresh_window() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(1, t0);
        let later = t0 + Duration::from_millis(2500);
        assert!(limiter.check_at(later).is_ok());
        let wait = limiter.check_at(later + Duration::from_millis(250)).unwrap_err();
        assert_eq!(wait, Duration::from_millis(750));
    }

    #[test]
    fn zero_rps_still_admits_one() {
        let t0 = Instant::now();
        let limiter = RateLimiter::starting_at(0, t0);
        assert!(limiter.check_at(t0).is_ok());
        assert!(limiter.check_at(t0).is_err());
    }
}
