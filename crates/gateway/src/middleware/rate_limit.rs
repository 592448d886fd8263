//! Rate limiting middleware using token bucket algorithm

use agora_common::errors::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Limiter plus the configured rate, reported back on refusal
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Arc<GlobalRateLimiter>,
    requests_per_second: u32,
}

impl RateLimitState {
    pub fn check(&self) -> Result<(), AppError> {
        self.limiter.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Create a new rate limiter; zero rates are refused
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Option<RateLimitState> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second)?)
        .allow_burst(NonZeroU32::new(burst)?);

    Some(RateLimitState {
        limiter: Arc::new(RateLimiter::direct(quota)),
        requests_per_second,
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limits): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = limits.check() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err(e);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limits = create_rate_limiter(100, 200).unwrap();
        assert!(limits.check().is_ok());
    }

    #[test]
    fn test_zero_rate_is_refused() {
        assert!(create_rate_limiter(0, 10).is_none());
        assert!(create_rate_limiter(10, 0).is_none());
    }

    #[test]
    fn test_burst_exhaustion_reports_rate() {
        let limits = create_rate_limiter(1, 2).unwrap();
        assert!(limits.check().is_ok());
        assert!(limits.check().is_ok());
        assert!(matches!(limits.check(), Err(AppError::RateLimited { limit: 1 })));
    }
}
