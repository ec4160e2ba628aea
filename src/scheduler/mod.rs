pub mod rate_limiter;
pub mod pool;

pub use rate_limiter::RateLimiter;
pub use pool::run_bounded;
