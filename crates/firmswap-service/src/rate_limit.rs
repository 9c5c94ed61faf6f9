//! Sliding-window rate limiting keyed by (route class, client).

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct RateLimiter {
	window: Duration,
	hits: DashMap<(String, String), VecDeque<Instant>>,
}

impl RateLimiter {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			hits: DashMap::new(),
		}
	}

	/// Per-minute limiter, the shape every route here uses.
	pub fn per_minute() -> Self {
		Self::new(Duration::from_secs(60))
	}

	/// Record a hit and report whether the caller is within `limit` hits
	/// per window.
	pub fn check(&self, route: &str, client: &str, limit: usize) -> bool {
		let now = Instant::now();
		let mut entry = self
			.hits
			.entry((route.to_string(), client.to_string()))
			.or_default();

		while let Some(front) = entry.front() {
			if now.duration_since(*front) > self.window {
				entry.pop_front();
			} else {
				break;
			}
		}

		if entry.len() >= limit {
			return false;
		}
		entry.push_back(now);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn enforces_the_limit_per_client() {
		let limiter = RateLimiter::new(Duration::from_secs(60));
		for _ in 0..5 {
			assert!(limiter.check("quote", "1.2.3.4", 5));
		}
		assert!(!limiter.check("quote", "1.2.3.4", 5));

		// Another client is unaffected
		assert!(limiter.check("quote", "5.6.7.8", 5));
		// As is another route for the same client
		assert!(limiter.check("order", "1.2.3.4", 5));
	}

	#[test]
	fn window_expiry_frees_budget() {
		let limiter = RateLimiter::new(Duration::from_millis(20));
		for _ in 0..3 {
			assert!(limiter.check("quote", "c", 3));
		}
		assert!(!limiter.check("quote", "c", 3));

		std::thread::sleep(Duration::from_millis(30));
		assert!(limiter.check("quote", "c", 3));
	}
}
