//! Sliding one-minute window limiter for requests and tokens

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// Timestamped events inside the last minute
#[derive(Default)]
struct Window {
    events: VecDeque<(Instant, u32)>,
}

impl Window {
    fn prune(&mut self, now: Instant) {
        while let Some(&(at, _)) = self.events.front() {
            if now.duration_since(at) >= WINDOW {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn total(&self) -> u64 {
        self.events.iter().map(|&(_, n)| n as u64).sum()
    }

    /// Time until the oldest event leaves the window
    fn until_oldest_expires(&self, now: Instant) -> Duration {
        self.events
            .front()
            .map(|&(at, _)| WINDOW.saturating_sub(now.duration_since(at)))
            .unwrap_or_default()
    }
}

struct State {
    requests: Window,
    tokens: Window,
}

/// Per-provider limiter on requests per minute and tokens per minute.
///
/// A limit of 0 disables that dimension.
pub struct RateLimiter {
    requests_per_minute: u32,
    tokens_per_minute: u32,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, tokens_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute,
            state: Mutex::new(State {
                requests: Window::default(),
                tokens: Window::default(),
            }),
        }
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    pub fn tokens_per_minute(&self) -> u32 {
        self.tokens_per_minute
    }

    /// Wait until a request may be sent, then count it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                match self.wait_time(&mut state, now) {
                    None => {
                        state.requests.events.push_back((now, 1));
                        return;
                    }
                    Some(wait) => wait,
                }
            };

            tracing::debug!("Rate limit reached, waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait + Duration::from_millis(10)).await;
        }
    }

    /// How long a request would have to wait right now, if at all
    pub async fn next_slot_in(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        self.wait_time(&mut state, Instant::now())
    }

    fn wait_time(&self, state: &mut State, now: Instant) -> Option<Duration> {
        state.requests.prune(now);
        state.tokens.prune(now);

        let mut wait = None;
        if self.requests_per_minute > 0 && state.requests.len() >= self.requests_per_minute as usize {
            wait = Some(state.requests.until_oldest_expires(now));
        }
        if self.tokens_per_minute > 0 && state.tokens.total() >= self.tokens_per_minute as u64 {
            let token_wait = state.tokens.until_oldest_expires(now);
            wait = Some(wait.map_or(token_wait, |w: Duration| w.max(token_wait)));
        }
        wait
    }

    /// Record tokens consumed by a completed request
    pub async fn record_tokens(&self, tokens: u32) {
        if tokens == 0 {
            return;
        }
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.tokens.prune(now);
        state.tokens.events.push_back((now, tokens));
    }

    /// Tokens recorded in the last minute
    pub async fn current_token_usage(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.tokens.prune(Instant::now());
        state.tokens.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_under_limit_do_not_wait() {
        let limiter = RateLimiter::new(5, 1000);
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(limiter.next_slot_in().await.is_none());
    }

    #[tokio::test]
    async fn test_full_window_reports_wait() {
        let limiter = RateLimiter::new(3, 0);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        let wait = limiter.next_slot_in().await.unwrap();
        assert!(wait > Duration::from_secs(55));
        assert!(wait <= WINDOW);
    }

    #[tokio::test]
    async fn test_token_budget() {
        let limiter = RateLimiter::new(0, 300);
        limiter.record_tokens(100).await;
        limiter.record_tokens(150).await;
        assert_eq!(limiter.current_token_usage().await, 250);
        assert!(limiter.next_slot_in().await.is_none());

        limiter.record_tokens(50).await;
        assert!(limiter.next_slot_in().await.is_some());
    }

    #[tokio::test]
    async fn test_zero_limits_are_unlimited() {
        let limiter = RateLimiter::new(0, 0);
        for _ in 0..100 {
            limiter.acquire().await;
        }
        limiter.record_tokens(1_000_000).await;
        assert!(limiter.next_slot_in().await.is_none());
    }
}
