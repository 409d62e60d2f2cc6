/// Gate consulted before every matchmaking, move or read request.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, ip: &str, token: &str) -> bool;
}

/// Permits every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

impl RateLimiter for AlwaysAllow {
    fn allow(&self, _ip: &str, _token: &str) -> bool {
        true
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Denies every request.
    pub struct AlwaysDeny;

    impl RateLimiter for AlwaysDeny {
        fn allow(&self, _ip: &str, _token: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_always_allow() {
        assert!(AlwaysAllow.allow("127.0.0.1", ""));
        assert!(AlwaysAllow.allow("", "token"));
    }
}
