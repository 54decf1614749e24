//! Device activation details shown on the welcome screen
//!
//! Codes are left-padded with zeros to a full twelve digits. Slicing the raw
//! base-36 string instead would leave the last group empty for current
//! timestamps (`LOYW-3V28-`), since they only need nine digits.

use std::time::{Duration, Instant};

/// Placeholder until devices report a real hardware address.
pub const DEVICE_MAC: &str = "AA:BB:CC:DD:EE:FF";

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CODE_LEN: usize = 12;

/// Base-36 of the epoch milliseconds, upper-cased and zero-padded to twelve
/// digits, grouped as `XXXX-XXXX-XXXX`.
pub fn code_from_millis(millis: u64) -> String {
    let mut digits = Vec::with_capacity(13);
    let mut n = millis;
    loop {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.resize(digits.len().max(CODE_LEN), b'0');
    digits.truncate(CODE_LEN);
    digits.reverse();

    let raw = String::from_utf8_lossy(&digits);
    format!("{}-{}-{}", &raw[0..4], &raw[4..8], &raw[8..12])
}

/// Activation code that regenerates itself once a minute.
pub struct ActivationCode {
    code: String,
    generated_at: Instant,
}

impl ActivationCode {
    pub fn new() -> Self {
        Self {
            code: code_from_millis(now_millis()),
            generated_at: Instant::now(),
        }
    }

    /// Regenerate if the interval elapsed. Returns true when the code changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.generated_at) < REFRESH_INTERVAL {
            return false;
        }
        self.code = code_from_millis(now_millis());
        self.generated_at = now;
        log::debug!("Activation code refreshed");
        true
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Time left until the next regeneration
    pub fn remaining(&self, now: Instant) -> Duration {
        REFRESH_INTERVAL.saturating_sub(now.duration_since(self.generated_at))
    }
}

impl Default for ActivationCode {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        assert_eq!(code_from_millis(1_700_000_000_000), "0000-LOYW-3V28");
        assert_eq!(code_from_millis(0), "0000-0000-0000");
        assert_eq!(code_from_millis(35), "0000-0000-000Z");
    }

    #[test]
    fn test_code_keeps_twelve_digits_for_huge_values() {
        let code = code_from_millis(u64::MAX);
        assert_eq!(code.len(), 14);
        assert_eq!(code.matches('-').count(), 2);
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let mut code = ActivationCode::new();
        let start = code.generated_at;
        assert!(!code.tick(start + Duration::from_secs(59)));
        assert!(code.tick(start + REFRESH_INTERVAL));
        assert_eq!(code.remaining(start + REFRESH_INTERVAL), REFRESH_INTERVAL);
    }
}
