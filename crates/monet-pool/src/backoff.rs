//! Reconnect backoff schedule.

use std::time::Duration;

/// The failure counter never grows beyond this value; every attempt past
/// it sleeps the maximum delay.
pub const MAX_RECORDED_FAILURES: u32 = 11;

/// Delay to sleep before a reconnect attempt, given the number of
/// consecutive failures observed so far.
///
/// The first two attempts retry immediately; later attempts back off up
/// to four seconds. The counter resets to zero on the first success.
#[must_use]
pub fn backoff_delay(failures: u32) -> Duration {
    let millis = match failures {
        0 | 1 => 0,
        2 => 100,
        3 => 300,
        4 => 600,
        5 => 1000,
        6 => 2000,
        7 => 3000,
        _ => 4000,
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let observed: Vec<u64> = (0..9).map(|f| backoff_delay(f).as_millis() as u64).collect();
        assert_eq!(observed, vec![0, 0, 100, 300, 600, 1000, 2000, 3000, 4000]);
    }

    #[test]
    fn test_backoff_caps_at_four_seconds() {
        assert_eq!(backoff_delay(8), Duration::from_millis(4000));
        assert_eq!(backoff_delay(MAX_RECORDED_FAILURES), Duration::from_millis(4000));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(4000));
    }
}
