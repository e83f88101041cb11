use rand::Rng;
use std::time::Duration;

/// Delay before a failed job becomes claimable again.
///
/// Exponential in the attempt count, capped, with up to 25% additive jitter
/// so a burst of failures does not re-materialize as a burst of claims.
pub fn retry_delay(attempt_count: i32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt_count.clamp(0, 31) as u32;
    let exponential = base
        .checked_mul(2u32.saturating_pow(exponent))
        .unwrap_or(cap);
    let capped = exponential.min(cap);

    let jitter_ceiling = (capped.as_millis() / 4) as u64;
    let jitter = if jitter_ceiling == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ceiling)
    };

    capped + Duration::from_millis(jitter)
}
