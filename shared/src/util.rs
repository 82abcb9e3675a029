/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms, collision-free at checkout scale)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Generate a human-facing order number ("SO-" + snowflake)
pub fn order_number() -> String {
    format!("SO-{}", snowflake_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_ids_are_positive_and_distinct_across_millis() {
        let a = snowflake_id();
        assert!(a > 0);
        // IDs generated one millisecond apart always differ in the timestamp bits
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = snowflake_id();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn order_number_has_prefix() {
        assert!(order_number().starts_with("SO-"));
    }
}
