//! Basic usage of the qrgate token bucket and registry.

use qrgate::{ManualClock, RateLimiterConfig, RateLimiterRegistry, TokenBucket};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    println!("=== Token Bucket Basics ===\n");

    simple_example();

    println!("\n{}\n", "=".repeat(50));

    refill_example();

    println!("\n{}\n", "=".repeat(50));

    registry_example();
}

fn simple_example() {
    println!("1. Single bucket:");

    // 5 tokens, fully restored over 10 seconds
    let bucket = match TokenBucket::new(5.0, Duration::from_secs(10)) {
        Ok(bucket) => bucket,
        Err(err) => {
            eprintln!("   invalid bucket: {err}");
            return;
        }
    };

    for i in 1..=7 {
        if bucket.check(true) {
            println!("   Request {i} - ✅ Allowed");
        } else {
            println!("   Request {i} - ❌ Rate limited");
        }
    }
    println!("   Tokens left: {:.2}", bucket.tokens());
}

fn refill_example() {
    println!("2. Refill on a manual clock:");

    let clock = Arc::new(ManualClock::new());
    let Ok(bucket) = TokenBucket::with_clock(2.0, Duration::from_secs(4), Arc::clone(&clock)) else {
        return;
    };

    bucket.check(true);
    bucket.check(true);
    println!("   Drained: probe says {}", bucket.check(false));

    for _ in 0..4 {
        clock.advance(Duration::from_secs(1));
        println!(
            "   t={:?}: probe says {}",
            clock.elapsed(),
            bucket.check(false)
        );
    }
}

fn registry_example() {
    println!("3. Registry keyed by client:");

    let Ok(registry) = RateLimiterRegistry::<String>::new(RateLimiterConfig::per_minute(3)) else {
        return;
    };

    for client in ["alice", "bob", "alice", "alice", "alice", "bob"] {
        let verdict = if registry.check(client, true) { "✅" } else { "❌" };
        println!("   {client:<6} {verdict}");
    }

    println!("\n{}", registry.stats().summary());
}
