use axum::http::HeaderMap;
use qrgate::{ClientIdentity, ClientRegistry, RateLimiterConfig};
use std::net::SocketAddr;

fn main() {
    let Ok(registry) = ClientRegistry::new(RateLimiterConfig::per_second(10)) else {
        return;
    };

    let mut proxied = HeaderMap::new();
    proxied.insert("x-forwarded-for", "203.0.113.10".parse().expect("valid header"));

    let direct: Option<SocketAddr> = "192.168.1.2:51000".parse().ok();

    let clients = [
        ClientIdentity::from_parts(&proxied, direct),
        ClientIdentity::from_parts(&HeaderMap::new(), direct),
        ClientIdentity::from_parts(&HeaderMap::new(), None),
    ];

    for client in &clients {
        for i in 1..=12 {
            if registry.check(client, true) {
                println!("{client} - Request {i} allowed");
            } else {
                println!("{client} - Request {i} BLOCKED");
            }
        }
        println!();
    }

    println!("{}", registry.stats().summary());
}
