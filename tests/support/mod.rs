#![allow(unused)]

use std::str::FromStr;
use std::sync::Once;

use zone_digest::rr::Name;
use zone_digest::store::DEFAULT_TREE_WIDTH;
use zone_digest::{Backend, DigestRecordType, Zone};

/// Registers a global default tracing subscriber when called for the first time. This is intended
/// for use in tests.
pub fn subscribe() {
    static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
    INSTALL_TRACING_SUBSCRIBER.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}

/// A small zone: SOA, apex NS set, and one address record.
pub const SMALL_ZONE: &str = "\
example.com. 3600 IN SOA ns1.example.com. hostmaster.example.com. 2024010101 7200 3600 1209600 3600
example.com. 3600 IN NS ns1.example.com.
example.com. 3600 IN NS ns2.example.com.
ns1.example.com. 3600 IN A 192.0.2.53
ns2.example.com. 3600 IN A 192.0.2.54
www.example.com. 300 IN A 192.0.2.80
www.example.com. 300 IN AAAA 2001:db8::80
mail.example.com. 300 IN MX 10 smtp.example.com.
smtp.example.com. 300 IN A 192.0.2.25
";

pub fn origin() -> Name {
    Name::from_str("example.com.").unwrap()
}

pub fn load(text: &str, backend: Backend) -> Zone {
    Zone::from_text(origin(), text, backend, DigestRecordType::Standard)
        .expect("zone text should load")
}

pub fn small_zone(backend: Backend) -> Zone {
    load(SMALL_ZONE, backend)
}

pub fn tree_backend() -> Backend {
    Backend::Tree {
        depth: 2,
        width: DEFAULT_TREE_WIDTH,
    }
}
