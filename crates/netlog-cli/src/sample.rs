// Synthetic proxy log generator
// Squid native access.log lines: mostly ordinary browsing, with a few patterns
// worth flagging mixed in (beaconing, denied tunnels, a large upload).

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;

const CLIENTS: &[&str] = &[
    "192.168.1.23",
    "192.168.1.50",
    "192.168.1.77",
    "192.168.1.104",
    "10.0.4.12",
];

const BROWSING: &[(&str, &str, &str)] = &[
    ("GET", "http://www.example.com/", "text/html"),
    ("GET", "http://cdn.example.com/app.js", "application/javascript"),
    ("GET", "http://cdn.example.com/styles.css", "text/css"),
    ("GET", "http://news.example.org/feed.xml", "application/rss+xml"),
    ("GET", "http://images.example.net/logo.png", "image/png"),
    ("POST", "http://api.example.com/v1/events", "application/json"),
];

const TUNNELS: &[&str] = &[
    "mail.example.com:443",
    "login.example.com:443",
    "update.example.org:443",
];

const BEACON_HOST: &str = "cdn-sync.xyz-metrics.top";
const BEACON_CLIENT: &str = "192.168.1.77";
const BEACON_INTERVAL_SECS: f64 = 60.0;

/// Which kind of traffic a generated line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traffic {
    Browsing,
    Tunnel,
    DeniedTunnel,
    Beacon,
    LargeUpload,
}

/// One access.log entry.
#[derive(Debug, Clone)]
pub struct ProxyLine {
    pub timestamp: f64,
    pub elapsed_ms: u32,
    pub client: String,
    pub result: String,
    pub status: u16,
    pub bytes: u64,
    pub method: String,
    pub url: String,
    pub hierarchy: String,
    pub mime: String,
    pub traffic: Traffic,
}

impl ProxyLine {
    pub fn render(&self) -> String {
        format!(
            "{:.3} {:>6} {} {}/{} {} {} {} - {} {}",
            self.timestamp,
            self.elapsed_ms,
            self.client,
            self.result,
            self.status,
            self.bytes,
            self.method,
            self.url,
            self.hierarchy,
            self.mime
        )
    }
}

pub fn generate(count: usize, start: DateTime<Utc>, seed: u64) -> Vec<ProxyLine> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut clock = start.timestamp_millis() as f64 / 1000.0;
    let mut next_beacon = clock + BEACON_INTERVAL_SECS;
    let upload_at = count / 2;
    let mut lines = Vec::with_capacity(count);

    for i in 0..count {
        clock += rng.random_range(50..2_500) as f64 / 1000.0;

        let line = if i == upload_at {
            large_upload(&mut rng, clock)
        } else if clock >= next_beacon {
            next_beacon += BEACON_INTERVAL_SECS;
            beacon(&mut rng, clock)
        } else if rng.random_ratio(1, 12) {
            tunnel(&mut rng, clock)
        } else {
            browsing(&mut rng, clock)
        };
        lines.push(line);
    }
    lines
}

/// Full file contents, newline terminated.
pub fn render_log(lines: &[ProxyLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&line.render());
        out.push('\n');
    }
    out
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn browsing(rng: &mut StdRng, clock: f64) -> ProxyLine {
    let (method, url, mime) = BROWSING[rng.random_range(0..BROWSING.len())];
    let hit = rng.random_ratio(1, 3);
    ProxyLine {
        timestamp: clock,
        elapsed_ms: rng.random_range(5..400),
        client: pick(rng, CLIENTS).to_string(),
        result: if hit { "TCP_HIT" } else { "TCP_MISS" }.to_string(),
        status: 200,
        bytes: rng.random_range(300..90_000),
        method: method.to_string(),
        url: url.to_string(),
        hierarchy: if hit {
            "HIER_NONE/-".to_string()
        } else {
            format!("HIER_DIRECT/93.184.216.{}", rng.random_range(1..250))
        },
        mime: mime.to_string(),
        traffic: Traffic::Browsing,
    }
}

fn tunnel(rng: &mut StdRng, clock: f64) -> ProxyLine {
    let denied = rng.random_ratio(1, 3);
    let (target, traffic) = if denied {
        (
            format!("185.220.101.{}:{}", rng.random_range(1..60), rng.random_range(4000..9999)),
            Traffic::DeniedTunnel,
        )
    } else {
        (pick(rng, TUNNELS).to_string(), Traffic::Tunnel)
    };
    ProxyLine {
        timestamp: clock,
        elapsed_ms: if denied { 0 } else { rng.random_range(1_000..60_000) },
        client: pick(rng, CLIENTS).to_string(),
        result: if denied { "TCP_DENIED" } else { "TCP_TUNNEL" }.to_string(),
        status: if denied { 403 } else { 200 },
        bytes: if denied { 0 } else { rng.random_range(2_000..400_000) },
        method: "CONNECT".to_string(),
        url: target,
        hierarchy: if denied {
            "HIER_NONE/-".to_string()
        } else {
            format!("HIER_DIRECT/203.0.113.{}", rng.random_range(1..250))
        },
        mime: "-".to_string(),
        traffic,
    }
}

fn beacon(rng: &mut StdRng, clock: f64) -> ProxyLine {
    ProxyLine {
        timestamp: clock,
        elapsed_ms: rng.random_range(80..140),
        client: BEACON_CLIENT.to_string(),
        result: "TCP_MISS".to_string(),
        status: 200,
        bytes: rng.random_range(180..220),
        method: "GET".to_string(),
        url: format!(
            "http://{}/pixel.gif?id={:08x}",
            BEACON_HOST,
            rng.random_range(0..u32::MAX)
        ),
        hierarchy: "HIER_DIRECT/45.134.26.9".to_string(),
        mime: "image/gif".to_string(),
        traffic: Traffic::Beacon,
    }
}

fn large_upload(rng: &mut StdRng, clock: f64) -> ProxyLine {
    ProxyLine {
        timestamp: clock,
        elapsed_ms: rng.random_range(20_000..90_000),
        client: BEACON_CLIENT.to_string(),
        result: "TCP_MISS".to_string(),
        status: 200,
        bytes: rng.random_range(150_000_000..400_000_000),
        method: "POST".to_string(),
        url: "http://files.anon-share.io/upload".to_string(),
        hierarchy: "HIER_DIRECT/198.51.100.23".to_string(),
        mime: "application/octet-stream".to_string(),
        traffic: Traffic::LargeUpload,
    }
}
