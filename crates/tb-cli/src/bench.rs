use std::cmp::Ordering;
use std::time::Instant;

use tb_core::{EntityScope, Resolver, Ruleset};

use crate::ruleset_source::load_ruleset;

pub struct BenchOptions {
    pub ruleset_path: Option<String>,
    pub hosts: usize,
    pub iterations: usize,
    pub seed: u32,
    pub entity_scope: EntityScope,
}

struct BenchResult {
    op_count: usize,
    total_ms: f64,
    avg_us: f64,
    p50_us: f64,
    p95_us: f64,
    p99_us: f64,
    ops_per_sec: u64,
    matched_pct: f64,
}

pub fn run(opts: BenchOptions) -> Result<(), String> {
    println!("============================================================");
    println!("TickBoost Resolution Benchmark");
    println!("============================================================");

    let ruleset = load_ruleset(opts.ruleset_path.as_deref())?;
    let resolver = Resolver::new(&ruleset.tables).with_entity_scope(opts.entity_scope);

    let hosts = generate_hosts(&ruleset, opts.hosts, opts.seed);
    println!(
        "Ruleset: {:?} ({} hostnames, {} entities)",
        ruleset.name,
        ruleset.tables.hostnames.len(),
        ruleset.tables.entities.len(),
    );
    println!(
        "Hosts: {} (seed {:#x}), iterations: {}",
        hosts.len(),
        opts.seed,
        opts.iterations
    );

    println!("Warmup...");
    for host in &hosts {
        let _ = resolver.resolve(host);
    }

    let result = run_benchmark(&resolver, &hosts, opts.iterations);
    println!("------------------------------------------------------------");
    println!("{}", format_result(&result));

    Ok(())
}

fn run_benchmark(resolver: &Resolver<'_>, hosts: &[String], iterations: usize) -> BenchResult {
    let mut latencies = Vec::with_capacity(hosts.len() * iterations);
    let mut matched = 0usize;

    for _ in 0..iterations {
        for host in hosts {
            let start = Instant::now();
            let resolution = resolver.resolve(host);
            latencies.push(start.elapsed().as_secs_f64() * 1_000_000.0);
            if !resolution.is_empty() {
                matched += 1;
            }
        }
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let op_count = latencies.len();
    let total_us: f64 = latencies.iter().sum();
    let total_ms = total_us / 1000.0;

    BenchResult {
        op_count,
        total_ms,
        avg_us: if op_count == 0 { 0.0 } else { total_us / op_count as f64 },
        p50_us: percentile(&latencies, 0.50),
        p95_us: percentile(&latencies, 0.95),
        p99_us: percentile(&latencies, 0.99),
        ops_per_sec: if total_ms > 0.0 {
            (op_count as f64 / (total_ms / 1000.0)) as u64
        } else {
            0
        },
        matched_pct: if op_count == 0 {
            0.0
        } else {
            matched as f64 * 100.0 / op_count as f64
        },
    }
}

fn format_result(result: &BenchResult) -> String {
    [
        "Resolve:".to_string(),
        format!("  Operations: {}", result.op_count),
        format!("  Total time: {:.2}ms", result.total_ms),
        format!("  Avg latency: {:.2}μs", result.avg_us),
        format!("  P50 latency: {:.2}μs", result.p50_us),
        format!("  P95 latency: {:.2}μs", result.p95_us),
        format!("  P99 latency: {:.2}μs", result.p99_us),
        format!("  Throughput:  {} ops/sec", result.ops_per_sec),
        format!("  Matched:     {:.1}%", result.matched_pct),
    ]
    .join("\n")
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn create_rng(seed: u32) -> impl FnMut() -> f64 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state as f64) / (u32::MAX as f64)
    }
}

fn pick<'a>(items: &[&'a str], rand: &mut impl FnMut() -> f64) -> &'a str {
    let idx = (rand() * items.len() as f64).floor() as usize;
    items[idx.min(items.len() - 1)]
}

/// Mix of hosts that hit ruleset keys (as-is, under a subdomain, or as an
/// entity under a random TLD) and hosts that miss everything.
fn generate_hosts(ruleset: &Ruleset, count: usize, seed: u32) -> Vec<String> {
    const SUBDOMAINS: &[&str] = &["www", "m", "games", "cdn", "go", "static"];
    const TLDS: &[&str] = &["com", "io", "net", "org", "co.uk", "xyz"];
    const MISSES: &[&str] = &["example", "news-site", "video-portal", "shop", "weather"];

    let mut rand = create_rng(seed);
    let hostnames = ruleset.tables.hostnames.sorted_keys();
    let entities = ruleset.tables.entities.sorted_keys();

    let mut hosts = Vec::with_capacity(count);
    while hosts.len() < count {
        let roll = rand();
        let host = if roll < 0.35 && !hostnames.is_empty() {
            pick(&hostnames, &mut rand).to_string()
        } else if roll < 0.55 && !hostnames.is_empty() {
            format!("{}.{}", pick(SUBDOMAINS, &mut rand), pick(&hostnames, &mut rand))
        } else if roll < 0.70 && !entities.is_empty() {
            format!("{}.{}", pick(&entities, &mut rand), pick(TLDS, &mut rand))
        } else {
            format!(
                "{}.{}.{}",
                pick(SUBDOMAINS, &mut rand),
                pick(MISSES, &mut rand),
                pick(TLDS, &mut rand)
            )
        };
        hosts.push(host);
    }
    hosts
}
