//! TickBoost CLI
//!
//! CLI tool for resolving hostnames against adjust-setInterval rulesets
//! and managing ruleset files.

mod bench;
mod ruleset_source;

use std::path::Path;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use tb_core::{
    run_scriptlet, DelayThreshold, EntityScope, IntervalAdjustment, IntervalRegistry, Resolution,
    Resolver, Ruleset, WILDCARD_KEY,
};
use tb_ruleset::{optimize_ruleset, to_json, validate_ruleset};

use ruleset_source::{load_ruleset, read_ruleset, write_text};

#[derive(Parser)]
#[command(name = "tb-cli")]
#[command(about = "TickBoost adjust-setInterval ruleset tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Every label run except the full host and the last label alone
    Labels,
    /// Never include the last label in an entity
    ExcludeLastLabel,
}

impl From<ScopeArg> for EntityScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Labels => EntityScope::Labels,
            ScopeArg::ExcludeLastLabel => EntityScope::ExcludeLastLabel,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve which argument sets apply to hostnames
    Resolve {
        /// Hostnames to resolve
        #[arg(required = true)]
        hosts: Vec<String>,

        /// Ruleset file (JSON or generated scriptlet); bundled default if omitted
        #[arg(short, long)]
        ruleset: Option<String>,

        /// Show which table and key contributed each index
        #[arg(short, long)]
        explain: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Entity matching range
        #[arg(long, value_enum, default_value = "labels")]
        entity_scope: ScopeArg,
    },

    /// Install the rules for a hostname and report the delay a setInterval call would get
    Simulate {
        /// Page hostname
        #[arg(long)]
        host: String,

        /// Callback source text passed to setInterval
        #[arg(long)]
        callback: String,

        /// Delay passed to setInterval, in milliseconds
        #[arg(long, default_value_t = 1000.0)]
        delay: f64,

        /// Ruleset file; bundled default if omitted
        #[arg(short, long)]
        ruleset: Option<String>,
    },

    /// Check a ruleset for dangling indices and dead entries
    Validate {
        /// Ruleset file to validate
        #[arg(short, long)]
        input: String,
    },

    /// Dump ruleset info
    Info {
        /// Ruleset file; bundled default if omitted
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Convert a ruleset (e.g. a generated scriptlet) to a JSON document
    Convert {
        /// Input ruleset file
        #[arg(short, long)]
        input: String,

        /// Output JSON file
        #[arg(short, long, default_value = "ruleset.json")]
        output: String,

        /// De-duplicate indices and drop empty keys before writing
        #[arg(long)]
        optimize: bool,
    },

    /// Benchmark hostname resolution
    Bench {
        /// Ruleset file; bundled default if omitted
        #[arg(short, long)]
        ruleset: Option<String>,

        /// Number of synthetic hostnames
        #[arg(long, default_value_t = 1000)]
        hosts: usize,

        /// Passes over the hostname set
        #[arg(long, default_value_t = 100)]
        iterations: usize,

        /// Seed for the hostname generator
        #[arg(long, default_value_t = 0xc0ffee)]
        seed: u32,

        /// Entity matching range
        #[arg(long, value_enum, default_value = "labels")]
        entity_scope: ScopeArg,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            hosts,
            ruleset,
            explain,
            json,
            entity_scope,
        } => cmd_resolve(&hosts, ruleset.as_deref(), explain, json, entity_scope.into()),
        Commands::Simulate {
            host,
            callback,
            delay,
            ruleset,
        } => cmd_simulate(&host, &callback, delay, ruleset.as_deref()),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Info { input } => cmd_info(input.as_deref()),
        Commands::Convert {
            input,
            output,
            optimize,
        } => cmd_convert(&input, &output, optimize),
        Commands::Bench {
            ruleset,
            hosts,
            iterations,
            seed,
            entity_scope,
        } => bench::run(bench::BenchOptions {
            ruleset_path: ruleset,
            hosts,
            iterations,
            seed,
            entity_scope: entity_scope.into(),
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_resolve(
    hosts: &[String],
    ruleset_path: Option<&str>,
    explain: bool,
    as_json: bool,
    scope: EntityScope,
) -> Result<(), String> {
    let ruleset = load_ruleset(ruleset_path)?;
    let resolver = Resolver::new(&ruleset.tables).with_entity_scope(scope);

    let mut reports = Vec::with_capacity(hosts.len());
    for host in hosts {
        let resolution = resolver.resolve(host);
        if as_json {
            reports.push(resolution_json(host, &resolution, &ruleset));
        } else {
            print_resolution(host, &resolution, &ruleset, explain);
        }
    }

    if as_json {
        let text = serde_json::to_string_pretty(&reports)
            .map_err(|e| format!("Failed to serialize JSON: {}", e))?;
        println!("{text}");
    }

    Ok(())
}

fn print_resolution(host: &str, resolution: &Resolution, ruleset: &Ruleset, explain: bool) {
    let indices: Vec<String> = resolution.indices.iter().map(|i| i.to_string()).collect();
    println!("{host}: [{}]", indices.join(", "));

    for &index in &resolution.indices {
        let args = match ruleset.argument_set(index) {
            Some(set) => format!("{:?}", set.to_positional()),
            None => "<missing>".to_string(),
        };
        println!("  [{index}] {args}");
    }

    if !explain {
        return;
    }
    for m in &resolution.matches {
        println!("  {:?} {:?} -> {}", m.source, m.key, m.index);
    }
    if !resolution.excluded.is_empty() {
        let excluded: Vec<String> = resolution.excluded.iter().map(|i| i.to_string()).collect();
        println!("  excluded: [{}]", excluded.join(", "));
    }
}

fn resolution_json(host: &str, resolution: &Resolution, ruleset: &Ruleset) -> serde_json::Value {
    let args: Vec<serde_json::Value> = resolution
        .indices
        .iter()
        .map(|&index| {
            json!({
                "index": index,
                "args": ruleset.argument_set(index).map(|set| set.to_positional()),
            })
        })
        .collect();
    let matches: Vec<serde_json::Value> = resolution
        .matches
        .iter()
        .map(|m| json!({ "source": format!("{:?}", m.source), "key": m.key, "index": m.index }))
        .collect();

    json!({
        "host": host,
        "indices": resolution.indices,
        "excluded": resolution.excluded,
        "argumentSets": args,
        "matches": matches,
    })
}

fn cmd_simulate(
    host: &str,
    callback: &str,
    delay: f64,
    ruleset_path: Option<&str>,
) -> Result<(), String> {
    let ruleset = load_ruleset(ruleset_path)?;
    let mut registry = IntervalRegistry::new();
    let report = run_scriptlet(host, &ruleset, &mut registry, |failure| {
        eprintln!("  skipped [{}]: {}", failure.index, failure.error);
    });

    println!("Host:      {host}");
    println!("Installed: {:?}", report.installed);
    for adj in registry.adjustments() {
        println!("  [{}] {}", adj.index, describe_adjustment(adj));
    }

    let scheduled = registry.schedule(callback, delay);
    println!("Delay:     {delay}ms -> {scheduled}ms");

    Ok(())
}

fn describe_adjustment(adj: &IntervalAdjustment) -> String {
    let needle = match adj.needle.source() {
        "" => "<any>".to_string(),
        source => format!("{source:?}"),
    };
    let delay = match adj.delay {
        DelayThreshold::Any => "any delay".to_string(),
        DelayThreshold::Exactly(ms) => format!("delay == {ms}"),
    };
    format!("needle {needle}, {delay}, x{}", adj.boost)
}

fn cmd_validate(input: &str) -> Result<(), String> {
    let ruleset = read_ruleset(Path::new(input))?;
    let issues = validate_ruleset(&ruleset);

    if issues.is_empty() {
        println!("Ruleset '{}' is valid", input);
        return Ok(());
    }

    for issue in &issues {
        let level = if issue.is_error() { "error" } else { "warning" };
        println!("  {level}: {issue}");
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    println!("{} issue(s), {} error(s)", issues.len(), errors);

    if errors > 0 {
        return Err(format!("Ruleset '{}' has {} error(s)", input, errors));
    }
    Ok(())
}

fn cmd_info(input: Option<&str>) -> Result<(), String> {
    let ruleset = load_ruleset(input)?;
    let tables = &ruleset.tables;

    println!("Ruleset: {}", input.unwrap_or("(bundled default)"));
    println!("  Name:          {}", ruleset.name);
    println!("  Argument sets: {}", ruleset.args.len());
    println!();
    println!("Tables:");
    println!("  Hostnames:     {}", tables.hostnames.len());
    println!("  Entities:      {}", tables.entities.len());
    println!("  Exceptions:    {}", tables.exceptions.len());
    let wildcard = tables.hostnames.get(WILDCARD_KEY).is_some();
    println!("  Wildcard:      {}", if wildcard { "yes" } else { "no" });

    Ok(())
}

fn cmd_convert(input: &str, output: &str, optimize: bool) -> Result<(), String> {
    let mut ruleset = read_ruleset(Path::new(input))?;

    if optimize {
        let stats = optimize_ruleset(&mut ruleset);
        println!(
            "Optimized: {} -> {} keys (dropped {}, deduped {} indices)",
            stats.keys_before, stats.keys_after, stats.dropped_keys, stats.deduped_indices
        );
    }

    let text = to_json(&ruleset).map_err(|e| format!("Failed to serialize ruleset: {}", e))?;
    write_text(Path::new(output), &text)?;

    println!("Wrote '{}' ({} argument sets)", output, ruleset.args.len());
    Ok(())
}
