//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{StreamBlueprint, WorkerConfig};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    feed: FeedInfo,
    subscription: SubscriptionInfo,
    pipeline: PipelineInfo,
    pools: Vec<PoolInfo>,
}

#[derive(Serialize)]
struct FeedInfo {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    interval_ms: u64,
}

#[derive(Serialize)]
struct SubscriptionInfo {
    follow: Vec<u64>,
    track: Vec<String>,
}

#[derive(Serialize)]
struct PipelineInfo {
    dry_run: bool,
    daemon: bool,
    post_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_statuses: Option<u64>,
}

#[derive(Serialize)]
struct PoolInfo {
    kind: String,
    task_prefix: String,
    pool_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<PoolSettings>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<String>,
}

#[derive(Serialize)]
struct PoolSettings {
    dirname: String,
    format: String,
    encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    drain_limit: Option<u64>,
    dry_run: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

/// Filter chain as configured, or the kind's default
fn filter_names(worker: &WorkerConfig) -> Vec<String> {
    match &worker.filters {
        Some(specs) => specs.iter().map(ToString::to_string).collect(),
        None => vec!["default_filter".to_string()],
    }
}

fn build_config_info(blueprint: &StreamBlueprint, args: &InfoArgs) -> ConfigInfo {
    let global_dry_run = blueprint.pipeline.dry_run;
    let pools = blueprint
        .workers
        .iter()
        .map(|w| PoolInfo {
            kind: w.kind.to_string(),
            task_prefix: w.kind.task_prefix().to_string(),
            pool_size: w.pool_size,
            settings: args.workers.then(|| PoolSettings {
                dirname: w.dirname.display().to_string(),
                format: w.format_or_default().to_string(),
                encoding: format!("{:?}", w.encoding),
                drain_limit: w.drain_limit,
                dry_run: w.effective_dry_run(global_dry_run),
            }),
            filters: if args.filters {
                filter_names(w)
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        feed: FeedInfo {
            source: format!("{:?}", blueprint.feed.source),
            path: blueprint.feed.path.as_ref().map(|p| p.display().to_string()),
            interval_ms: blueprint.feed.interval_ms,
        },
        subscription: SubscriptionInfo {
            follow: blueprint.stream.follow.clone(),
            track: blueprint.stream.track.clone(),
        },
        pipeline: PipelineInfo {
            dry_run: global_dry_run,
            daemon: blueprint.pipeline.daemon,
            post_backend: format!("{:?}", blueprint.pipeline.post_backend),
            max_statuses: blueprint.pipeline.max_statuses,
        },
        pools,
    }
}

fn print_config_info(blueprint: &StreamBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               twitstream Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let feed = &blueprint.feed;
    println!("📥 Feed");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Source: {:?}", feed.source);
    match &feed.path {
        Some(path) => println!("   ├─ Path: {}", path.display()),
        None => println!("   ├─ Path: -"),
    }
    println!("   └─ Interval: {} ms", feed.interval_ms);

    let stream = &blueprint.stream;
    println!("\n🔎 Subscription");
    if stream.is_empty() {
        println!("   └─ (everything)");
    } else {
        println!("   ├─ Follow: {:?}", stream.follow);
        println!("   └─ Track: {:?}", stream.track);
    }

    let pipeline = &blueprint.pipeline;
    println!("\n⚙️  Pipeline");
    println!("   ├─ Dry run: {}", pipeline.dry_run);
    println!("   ├─ Daemon: {}", pipeline.daemon);
    println!("   ├─ Post backend: {:?}", pipeline.post_backend);
    match pipeline.max_statuses {
        Some(max) => println!("   └─ Max statuses: {}", max),
        None => println!("   └─ Max statuses: unlimited"),
    }

    println!("\n👷 Pools ({})", blueprint.workers.len());
    for (i, worker) in blueprint.workers.iter().enumerate() {
        let is_last = i == blueprint.workers.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} x{} ({}-*)",
            prefix,
            worker.kind,
            worker.pool_size,
            worker.kind.task_prefix()
        );

        if args.workers {
            println!("   {}  ├─ Dir: {}", child_prefix, worker.dirname.display());
            println!("   {}  ├─ Format: {}", child_prefix, worker.format_or_default());
            println!("   {}  ├─ Encoding: {:?}", child_prefix, worker.encoding);
            match worker.drain_limit {
                Some(limit) => println!("   {}  ├─ Drain limit: {}", child_prefix, limit),
                None => println!("   {}  ├─ Drain limit: none", child_prefix),
            }
            println!(
                "   {}  └─ Dry run: {}",
                child_prefix,
                worker.effective_dry_run(pipeline.dry_run)
            );
        }

        if args.filters {
            println!(
                "   {}  🧹 Filters: {}",
                child_prefix,
                filter_names(worker).join(" && ")
            );
        }
    }

    println!();
}
