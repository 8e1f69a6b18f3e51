//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RouterBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    router: RouterInfo,
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct RouterInfo {
    id: String,
    protocol: String,
    mode: String,
    combiner: String,
    strategy: String,
    /// Candidate order the priority strategy would use
    priority_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct RouteInfo {
    name: String,
    protocol: String,
    endpoint: String,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
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
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &RouterBlueprint) -> ConfigInfo {
    let router = &blueprint.router;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        router: RouterInfo {
            id: router.id.clone(),
            protocol: router.protocol.to_string(),
            mode: format!("{:?}", router.mode),
            combiner: format!("{:?}", router.combiner),
            strategy: format!("{:?}", router.strategy.kind),
            priority_order: blueprint.priority_order(),
            seed: router.strategy.seed,
        },
        routes: blueprint
            .routes
            .iter()
            .map(|r| RouteInfo {
                name: r.name.clone(),
                protocol: r.protocol.to_string(),
                endpoint: r.endpoint.clone(),
                timeout_ms: r.timeout_ms,
                params: r.params.clone(),
            })
            .collect(),
    }
}

fn print_config_info(blueprint: &RouterBlueprint) {
    let router = &blueprint.router;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Switchyard Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔀 Router");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Id: {}", router.id);
    println!("   ├─ Request protocol: {}", router.protocol);
    println!("   ├─ Mode: {:?}", router.mode);
    println!("   ├─ Combiner: {:?}", router.combiner);
    match router.strategy.seed {
        Some(seed) => println!("   └─ Strategy: {:?} (seed {})", router.strategy.kind, seed),
        None => println!("   └─ Strategy: {:?}", router.strategy.kind),
    }

    println!("\n🎯 Routes ({})", blueprint.routes.len());
    let order = blueprint.priority_order();
    for (i, name) in order.iter().enumerate() {
        let Some(route) = blueprint.route(name) else {
            continue;
        };
        let prefix = if i == order.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} #{} {} [{}] {} (timeout {}ms)",
            prefix,
            i + 1,
            route.name,
            route.protocol,
            route.endpoint,
            route.timeout_ms
        );
    }

    println!();
}
