//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RouterBlueprint, StrategyKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    router: String,
    protocol: String,
    strategy: String,
    route_count: usize,
    http_routes: usize,
    rpc_routes: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let http_routes = blueprint
                .routes
                .iter()
                .filter(|r| r.protocol == contracts::Protocol::Http)
                .count();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    router: blueprint.router.id.clone(),
                    protocol: blueprint.router.protocol.to_string(),
                    strategy: format!("{:?}", blueprint.router.strategy.kind),
                    route_count: blueprint.routes.len(),
                    http_routes,
                    rpc_routes: blueprint.routes.len() - http_routes,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RouterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let strategy = &blueprint.router.strategy;

    if strategy.seed.is_some() && strategy.kind != StrategyKind::Random {
        warnings.push(format!(
            "router.strategy.seed is ignored by the {:?} strategy",
            strategy.kind
        ));
    }

    if !strategy.order.is_empty() && strategy.kind != StrategyKind::Priority {
        warnings.push(format!(
            "router.strategy.order only sets the base order for the {:?} strategy",
            strategy.kind
        ));
    }

    if blueprint.routes.len() == 1 {
        warnings.push("Only one route configured - no fallback is possible".to_string());
    }

    for route in &blueprint.routes {
        if route.protocol != blueprint.router.protocol {
            warnings.push(format!(
                "Route '{}' uses {} but requests are {}",
                route.name, route.protocol, blueprint.router.protocol
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Router: {} ({})", summary.router, summary.protocol);
            println!("  Strategy: {}", summary.strategy);
            println!(
                "  Routes: {} ({} HTTP, {} RPC)",
                summary.route_count, summary.http_routes, summary.rpc_routes
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
