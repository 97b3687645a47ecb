//! `breathwise doctor`: Check configuration and source health.

use breathwise_config::AppConfig;
use breathwise_content::RecommendationPool;
use breathwise_core::source::{DataSource, ForecastProvider};
use breathwise_providers::build_from_config;
use std::time::Duration;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Breathwise Doctor: System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found at {}", config_path.display());
    } else {
        println!("  ⚠️  No config file; using defaults (see `breathwise config`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return Err(e.into());
        }
    };

    if config.profiles.is_empty() {
        println!("  ⚠️  No health profiles configured; only `--offline` demo scoring will work");
        issues += 1;
    } else {
        println!("  ✅ {} health profile(s)", config.profiles.len());
    }

    let registry = build_from_config(&config);
    if registry.is_empty() {
        println!("  ❌ No data sources configured");
        issues += 1;
    }

    for id in registry.list() {
        let Some(source) = registry.get(id) else {
            continue;
        };
        match tokio::time::timeout(Duration::from_secs(5), source.health_check()).await {
            Ok(Ok(true)) => println!("  ✅ Source {id} reachable"),
            Ok(Ok(false)) => {
                println!("  ⚠️  Source {id} answered but reported unhealthy");
                issues += 1;
            }
            Ok(Err(e)) => {
                println!("  ❌ Source {id}: {e}");
                issues += 1;
            }
            Err(_) => {
                println!("  ❌ Source {id}: health check timed out");
                issues += 1;
            }
        }
    }

    match registry.forecast() {
        Some(f) => println!("  ✅ Forecast provider: {}", f.id()),
        None => println!("  ⚠️  No forecast provider; trends fall back to history"),
    }

    match RecommendationPool::from_config(&config.content) {
        Ok(pool) => match &config.content.pool_path {
            Some(path) => println!("  ✅ Recommendation pool {} ({} items)", path.display(), pool.len()),
            None => println!("  ✅ Built-in recommendation pool ({} items)", pool.len()),
        },
        Err(e) => {
            println!("  ❌ Recommendation pool: {e}");
            issues += 1;
        }
    }

    if config.gateway.admin_token.is_none() {
        println!("  ⚠️  No admin token; cache invalidation is only rate limited");
    }
    if config.gateway.bearer_tokens.is_empty() {
        println!("  ⚠️  No caller tokens; API requests are rate limited per client address");
    } else {
        println!("  ✅ {} caller token(s)", config.gateway.bearer_tokens.len());
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
