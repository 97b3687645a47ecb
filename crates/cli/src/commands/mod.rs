pub mod briefing;
pub mod config_cmd;
pub mod doctor;
pub mod score;
pub mod serve;

use breathwise_briefing::BriefingService;
use breathwise_config::AppConfig;
use breathwise_core::metric::MetricKind;
use breathwise_core::profile::{HealthProfile, Severity};
use breathwise_providers::{SourceRegistry, StaticProfileStore, build_from_config};
use std::sync::Arc;

/// Profile seeded in offline mode so the demo works without a config file.
pub const DEMO_USER: &str = "demo";

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build a one-shot service, either over the configured sources or over
/// the built-in demo fixtures.
pub fn build_service(config: &AppConfig, offline: bool) -> Result<BriefingService, Box<dyn std::error::Error>> {
    let registry = if offline {
        SourceRegistry::offline()
    } else {
        build_from_config(config)
    };

    let mut profiles = StaticProfileStore::new(config.profiles.clone());
    if offline && !config.profiles.iter().any(|p| p.user_ref == DEMO_USER) {
        profiles.insert(
            HealthProfile::new(DEMO_USER)
                .with_condition("asthma", Severity::Moderate)
                .with_trigger(MetricKind::Pm25),
        );
    }

    Ok(BriefingService::from_config(config, &registry, Arc::new(profiles))?)
}
