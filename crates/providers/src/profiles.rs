//! In-memory profile store seeded from configuration.

use async_trait::async_trait;
use breathwise_core::error::ProfileError;
use breathwise_core::profile::HealthProfile;
use breathwise_core::source::ProfileStore;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct StaticProfileStore {
    profiles: HashMap<String, HealthProfile>,
}

impl StaticProfileStore {
    pub fn new(profiles: impl IntoIterator<Item = HealthProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.user_ref.clone(), p))
                .collect(),
        }
    }

    pub fn insert(&mut self, profile: HealthProfile) {
        self.profiles.insert(profile.user_ref.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for StaticProfileStore {
    async fn get_health_profile(&self, user_ref: &str) -> Result<HealthProfile, ProfileError> {
        self.profiles
            .get(user_ref)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(user_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breathwise_core::metric::MetricKind;
    use breathwise_core::profile::Severity;

    #[tokio::test]
    async fn lookup_by_user_ref() {
        let store = StaticProfileStore::new([HealthProfile::new("alice")
            .with_condition("asthma", Severity::Severe)
            .with_trigger(MetricKind::Pm25)]);

        let profile = store.get_health_profile("alice").await.unwrap();
        assert!(profile.is_trigger(MetricKind::Pm25));

        let err = store.get_health_profile("bob").await.unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(ref who) if who == "bob"));
    }
}
