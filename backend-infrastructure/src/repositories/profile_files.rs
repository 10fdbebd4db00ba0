use std::path::Path;

use async_trait::async_trait;
use tokio::fs;

use backend_domain::{WatchProfile, WatchProfileRepository};

/// File-backed watch-profile store. Profiles are owned by the account
/// system; this repository only reads them.
pub struct ProfileFileRepository;

impl ProfileFileRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProfileFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WatchProfileRepository for ProfileFileRepository {
    async fn load_profiles(&self, path: &str) -> anyhow::Result<Vec<WatchProfile>> {
        if !Path::new(path).exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path).await?;
        let profiles: Vec<WatchProfile> = serde_yaml::from_str(&content)?;
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::WatchCriterion;

    #[test]
    fn profiles_parse_from_yaml() {
        let yaml = r#"
- profile_id: profile-1
  name: hunters
  criteria:
    - type: character_watch
      ids: [123456789]
    - type: custom
      logic_operator: or
      conditions:
        - type: isk_value
          operator: greater_than
          value: 100000000.0
        - type: corporation_watch
          ids: [98000001]
"#;
        let profiles: Vec<WatchProfile> = serde_yaml::from_str(yaml).expect("profiles");
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].criteria.len(), 2);
        assert!(matches!(
            profiles[0].criteria[0],
            WatchCriterion::CharacterWatch { .. }
        ));
    }
}
