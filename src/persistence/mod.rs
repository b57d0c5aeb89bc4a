//! Player profiles
//!
//! The storage format belongs to the persistence service. The simulation
//! only reads what a player owns: unlocked classes and, per class, the
//! upgrade ids bought for it. Ids that no longer exist in the catalog are
//! skipped when a bot is built, never rejected here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::sim::actor::PlayerId;
use crate::sim::catalog::Catalog;

/// What one player has unlocked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player: PlayerId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unlocked_classes: Vec<String>,
    /// Upgrade ids owned per class id
    #[serde(default)]
    pub upgrades: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub credits: u32,
}

impl PlayerProfile {
    /// A fresh profile: the two free classes and no upgrades
    pub fn starter(player: PlayerId) -> Self {
        Self {
            player,
            display_name: String::new(),
            unlocked_classes: vec!["striker".to_string(), "titan".to_string()],
            upgrades: BTreeMap::new(),
            credits: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(json).map_err(|source| ConfigurationError::Parse {
            what: "player profile",
            source,
        })?;
        log::debug!(
            "Loaded profile {:?}: {} classes, {} upgraded",
            profile.player,
            profile.unlocked_classes.len(),
            profile.upgrades.len()
        );
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| ConfigurationError::Serialize {
            what: "player profile",
            source,
        })
    }

    pub fn has_class(&self, class_id: &str) -> bool {
        self.unlocked_classes.iter().any(|c| c == class_id)
    }

    /// Upgrade ids owned for a class (empty if none)
    pub fn upgrades_for(&self, class_id: &str) -> &[String] {
        self.upgrades.get(class_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unlock a class by spending credits.
    ///
    /// Returns false if already unlocked or unaffordable.
    pub fn unlock_class(&mut self, catalog: &Catalog, class_id: &str) -> Result<bool> {
        let price = catalog.class(class_id)?.unlock_price;
        if self.has_class(class_id) || self.credits < price {
            return Ok(false);
        }
        self.credits -= price;
        self.unlocked_classes.push(class_id.to_string());
        log::info!("{:?} unlocked {}", self.player, class_id);
        Ok(true)
    }

    /// Buy an upgrade for a class if its prerequisite is owned and it is affordable
    pub fn purchase_upgrade(&mut self, catalog: &Catalog, class_id: &str, upgrade_id: &str) -> bool {
        let Some(upgrade) = catalog.upgrade(upgrade_id) else {
            return false;
        };
        let owned = self.upgrades_for(class_id);
        if !self.has_class(class_id)
            || owned.iter().any(|id| id == upgrade_id)
            || !catalog.can_unlock(owned, upgrade_id)
            || self.credits < upgrade.cost
        {
            return false;
        }
        self.credits -= upgrade.cost;
        self.upgrades
            .entry(class_id.to_string())
            .or_default()
            .push(upgrade_id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_profile() {
        let profile = PlayerProfile::starter(PlayerId(1));
        assert!(profile.has_class("striker"));
        assert!(profile.has_class("titan"));
        assert!(!profile.has_class("phantom"));
        assert!(profile.upgrades_for("striker").is_empty());
    }

    #[test]
    fn test_starter_matches_free_catalog_classes() {
        let catalog = Catalog::builtin();
        let profile = PlayerProfile::starter(PlayerId(1));
        assert_eq!(catalog.starter_classes(), profile.unlocked_classes);
    }

    #[test]
    fn test_from_json_with_missing_fields() {
        let profile = PlayerProfile::from_json(
            r#"{"player": 7, "upgrades": {"striker": ["hull_1", "gone_upgrade"]}}"#,
        )
        .unwrap();
        assert_eq!(profile.player, PlayerId(7));
        assert!(profile.unlocked_classes.is_empty());
        assert_eq!(profile.upgrades_for("striker").len(), 2);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = PlayerProfile::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { what: "player profile", .. }));
    }

    #[test]
    fn test_purchase_follows_chain() {
        let catalog = Catalog::builtin();
        let mut profile = PlayerProfile::starter(PlayerId(1));
        profile.credits = 10_000;

        assert!(!profile.purchase_upgrade(&catalog, "striker", "hull_2"));
        assert!(profile.purchase_upgrade(&catalog, "striker", "hull_1"));
        assert!(!profile.purchase_upgrade(&catalog, "striker", "hull_1"));
        assert!(profile.purchase_upgrade(&catalog, "striker", "hull_2"));
        assert!(!profile.purchase_upgrade(&catalog, "phantom", "hull_1"));
        assert_eq!(profile.upgrades_for("striker"), &["hull_1", "hull_2"]);
    }

    #[test]
    fn test_unlock_class_spends_credits() {
        let catalog = Catalog::builtin();
        let mut profile = PlayerProfile::starter(PlayerId(1));
        profile.credits = 500;
        assert!(!profile.unlock_class(&catalog, "phantom").unwrap());
        assert!(profile.unlock_class(&catalog, "speedster").unwrap());
        assert_eq!(profile.credits, 200);
        assert!(profile.unlock_class(&catalog, "nope").is_err());
    }
}
