use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{Level, LevelError, LevelGeometry, LevelObject};

/// Serialized description of a single level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelAsset {
    /// Tile codes indexed `[z][y][x]`; zero marks an empty coordinate.
    pub tiles: Vec<Vec<Vec<u8>>>,
    /// Objects placed in the level keyed by name.
    pub objects: BTreeMap<String, ObjectAsset>,
}

/// Serialized description of a movable object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectAsset {
    /// Starting position of the object.
    pub pos: [f32; 3],
    /// Sprite variant drawn for the object.
    pub sprite: String,
}

#[derive(Debug, Deserialize)]
struct CampaignFile {
    levels: Vec<LevelAsset>,
}

/// Ordered sequence of validated levels.
///
/// Levels are numbered from 1. Each call to [`Campaign::start`] hands out a
/// pristine attempt that shares the level's geometry with every other attempt.
#[derive(Clone, Debug)]
pub struct Campaign {
    levels: Vec<Level>,
}

impl Campaign {
    /// Validates the provided assets and builds a campaign from them.
    pub fn from_assets(assets: Vec<LevelAsset>) -> Result<Self, LevelError> {
        if assets.is_empty() {
            return Err(LevelError::EmptyCampaign);
        }

        let mut levels = Vec::with_capacity(assets.len());
        for (offset, asset) in assets.into_iter().enumerate() {
            let number = offset as u32 + 1;
            let geometry = Arc::new(LevelGeometry::from_tiles(asset.tiles, number)?);
            let objects = asset.objects.into_iter().map(|(name, object)| {
                let [x, y, z] = object.pos;
                (name, LevelObject::new(Vec3::new(x, y, z), object.sprite))
            });
            levels.push(Level::new(geometry, objects, number)?);
        }

        Ok(Self { levels })
    }

    /// Parses a campaign from TOML text containing a `[[levels]]` array.
    pub fn from_toml_str(contents: &str) -> Result<Self, LevelError> {
        let file: CampaignFile = toml::from_str(contents)?;
        Self::from_assets(file.levels)
    }

    /// Reads and parses a campaign file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Number of levels in the campaign.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Reports whether the campaign holds no levels. Always `false` once built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Starts a fresh attempt of level 1. Built campaigns are never empty.
    #[must_use]
    pub fn first(&self) -> Level {
        self.levels[0].clone()
    }

    /// Starts a fresh attempt of the level with the provided number.
    ///
    /// Returns `None` once the number runs past the final level.
    #[must_use]
    pub fn start(&self, number: u32) -> Option<Level> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.levels.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use tile_quest_core::{LevelStatus, TilePosition};

    use super::*;

    const TWO_LEVELS: &str = r#"
[[levels]]
tiles = [[[1, 1, 2]]]

[levels.objects.player]
pos = [0.0, 0.0, 0.0]
sprite = "robot-1"

[[levels]]
tiles = [[[1, 2], [1, 0]]]

[levels.objects.player]
pos = [0, 1, 0]
sprite = "robot-1"

[levels.objects.checkpoint]
pos = [1.0, 1.0, 0.0]
sprite = "checkpoint-1"
"#;

    #[test]
    fn parses_levels_in_order() {
        let campaign = Campaign::from_toml_str(TWO_LEVELS).expect("campaign");
        assert_eq!(campaign.len(), 2);

        let first = campaign.start(1).expect("first level");
        assert_eq!(first.level_index(), 1);
        assert!(!first.has_checkpoint());
        assert_eq!(first.geometry().goal(), TilePosition::new(2, 0, 0));

        let second = campaign.start(2).expect("second level");
        assert_eq!(second.level_index(), 2);
        assert!(second.has_checkpoint());
        assert_eq!(second.player_tile(), TilePosition::new(0, 1, 0));
        assert_eq!(second.geometry().goal(), TilePosition::new(1, 0, 0));

        assert!(campaign.start(0).is_none());
        assert!(campaign.start(3).is_none());
    }

    #[test]
    fn attempts_do_not_share_mutable_state() {
        let campaign = Campaign::from_toml_str(TWO_LEVELS).expect("campaign");
        let mut attempt = campaign.start(2).expect("level");
        attempt.apply_action(tile_quest_core::Action::PositiveX);
        assert_eq!(attempt.classify(), LevelStatus::CheckpointReached);

        let fresh = campaign.start(2).expect("level");
        assert_eq!(fresh.step_count(), 0);
        assert!(!fresh.checkpoint_claimed());
        assert_eq!(fresh.player_tile(), TilePosition::new(0, 1, 0));
    }

    #[test]
    fn level_without_player_is_rejected() {
        let contents = r#"
[[levels]]
tiles = [[[2]]]

[levels.objects.checkpoint]
pos = [0.0, 0.0, 0.0]
sprite = "checkpoint-1"
"#;
        let error = Campaign::from_toml_str(contents).unwrap_err();
        assert!(matches!(error, LevelError::MissingPlayer { level: 1 }));
    }

    #[test]
    fn empty_campaign_is_rejected() {
        let error = Campaign::from_toml_str("levels = []").unwrap_err();
        assert!(matches!(error, LevelError::EmptyCampaign));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let error = Campaign::from_toml_str("levels = [[[").unwrap_err();
        assert!(matches!(error, LevelError::Parse(_)));
    }
}
