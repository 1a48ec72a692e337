use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

/// Root of `versions.json`.
#[derive(Debug, Default, Deserialize)]
pub struct VersionList {
    pub list: Option<Vec<VersionInfo>>,
}

/// One game version, or a group of videos inside it.
///
/// `key` and `encAudio` are inherited by nested groups that do not set them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: Option<String>,
    pub videos: Option<Vec<String>>,
    pub video_groups: Option<Vec<VersionInfo>>,
    pub key: Option<u64>,
    pub enc_audio: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionEntry {
    pub key: u64,
    pub enc_audio: bool,
}

/// Video name to version key lookup.
#[derive(Debug, Default)]
pub struct VersionMap(HashMap<String, VersionEntry>);

impl VersionMap {
    /// Loads `path`. A missing file or an empty list is logged and gives an empty map.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!("File not found: {}", path.display());
            return Ok(Self::default());
        }

        let data = fs::read(path).with_context(|| format!("could not read {}", path.display()))?;
        let versions = serde_json::from_slice::<VersionList>(&data)
            .with_context(|| format!("could not deserialize {}", path.display()))?;

        match versions.list {
            Some(list) => {
                let map = Self::from_list(&list);
                log::debug!("loaded {} video keys from {}", map.len(), path.display());
                Ok(map)
            }
            None => {
                log::error!("No version info loaded");
                Ok(Self::default())
            }
        }
    }

    pub fn from_list(list: &[VersionInfo]) -> Self {
        let mut map = Self::default();
        map.flatten(list, 0, false);
        map
    }

    fn flatten(&mut self, versions: &[VersionInfo], key: u64, enc_audio: bool) {
        for version in versions {
            let key = version.key.unwrap_or(key);
            let enc_audio = version.enc_audio.unwrap_or(enc_audio);

            if let Some(name) = &version.version {
                log::trace!("version {} uses key {:#x}", name, key);
            }

            for video in version.videos.iter().flatten() {
                self.0.insert(video.clone(), VersionEntry { key, enc_audio });
            }

            if let Some(groups) = &version.video_groups {
                self.flatten(groups, key, enc_audio);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<VersionEntry> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
