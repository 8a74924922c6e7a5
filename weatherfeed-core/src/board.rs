use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::scope::Surface;

/// Text shown on the three display surfaces, kept across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub once: String,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub pair: String,
}

impl Board {
    pub fn text(&self, surface: Surface) -> &str {
        match surface {
            Surface::Once => &self.once,
            Surface::Interval => &self.interval,
            Surface::Pair => &self.pair,
        }
    }

    pub fn append(&mut self, surface: Surface, text: &str) {
        let slot = match surface {
            Surface::Once => &mut self.once,
            Surface::Interval => &mut self.interval,
            Surface::Pair => &mut self.pair,
        };
        slot.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        Surface::all().iter().all(|s| self.text(*s).is_empty())
    }

    /// Load a saved board, or an empty one if nothing was saved yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read board file: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse board file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create board directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize board")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write board file: {}", path.display()))
    }
}
