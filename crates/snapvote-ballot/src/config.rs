//! Ballot configuration.
//!
//! Loads the proposal list and reference point of a ballot from a TOML file.

use serde::{Deserialize, Serialize};
use snapvote_types::ProposalName;
use std::collections::HashSet;
use std::path::Path;

/// Ballot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotConfig {
    /// Proposal labels in ballot order
    pub proposals: Vec<String>,
    /// Issuance point voting power is read at
    pub reference_point: u64,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            proposals: vec![
                "Chocolate".to_string(),
                "Vanilla".to_string(),
                "Lemon".to_string(),
            ],
            reference_point: 0,
        }
    }
}

impl BallotConfig {
    /// Load configuration from file.
    /// Paths containing `..` are rejected.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: BallotConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        check_path(path)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.proposals.is_empty() {
            anyhow::bail!("At least one proposal is required");
        }

        let mut seen = HashSet::new();
        for label in &self.proposals {
            ProposalName::new(label)
                .map_err(|e| anyhow::anyhow!("Invalid proposal '{}': {}", label, e))?;
            if !seen.insert(label.as_str()) {
                anyhow::bail!("Duplicate proposal '{}'", label);
            }
        }

        Ok(())
    }

    /// Encoded proposal labels, ready for ballot construction.
    pub fn proposal_names(&self) -> anyhow::Result<Vec<ProposalName>> {
        self.proposals
            .iter()
            .map(|label| {
                ProposalName::new(label)
                    .map_err(|e| anyhow::anyhow!("Invalid proposal '{}': {}", label, e))
            })
            .collect()
    }
}

fn check_path(path: &Path) -> anyhow::Result<()> {
    if path.to_string_lossy().contains("..") {
        anyhow::bail!("Invalid path: directory traversal detected");
    }
    Ok(())
}
