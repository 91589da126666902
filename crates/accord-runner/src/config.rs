use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use accord_core::PartyName;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Party the CLI acts as when `--as` is not given.
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub participants: Vec<String>,
    pub notary: String,
    /// Organisations hidden from `peers`.
    #[serde(default = "default_service_names")]
    pub service_names: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// 0 disables the deadline.
    #[serde(default)]
    pub run_timeout_ms: u64,
}

fn default_service_names() -> Vec<String> {
    vec!["Notary".to_string(), "Network Map Service".to_string()]
}

impl Config {
    pub fn default_for_root() -> Self {
        let participants = vec![
            "O=PartyA,L=London,C=GB".to_string(),
            "O=PartyB,L=New York,C=US".to_string(),
            "O=PartyC,L=Paris,C=FR".to_string(),
        ];
        Self {
            node: NodeConfig {
                name: participants[0].clone(),
            },
            network: NetworkConfig {
                participants,
                notary: "O=Notary,L=London,C=GB".to_string(),
                service_names: default_service_names(),
            },
            storage: StorageConfig {
                data_dir: ".accord/data".to_string(),
            },
            protocol: ProtocolConfig { run_timeout_ms: 30_000 },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse accord.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn participants(&self) -> Vec<PartyName> {
        self.network.participants.iter().map(PartyName::new).collect()
    }

    pub fn notary(&self) -> PartyName {
        PartyName::new(&self.network.notary)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        match self.protocol.run_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// `data_dir` with `~` expanded; relative paths hang off `root`.
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(&self.storage.data_dir).to_string());
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    }

    pub fn key_path(&self, root: &Path, party: &PartyName) -> PathBuf {
        self.data_dir(root).join("keys").join(format!("{}.key", party.slug()))
    }

    pub fn db_path(&self, root: &Path, party: &PartyName) -> PathBuf {
        self.data_dir(root).join("db").join(format!("{}.db", party.slug()))
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".accord").join("accord.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::config_path(dir.path());
        Config::default_for_root().save_to(&path).unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.network.participants.len(), 3);
        assert_eq!(cfg.node.name, "O=PartyA,L=London,C=GB");
        assert_eq!(cfg.run_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_protocol_section_means_no_deadline() {
        let cfg: Config = toml::from_str(
            r#"
            [node]
            name = "O=PartyA"
            [network]
            participants = ["O=PartyA", "O=PartyB"]
            notary = "O=Notary"
            [storage]
            data_dir = "/var/lib/accord"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.run_timeout(), None);
        assert_eq!(cfg.network.service_names, vec!["Notary", "Network Map Service"]);
        assert_eq!(
            cfg.db_path(Path::new("/ignored"), &PartyName::new("O=PartyA")),
            PathBuf::from("/var/lib/accord/db/partya.db")
        );
    }

    #[test]
    fn relative_data_dir_is_under_root() {
        let cfg = Config::default_for_root();
        let key = cfg.key_path(Path::new("/srv/ledger"), &PartyName::new("O=PartyB,L=New York,C=US"));
        assert!(key.starts_with("/srv/ledger/.accord/data/keys"));
    }
}
