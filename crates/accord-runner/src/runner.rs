use std::path::{Path, PathBuf};

use accord_protocol::LocalNetwork;
use accord_storage_sqlite::SqliteRecordStore;
use anyhow::{anyhow, Result};

use crate::network::{acting_party, load_or_create_key, open_network};
use crate::{doctor::doctor, Api, Config};

/// A root directory holding `accord.toml`, party keys and per-party stores,
/// opened as one in-process network.
pub struct Runner {
    pub root: PathBuf,
    pub cfg: Config,
    pub network: LocalNetwork,
}

impl Runner {
    /// Writes a default config if none exists, then creates every missing key
    /// and store. Existing keys are kept.
    pub fn init(root: &Path) -> Result<Config> {
        let cfg_path = Config::config_path(root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let cfg = Config::default_for_root();
            cfg.save_to(&cfg_path)?;
            cfg
        };
        let notary = cfg.notary();
        load_or_create_key(&cfg.key_path(root, &notary), &notary)?;
        for name in cfg.participants() {
            load_or_create_key(&cfg.key_path(root, &name), &name)?;
            // creates and migrates the database
            let _ = SqliteRecordStore::open(&cfg.db_path(root, &name))?;
        }
        Ok(cfg)
    }

    pub fn load_config(root: &Path) -> Result<Config> {
        let cfg_path = Config::config_path(root);
        if !cfg_path.exists() {
            return Err(anyhow!("{} not found; run `accord init`", cfg_path.display()));
        }
        Config::load_from(&cfg_path)
    }

    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg = Self::load_config(&root)?;
        let network = open_network(&root, &cfg)?;
        Ok(Self { root, cfg, network })
    }

    pub fn doctor(&self) -> Result<()> {
        doctor(&self.root, &self.cfg)
    }

    /// Façade for the party named by `acting_as`, or the configured node.
    pub fn api(&self, acting_as: Option<&str>) -> Result<Api> {
        let name = acting_party(&self.cfg, acting_as)?;
        let node = self
            .network
            .node(&name)
            .ok_or_else(|| anyhow!("{name} has not joined the network"))?;
        Ok(Api::new(node, self.cfg.network.service_names.clone(), self.cfg.run_timeout()))
    }
}
