use std::path::Path;
use std::sync::Arc;

use accord_core::PartyName;
use accord_protocol::{KeyPairSigner, LocalNetwork};
use accord_storage::RecordStore;
use accord_storage_sqlite::SqliteRecordStore;
use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::Config;

/// Reads the party's key seed, creating and persisting a fresh one on first use.
pub fn load_or_create_key(path: &Path, name: &PartyName) -> Result<KeyPairSigner> {
    if path.exists() {
        return load_key(path, name);
    }
    let signer = KeyPairSigner::generate(name.clone());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, signer.seed_hex()).with_context(|| format!("write {}", path.display()))?;
    info!(party = %name, path = %path.display(), "generated key");
    Ok(signer)
}

pub fn load_key(path: &Path, name: &PartyName) -> Result<KeyPairSigner> {
    let seed = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    KeyPairSigner::from_seed_hex(name.clone(), &seed).with_context(|| format!("parse key {}", path.display()))
}

/// Every configured participant on one in-process network, each with its own
/// sqlite store under the data dir.
pub fn open_network(root: &Path, cfg: &Config) -> Result<LocalNetwork> {
    let notary = cfg.notary();
    let mut net = LocalNetwork::new(load_or_create_key(&cfg.key_path(root, &notary), &notary)?)?;
    for name in cfg.participants() {
        let signer = load_or_create_key(&cfg.key_path(root, &name), &name)?;
        let db = cfg.db_path(root, &name);
        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::open(&db).with_context(|| format!("open store for {name}"))?);
        debug!(party = %name, db = %db.display(), "joined network");
        net.join(signer, store)?;
    }
    Ok(net)
}

/// Resolve `--as`, falling back to the configured node.
pub fn acting_party(cfg: &Config, acting_as: Option<&str>) -> Result<PartyName> {
    let name = PartyName::new(acting_as.unwrap_or(&cfg.node.name));
    if cfg.participants().contains(&name) {
        Ok(name)
    } else {
        Err(anyhow!("{name} is not a participant of this network"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_protocol::Signer;

    #[test]
    fn key_is_created_once_then_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("partya.key");
        let name = PartyName::new("O=PartyA");
        let first = load_or_create_key(&path, &name).unwrap();
        let second = load_or_create_key(&path, &name).unwrap();
        assert_eq!(first.identity(), second.identity());
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.key");
        std::fs::write(&path, "not hex").unwrap();
        assert!(load_key(&path, &PartyName::new("O=PartyA")).is_err());
    }

    #[test]
    fn acting_party_must_be_a_participant() {
        let cfg = Config::default_for_root();
        assert_eq!(acting_party(&cfg, None).unwrap().as_str(), "O=PartyA,L=London,C=GB");
        assert!(acting_party(&cfg, Some("O=PartyB,L=New York,C=US")).is_ok());
        assert!(acting_party(&cfg, Some("O=Notary,L=London,C=GB")).is_err());
    }
}
