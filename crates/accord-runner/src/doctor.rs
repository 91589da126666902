use std::collections::HashSet;
use std::path::Path;

use accord_validate::parse_party_name;
use anyhow::{anyhow, Result};

use crate::network::load_key;
use crate::Config;

pub fn doctor(root: &Path, cfg: &Config) -> Result<()> {
    if cfg.network.participants.len() < 2 {
        return Err(anyhow!("network needs at least two participants"));
    }

    let mut names = HashSet::new();
    let mut slugs = HashSet::new();
    for raw in &cfg.network.participants {
        let name = parse_party_name(raw).map_err(|e| anyhow!("participant {raw:?}: {e}"))?;
        if !names.insert(name.clone()) {
            return Err(anyhow!("participant {name} listed twice"));
        }
        // key and db files are named by slug
        if !slugs.insert(name.slug()) {
            return Err(anyhow!("participant {name} collides with another participant's file name"));
        }
    }

    let notary = parse_party_name(&cfg.network.notary).map_err(|e| anyhow!("notary: {e}"))?;
    if names.contains(&notary) || slugs.contains(&notary.slug()) {
        return Err(anyhow!("notary {notary} must not also be a participant"));
    }

    let node = parse_party_name(&cfg.node.name).map_err(|e| anyhow!("node name: {e}"))?;
    if !names.contains(&node) {
        return Err(anyhow!("node {node} is not one of the network participants"));
    }

    for name in names.iter().chain(std::iter::once(&notary)) {
        let path = cfg.key_path(root, name);
        if !path.exists() {
            return Err(anyhow!("no key for {name} at {}; run `accord init`", path.display()));
        }
        load_key(&path, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runner;

    #[test]
    fn initialized_root_passes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Runner::init(dir.path()).unwrap();
        doctor(dir.path(), &cfg).unwrap();
    }

    #[test]
    fn missing_keys_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = doctor(dir.path(), &Config::default_for_root()).unwrap_err();
        assert!(err.to_string().contains("run `accord init`"));
    }

    #[test]
    fn notary_cannot_participate() {
        let mut cfg = Config::default_for_root();
        cfg.network.notary = cfg.network.participants[1].clone();
        let err = doctor(Path::new("/nonexistent"), &cfg).unwrap_err();
        assert!(err.to_string().contains("must not also be a participant"));
    }

    #[test]
    fn node_must_be_a_participant() {
        let mut cfg = Config::default_for_root();
        cfg.node.name = "O=Elsewhere,C=DE".to_string();
        let err = doctor(Path::new("/nonexistent"), &cfg).unwrap_err();
        assert!(err.to_string().contains("is not one of the network participants"));
    }

    #[test]
    fn duplicate_and_malformed_names_fail() {
        let mut cfg = Config::default_for_root();
        cfg.network.participants.push(cfg.network.participants[0].clone());
        assert!(doctor(Path::new("/nonexistent"), &cfg).is_err());

        let mut cfg = Config::default_for_root();
        cfg.network.participants.push("L=London,C=GB".to_string());
        let err = doctor(Path::new("/nonexistent"), &cfg).unwrap_err();
        assert!(err.to_string().contains("participant"));
    }
}
