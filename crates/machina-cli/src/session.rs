//! World session
//!
//! TigerStyle: One store, one registry environment, explicit save.

use anyhow::{Context, Result};
use machina_core::{IoContext, MachinaConfig};
use machina_registry::RegistryEnv;
use machina_storage::{MemoryStore, WorldSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A loaded world and the registries over it
pub struct Session {
    store: MemoryStore,
    env: Arc<RegistryEnv>,
    path: Option<PathBuf>,
}

impl Session {
    /// Open a session
    ///
    /// The snapshot comes from `world` when given, then from the
    /// configuration; with neither the world starts empty.
    pub fn open(world: Option<&Path>, config: MachinaConfig) -> Result<Self> {
        let path = world
            .map(Path::to_path_buf)
            .or_else(|| config.store.snapshot_path.as_ref().map(PathBuf::from));

        let io = IoContext::production();
        let store = match &path {
            Some(p) => {
                let snapshot = WorldSnapshot::load_json(p)
                    .with_context(|| format!("Failed to load world snapshot {}", p.display()))?;
                info!(
                    path = %p.display(),
                    items = snapshot.items.len(),
                    actors = snapshot.actors.len(),
                    packs = snapshot.packs.len(),
                    "world loaded"
                );
                MemoryStore::from_snapshot(snapshot, io.clone())
            }
            None => MemoryStore::with_io(io.clone()),
        };

        let env = RegistryEnv::new(Arc::new(store.clone()), io, config);
        Ok(Self { store, env, path })
    }

    pub fn env(&self) -> &Arc<RegistryEnv> {
        &self.env
    }

    /// Write the world back to the snapshot it was loaded from
    pub async fn save(&self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .context("No world snapshot to save to; pass --world")?;
        self.store
            .snapshot()
            .await
            .save_json(&path)
            .with_context(|| format!("Failed to save world snapshot {}", path.display()))?;
        info!(path = %path.display(), "world saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_registry::Category;
    use machina_storage::Document;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("machina-cli-{}-{}.json", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_open_without_world_is_empty() {
        let session = Session::open(None, MachinaConfig::default()).unwrap();
        let items = session
            .env()
            .world()
            .get_cat(Category::MechWeapon)
            .raw_map()
            .await
            .unwrap();
        assert!(items.is_empty());
        assert!(session.save().await.is_err());
    }

    #[tokio::test]
    async fn test_open_and_save_round_trip() {
        let path = temp_path("round-trip");
        let snapshot = WorldSnapshot {
            items: vec![Document {
                id: "w1".into(),
                name: "Rifle".into(),
                img: String::new(),
                doc_type: "mech_weapon".into(),
                data: serde_json::json!({"lid": "mw_rifle", "name": "Rifle"}),
                owner: None,
            }],
            ..Default::default()
        };
        snapshot.save_json(&path).unwrap();

        let session = Session::open(Some(&path), MachinaConfig::default()).unwrap();
        let world = session.env().world();
        let weapons = world.get_cat(Category::MechWeapon).raw_map().await.unwrap();
        assert_eq!(weapons["w1"].lid(), "mw_rifle");

        assert_eq!(session.save().await.unwrap(), path);
        let reloaded = WorldSnapshot::load_json(&path).unwrap();
        assert_eq!(reloaded.items.len(), 1);

        std::fs::remove_file(&path).ok();
    }
}
