//! Shared fixtures for registry integration tests

#![allow(dead_code)]

use machina_core::{IoContext, MachinaConfig, ManualClock};
use machina_registry::model::{GearData, LicenseData, MechData, PilotData, TagData, WeaponData};
use machina_registry::{Category, RawData, RegEntry, RegRef, Registry, RegistryEnv, TagInstance};
use machina_storage::MemoryStore;
use std::sync::Arc;

pub struct Fixture {
    pub store: MemoryStore,
    pub env: Arc<RegistryEnv>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(MachinaConfig::default())
    }

    pub fn with_config(config: MachinaConfig) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let io = IoContext::deterministic(42, clock.clone());
        let store = MemoryStore::with_io(io.clone());
        let env = RegistryEnv::new(Arc::new(store.clone()), io, config);
        Self { store, env, clock }
    }

    pub fn world(&self) -> Registry {
        self.env.world()
    }

    pub fn library(&self) -> Registry {
        self.env.library()
    }

    /// Create one record and return its entry
    pub async fn create(&self, registry: &Registry, raw: RawData) -> RegEntry {
        let category = raw.category();
        registry
            .get_cat(category)
            .create_many_raw(vec![raw])
            .await
            .expect("create")
            .remove(0)
    }

    /// Persist a changed raw record for an existing entry
    pub async fn rewrite(&self, registry: &Registry, mut entry: RegEntry, raw: RawData) {
        entry.raw = raw;
        let category = entry.category();
        registry
            .get_cat(category)
            .update_raw(vec![entry])
            .await
            .expect("update");
    }
}

pub fn reference(entry: &RegEntry, registry: &Registry) -> RegRef {
    RegRef::to(entry, registry)
}

pub fn weapon(lid: &str, name: &str) -> RawData {
    RawData::MechWeapon(WeaponData {
        lid: lid.into(),
        name: name.into(),
        mount: "main".into(),
        damage: "1d6".into(),
        uses: 2,
        max_uses: 2,
        loaded: true,
        ..Default::default()
    })
}

pub fn tagged_weapon(lid: &str, tag_lid: &str) -> RawData {
    RawData::MechWeapon(WeaponData {
        lid: lid.into(),
        name: lid.to_uppercase(),
        tags: vec![TagInstance {
            tag: RegRef::by_lid(Category::Tag, tag_lid, "library|library"),
            value: None,
        }],
        ..Default::default()
    })
}

pub fn tag(lid: &str, name: &str) -> RawData {
    RawData::Tag(TagData {
        lid: lid.into(),
        name: name.into(),
        ..Default::default()
    })
}

pub fn gear(lid: &str, uses: u32, max_uses: u32) -> RawData {
    RawData::PilotGear(GearData {
        lid: lid.into(),
        name: lid.to_uppercase(),
        uses,
        max_uses,
        ..Default::default()
    })
}

pub fn license(lid: &str, rank: u8) -> RawData {
    RawData::License(LicenseData {
        lid: lid.into(),
        name: lid.to_uppercase(),
        rank,
        ..Default::default()
    })
}

pub fn pilot(name: &str) -> RawData {
    RawData::Pilot(PilotData {
        lid: format!("pilot_{}", name.to_lowercase()),
        name: name.into(),
        callsign: name.to_uppercase(),
        ..Default::default()
    })
}

pub fn mech(name: &str) -> RawData {
    RawData::Mech(MechData {
        lid: format!("mech_{}", name.to_lowercase()),
        name: name.into(),
        current_hp: 10,
        ..Default::default()
    })
}
