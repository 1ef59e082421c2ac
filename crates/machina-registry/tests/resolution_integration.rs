//! Integration tests for registry resolution and hydration
//!
//! TigerStyle: End-to-end against the in-memory host store.

mod common;

use common::*;
use machina_core::MachinaConfig;
use machina_registry::model::{DeployableData, MechData, PilotData};
use machina_registry::{
    Category, DocumentKind, DropPayload, DropResolver, Fetched, HostDocument, OpCtx, RawData,
    RegRef,
};
use machina_storage::{DocumentStore, Scope};
use std::sync::Arc;

// =============================================================================
// Idempotence and cycles
// =============================================================================

#[tokio::test]
async fn test_same_ref_twice_yields_same_instance() {
    let fx = Fixture::new();
    let world = fx.world();
    let entry = fx.create(&world, weapon("mw_rifle", "Rifle")).await;
    let r = reference(&entry, &world);

    let ctx = OpCtx::new();
    let a = world.resolve(&ctx, &r).await.unwrap();
    let b = world.resolve(&ctx, &r).await.unwrap();
    let c = world.get_cat(Category::MechWeapon).get_live(&ctx, &entry.id).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &c));
    assert_eq!(ctx.len(), 1);

    // A separate operation hydrates its own copy
    let other = OpCtx::new();
    let d = world.resolve(&other, &r).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &d));
    assert_eq!(a.raw().await, d.raw().await);
}

#[tokio::test]
async fn test_mutual_references_terminate() {
    let fx = Fixture::new();
    let world = fx.world();
    let pilot_entry = fx.create(&world, pilot("Ace")).await;
    let mech_entry = fx.create(&world, mech("Everest")).await;
    let pilot_ref = reference(&pilot_entry, &world);
    let mech_ref = reference(&mech_entry, &world);

    fx.rewrite(
        &world,
        pilot_entry.clone(),
        RawData::Pilot(PilotData {
            name: "Ace".into(),
            mechs: vec![mech_ref.clone()],
            active_mech: Some(mech_ref.clone()),
            ..Default::default()
        }),
    )
    .await;
    fx.rewrite(
        &world,
        mech_entry.clone(),
        RawData::Mech(MechData {
            name: "Everest".into(),
            pilot: Some(pilot_ref.clone()),
            ..Default::default()
        }),
    )
    .await;

    let ctx = OpCtx::new();
    let ace = world
        .get_cat(Category::Pilot)
        .get_live(&ctx, &pilot_entry.id)
        .await
        .unwrap();
    assert!(ace.is_ready());
    assert_eq!(ctx.len(), 2);

    let everest = ace.link("active_mech").unwrap();
    assert!(everest.is_ready());
    assert_eq!(everest.id(), mech_entry.id);
    assert!(Arc::ptr_eq(&ace.link("mechs[0]").unwrap(), &everest));
    assert!(Arc::ptr_eq(&everest.link("pilot").unwrap(), &ace));

    // Entering the cycle from the other side reuses both instances
    let again = world.resolve(&ctx, &mech_ref).await.unwrap();
    assert!(Arc::ptr_eq(&again, &everest));
}

#[tokio::test]
async fn test_self_reference_terminates() {
    let fx = Fixture::new();
    let world = fx.world();
    let entry = fx.create(&world, RawData::default_for(Category::Deployable)).await;
    let self_ref = reference(&entry, &world);
    fx.rewrite(
        &world,
        entry.clone(),
        RawData::Deployable(DeployableData {
            name: "Turret".into(),
            deployer: Some(self_ref.clone()),
            hp: 5,
            ..Default::default()
        }),
    )
    .await;

    let ctx = OpCtx::new();
    let turret = world.resolve(&ctx, &self_ref).await.unwrap();
    assert!(Arc::ptr_eq(&turret.link("deployer").unwrap(), &turret));
}

#[tokio::test]
async fn test_dropping_ctx_releases_links() {
    let fx = Fixture::new();
    let world = fx.world();
    let tags = fx.library();
    fx.create(&tags, tag("tg_loading", "Loading")).await;
    let entry = fx.create(&world, tagged_weapon("mw_cannon", "tg_loading")).await;

    let ctx = OpCtx::new();
    let cannon = world
        .get_cat(Category::MechWeapon)
        .get_live(&ctx, &entry.id)
        .await
        .unwrap();
    assert!(cannon.link("tags[0].tag").is_some());

    drop(ctx);
    assert!(cannon.link("tags[0].tag").is_none());
    assert!(cannon.links()[0].1.is_resolved());
}

// =============================================================================
// Cross-registry resolution
// =============================================================================

#[tokio::test]
async fn test_serialized_ref_resolves_from_other_registry() {
    let fx = Fixture::new();
    let library = fx.library();
    let entry = fx.create(&library, weapon("mw_howitzer", "Howitzer")).await;

    let ctx = OpCtx::new();
    let original = library
        .get_cat(Category::MechWeapon)
        .get_live(&ctx, &entry.id)
        .await
        .unwrap();
    let json = serde_json::to_string(&original.reg_ref()).unwrap();

    let parsed: RegRef = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.registry_name, "library|library");

    let world = fx.world();
    let fresh = OpCtx::new();
    let revived = world.resolve(&fresh, &parsed).await.unwrap();
    assert_eq!(revived.registry().name(), "library|library");
    assert_eq!(revived.raw().await, entry.raw);
}

#[tokio::test]
async fn test_inventory_ref_resolves_via_owner_lookup() {
    let fx = Fixture::new();
    let world = fx.world();
    let owner = fx.create(&world, pilot("Owner")).await;
    let inventory = world.inventory_of(Category::Pilot, &owner.id).unwrap();
    assert_eq!(inventory.name(), format!("world_inv:{}|world", owner.id));

    let item = fx.create(&inventory, gear("pg_flare", 1, 1)).await;
    let r = reference(&item, &inventory);

    let ctx = OpCtx::new();
    let revived = fx.library().resolve(&ctx, &r).await.unwrap();
    assert_eq!(revived.raw().await, item.raw);
    assert_eq!(revived.doc().await.owner.as_deref(), Some(owner.id.as_str()));

    // The item is not visible in the world item collection
    let fresh = OpCtx::new();
    assert!(world
        .resolve(&fresh, &RegRef::new(item.id.clone(), Category::PilotGear, "world|world", ""))
        .await
        .is_none());
}

#[tokio::test]
async fn test_nested_ref_crosses_into_library() {
    let fx = Fixture::new();
    let world = fx.world();
    fx.create(&fx.library(), tag("tg_heat_self", "Heat (Self)")).await;
    let owner = fx.create(&world, mech("Sagarmatha")).await;
    let inventory = world.inventory_of(Category::Mech, &owner.id).unwrap();
    let item = fx.create(&inventory, tagged_weapon("mw_plasma", "tg_heat_self")).await;

    let ctx = OpCtx::new();
    let plasma = inventory
        .get_cat(Category::MechWeapon)
        .get_live(&ctx, &item.id)
        .await
        .unwrap();
    let heat = plasma.link("tags[0].tag").unwrap();
    assert_eq!(heat.category(), Category::Tag);
    assert_eq!(heat.registry().name(), "library|library");
    assert_eq!(heat.name().await, "Heat (Self)");
}

#[tokio::test]
async fn test_fallback_key_resolution() {
    let fx = Fixture::new();
    let library = fx.library();
    let entry = fx.create(&library, weapon("mw_railgun", "Railgun")).await;
    let ctx = OpCtx::new();

    // Stale id, valid stable id
    let stale = RegRef::new("reimported00000", Category::MechWeapon, "library|library", "mw_railgun");
    let found = library.resolve(&ctx, &stale).await.unwrap();
    assert_eq!(found.id(), entry.id);

    // Display name as key, category unknown
    let by_name = RegRef {
        id: "gone".into(),
        category: None,
        registry_name: "library|library".into(),
        fallback_key: "Railgun".into(),
    };
    let found = fx.world().resolve(&ctx, &by_name).await.unwrap();
    assert_eq!(found.id(), entry.id);

    // No fallback, no result
    let hopeless = RegRef::new("gone", Category::MechWeapon, "library|library", "");
    assert!(library.resolve(&ctx, &hopeless).await.is_none());

    // Wrong category is a miss even with a matching key
    let wrong = RegRef::new("gone", Category::Tag, "library|library", "mw_railgun");
    assert!(library.resolve(&ctx, &wrong).await.is_none());
}

#[tokio::test]
async fn test_unresolvable_targets_are_absent() {
    let fx = Fixture::new();
    let world = fx.world();
    let ctx = OpCtx::new();

    let missing_owner = RegRef::new("x", Category::MechWeapon, "world_inv:nobody|world", "");
    assert!(world.resolve(&ctx, &missing_owner).await.is_none());

    let garbage = RegRef::new("x", Category::MechWeapon, "not a registry", "");
    assert!(world.resolve(&ctx, &garbage).await.is_none());

    // A record with a dangling reference still hydrates
    let entry = fx.create(&world, tagged_weapon("mw_gun", "tg_missing")).await;
    let gun = world
        .get_cat(Category::MechWeapon)
        .get_live(&ctx, &entry.id)
        .await
        .unwrap();
    assert!(gun.is_ready());
    assert!(gun.link("tags[0].tag").is_none());
    assert!(!gun.links()[0].1.is_resolved());
}

// =============================================================================
// Registry switching
// =============================================================================

#[tokio::test]
async fn test_switch_reg() {
    let fx = Fixture::new();
    let world = fx.world();
    let owner = fx.create(&world, pilot("Switch")).await;
    let name = format!("world_inv:{}|world", owner.id);

    let reg = world.switch_reg(&name).await.unwrap();
    assert_eq!(reg.name(), name);
    assert!(Arc::ptr_eq(
        world.env(),
        fx.world().switch_reg(&name).await.unwrap().env()
    ));
    assert_eq!(fx.env.registry_cache().hits(), 1);

    assert!(world.switch_reg("world_inv:nobody|world").await.is_none());
    assert!(world.switch_reg("world|world|world").await.is_none());
    assert!(world.switch_reg("").await.is_none());
    assert_eq!(world.switch_reg("world|world").await.unwrap().name(), "world|world");
}

#[tokio::test]
async fn test_switch_reg_without_cache() {
    let mut config = MachinaConfig::default();
    config.cache.registry_cache_enabled = false;
    let fx = Fixture::with_config(config);
    let owner = fx.create(&fx.world(), pilot("NoCache")).await;
    let name = format!("world_inv:{}|world", owner.id);

    assert!(fx.env.switch_reg(&name).await.is_some());
    assert!(fx.env.switch_reg(&name).await.is_some());
    assert!(fx.env.registry_cache().is_empty());

    fx.world().get_cat(Category::Pilot).delete_id(&owner.id).await.unwrap();
    assert!(fx.env.switch_reg(&name).await.is_none());
}

#[tokio::test]
async fn test_token_registry_follows_active_scene() {
    let fx = Fixture::new();
    let world = fx.world();
    let actor = fx.create(&world, mech("Token Source")).await;
    let inventory = world.inventory_of(Category::Mech, &actor.id).unwrap();
    fx.create(&inventory, weapon("mw_knife", "Knife")).await;

    fx.store.add_scene("s1", "Bridge").await;
    fx.store.set_active_scene(Some("s1")).await;
    let token = fx.store.spawn_token("s1", &actor.id).await.unwrap();
    let name = format!("token_inv:{}|world", token.id);

    let reg = fx.env.switch_reg(&name).await.unwrap();
    let ctx = OpCtx::new();
    let knives = reg.get_cat(Category::MechWeapon).list_live(&ctx).await;
    assert_eq!(knives.len(), 1);
    assert_eq!(knives[0].registry().name(), name);

    fx.store.set_active_scene(None).await;
    assert!(fx.env.switch_reg(&name).await.is_none());
    assert!(reg
        .get_cat(Category::MechWeapon)
        .list_live(&OpCtx::new())
        .await
        .is_empty());
}

// =============================================================================
// Accessor operations
// =============================================================================

#[tokio::test]
async fn test_accessor_crud() {
    let fx = Fixture::new();
    let world = fx.world();
    let weapons = world.get_cat(Category::MechWeapon);
    let ctx = OpCtx::new();

    let made = weapons
        .create_many_live(&ctx, vec![weapon("mw_a", "A"), weapon("mw_b", "B")])
        .await
        .unwrap();
    assert_eq!(made.len(), 2);
    let blank = weapons.create_default(&ctx).await.unwrap();
    assert_eq!(blank.name().await, "New Weapon");

    let map = weapons.raw_map().await.unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map[made[0].id()].lid(), "mw_a");
    assert_eq!(weapons.list_live(&ctx).await.len(), 3);
    assert_eq!(ctx.len(), 3);

    let found = weapons.lookup_raw(|raw| raw.lid() == "mw_b").await.unwrap().unwrap();
    assert_eq!(found.id, made[1].id());

    let removed = weapons.delete_id(blank.id()).await.unwrap().unwrap();
    assert_eq!(removed.name(), "New Weapon");
    assert!(weapons.get_raw(blank.id()).await.unwrap().is_none());

    // Records of another category are rejected
    let err = weapons.create_many_raw(vec![tag("tg_x", "X")]).await.unwrap_err();
    assert!(err.to_string().contains("mech_weapon"));
}

#[tokio::test]
async fn test_wrap_doc() {
    let fx = Fixture::new();
    let world = fx.world();
    let entry = fx.create(&world, weapon("mw_w", "Wrapped")).await;
    let doc = fx
        .store
        .get(&Scope::Items, &entry.id)
        .await
        .unwrap()
        .unwrap();

    let ctx = OpCtx::new();
    let live = world
        .get_cat(Category::MechWeapon)
        .wrap_doc(&ctx, doc.clone())
        .await
        .unwrap();
    assert_eq!(live.id(), entry.id);
    assert!(world.get_cat(Category::Tag).wrap_doc(&ctx, doc).await.is_none());
}

#[tokio::test]
async fn test_save_and_staleness() {
    let fx = Fixture::new();
    let world = fx.world();
    let entry = fx.create(&world, weapon("mw_s", "Before")).await;
    let r = reference(&entry, &world);

    let ctx = OpCtx::new();
    let live = world.resolve(&ctx, &r).await.unwrap();
    live.rename("After").await;
    live.modify(|raw| {
        if let RawData::MechWeapon(w) = raw {
            w.destroyed = true;
        }
    })
    .await;

    // Not persisted until saved
    let untouched = world.resolve(&OpCtx::new(), &r).await.unwrap();
    assert_eq!(untouched.name().await, "Before");

    live.save().await.unwrap();
    let fresh = world.resolve(&OpCtx::new(), &r).await.unwrap();
    assert_eq!(fresh.name().await, "After");
    assert_eq!(fresh.doc().await.name, "After");
    assert!(matches!(fresh.raw().await, RawData::MechWeapon(w) if w.destroyed));

    // The earlier handle is a stale snapshot until re-resolved
    assert_eq!(untouched.name().await, "Before");
}

#[tokio::test]
async fn test_library_index_serves_repeat_reads() {
    let fx = Fixture::new();
    let library = fx.library();
    for i in 0..5 {
        fx.create(&library, tag(&format!("tg_{}", i), &format!("Tag {}", i))).await;
    }

    for _ in 0..3 {
        let ctx = OpCtx::new();
        assert_eq!(library.get_cat(Category::Tag).list_live(&ctx).await.len(), 5);
    }
    // Another registry value with the same name shares the index
    assert_eq!(fx.env.library().get_cat(Category::Tag).raw_map().await.unwrap().len(), 5);
    assert_eq!(fx.store.stats().lists_pack, 1);
}

// =============================================================================
// Drops
// =============================================================================

#[tokio::test]
async fn test_drop_resolver_answers_synchronously_once_known() {
    let fx = Fixture::new();
    let library = fx.library();
    let entry = fx.create(&library, weapon("mw_drop", "Dropped")).await;
    let payload = DropPayload::Ref(reference(&entry, &library));
    let resolver = DropResolver::new(fx.env.clone());

    assert!(resolver.sync_check(&payload).is_pending());
    assert!(resolver.accepts(&payload, &[Category::Tag]));

    let summary = resolver.resolve(&payload).await.unwrap();
    assert_eq!(summary.category, Category::MechWeapon);
    assert_eq!(summary.name, "Dropped");

    match resolver.sync_check(&payload) {
        Fetched::Ready(Some(s)) => assert_eq!(s.reference.id, entry.id),
        other => panic!("expected ready summary, got {:?}", other),
    }
    assert!(resolver.accepts(&payload, &[Category::MechWeapon]));
    assert!(!resolver.accepts(&payload, &[Category::Tag]));
}

#[tokio::test]
async fn test_drop_resolver_host_document() {
    let fx = Fixture::new();
    let world = fx.world();
    let owner = fx.create(&world, pilot("Dropper")).await;
    let inventory = world.inventory_of(Category::Pilot, &owner.id).unwrap();
    let item = fx.create(&inventory, gear("pg_kit", 1, 1)).await;

    let payload = DropPayload::Document(HostDocument {
        document_kind: DocumentKind::Item,
        id: item.id.clone(),
        pack: None,
        actor_id: Some(owner.id.clone()),
        token_id: None,
    });
    let resolver = DropResolver::new(fx.env.clone());
    let summary = resolver.resolve(&payload).await.unwrap();
    assert_eq!(summary.category, Category::PilotGear);
    assert_eq!(summary.reference.registry_name, inventory.name());

    let ctx = OpCtx::new();
    let live = resolver.resolve_live(&ctx, &payload).await.unwrap();
    assert_eq!(live.id(), item.id);

    // Declared as an actor but the record is an item
    let mislabeled = DropPayload::Document(HostDocument {
        document_kind: DocumentKind::Actor,
        id: item.id.clone(),
        pack: None,
        actor_id: Some(owner.id.clone()),
        token_id: None,
    });
    assert!(resolver.resolve(&mislabeled).await.is_none());
}

#[tokio::test]
async fn test_drop_resolver_flush_sees_changes() {
    let fx = Fixture::new();
    let world = fx.world();
    let entry = fx.create(&world, weapon("mw_f", "First")).await;
    let payload = DropPayload::Ref(reference(&entry, &world));
    let resolver = DropResolver::new(fx.env.clone());

    assert_eq!(resolver.resolve(&payload).await.unwrap().name, "First");
    let ctx = OpCtx::new();
    let live = world.resolve(&ctx, &payload.to_ref()).await.unwrap();
    live.rename("Second").await;
    live.save().await.unwrap();

    assert_eq!(resolver.resolve(&payload).await.unwrap().name, "First");
    resolver.flush(&payload);
    assert_eq!(resolver.resolve(&payload).await.unwrap().name, "Second");

    // Expiry also forces a refetch
    world.get_cat(Category::MechWeapon).delete_id(&entry.id).await.unwrap();
    fx.clock.advance(fx.env.config().cache.fetch_timeout_ms + 1);
    assert!(resolver.resolve(&payload).await.is_none());
}
