//! Entity categories and raw records
//!
//! TigerStyle: Closed category set, one typed payload per category.
//!
//! A raw record is the as-stored form of an entity. It carries no behavior
//! beyond enumerating the references it holds, so that hydration and
//! insinuation can walk them without knowing each payload's layout.

use crate::reference::RegRef;
use machina_core::{Error, Result, LIBRARY_PACK_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Category
// =============================================================================

/// Kind of entity stored by a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pilot,
    Mech,
    Deployable,
    Frame,
    MechWeapon,
    MechSystem,
    PilotGear,
    Tag,
    License,
    Talent,
    Skill,
    CoreBonus,
}

impl Category {
    /// Every category, actors first
    pub const ALL: [Category; 12] = [
        Category::Pilot,
        Category::Mech,
        Category::Deployable,
        Category::Frame,
        Category::MechWeapon,
        Category::MechSystem,
        Category::PilotGear,
        Category::Tag,
        Category::License,
        Category::Talent,
        Category::Skill,
        Category::CoreBonus,
    ];

    /// Wire tag, also used as the document type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pilot => "pilot",
            Self::Mech => "mech",
            Self::Deployable => "deployable",
            Self::Frame => "frame",
            Self::MechWeapon => "mech_weapon",
            Self::MechSystem => "mech_system",
            Self::PilotGear => "pilot_gear",
            Self::Tag => "tag",
            Self::License => "license",
            Self::Talent => "talent",
            Self::Skill => "skill",
            Self::CoreBonus => "core_bonus",
        }
    }

    /// Whether entities of this category are actors (owners of inventories)
    pub fn is_actor(&self) -> bool {
        matches!(self, Self::Pilot | Self::Mech | Self::Deployable)
    }

    /// Position in [`Category::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Library pack holding templates of this category
    pub fn pack_name(&self) -> String {
        format!("{}.{}", LIBRARY_PACK_PREFIX, self.as_str())
    }

    /// Portrait used when a record is created without one
    pub fn default_img(&self) -> String {
        format!("systems/machina/assets/icons/{}.svg", self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory {
                category: s.to_string(),
            })
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// A tag attached to equipment, with an optional parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagInstance {
    pub tag: RegRef,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotData {
    pub lid: String,
    pub name: String,
    pub callsign: String,
    pub background: String,
    pub licenses: Vec<RegRef>,
    pub skills: Vec<RegRef>,
    pub talents: Vec<RegRef>,
    pub core_bonuses: Vec<RegRef>,
    pub loadout: Vec<RegRef>,
    pub mechs: Vec<RegRef>,
    pub active_mech: Option<RegRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechData {
    pub lid: String,
    pub name: String,
    pub frame: Option<RegRef>,
    pub pilot: Option<RegRef>,
    pub weapons: Vec<RegRef>,
    pub systems: Vec<RegRef>,
    pub current_hp: u32,
    pub current_heat: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployableData {
    pub lid: String,
    pub name: String,
    pub deployer: Option<RegRef>,
    pub hp: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameData {
    pub lid: String,
    pub name: String,
    pub source: String,
    pub hp: u32,
    pub armor: u32,
    pub speed: u32,
    pub core_system: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponData {
    pub lid: String,
    pub name: String,
    pub source: String,
    pub license_level: u8,
    pub mount: String,
    pub damage: String,
    pub tags: Vec<TagInstance>,
    pub uses: u32,
    pub max_uses: u32,
    pub loaded: bool,
    pub destroyed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemData {
    pub lid: String,
    pub name: String,
    pub source: String,
    pub license_level: u8,
    pub sp: u32,
    pub tags: Vec<TagInstance>,
    pub uses: u32,
    pub max_uses: u32,
    pub destroyed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearData {
    pub lid: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<TagInstance>,
    pub uses: u32,
    pub max_uses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagData {
    pub lid: String,
    pub name: String,
    pub description: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseData {
    pub lid: String,
    pub name: String,
    pub source: String,
    pub rank: u8,
}

/// Shared shape of talents, skills, and core bonuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureData {
    pub lid: String,
    pub name: String,
    pub description: String,
    pub rank: u8,
}

// =============================================================================
// RawData
// =============================================================================

/// As-stored record of one entity
///
/// The variant always agrees with the category the record is stored under;
/// the category travels separately as the document type.
#[derive(Debug, Clone, PartialEq)]
pub enum RawData {
    Pilot(PilotData),
    Mech(MechData),
    Deployable(DeployableData),
    Frame(FrameData),
    MechWeapon(WeaponData),
    MechSystem(SystemData),
    PilotGear(GearData),
    Tag(TagData),
    License(LicenseData),
    Talent(FeatureData),
    Skill(FeatureData),
    CoreBonus(FeatureData),
}

/// One reference held by a raw record
#[derive(Debug, Clone, PartialEq)]
pub struct RefSlot {
    /// Location within the record, e.g. `loadout[2]` or `tags[0].tag`
    pub path: String,
    /// Whether the target is an owned dependent that travels with its owner
    pub child: bool,
    pub reference: RegRef,
}

fn parse<T: serde::de::DeserializeOwned + Default>(value: serde_json::Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| Error::DeserializationFailed {
        reason: e.to_string(),
    })
}

impl RawData {
    /// Decode a stored payload for the given category
    ///
    /// A `null` payload yields the category's default record.
    pub fn from_parts(category: Category, value: serde_json::Value) -> Result<Self> {
        Ok(match category {
            Category::Pilot => Self::Pilot(parse(value)?),
            Category::Mech => Self::Mech(parse(value)?),
            Category::Deployable => Self::Deployable(parse(value)?),
            Category::Frame => Self::Frame(parse(value)?),
            Category::MechWeapon => Self::MechWeapon(parse(value)?),
            Category::MechSystem => Self::MechSystem(parse(value)?),
            Category::PilotGear => Self::PilotGear(parse(value)?),
            Category::Tag => Self::Tag(parse(value)?),
            Category::License => Self::License(parse(value)?),
            Category::Talent => Self::Talent(parse(value)?),
            Category::Skill => Self::Skill(parse(value)?),
            Category::CoreBonus => Self::CoreBonus(parse(value)?),
        })
    }

    /// Encode the payload for storage
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            Self::Pilot(d) => serde_json::to_value(d),
            Self::Mech(d) => serde_json::to_value(d),
            Self::Deployable(d) => serde_json::to_value(d),
            Self::Frame(d) => serde_json::to_value(d),
            Self::MechWeapon(d) => serde_json::to_value(d),
            Self::MechSystem(d) => serde_json::to_value(d),
            Self::PilotGear(d) => serde_json::to_value(d),
            Self::Tag(d) => serde_json::to_value(d),
            Self::License(d) => serde_json::to_value(d),
            Self::Talent(d) | Self::Skill(d) | Self::CoreBonus(d) => serde_json::to_value(d),
        };
        value.map_err(|e| Error::SerializationFailed {
            reason: e.to_string(),
        })
    }

    /// Blank record of a category
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::Pilot => Self::Pilot(PilotData {
                name: "New Pilot".into(),
                ..Default::default()
            }),
            Category::Mech => Self::Mech(MechData {
                name: "New Mech".into(),
                ..Default::default()
            }),
            Category::Deployable => Self::Deployable(DeployableData {
                name: "New Deployable".into(),
                ..Default::default()
            }),
            Category::Frame => Self::Frame(FrameData {
                name: "New Frame".into(),
                ..Default::default()
            }),
            Category::MechWeapon => Self::MechWeapon(WeaponData {
                name: "New Weapon".into(),
                loaded: true,
                ..Default::default()
            }),
            Category::MechSystem => Self::MechSystem(SystemData {
                name: "New System".into(),
                ..Default::default()
            }),
            Category::PilotGear => Self::PilotGear(GearData {
                name: "New Gear".into(),
                ..Default::default()
            }),
            Category::Tag => Self::Tag(TagData {
                name: "New Tag".into(),
                ..Default::default()
            }),
            Category::License => Self::License(LicenseData {
                name: "New License".into(),
                ..Default::default()
            }),
            Category::Talent => Self::Talent(FeatureData {
                name: "New Talent".into(),
                ..Default::default()
            }),
            Category::Skill => Self::Skill(FeatureData {
                name: "New Skill".into(),
                ..Default::default()
            }),
            Category::CoreBonus => Self::CoreBonus(FeatureData {
                name: "New Core Bonus".into(),
                ..Default::default()
            }),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Pilot(_) => Category::Pilot,
            Self::Mech(_) => Category::Mech,
            Self::Deployable(_) => Category::Deployable,
            Self::Frame(_) => Category::Frame,
            Self::MechWeapon(_) => Category::MechWeapon,
            Self::MechSystem(_) => Category::MechSystem,
            Self::PilotGear(_) => Category::PilotGear,
            Self::Tag(_) => Category::Tag,
            Self::License(_) => Category::License,
            Self::Talent(_) => Category::Talent,
            Self::Skill(_) => Category::Skill,
            Self::CoreBonus(_) => Category::CoreBonus,
        }
    }

    /// Stable rules id
    pub fn lid(&self) -> &str {
        match self {
            Self::Pilot(d) => &d.lid,
            Self::Mech(d) => &d.lid,
            Self::Deployable(d) => &d.lid,
            Self::Frame(d) => &d.lid,
            Self::MechWeapon(d) => &d.lid,
            Self::MechSystem(d) => &d.lid,
            Self::PilotGear(d) => &d.lid,
            Self::Tag(d) => &d.lid,
            Self::License(d) => &d.lid,
            Self::Talent(d) | Self::Skill(d) | Self::CoreBonus(d) => &d.lid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pilot(d) => &d.name,
            Self::Mech(d) => &d.name,
            Self::Deployable(d) => &d.name,
            Self::Frame(d) => &d.name,
            Self::MechWeapon(d) => &d.name,
            Self::MechSystem(d) => &d.name,
            Self::PilotGear(d) => &d.name,
            Self::Tag(d) => &d.name,
            Self::License(d) => &d.name,
            Self::Talent(d) | Self::Skill(d) | Self::CoreBonus(d) => &d.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Self::Pilot(d) => d.name = name,
            Self::Mech(d) => d.name = name,
            Self::Deployable(d) => d.name = name,
            Self::Frame(d) => d.name = name,
            Self::MechWeapon(d) => d.name = name,
            Self::MechSystem(d) => d.name = name,
            Self::PilotGear(d) => d.name = name,
            Self::Tag(d) => d.name = name,
            Self::License(d) => d.name = name,
            Self::Talent(d) | Self::Skill(d) | Self::CoreBonus(d) => d.name = name,
        }
    }

    /// Every reference in the record, in a stable order
    pub fn refs(&self) -> Vec<RefSlot> {
        let mut out = Vec::new();
        self.visit_refs(&mut |path, child, r| {
            out.push(RefSlot {
                path: path.to_string(),
                child,
                reference: r.clone(),
            })
        });
        out
    }

    /// References to owned dependents only
    pub fn child_slots(&self) -> Vec<RefSlot> {
        self.refs().into_iter().filter(|s| s.child).collect()
    }

    /// Mutable access to every reference with its slot path
    pub fn refs_mut(&mut self) -> Vec<(String, &mut RegRef)> {
        let mut out = Vec::new();
        match self {
            Self::Pilot(d) => {
                many_mut(&mut out, "licenses", &mut d.licenses);
                many_mut(&mut out, "skills", &mut d.skills);
                many_mut(&mut out, "talents", &mut d.talents);
                many_mut(&mut out, "core_bonuses", &mut d.core_bonuses);
                many_mut(&mut out, "loadout", &mut d.loadout);
                many_mut(&mut out, "mechs", &mut d.mechs);
                if let Some(r) = d.active_mech.as_mut() {
                    out.push(("active_mech".to_string(), r));
                }
            }
            Self::Mech(d) => {
                if let Some(r) = d.frame.as_mut() {
                    out.push(("frame".to_string(), r));
                }
                if let Some(r) = d.pilot.as_mut() {
                    out.push(("pilot".to_string(), r));
                }
                many_mut(&mut out, "weapons", &mut d.weapons);
                many_mut(&mut out, "systems", &mut d.systems);
            }
            Self::Deployable(d) => {
                if let Some(r) = d.deployer.as_mut() {
                    out.push(("deployer".to_string(), r));
                }
            }
            Self::MechWeapon(d) => tags_mut(&mut out, &mut d.tags),
            Self::MechSystem(d) => tags_mut(&mut out, &mut d.tags),
            Self::PilotGear(d) => tags_mut(&mut out, &mut d.tags),
            Self::Frame(_)
            | Self::Tag(_)
            | Self::License(_)
            | Self::Talent(_)
            | Self::Skill(_)
            | Self::CoreBonus(_) => {}
        }
        out
    }

    /// Reset consumable counters to their maximum
    ///
    /// Returns whether anything changed.
    pub fn refill_uses(&mut self) -> bool {
        let (uses, max) = match self {
            Self::MechWeapon(d) => (&mut d.uses, d.max_uses),
            Self::MechSystem(d) => (&mut d.uses, d.max_uses),
            Self::PilotGear(d) => (&mut d.uses, d.max_uses),
            _ => return false,
        };
        let changed = *uses != max;
        *uses = max;
        changed
    }

    fn visit_refs(&self, visit: &mut dyn FnMut(&str, bool, &RegRef)) {
        match self {
            Self::Pilot(d) => {
                many(visit, "licenses", true, &d.licenses);
                many(visit, "skills", true, &d.skills);
                many(visit, "talents", true, &d.talents);
                many(visit, "core_bonuses", true, &d.core_bonuses);
                many(visit, "loadout", true, &d.loadout);
                many(visit, "mechs", false, &d.mechs);
                if let Some(r) = &d.active_mech {
                    visit("active_mech", false, r);
                }
            }
            Self::Mech(d) => {
                if let Some(r) = &d.frame {
                    visit("frame", true, r);
                }
                if let Some(r) = &d.pilot {
                    visit("pilot", false, r);
                }
                many(visit, "weapons", true, &d.weapons);
                many(visit, "systems", true, &d.systems);
            }
            Self::Deployable(d) => {
                if let Some(r) = &d.deployer {
                    visit("deployer", false, r);
                }
            }
            Self::MechWeapon(d) => tags(visit, &d.tags),
            Self::MechSystem(d) => tags(visit, &d.tags),
            Self::PilotGear(d) => tags(visit, &d.tags),
            Self::Frame(_)
            | Self::Tag(_)
            | Self::License(_)
            | Self::Talent(_)
            | Self::Skill(_)
            | Self::CoreBonus(_) => {}
        }
    }
}

fn many(visit: &mut dyn FnMut(&str, bool, &RegRef), field: &str, child: bool, refs: &[RegRef]) {
    for (i, r) in refs.iter().enumerate() {
        visit(&format!("{}[{}]", field, i), child, r);
    }
}

fn tags(visit: &mut dyn FnMut(&str, bool, &RegRef), tags: &[TagInstance]) {
    for (i, t) in tags.iter().enumerate() {
        visit(&format!("tags[{}].tag", i), false, &t.tag);
    }
}

fn many_mut<'a>(out: &mut Vec<(String, &'a mut RegRef)>, field: &str, refs: &'a mut [RegRef]) {
    for (i, r) in refs.iter_mut().enumerate() {
        out.push((format!("{}[{}]", field, i), r));
    }
}

fn tags_mut<'a>(out: &mut Vec<(String, &'a mut RegRef)>, tags: &'a mut [TagInstance]) {
    for (i, t) in tags.iter_mut().enumerate() {
        out.push((format!("tags[{}].tag", i), &mut t.tag));
    }
}
