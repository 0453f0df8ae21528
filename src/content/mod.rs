pub mod armor;
pub mod dice;
pub mod model;
pub mod pool;
pub mod repository;

pub use armor::ArmorClass;
pub use dice::{cantrip_dice_multiplier, DiceFormula};
pub use model::{
    Alternative, ArchetypeDef, BackgroundDef, ChoicePoint, ClassDef, EquipmentDef, EquipmentGrant,
    EquipmentNode, EquipmentTree, MagicDef, NodeId, ProficiencyGroup, RaceDef, SpellDef,
    SpellProgression, SubclassDef, SubraceDef, TraitDef,
};
pub use pool::{assign_slots, ChoiceSlot, OptionPool};
pub use repository::{Catalogue, CatalogueData, ChoiceMetadata, ContentRepository, TagDef};
