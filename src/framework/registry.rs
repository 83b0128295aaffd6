//! Game registry
//!
//! Maps game packages to their modules and object discriminators to their
//! classes. The framework base classes `Player`, `Item` and `NPC` are always
//! registered so objects of unknown or removed classes still get the shared
//! base behavior.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::model::{BaseKind, GameObject};

use super::{discriminator, GameModule, ItemClass, NpcClass, ObjectClass, PlayerClass};

/// A class together with the discriminator it is registered under
#[derive(Clone)]
pub struct RegisteredClass {
    pub type_name: String,
    pub package: Option<String>,
    pub class: Arc<dyn ObjectClass>,
}

/// All known games and classes
pub struct GameRegistry {
    modules: BTreeMap<String, Arc<dyn GameModule>>,
    classes: HashMap<String, RegisteredClass>,
    base_player: Arc<dyn ObjectClass>,
    base_item: Arc<dyn ObjectClass>,
    base_npc: Arc<dyn ObjectClass>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    /// Create a registry holding only the framework base classes
    pub fn new() -> Self {
        let base_player: Arc<dyn ObjectClass> =
            Arc::new(PlayerClass::new(BaseKind::Player.framework_type()));
        let base_item: Arc<dyn ObjectClass> =
            Arc::new(ItemClass::new(BaseKind::Item.framework_type()));
        let base_npc: Arc<dyn ObjectClass> =
            Arc::new(NpcClass::new(BaseKind::Npc.framework_type()));

        let mut classes = HashMap::new();
        for class in [&base_player, &base_item, &base_npc] {
            let type_name = discriminator(None, class.name());
            classes.insert(
                type_name.clone(),
                RegisteredClass {
                    type_name,
                    package: None,
                    class: Arc::clone(class),
                },
            );
        }

        Self {
            modules: BTreeMap::new(),
            classes,
            base_player,
            base_item,
            base_npc,
        }
    }

    /// Register a game module and all its classes
    pub fn register(&mut self, module: Arc<dyn GameModule>) {
        let package = module.package().to_string();

        if self.modules.contains_key(&package) {
            warn!(package = %package, "Game module registered twice, replacing");
            self.classes
                .retain(|_, registered| registered.package.as_deref() != Some(package.as_str()));
        }

        for class in module.classes() {
            let type_name = discriminator(Some(&package), class.name());
            debug!(type_name = %type_name, kind = %class.kind(), "Registered object class");
            self.classes.insert(
                type_name.clone(),
                RegisteredClass {
                    type_name,
                    package: Some(package.clone()),
                    class,
                },
            );
        }

        info!(package = %package, name = %module.info().name, "Game module registered");
        self.modules.insert(package, module);
    }

    /// Packages of all registered games, sorted
    pub fn game_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn games(&self) -> impl Iterator<Item = &Arc<dyn GameModule>> {
        self.modules.values()
    }

    pub fn by_name(&self, package: &str) -> Option<Arc<dyn GameModule>> {
        self.modules.get(package).cloned()
    }

    /// Class registered under a discriminator
    pub fn class(&self, type_name: &str) -> Option<Arc<dyn ObjectClass>> {
        self.classes.get(type_name).map(|r| Arc::clone(&r.class))
    }

    /// Framework base class of a kind
    pub fn base_class(&self, kind: BaseKind) -> Arc<dyn ObjectClass> {
        let class = match kind {
            BaseKind::Player => &self.base_player,
            BaseKind::Item => &self.base_item,
            BaseKind::Npc => &self.base_npc,
        };
        Arc::clone(class)
    }

    /// Class of an object, falling back to the base class of its kind
    pub fn class_of(&self, object: &GameObject) -> Arc<dyn ObjectClass> {
        self.class(&object.type_name)
            .filter(|class| class.kind() == object.base_kind())
            .unwrap_or_else(|| self.base_class(object.base_kind()))
    }

    /// Player class of a game; games without one use the framework `Player`
    pub fn player_class(&self, package: &str) -> RegisteredClass {
        self.classes_of(package)
            .into_iter()
            .find(|registered| registered.class.kind() == BaseKind::Player)
            .unwrap_or_else(|| RegisteredClass {
                type_name: discriminator(None, self.base_player.name()),
                package: None,
                class: Arc::clone(&self.base_player),
            })
    }

    /// Classes of a game, sorted by discriminator
    pub fn classes_of(&self, package: &str) -> Vec<RegisteredClass> {
        let mut classes: Vec<RegisteredClass> = self
            .classes
            .values()
            .filter(|registered| registered.package.as_deref() == Some(package))
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        classes
    }

    /// Package a discriminator belongs to, if it is a game class
    pub fn package_of(&self, type_name: &str) -> Option<&str> {
        self.classes
            .get(type_name)
            .and_then(|registered| registered.package.as_deref())
    }
}
