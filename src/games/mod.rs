//! Bundled game modules
//!
//! - `test`: minimal game used by the test suite and fresh installations
//! - `drink`: demo game spawning drinks at real pubs and fountains

pub mod drink;
pub mod test;

use std::sync::Arc;

use crate::framework::GameRegistry;

/// Registry with every bundled game
pub fn builtin_registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry.register(Arc::new(test::TestGame));
    registry.register(Arc::new(drink::DrinkGame));
    registry
}
