//! Named layers of bindings, switched by holding an activator button

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::binding::Binding;
use super::types::ControllerButton;

/// Named layers a profile may hold in addition to the base layer
pub const MAX_LAYERS: usize = 4;

/// A named alternate set of bindings
///
/// While the activator is held, lookups hit this layer first and fall through
/// to the base layer for buttons it does not map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: Uuid,
    pub name: String,
    /// `None` leaves the layer unassigned (kept, but unreachable)
    #[serde(default)]
    pub activator_button: Option<ControllerButton>,
    #[serde(default)]
    pub button_mappings: BTreeMap<ControllerButton, Binding>,
}

impl Layer {
    pub fn new(name: impl Into<String>, activator_button: Option<ControllerButton>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            activator_button,
            button_mappings: BTreeMap::new(),
        }
    }

    pub fn binding(&self, button: ControllerButton) -> Option<&Binding> {
        self.button_mappings.get(&button)
    }

    /// Number of buttons with something configured
    pub fn mapped_count(&self) -> usize {
        self.button_mappings
            .values()
            .filter(|b| b.has_any_action())
            .count()
    }
}

/// Layer whose activator is held
///
/// When several activators are held at once the first layer in profile order
/// wins.
pub fn active_layer<'a>(layers: &'a [Layer], held: &BTreeSet<ControllerButton>) -> Option<&'a Layer> {
    layers.iter().find(|layer| {
        layer
            .activator_button
            .is_some_and(|activator| held.contains(&activator))
    })
}

/// Two-level lookup: the layer's own binding, else the base binding
///
/// Empty layer entries (no action at all) fall through as well.
pub fn resolve_binding<'a>(
    base: &'a BTreeMap<ControllerButton, Binding>,
    layer: Option<&'a Layer>,
    button: ControllerButton,
) -> Option<&'a Binding> {
    layer
        .and_then(|l| l.binding(button))
        .filter(|b| b.has_any_action())
        .or_else(|| base.get(&button))
        .filter(|b| b.has_any_action())
}
