//! Category visibility.
//!
//! A category's own state is the user's override when one exists, else its
//! own `defaulttoggle` property (true when unset). Effective visibility
//! additionally requires every ancestor to resolve active on its own. The
//! answer is recomputed on every call.

use tracing::debug;
use waymark_core::typeid;
use waymark_store::{OverrideRepo, PackStore, PropOwner, StateStore};

use crate::errors::Result;

/// Stateless resolver over a pack and the user state store.
pub struct ActiveResolver;

impl ActiveResolver {
    /// Whether `typeid` is active. With `include_ancestors`, also requires
    /// every ancestor to be active.
    pub fn is_active(
        pack: &PackStore,
        state: &StateStore,
        typeid: &str,
        include_ancestors: bool,
    ) -> Result<bool> {
        let typeid = typeid.to_lowercase();
        let mut current = Some(typeid.as_str());
        while let Some(t) = current {
            if !Self::own_state(pack, state, t)? {
                return Ok(false);
            }
            if !include_ancestors {
                break;
            }
            current = typeid::parent(t);
        }
        Ok(true)
    }

    /// The category's own state, ignoring ancestors.
    fn own_state(pack: &PackStore, state: &StateStore, typeid: &str) -> Result<bool> {
        if let Some(active) = OverrideRepo::get(state.conn(), typeid)? {
            return Ok(active);
        }
        let default = pack
            .property(PropOwner::Category(typeid), "defaulttoggle")?
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(default)
    }

    /// Persist a user override.
    pub fn set_active(state: &StateStore, typeid: &str, active: bool) -> Result<()> {
        OverrideRepo::set(state.conn(), typeid, active)?;
        debug!(typeid, active, "category override set");
        Ok(())
    }

    /// Remove a user override, falling back to `defaulttoggle`.
    pub fn clear_override(state: &StateStore, typeid: &str) -> Result<bool> {
        Ok(OverrideRepo::clear(state.conn(), typeid)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
