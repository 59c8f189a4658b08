//! Primary/backup hotkey registration.
//!
//! Another program may already own a configured combination. Rather than
//! failing outright, the application retries once with the same key under
//! [`BACKUP_MODIFIERS`], which are unlikely to be taken, and tells the user
//! which combination ended up bound.

use switchyard_core::{Handler, Hotkey, HotkeyId, Modifiers, Reactor, Result};

/// Modifiers used for the second attempt.
pub const BACKUP_MODIFIERS: Modifiers = Modifiers::ALT
    .union(Modifiers::CONTROL)
    .union(Modifiers::WIN)
    .union(Modifiers::NO_REPEAT);

/// Outcome of [`add_hotkey_with_backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    /// The combination that was actually bound.
    pub hotkey: Hotkey,
    /// Its registered identity.
    pub id: HotkeyId,
    /// Set when the backup combination had to be used.
    pub warning: Option<String>,
}

/// Bind `handler` to `hotkey`, falling back to the backup modifiers once.
///
/// # Errors
///
/// Errors other than a registration conflict are returned as they are. If
/// the backup is refused too, the first conflict is returned.
pub fn add_hotkey_with_backup(
    reactor: &mut Reactor,
    hotkey: Hotkey,
    handler: Handler,
) -> Result<HotkeyBinding> {
    let first = match reactor.add_hotkey_handling(hotkey, handler.clone()) {
        Ok(id) => {
            return Ok(HotkeyBinding {
                hotkey,
                id,
                warning: None,
            });
        }
        Err(err) if err.is_conflict() => err,
        Err(err) => return Err(err),
    };

    let backup = hotkey.with_modifiers(BACKUP_MODIFIERS);
    match reactor.add_hotkey_handling(backup, handler) {
        Ok(id) => {
            let warning = format!(
                "Failed to register \"{hotkey}\" hotkey. \"{backup}\" used instead."
            );
            tracing::warn!(target: "switchyard::app", %hotkey, %backup, "using backup hotkey");
            Ok(HotkeyBinding {
                hotkey: backup,
                id,
                warning: Some(warning),
            })
        }
        Err(second) => {
            tracing::warn!(target: "switchyard::app", %hotkey, %second, "backup hotkey refused as well");
            Err(first)
        }
    }
}
