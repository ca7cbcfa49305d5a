use super::SelectorSpec;
use crate::settings::SettingsField;
use crate::settings::SettingsRecord;

/// One ordered override entry of a behavior: partial settings applied to
/// every key the selector matches. Frozen once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    selector: SelectorSpec,
    settings: SettingsRecord,
}

impl Patch {
    /// Pairs a selector with settings, rejecting the first set field the
    /// selector cannot carry.
    pub fn try_new(
        selector: SelectorSpec,
        settings: SettingsRecord,
    ) -> std::result::Result<Self, SettingsField> {
        if let Some(field) = settings.set_fields().into_iter().find(|f| !selector.permits(*f)) {
            return Err(field);
        }
        Ok(Self { selector, settings })
    }

    /// Only reachable through the typed builder, whose bounds already
    /// guarantee every set field is permitted.
    pub(crate) fn new_unchecked(
        selector: SelectorSpec,
        settings: SettingsRecord,
    ) -> Self {
        debug_assert!(settings.set_fields().iter().all(|f| selector.permits(*f)));
        Self { selector, settings }
    }

    pub fn selector(&self) -> &SelectorSpec {
        &self.selector
    }

    pub fn settings(&self) -> &SettingsRecord {
        &self.settings
    }
}
