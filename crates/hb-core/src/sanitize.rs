//! Cleanup of known client reporting quirks.

use crate::heartbeat::Heartbeat;

/// Project placeholder some browser plugins send to mean "whatever project
/// was active last". Browsing activity is attributed to no project instead.
pub const LAST_PROJECT_PLACEHOLDER: &str = "<<LAST_PROJECT>>";

impl Heartbeat {
    /// Normalizes client-reported fields in place.
    ///
    /// Idempotent and infallible.
    pub fn sanitize(&mut self) -> &mut Self {
        if matches!(self.entity_type.as_str(), "url" | "domain")
            && self.project == LAST_PROJECT_PLACEHOLDER
        {
            self.project.clear();
        }

        capitalize(&mut self.operating_system);
        capitalize(&mut self.editor);

        self
    }
}

/// Uppercases the first character, leaving the rest untouched.
fn capitalize(value: &mut String) {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return;
    };
    if first.is_uppercase() {
        return;
    }
    let capitalized: String = first.to_uppercase().chain(chars).collect();
    *value = capitalized;
}
