//! Config field paths.

use std::fmt;

/// Dotted key of a config field, e.g. `scripts.extension`.
///
/// Sections declare one constant per validated key so diagnostics point at
/// the exact spelling a user would write in `hotbrew.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPath(&'static str);

impl FieldPath {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// The `[section]` a key lives in.
    pub fn section(self) -> &'static str {
        self.0.split_once('.').map_or(self.0, |(section, _)| section)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section() {
        assert_eq!(FieldPath::new("scripts.extension").section(), "scripts");
        assert_eq!(FieldPath::new("watch").section(), "watch");
    }
}
