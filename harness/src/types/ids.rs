//! Path types for devices and namespaces.
//!
//! Both are dot-separated paths rooted at `root`, for example
//! `root.harness` (a namespace) and `root.harness.d1` (a device).

use std::fmt;

/// Root segment every path must start with.
const ROOT: &str = "root";

/// Error returned when a path is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path does not start with `root.`.
    MissingRoot(String),
    /// The path contains an empty segment.
    EmptySegment(String),
    /// A segment contains a character other than ASCII alphanumerics or `_`.
    InvalidCharacter { path: String, character: char },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot(path) => write!(f, "path '{path}' must start with '{ROOT}.'"),
            Self::EmptySegment(path) => write!(f, "path '{path}' contains an empty segment"),
            Self::InvalidCharacter { path, character } => {
                write!(f, "path '{path}' contains invalid character '{character}'")
            }
        }
    }
}

impl std::error::Error for PathError {}

fn validate(path: &str) -> Result<(), PathError> {
    let mut segments = path.split('.');
    if segments.next() != Some(ROOT) {
        return Err(PathError::MissingRoot(path.to_string()));
    }
    let mut rest = segments.peekable();
    if rest.peek().is_none() {
        return Err(PathError::MissingRoot(path.to_string()));
    }
    for segment in rest {
        if segment.is_empty() {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        if let Some(character) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(PathError::InvalidCharacter {
                path: path.to_string(),
                character,
            });
        }
    }
    Ok(())
}

/// The path of one device (one logical entity receiving points).
///
/// # Invariants
///
/// - Starts with `root.` and has at least one segment after it.
/// - Every segment is non-empty ASCII alphanumerics or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Parse and validate a device path.
    ///
    /// # Examples
    ///
    /// ```
    /// use harness::types::DeviceId;
    /// let id = DeviceId::parse("root.sg.d1").unwrap();
    /// assert!(id.is_under("root.sg"));
    /// ```
    pub fn parse(path: &str) -> Result<Self, PathError> {
        validate(path)?;
        Ok(Self(path.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this device lives strictly below `prefix`.
    #[must_use]
    pub fn is_under(&self, prefix: &str) -> bool {
        self.0
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for DeviceId {
    type Error = PathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::parse(path)
    }
}

/// The path of a namespace that groups devices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Parse and validate a namespace path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        validate(path)?;
        Ok(Self(path.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `device` belongs to this namespace.
    #[must_use]
    pub fn contains(&self, device: &DeviceId) -> bool {
        device.is_under(&self.0)
    }

    /// The namespace holding `device`: its path minus the last segment.
    #[must_use]
    pub fn of(device: &DeviceId) -> Option<Self> {
        let (parent, _) = device.as_str().rsplit_once('.')?;
        if parent == ROOT {
            return None;
        }
        Some(Self(parent.to_string()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_parse() {
        let id = DeviceId::parse("root.sg.d1").unwrap();
        assert_eq!(id.as_str(), "root.sg.d1");
        assert_eq!(format!("{id}"), "root.sg.d1");
    }

    #[test]
    fn test_device_id_rejects_missing_root() {
        assert_eq!(
            DeviceId::parse("sg.d1"),
            Err(PathError::MissingRoot("sg.d1".to_string()))
        );
        assert!(DeviceId::parse("root").is_err());
        assert!(DeviceId::parse("").is_err());
    }

    #[test]
    fn test_device_id_rejects_empty_segment() {
        assert_eq!(
            DeviceId::parse("root..d1"),
            Err(PathError::EmptySegment("root..d1".to_string()))
        );
        assert!(DeviceId::parse("root.sg.").is_err());
    }

    #[test]
    fn test_device_id_rejects_invalid_character() {
        assert_eq!(
            DeviceId::parse("root.sg.d-1"),
            Err(PathError::InvalidCharacter {
                path: "root.sg.d-1".to_string(),
                character: '-',
            })
        );
    }

    #[test]
    fn test_is_under() {
        let id = DeviceId::parse("root.sg.d1").unwrap();
        assert!(id.is_under("root.sg"));
        assert!(id.is_under("root"));
        assert!(!id.is_under("root.s"));
        assert!(!id.is_under("root.sg.d1"));
    }

    #[test]
    fn test_namespace_of() {
        let id = DeviceId::parse("root.sg.d1").unwrap();
        let ns = Namespace::of(&id).unwrap();
        assert_eq!(ns.as_str(), "root.sg");
        assert!(ns.contains(&id));
        assert!(Namespace::of(&DeviceId::parse("root.d1").unwrap()).is_none());
    }
}
