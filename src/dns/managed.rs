use std::fmt::{self, Display, Formatter};

/// Tag opening every set identifier this crate owns.
pub const MANAGED_TAG: &str = "managed";

/// Owner identifier carried in a record's set identifier: `managed:<group>:<service>`.
///
/// The tag is fixed to [`MANAGED_TAG`] and not stored. [`ManagedId::decode`] is the only
/// place the whole tagged shape is checked: any other tag, including a different case,
/// never decodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedId {
    pub group: String,
    pub service: String,
}

impl ManagedId {
    pub fn new(group: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            service: service.into(),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Returns `None` for anything that is not exactly `managed:<group>:<service>`.
    pub fn decode(set_identifier: &str) -> Option<Self> {
        let mut segments = set_identifier.split(':');

        match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(MANAGED_TAG), Some(group), Some(service), None) => {
                Some(Self::new(group, service))
            }

            _ => None,
        }
    }

    /// Cheap check used while listing: the identifier claims to be owned by us, even if it
    /// later fails to decode.
    pub fn is_managed(set_identifier: &str) -> bool {
        set_identifier
            .strip_prefix(MANAGED_TAG)
            .map_or(false, |rest| rest.starts_with(':'))
    }
}

impl Display for ManagedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", MANAGED_TAG, self.group, self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode() {
        let id = ManagedId::new("group1", "svc1");

        assert_eq!(id.encode(), "managed:group1:svc1");
        assert_eq!(ManagedId::decode(&id.encode()), Some(id));
    }

    #[test]
    fn malformed_is_not_managed() {
        assert_eq!(ManagedId::decode("managed:onlyonecolon"), None);
        assert_eq!(ManagedId::decode("managed:a:b:c"), None);
        assert_eq!(ManagedId::decode("owned:a:b"), None);
        assert_eq!(ManagedId::decode("Managed:a:b"), None);
        assert_eq!(ManagedId::decode(""), None);
    }

    #[test]
    fn managed_prefix() {
        assert!(ManagedId::is_managed("managed:onlyonecolon"));
        assert!(ManagedId::is_managed("managed:g:s"));
        assert!(!ManagedId::is_managed("managedx:g:s"));
        assert!(!ManagedId::is_managed("weighted-1"));
    }
}
