//! Kind restriction applied by a bus at registration and post time.

use std::collections::HashSet;

use modhost_core::EventKind;

/// Which event kinds a bus carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindFilter {
    /// Stage and config events only.
    #[default]
    ModuleBus,
    /// Everything, including host-defined custom events.
    Any,
    /// Exactly the listed kinds.
    Only(HashSet<EventKind>),
}

impl KindFilter {
    pub fn only(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self::Only(kinds.into_iter().collect())
    }

    pub fn accepts(&self, kind: &EventKind) -> bool {
        match self {
            Self::ModuleBus => kind.is_module_bus_event(),
            Self::Any => true,
            Self::Only(kinds) => kinds.contains(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_bus_rejects_custom_events() {
        let filter = KindFilter::default();
        assert!(filter.accepts(&EventKind::Complete));
        assert!(filter.accepts(&EventKind::ConfigLoading));
        assert!(!filter.accepts(&EventKind::Custom("tick".into())));
    }

    #[test]
    fn only_accepts_listed_kinds() {
        let filter = KindFilter::only([EventKind::CommonSetup, EventKind::Custom("tick".into())]);
        assert!(filter.accepts(&EventKind::CommonSetup));
        assert!(filter.accepts(&EventKind::Custom("tick".into())));
        assert!(!filter.accepts(&EventKind::Done));
    }
}
