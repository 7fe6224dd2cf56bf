use std::fmt;

/// Signaling state of one pairwise link.
///
/// `New → LocalDescriptionSet → RemoteDescriptionSet → Connected` for the
/// initiator, `New → RemoteDescriptionSet → Connected` for the responder.
/// `Closed` is reachable from anywhere and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    New,
    LocalDescriptionSet,
    RemoteDescriptionSet,
    Connected,
    Closed,
}

impl LinkState {
    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (New, LocalDescriptionSet)
            | (New, RemoteDescriptionSet)
            | (LocalDescriptionSet, RemoteDescriptionSet)
            | (RemoteDescriptionSet, Connected) => true,
            _ => false,
        }
    }

    /// Remote candidates can be applied from here on.
    pub fn has_remote_description(self) -> bool {
        matches!(self, Self::RemoteDescriptionSet | Self::Connected)
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::LocalDescriptionSet => "local-description-set",
            Self::RemoteDescriptionSet => "remote-description-set",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::LinkState::*;

    #[test]
    fn initiator_and_responder_paths_are_allowed() {
        assert!(New.can_transition_to(LocalDescriptionSet));
        assert!(LocalDescriptionSet.can_transition_to(RemoteDescriptionSet));
        assert!(New.can_transition_to(RemoteDescriptionSet));
        assert!(RemoteDescriptionSet.can_transition_to(Connected));
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!New.can_transition_to(Connected));
        assert!(!LocalDescriptionSet.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(RemoteDescriptionSet));
        assert!(!RemoteDescriptionSet.can_transition_to(LocalDescriptionSet));
    }

    #[test]
    fn closed_is_terminal_and_reachable_from_everywhere() {
        for s in [New, LocalDescriptionSet, RemoteDescriptionSet, Connected] {
            assert!(s.can_transition_to(Closed));
        }
        for s in [New, LocalDescriptionSet, RemoteDescriptionSet, Connected, Closed] {
            assert!(!Closed.can_transition_to(s));
        }
    }
}
