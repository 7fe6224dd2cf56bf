use crate::signaling::protocol::Seq;

/// Which side of a pairwise link sends the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    /// The later joiner initiates toward everyone already in the room, so
    /// two peers never both send offers.
    pub fn from_join_order(local_joined_at: Seq, remote_joined_at: Seq) -> Self {
        if local_joined_at > remote_joined_at {
            Self::Initiator
        } else {
            Self::Responder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_complementary() {
        for (a, b) in [(1, 2), (7, 3), (10, 11)] {
            assert_ne!(Role::from_join_order(a, b), Role::from_join_order(b, a));
        }
    }

    #[test]
    fn newcomer_initiates() {
        assert_eq!(Role::from_join_order(5, 2), Role::Initiator);
        assert_eq!(Role::from_join_order(2, 5), Role::Responder);
    }
}
