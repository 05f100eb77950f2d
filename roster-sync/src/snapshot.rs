//! Group membership snapshot: current group members keyed by canonical email.

use std::collections::HashMap;

use roster_core::{canonicalize, CanonicalEmail, GroupMember, MemberId};

/// One group member as needed to remove or notify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub member_id: MemberId,
    /// Address as reported by the provider.
    pub email: String,
}

/// Group lookup structure, built from the fully paged member listing.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    members: HashMap<CanonicalEmail, SnapshotEntry>,
}

impl GroupSnapshot {
    /// Key every member by canonical email. Members without a provider id
    /// are addressed by their raw email. Later entries win on collision.
    pub fn build(members: &[GroupMember]) -> Self {
        let mut map = HashMap::with_capacity(members.len());
        for member in members {
            let key = canonicalize(&member.email);
            let entry = SnapshotEntry {
                member_id: member.member_id(),
                email: member.email.clone(),
            };
            if let Some(previous) = map.insert(key.clone(), entry) {
                tracing::warn!(
                    "group lists {key} more than once ('{}' and '{}'); acting on the latter",
                    previous.email,
                    member.email
                );
            }
        }
        Self { members: map }
    }

    pub fn get(&self, key: &CanonicalEmail) -> Option<&SnapshotEntry> {
        self.members.get(key)
    }

    pub fn contains(&self, key: &CanonicalEmail) -> bool {
        self.members.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalEmail, &SnapshotEntry)> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_provider_id_or_falls_back_to_email() {
        let snapshot = GroupSnapshot::build(&[
            GroupMember::new("1234", "Ann.Lee@gmail.com"),
            GroupMember::from_email("bob@x.com"),
        ]);
        assert_eq!(snapshot.len(), 2);

        let ann = snapshot.get(&canonicalize("annlee@gmail.com")).unwrap();
        assert_eq!(ann.member_id, MemberId::from("1234"));
        assert_eq!(ann.email, "Ann.Lee@gmail.com");

        let bob = snapshot.get(&canonicalize("BOB@x.com")).unwrap();
        assert_eq!(bob.member_id, MemberId::from("bob@x.com"));
    }

    #[test]
    fn no_members_is_empty_map() {
        assert!(GroupSnapshot::build(&[]).is_empty());
    }

    #[test]
    fn colliding_members_collapse_to_one_key() {
        let snapshot = GroupSnapshot::build(&[
            GroupMember::new("1", "a.b@gmail.com"),
            GroupMember::new("2", "ab@gmail.com"),
        ]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot.get(&canonicalize("ab@gmail.com")).unwrap().member_id,
            MemberId::from("2")
        );
    }
}
