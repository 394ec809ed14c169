//! Decryption group model.
//!
//! A decryption group is a shared capacity scope: it limits how many
//! encrypted sources can be received concurrently across its member
//! resources. Groups form a tree; a resource that is a member of a nested
//! group is simultaneously subject to the limits of every enclosing group.

use serde::{Deserialize, Serialize};

/// A shared decryption-slot scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionGroup {
    /// Unique group name.
    pub name: String,
    /// Maximum concurrently decrypted sources across all members
    /// (including members of child groups).
    pub limit: i32,
    /// Names of member resources.
    pub members: Vec<String>,
    /// Nested scopes; members inherit this group's limit as well.
    pub children: Vec<DecryptionGroup>,
}

impl DecryptionGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, limit: i32) -> Self {
        Self {
            name: name.into(),
            limit,
            members: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a member resource by name.
    pub fn with_member(mut self, resource: impl Into<String>) -> Self {
        self.members.push(resource.into());
        self
    }

    /// Adds a child group.
    pub fn with_child(mut self, child: DecryptionGroup) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_builder() {
        let g = DecryptionGroup::new("CAM", 2)
            .with_member("R1")
            .with_child(DecryptionGroup::new("CAM-A", 1).with_member("R2"));
        assert_eq!(g.limit, 2);
        assert_eq!(g.members, vec!["R1"]);
        assert_eq!(g.children.len(), 1);
        assert_eq!(g.children[0].members, vec!["R2"]);
    }
}
