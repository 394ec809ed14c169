//! Resource set: the priority-ordered device collection plus the
//! decryption-scope registry.
//!
//! Registration is the only place configuration errors can surface:
//! duplicate names, negative limits, and group members that resolve to no
//! registered resource are rejected with
//! [`SchedulerError::Configuration`]. Once registered, resources and
//! scopes are read-only to the engine.
//!
//! # Scope registration
//! A decryption-group tree is walked depth-first. Each group allocates one
//! scope (backing one capacity ledger per candidate plan) and pushes
//! itself onto the active ancestor set; every member resource receives the
//! union of the active set, so nested membership inherits all enclosing
//! limits simultaneously. On return the group pops itself off (stack
//! discipline).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchedulerError;

use super::{DecryptionGroup, Resource};

/// Identifier of a registered decryption scope.
pub type ScopeId = usize;

/// A registered decryption scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name (the group name it was registered from).
    pub name: String,
    /// Maximum concurrently decrypted sources within this scope.
    pub limit: i32,
}

/// Priority-ordered collection of resources plus decryption scopes.
///
/// Resources are kept in ascending priority order (lowest priority first;
/// the highest-priority device is logically last). Equal priorities keep
/// insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    resources: Vec<Resource>,
    scopes: Vec<Scope>,
    /// Scope memberships per resource, parallel to `resources`.
    memberships: Vec<Vec<ScopeId>>,
}

impl ResourceSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource, inserting it into priority order.
    ///
    /// The insertion point is before the first resource whose priority
    /// strictly exceeds the new one, so equal priorities preserve
    /// registration order.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), SchedulerError> {
        if self.resources.iter().any(|r| r.name == resource.name) {
            return Err(SchedulerError::configuration(format!(
                "duplicate resource '{}'",
                resource.name
            )));
        }
        if resource.source_limit < 0 || resource.decryption_limit < 0 {
            return Err(SchedulerError::configuration(format!(
                "resource '{}' has a negative limit",
                resource.name
            )));
        }

        let at = self
            .resources
            .iter()
            .position(|r| r.priority > resource.priority)
            .unwrap_or(self.resources.len());
        self.resources.insert(at, resource);
        self.memberships.insert(at, Vec::new());
        Ok(())
    }

    /// Registers a decryption-group tree.
    ///
    /// Validates the whole tree before allocating any scope, so a failed
    /// registration leaves the set unchanged.
    pub fn add_group(&mut self, group: DecryptionGroup) -> Result<(), SchedulerError> {
        let mut seen: HashSet<String> =
            self.scopes.iter().map(|s| s.name.clone()).collect();
        self.validate_group(&group, &mut seen)?;

        let mut active = Vec::new();
        self.register_group(&group, &mut active);
        Ok(())
    }

    fn validate_group(
        &self,
        group: &DecryptionGroup,
        seen: &mut HashSet<String>,
    ) -> Result<(), SchedulerError> {
        if group.limit < 0 {
            return Err(SchedulerError::configuration(format!(
                "decryption group '{}' has a negative limit",
                group.name
            )));
        }
        if !seen.insert(group.name.clone()) {
            return Err(SchedulerError::configuration(format!(
                "duplicate decryption group '{}'",
                group.name
            )));
        }
        for member in &group.members {
            if self.index_of(member).is_none() {
                return Err(SchedulerError::configuration(format!(
                    "decryption group '{}' references unknown resource '{}'",
                    group.name, member
                )));
            }
        }
        for child in &group.children {
            self.validate_group(child, seen)?;
        }
        Ok(())
    }

    fn register_group(&mut self, group: &DecryptionGroup, active: &mut Vec<ScopeId>) {
        let id = self.scopes.len();
        self.scopes.push(Scope {
            name: group.name.clone(),
            limit: group.limit,
        });
        active.push(id);

        for member in &group.members {
            // Validated above; members always resolve.
            if let Some(index) = self.index_of(member) {
                for &scope in active.iter() {
                    if !self.memberships[index].contains(&scope) {
                        self.memberships[index].push(scope);
                    }
                }
            }
        }
        for child in &group.children {
            self.register_group(child, active);
        }
        active.pop();
    }

    /// Resources in ascending priority order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource is registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Registered decryption scopes, in registration (depth-first) order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Scope ids the resource at `index` belongs to.
    pub fn scopes_of(&self, index: usize) -> &[ScopeId] {
        &self.memberships[index]
    }

    /// Index of a resource by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.resources.iter().position(|r| r.name == name)
    }
}
