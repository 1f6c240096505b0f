use crate::error::{CoreError, CoreResult};

/// One unit of work inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec<T> {
    /// Identifies the item in reports and progress messages (e.g. `A www`).
    pub key: String,
    pub payload: T,
    /// Caller-supplied idempotency token. When absent and the provider call
    /// is not idempotent, the coordinator synthesizes one per item.
    pub idempotency_token: Option<String>,
}

impl<T> ItemSpec<T> {
    pub fn new(key: impl Into<String>, payload: T) -> Self {
        Self {
            key: key.into(),
            payload,
            idempotency_token: None,
        }
    }

    #[must_use]
    pub fn with_idempotency_token(mut self, token: impl Into<String>) -> Self {
        self.idempotency_token = Some(token.into());
        self
    }
}

/// A group key (zone, distribution, region) and its ordered items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec<T> {
    pub group_key: String,
    pub items: Vec<ItemSpec<T>>,
}

impl<T> GroupSpec<T> {
    pub fn new(group_key: impl Into<String>, items: Vec<ItemSpec<T>>) -> Self {
        Self {
            group_key: group_key.into(),
            items,
        }
    }
}

/// Ordered groups to provision in one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan<T> {
    groups: Vec<GroupSpec<T>>,
}

impl<T> ExecutionPlan<T> {
    pub fn new(groups: Vec<GroupSpec<T>>) -> Self {
        Self { groups }
    }

    /// A flat list of items under a single group (e.g. certificate requests
    /// in one region).
    pub fn single_group(group_key: impl Into<String>, items: Vec<ItemSpec<T>>) -> Self {
        Self::new(vec![GroupSpec::new(group_key, items)])
    }

    pub fn groups(&self) -> &[GroupSpec<T>] {
        &self.groups
    }

    pub fn total_items(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Check the structural preconditions the coordinator relies on: every
    /// group and every item has a non-blank key. Semantic validation of
    /// payloads is the configuration layer's job.
    pub fn validate(&self) -> CoreResult<()> {
        for (i, group) in self.groups.iter().enumerate() {
            if group.group_key.trim().is_empty() {
                return Err(CoreError::InvalidPlan(format!(
                    "group[{i}]: group key must not be empty"
                )));
            }
            for (j, item) in group.items.iter().enumerate() {
                if item.key.trim().is_empty() {
                    return Err(CoreError::InvalidPlan(format!(
                        "group[{i}] ({}) item[{j}]: item key must not be empty",
                        group.group_key
                    )));
                }
            }
        }
        Ok(())
    }
}
