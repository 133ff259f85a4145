use uuid::Uuid;

use crate::{Currency, EngineError, Group, MemberId, ResultEngine, TripPlan};

use super::Engine;

impl Engine {
    /// Add a new group and return its id
    pub fn create_group<'a, I>(&mut self, name: &str, home_currency: Currency, members: I) -> ResultEngine<Uuid>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let group = Group::new(name, home_currency, members)?.with_default_split(self.default_split.clone());
        Ok(self.insert_group(group))
    }

    /// Add a new trip: a group with an estimated cost and category budgets
    pub fn create_trip<'a, I>(
        &mut self,
        name: &str,
        home_currency: Currency,
        members: I,
        plan: TripPlan,
    ) -> ResultEngine<Uuid>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let group = Group::new(name, home_currency, members)?
            .with_default_split(self.default_split.clone())
            .with_trip(plan)?;
        Ok(self.insert_group(group))
    }

    /// Load an existing group, e.g. one restored from storage.
    pub fn import_group(&mut self, group: Group) -> ResultEngine<Uuid> {
        if self.groups.contains_key(&group.id) {
            return Err(EngineError::ExistingKey(group.id.to_string()));
        }
        Ok(self.insert_group(group))
    }

    fn insert_group(&mut self, group: Group) -> Uuid {
        let id = group.id;
        tracing::info!(
            group = %id,
            name = %group.name,
            currency = %group.home_currency,
            members = group.members.len(),
            trip = group.is_trip(),
            "group created"
        );
        self.groups.insert(id, group);
        id
    }

    /// Add a member to an existing group and return the derived id
    pub fn add_member(&mut self, group_id: Uuid, display_name: &str) -> ResultEngine<MemberId> {
        let group = self.require_group_mut(group_id)?;
        let member = group.add_member(display_name)?;
        tracing::debug!(group = %group_id, %member, "member added");
        Ok(member)
    }

    /// Read access to a group, its members and its ledger
    pub fn group(&self, group_id: Uuid) -> ResultEngine<&Group> {
        self.require_group(group_id)
    }

    /// Every group held by the engine, in no particular order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Delete a group with its whole ledger and return it.
    pub fn delete_group(&mut self, group_id: Uuid) -> ResultEngine<Group> {
        let group = self
            .groups
            .remove(&group_id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("group {group_id}")))?;
        tracing::info!(group = %group_id, expenses = group.expenses().len(), "group deleted");
        Ok(group)
    }
}
