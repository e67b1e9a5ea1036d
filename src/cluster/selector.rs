use crate::cluster::Address;

/// AddressSelector decides which server the client talks to next. Each sweep
/// visits the believed leader first (when one is known), then the remaining
/// members in configuration order, each candidate at most once.
pub struct AddressSelector {
    leader: Option<Address>,
    members: Vec<Address>,
    selections: Vec<Address>,
    cursor: usize,
    state: SelectorState,
}

/// `Reset` is a one-shot latch raised when a new membership view supersedes
/// the current sweep. Callers observe it once (typically to decide whether an
/// existing connection is stale) and the first `next()` lowers it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SelectorState {
    Reset,
    Iterating,
}

impl AddressSelector {
    pub fn new(members: Vec<Address>) -> Self {
        let mut selector = AddressSelector {
            leader: None,
            members,
            selections: Vec::new(),
            cursor: 0,
            state: SelectorState::Reset,
        };
        selector.rebuild_selections();
        selector
    }

    /// Forgets the leader and starts a fresh sweep over the full member list.
    pub fn reset(&mut self) {
        self.leader = None;
        self.rebuild_selections();
        self.state = SelectorState::Reset;
    }

    /// Adopts a new membership view and starts a fresh sweep biased toward
    /// `leader`. An unchanged view is a no-op: it neither raises the latch
    /// nor discards the current sweep cursor.
    pub fn reset_with(&mut self, leader: Option<Address>, members: Vec<Address>) {
        if self.leader == leader && self.members == members {
            return;
        }

        self.leader = leader;
        self.members = members;
        self.rebuild_selections();
        self.state = SelectorState::Reset;
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.selections.len()
    }

    pub fn next(&mut self) -> Option<Address> {
        self.state = SelectorState::Iterating;
        let candidate = self.selections.get(self.cursor).cloned();
        if candidate.is_some() {
            self.cursor += 1;
        }
        candidate
    }

    pub fn leader(&self) -> Option<&Address> {
        self.leader.as_ref()
    }

    pub fn servers(&self) -> &[Address] {
        &self.members
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    fn rebuild_selections(&mut self) {
        let mut selections = Vec::with_capacity(self.members.len() + 1);
        if let Some(leader) = &self.leader {
            selections.push(leader.clone());
        }
        for member in &self.members {
            if !selections.contains(member) {
                selections.push(member.clone());
            }
        }

        self.selections = selections;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> Address {
        Address::new("10.0.0.1", port)
    }

    fn members() -> Vec<Address> {
        vec![addr(1), addr(2), addr(3)]
    }

    #[test]
    fn sweep_without_leader_follows_configuration_order() {
        let mut selector = AddressSelector::new(members());

        assert_eq!(selector.next(), Some(addr(1)));
        assert_eq!(selector.next(), Some(addr(2)));
        assert_eq!(selector.next(), Some(addr(3)));
        assert!(!selector.has_next());
        assert_eq!(selector.next(), None);
    }

    #[test]
    fn leader_is_tried_first_and_not_repeated() {
        let mut selector = AddressSelector::new(members());
        selector.reset_with(Some(addr(2)), members());

        assert_eq!(selector.next(), Some(addr(2)));
        assert_eq!(selector.next(), Some(addr(1)));
        assert_eq!(selector.next(), Some(addr(3)));
        assert!(!selector.has_next());
    }

    #[test]
    fn reset_latch_is_lowered_by_next() {
        let mut selector = AddressSelector::new(members());
        assert_eq!(selector.state(), SelectorState::Reset);

        selector.next();
        assert_eq!(selector.state(), SelectorState::Iterating);

        selector.reset_with(Some(addr(3)), members());
        assert_eq!(selector.state(), SelectorState::Reset);
    }

    #[test]
    fn unchanged_view_does_not_supersede_the_sweep() {
        let mut selector = AddressSelector::new(members());
        selector.reset_with(Some(addr(1)), members());
        assert_eq!(selector.next(), Some(addr(1)));

        // Same leader, same members: the cursor and latch must survive.
        selector.reset_with(Some(addr(1)), members());
        assert_eq!(selector.state(), SelectorState::Iterating);
        assert_eq!(selector.next(), Some(addr(2)));
    }

    #[test]
    fn plain_reset_forgets_the_leader() {
        let mut selector = AddressSelector::new(members());
        selector.reset_with(Some(addr(3)), members());

        selector.reset();
        assert_eq!(selector.leader(), None);
        assert_eq!(selector.next(), Some(addr(1)));
    }

    #[test]
    fn new_view_restarts_the_sweep() {
        let mut selector = AddressSelector::new(members());
        selector.next();
        selector.next();

        selector.reset_with(Some(addr(3)), vec![addr(3), addr(4)]);
        assert_eq!(selector.next(), Some(addr(3)));
        assert_eq!(selector.next(), Some(addr(4)));
        assert!(!selector.has_next());
    }
}
