//! Restart strategies.
//!
//! A strategy is a pure decision function: given which child failed and the
//! ordered sibling list, it yields the set of children that must restart. It
//! holds no state of its own. The three variants follow the classic
//! supervision vocabulary:
//!
//! - `OneForOne`: independent children; only the failed one restarts
//! - `OneForAll`: interdependent children; everything restarts together
//! - `RestForOne`: startup-dependency chains; the failed child and everyone
//!   started after it restart
//!
//! The closed enum keeps dispatch to a single match with no trait objects.

use super::types::ChildId;

/// Which siblings restart when one child fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartStrategy {
    /// Restart only the failed child.
    #[default]
    OneForOne,

    /// Restart every child, in original start order.
    OneForAll,

    /// Restart the failed child and all children started after it.
    RestForOne,
}

impl RestartStrategy {
    /// Computes the ordered set of children to restart.
    ///
    /// The result preserves original start order. A failed id that is not in
    /// `order` yields an empty set (the child is already gone).
    pub fn restart_set(&self, failed: &ChildId, order: &[ChildId]) -> Vec<ChildId> {
        match self {
            RestartStrategy::OneForOne => {
                if order.contains(failed) {
                    vec![*failed]
                } else {
                    Vec::new()
                }
            }
            RestartStrategy::OneForAll => {
                if order.contains(failed) {
                    order.to_vec()
                } else {
                    Vec::new()
                }
            }
            RestartStrategy::RestForOne => match order.iter().position(|id| id == failed) {
                Some(index) => order[index..].to_vec(),
                None => Vec::new(),
            },
        }
    }

    /// Strategy name for events and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RestartStrategy::OneForOne => "OneForOne",
            RestartStrategy::OneForAll => "OneForAll",
            RestartStrategy::RestForOne => "RestForOne",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_children() -> Vec<ChildId> {
        vec![ChildId::new(), ChildId::new(), ChildId::new()]
    }

    #[test]
    fn one_for_one_targets_only_the_failed_child() {
        let order = three_children();
        let set = RestartStrategy::OneForOne.restart_set(&order[1], &order);
        assert_eq!(set, vec![order[1]]);
    }

    #[test]
    fn one_for_all_targets_everyone_in_start_order() {
        let order = three_children();
        let set = RestartStrategy::OneForAll.restart_set(&order[1], &order);
        assert_eq!(set, order);
    }

    #[test]
    fn rest_for_one_targets_failed_and_later_siblings() {
        let order = three_children();
        let set = RestartStrategy::RestForOne.restart_set(&order[1], &order);
        assert_eq!(set, vec![order[1], order[2]]);
    }

    #[test]
    fn rest_for_one_on_first_child_is_equivalent_to_one_for_all() {
        let order = three_children();
        let set = RestartStrategy::RestForOne.restart_set(&order[0], &order);
        assert_eq!(set, order);
    }

    #[test]
    fn rest_for_one_on_last_child_is_equivalent_to_one_for_one() {
        let order = three_children();
        let set = RestartStrategy::RestForOne.restart_set(&order[2], &order);
        assert_eq!(set, vec![order[2]]);
    }

    #[test]
    fn unknown_failed_child_yields_empty_set() {
        let order = three_children();
        let stranger = ChildId::new();
        for strategy in [
            RestartStrategy::OneForOne,
            RestartStrategy::OneForAll,
            RestartStrategy::RestForOne,
        ] {
            assert!(strategy.restart_set(&stranger, &order).is_empty());
        }
    }

    #[test]
    fn strategies_are_stateless_and_repeatable() {
        let order = three_children();
        let strategy = RestartStrategy::RestForOne;
        let first = strategy.restart_set(&order[1], &order);
        let second = strategy.restart_set(&order[1], &order);
        assert_eq!(first, second);
    }
}
