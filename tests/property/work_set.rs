use buildplan::dag::OrderedWorkSet;
use buildplan::errors::WorkSetError;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    Remove(u8),
    PollFirst,
    PollLast,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small element domain so adds and removes collide often.
    prop_oneof![
        4 => (0..16u8).prop_map(Op::Add),
        2 => (0..16u8).prop_map(Op::Remove),
        1 => Just(Op::PollFirst),
        1 => Just(Op::PollLast),
    ]
}

proptest! {
    #[test]
    fn behaves_like_an_insertion_ordered_vec(ops in proptest::collection::vec(op_strategy(), 0..200)) {
        let mut set: OrderedWorkSet<u8> = OrderedWorkSet::new();
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Add(e) => {
                    let fresh = !model.contains(&e);
                    if fresh {
                        model.push(e);
                    }
                    prop_assert_eq!(set.add(e), fresh);
                }
                Op::Remove(e) => {
                    let position = model.iter().position(|&m| m == e);
                    if let Some(i) = position {
                        model.remove(i);
                    }
                    prop_assert_eq!(set.remove(&e), position.is_some());
                }
                Op::PollFirst => {
                    let expected = if model.is_empty() { None } else { Some(model.remove(0)) };
                    prop_assert_eq!(set.poll_first().ok(), expected);
                }
                Op::PollLast => {
                    prop_assert_eq!(set.poll_last().ok(), model.pop());
                }
            }

            prop_assert!(set.is_consistent());
            prop_assert_eq!(set.len(), model.len());
            prop_assert_eq!(set.to_vec(), model.clone());
        }

        if model.is_empty() {
            prop_assert_eq!(set.first(), Err(WorkSetError::Empty));
        } else {
            prop_assert_eq!(set.first().ok(), model.first());
            prop_assert_eq!(set.last().ok(), model.last());
        }
    }

    #[test]
    fn neighbours_follow_insertion_order(elements in proptest::collection::btree_set(any::<u16>(), 1..50)) {
        let order: Vec<u16> = elements.into_iter().rev().collect();
        let set: OrderedWorkSet<u16> = order.iter().copied().collect();

        for (i, e) in order.iter().enumerate() {
            let before = i.checked_sub(1).map(|j| &order[j]);
            let after = order.get(i + 1);
            prop_assert_eq!(set.lower(e).unwrap(), before);
            prop_assert_eq!(set.higher(e).unwrap(), after);
            prop_assert_eq!(set.floor(e).unwrap(), Some(e));
            prop_assert_eq!(set.ceiling(e).unwrap(), Some(e));
        }

        let reversed: Vec<u16> = set.descending_iter().copied().collect();
        let mut expected = order.clone();
        expected.reverse();
        prop_assert_eq!(reversed, expected);
    }
}
