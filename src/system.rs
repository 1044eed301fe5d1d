//! Composition (§4.4): combining processes into one global system,
//! synchronizing matching action labels.
//!
//! Grounded on `original_source/mdptools/mdp2.py::combine_transitions`
//! (histogram over stripped action labels, `itertools.product` over the
//! synchronized queues) generalized for the `!`/`?` driver/receiver rule of
//! §4.4 step 4, which the Python version didn't distinguish — there every
//! participant synchronized via a plain Cartesian product regardless of
//! direction suffix.

use crate::error::CompositionError;
use crate::intern::{Id, Interner};
use crate::process::Process;
use crate::state::State;
use crate::transition::{Direction, Transition};
use fnv::FnvHashMap;
use itertools::Itertools;

/// `M = (Processes, Transitions, Init)`.
#[derive(Clone, Debug)]
pub struct System {
    pub processes: Vec<Process>,
    pub transitions: Vec<Transition>,
    pub init: State,
}

struct Group {
    process_index: usize,
    transition_indices: Vec<usize>,
}

impl System {
    /// Composes `processes` (kept in the given order, observable only in
    /// emission/rendering per §3) into a global system.
    pub fn compose(interner: &Interner, processes: Vec<Process>) -> Result<System, CompositionError> {
        // Flatten (process_index, transition) in declaration order, the
        // canonical order internal transitions are emitted in.
        let mut by_action: FnvHashMap<Id, Vec<Group>> = FnvHashMap::default();
        let mut action_order: Vec<Id> = Vec::new();
        let mut internal = Vec::new();

        for (pi, process) in processes.iter().enumerate() {
            for (ti, transition) in process.transitions.iter().enumerate() {
                let action_id = transition.action.stripped;
                let synchronizable =
                    !transition.action.is_tau && processes.iter().filter(|p| has_action(p, action_id)).count() >= 2;
                if !synchronizable {
                    internal.push(transition.clone());
                    continue;
                }
                let groups = by_action.entry(action_id).or_insert_with(|| {
                    action_order.push(action_id);
                    Vec::new()
                });
                match groups.iter_mut().find(|g| g.process_index == pi) {
                    Some(g) => g.transition_indices.push(ti),
                    None => groups.push(Group { process_index: pi, transition_indices: vec![ti] }),
                }
            }
        }

        let mut transitions = internal;
        for action_id in action_order {
            let groups = &by_action[&action_id];
            let products = synchronize(interner, &processes, groups, action_id)?;
            transitions.extend(products);
        }

        let init = processes
            .iter()
            .fold(State::default(), |acc, p| acc.add(&p.init));

        Ok(System { processes, transitions, init })
    }

    /// Indices into [`System::transitions`] of the transitions enabled in
    /// `state`, in system order. The index, not the `Transition` value, is
    /// what the POR selectors in [`crate::selectors`] track membership by.
    #[must_use]
    pub fn enabled_indices(&self, state: &State) -> Vec<usize> {
        self.transitions
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_enabled(state))
            .map(|(i, _)| i)
            .collect()
    }

    #[must_use]
    pub fn enabled(&self, state: &State) -> Vec<Transition> {
        self.enabled_indices(state).into_iter().map(|i| self.transitions[i].clone()).collect()
    }
}

fn has_action(process: &Process, action_id: Id) -> bool {
    process.transitions.iter().any(|t| t.action.stripped == action_id)
}

fn synchronize(
    interner: &Interner,
    processes: &[Process],
    groups: &[Group],
    action_id: Id,
) -> Result<Vec<Transition>, CompositionError> {
    let driver_groups: Vec<&Group> = groups
        .iter()
        .filter(|g| {
            g.transition_indices
                .iter()
                .any(|&ti| processes[g.process_index].transitions[ti].action.direction == Direction::Send)
        })
        .collect();

    let mut products = Vec::new();
    if driver_groups.is_empty() {
        // No `a!` anywhere: full Cartesian product over all participants.
        let combos: Vec<Vec<usize>> = groups.iter().map(|g| g.transition_indices.clone()).multi_cartesian_product().collect();
        for combo in combos {
            products.push(build_product(interner, processes, groups, &combo, action_id)?);
        }
    } else {
        for driver_group in &driver_groups {
            let drivers: Vec<usize> = driver_group
                .transition_indices
                .iter()
                .copied()
                .filter(|&ti| processes[driver_group.process_index].transitions[ti].action.direction == Direction::Send)
                .collect();
            // Only a non-`Send` transition from each other participating
            // process counts as a receiver (§4.4 step 4); a second `a!`
            // group must not be consumed here, both because it isn't a
            // valid `a?`/`a` counterpart and because treating it as one
            // would double-generate the product across driver groups (once
            // with this group driving, once with the other).
            let receiver_groups: Vec<(usize, Vec<usize>)> = groups
                .iter()
                .filter(|g| g.process_index != driver_group.process_index)
                .map(|g| {
                    let indices = g
                        .transition_indices
                        .iter()
                        .copied()
                        .filter(|&ti| processes[g.process_index].transitions[ti].action.direction != Direction::Send)
                        .collect();
                    (g.process_index, indices)
                })
                .collect();
            let receiver_combos: Vec<Vec<usize>> = receiver_groups
                .iter()
                .map(|(_, indices)| indices.clone())
                .multi_cartesian_product()
                .collect();
            for &driver_ti in &drivers {
                for receiver_combo in &receiver_combos {
                    let mut members: Vec<(usize, usize)> = vec![(driver_group.process_index, driver_ti)];
                    for (&(pi, _), &ti) in receiver_groups.iter().zip(receiver_combo.iter()) {
                        members.push((pi, ti));
                    }
                    members.sort_by_key(|&(pi, ti)| (pi, ti));
                    products.push(fold_product(interner, processes, &members, action_id)?);
                }
            }
        }
    }
    Ok(products)
}

fn build_product(
    interner: &Interner,
    processes: &[Process],
    groups: &[Group],
    combo: &[usize],
    action_id: Id,
) -> Result<Transition, CompositionError> {
    let members: Vec<(usize, usize)> = groups.iter().zip(combo.iter()).map(|(g, &ti)| (g.process_index, ti)).collect();
    fold_product(interner, processes, &members, action_id)
}

fn fold_product(
    interner: &Interner,
    processes: &[Process],
    members: &[(usize, usize)],
    action_id: Id,
) -> Result<Transition, CompositionError> {
    let mut iter = members.iter().map(|&(pi, ti)| processes[pi].transitions[ti].clone());
    let mut acc = iter.next().expect("synchronization group is never empty");
    let stripped_action = crate::transition::Action {
        stripped: action_id,
        direction: crate::transition::Direction::Symmetric,
        is_tau: false,
    };
    for next in iter {
        acc = acc.product(&next, stripped_action.clone(), interner)?;
    }
    acc.action = stripped_action;
    Ok(acc)
}
