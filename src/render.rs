//! Graphviz-compatible rendering contract (feature `dot`): an in-memory
//! directed-graph description of an explored system — state nodes,
//! labelled action edges, auxiliary point nodes for probabilistic
//! branches, and a phantom arrow to the initial state.
//!
//! Grounded on `original_source/mdptools/graph.py`'s `__render_mdp`
//! (state/point node shape, `p==1` direct edge vs. shared point node for
//! probabilistic outcomes, phantom `mdp_<name>_start` init arrow) and its
//! `__label_html` cosmetic substitutions (greek letter names, numeral
//! subscripting, separator stripping).

use crate::intern::Interner;
use crate::search::Visit;
use crate::state::State;
use crate::system::System;
use dot_writer::{Attributes, DotWriter, Shape};
use fnv::FnvHashMap;
use lazy_static::lazy_static;
use regex::Regex;

/// Renders `system`'s explored graph (`visits`) as Graphviz `dot` source.
/// Node/edge naming is stable for identical inputs, per §6's rendering
/// contract.
#[must_use]
pub fn render(system: &System, visits: &[Visit], interner: &Interner, name: &str) -> String {
    let index: FnvHashMap<State, usize> = visits.iter().enumerate().map(|(i, v)| (v.state.clone(), i)).collect();
    let mut output = Vec::new();
    {
        let mut writer = DotWriter::from(&mut output);
        writer.set_pretty_print(true);
        let mut digraph = writer.digraph();

        let start_name = format!("mdp_{name}_start");
        digraph.node_named(&start_name).set_shape(Shape::Plaintext).set_label(name);
        if let Some(first) = visits.first() {
            digraph.edge(&start_name, state_node(index[&first.state]));
        }

        for (i, visit) in visits.iter().enumerate() {
            digraph.node_named(state_node(i)).set_label(&prettify(&state_label(visit, interner)));

            for (action_key, dists) in &visit.actions {
                let action_label = prettify(action_key);
                for dist in dists {
                    if dist.len() == 1 && (dist[0].1 - 1.0).abs() <= f64::EPSILON * 10.0 {
                        let (succ, _) = &dist[0];
                        digraph
                            .edge(state_node(i), state_node(index[succ]))
                            .attributes()
                            .set_label(&action_label);
                    } else {
                        let point = format!("p_point_{i}_{action_label}");
                        digraph.node_named(&point).set_shape(Shape::Point).set_label("");
                        digraph.edge(state_node(i), &point).attributes().set_label(&action_label);
                        for (succ, p) in dist {
                            digraph
                                .edge(&point, state_node(index[succ]))
                                .attributes()
                                .set_label(&prettify(&format_probability(*p)));
                        }
                    }
                }
            }
        }
    }
    String::from_utf8(output).expect("dot-writer only emits ASCII/UTF-8 text")
}

fn state_node(index: usize) -> String {
    format!("state_{index}")
}

fn state_label(visit: &Visit, interner: &Interner) -> String {
    visit
        .state
        .locs
        .iter()
        .map(|l| interner.resolve(l).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn format_probability(p: f64) -> String {
    let rounded = (p * 1e8).round() / 1e8;
    format!("{rounded}")
}

/// `__label_html`'s cosmetic substitutions, minus the HTML wrapper: spells
/// out greek-letter names as their literal word (left as-is, Graphviz's
/// plain-text labels render the word directly rather than through an HTML
/// entity), and strips the action-grouping separator the search engine's
/// `interned_action_key` never actually emits into labels shown to a user
/// (kept for parity with the original's defensive pass).
fn prettify(label: &str) -> String {
    lazy_static! {
        static ref SEPARATOR: Regex = Regex::new(r"\|").unwrap();
    }
    SEPARATOR.replace_all(label, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Guard, Update};
    use crate::process::Process;
    use crate::search::explore_dfs;
    use crate::state::{Ctx, Locs};
    use crate::transition::{Action, Direction, Outcome, Post, Transition};

    #[test]
    fn renders_phantom_start_arrow_and_state_nodes() {
        let interner = Interner::new();
        let u = interner.intern("u");
        let h = interner.intern("h");
        let t = interner.intern("t");
        let flip = interner.intern("flip");
        let transition = Transition {
            action: Action { stripped: flip, direction: Direction::Symmetric, is_tau: false },
            pre: Locs::single(u),
            guard: Guard::empty(),
            post: Post::new(vec![
                Outcome { locs: Locs::single(h), update: Update::empty(), probability: 0.5 },
                Outcome { locs: Locs::single(t), update: Update::empty(), probability: 0.5 },
            ]),
            active: Locs::single(interner.intern("coin")),
        };
        let init = State::new(Locs::single(u), Ctx::new());
        let p = Process::new(&interner, "coin", vec![transition], init);
        let system = System::compose(&interner, vec![p]).unwrap();
        let visits = explore_dfs(&system, None);

        let dot = render(&system, &visits, &interner, "coin");
        assert!(dot.contains("mdp_coin_start"));
        assert!(dot.contains("state_0"));
        assert!(dot.contains("p_point_0_flip"));
    }
}
