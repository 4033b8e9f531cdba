//! Builds the quotient MDP (and its design space / hole coloring) from a
//! parsed [`Program`] by expanding every command over the holes it
//! references, then exploring the reachable state space by forward BFS,
//! producing our own explicit-state sparse representation directly rather
//! than coloring an externally-built MDP.

use std::collections::{HashMap, VecDeque};

use fixedbitset::FixedBitSet;

use crate::error::{Result, SynthesisError};
use crate::family::{DesignSpace, Hole};
use crate::quotient::{Coloring, QuotientChoice, QuotientMdp};

use super::expr::{Env, Expr};
use super::parser::UpdateTerm;
use super::program::{Command, HoleDecl, Program, VarDecl};

/// A command variant with every referenced hole baked in to a literal
/// value, tagged with the hole-option requirement that enables it.
struct ColoredCommand<'a> {
    action: Option<&'a str>,
    guard: Expr,
    updates: Vec<UpdateTerm>,
    requirement: Vec<(usize, usize)>,
}

/// Expands every command of `program` over the holes it references,
/// producing one [`ColoredCommand`] per (command, hole-option combination)
/// pair.
fn colored_commands<'a>(
    program: &'a Program,
    hole_index: &HashMap<&str, usize>,
    holes: &[HoleDecl],
) -> Vec<ColoredCommand<'a>> {
    let mut result = Vec::new();
    for command in &program.commands {
        let referenced = referenced_holes(command, hole_index);
        if referenced.is_empty() {
            result.push(ColoredCommand {
                action: command.action.as_deref(),
                guard: command.guard.clone(),
                updates: command.updates.clone(),
                requirement: Vec::new(),
            });
            continue;
        }
        for combination in cartesian_options(&referenced, holes) {
            let mut guard = command.guard.clone();
            let mut updates = command.updates.clone();
            for &(hole, option) in &combination {
                let value = holes[hole].option_values[option];
                let name = &holes[hole].name;
                guard = guard.substitute(name, value);
                for term in &mut updates {
                    term.probability = term.probability.substitute(name, value);
                    for assign in &mut term.assigns {
                        assign.value = assign.value.substitute(name, value);
                    }
                }
            }
            result.push(ColoredCommand {
                action: command.action.as_deref(),
                guard,
                updates,
                requirement: combination,
            });
        }
    }
    result
}

fn referenced_holes(command: &Command, hole_index: &HashMap<&str, usize>) -> Vec<usize> {
    let mut holes = Vec::new();
    let mut push_from = |expr: &Expr, holes: &mut Vec<usize>| {
        for name in expr.identifiers() {
            if let Some(&index) = hole_index.get(name.as_str()) {
                if !holes.contains(&index) {
                    holes.push(index);
                }
            }
        }
    };
    push_from(&command.guard, &mut holes);
    for term in &command.updates {
        push_from(&term.probability, &mut holes);
        for assign in &term.assigns {
            push_from(&assign.value, &mut holes);
        }
    }
    holes.sort_unstable();
    holes
}

/// Every combination of options across `referenced` holes, as a sorted
/// `(hole, option)` requirement vector.
fn cartesian_options(referenced: &[usize], holes: &[HoleDecl]) -> Vec<Vec<(usize, usize)>> {
    let mut combinations = vec![Vec::new()];
    for &hole in referenced {
        let mut next = Vec::new();
        for combo in &combinations {
            for option in 0..holes[hole].option_values.len() {
                let mut extended = combo.clone();
                extended.push((hole, option));
                next.push(extended);
            }
        }
        combinations = next;
    }
    combinations
}

fn env_of(variables: &[VarDecl], state: &[i64]) -> Env {
    variables
        .iter()
        .zip(state)
        .map(|(v, &value)| (v.name.clone(), value as f64))
        .collect()
}

/// Builds the quotient MDP, design space and label metadata for `program`
/// by BFS-exploring the state space reachable from the declared initial
/// valuation, expanding every command over the holes it references at each
/// visited state.
pub fn build_quotient(program: &Program) -> Result<(QuotientMdp, DesignSpace)> {
    let hole_index: HashMap<&str, usize> = program
        .holes
        .iter()
        .enumerate()
        .map(|(i, h)| (h.name.as_str(), i))
        .collect();
    let variants = colored_commands(program, &hole_index, &program.holes);
    let var_index: HashMap<&str, usize> = program
        .variables
        .iter()
        .enumerate()
        .map(|(i, v)| (v.name.as_str(), i))
        .collect();

    let init_state: Vec<i64> = program.variables.iter().map(|v| v.init).collect();
    let mut state_index: HashMap<Vec<i64>, usize> = HashMap::new();
    let mut states: Vec<Vec<i64>> = Vec::new();
    state_index.insert(init_state.clone(), 0);
    states.push(init_state);

    let mut row_starts = vec![0usize];
    let mut choices = Vec::new();
    let mut requirements = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(0usize);

    while let Some(state_id) = queue.pop_front() {
        let env = env_of(&program.variables, &states[state_id]);
        let mut enabled = 0usize;

        for variant in &variants {
            if variant.guard.eval(&env)?.eq(&0.0) {
                continue;
            }

            let mut successors: HashMap<usize, f64> = HashMap::new();
            for term in &variant.updates {
                let probability = term.probability.eval(&env)?;
                let mut next = states[state_id].clone();
                for assign in &term.assigns {
                    let &var = var_index.get(assign.var.as_str()).ok_or_else(|| {
                        SynthesisError::model_checker_failure(format!(
                            "update assigns undeclared variable '{}'",
                            assign.var
                        ))
                    })?;
                    let value = assign.value.eval(&env)?.round() as i64;
                    let bounds = &program.variables[var];
                    if value < bounds.min || value > bounds.max {
                        return Err(SynthesisError::model_checker_failure(format!(
                            "update assigns {}={} outside declared range [{}..{}]",
                            assign.var, value, bounds.min, bounds.max
                        )));
                    }
                    next[var] = value;
                }
                let next_id = *state_index.entry(next.clone()).or_insert_with(|| {
                    states.push(next);
                    queue.push_back(states.len() - 1);
                    states.len() - 1
                });
                *successors.entry(next_id).or_insert(0.0) += probability;
            }

            let mut rewards = HashMap::new();
            for (reward_name, items) in &program.rewards {
                let mut total = 0.0;
                for item in items {
                    if item.action.as_deref() != variant.action {
                        continue;
                    }
                    // A reward item may reference the same holes its command
                    // variant was colored by (PRISM lets reward structures
                    // read module constants just like guards/updates do), so
                    // bake in this variant's requirement before evaluating.
                    let mut guard = item.guard.clone();
                    let mut value = item.value.clone();
                    for &(hole, option) in &variant.requirement {
                        let literal = program.holes[hole].option_values[option];
                        let name = &program.holes[hole].name;
                        guard = guard.substitute(name, literal);
                        value = value.substitute(name, literal);
                    }
                    if guard.eval(&env)?.ne(&0.0) {
                        total += value.eval(&env)?;
                    }
                }
                rewards.insert(reward_name.clone(), total);
            }

            choices.push(QuotientChoice {
                successors: successors.into_iter().collect(),
                rewards,
            });
            requirements.push(variant.requirement.clone());
            enabled += 1;
        }
        row_starts.push(row_starts.last().unwrap() + enabled);
    }

    let labels = build_labels(program, &states)?;
    let num_holes = program.holes.len();

    let quotient = QuotientMdp {
        num_states: states.len(),
        row_starts,
        choices,
        labels,
        initial_state: 0,
        coloring: Coloring::new(requirements),
        num_holes,
    };

    let design_space = DesignSpace::new(
        program
            .holes
            .iter()
            .map(|h| Hole::new(h.name.clone(), h.option_labels.clone()))
            .collect(),
    );

    Ok((quotient, design_space))
}

fn build_labels(program: &Program, states: &[Vec<i64>]) -> Result<HashMap<String, FixedBitSet>> {
    let mut labels = HashMap::new();
    for (name, expr) in &program.labels {
        let mut set = FixedBitSet::with_capacity(states.len());
        for (state_id, state) in states.iter().enumerate() {
            let env = env_of(&program.variables, state);
            if expr.eval(&env)?.ne(&0.0) {
                set.insert(state_id);
            }
        }
        labels.insert(name.clone(), set);
    }
    Ok(labels)
}
