//! The PRISM-subset program model: variables, guarded commands, labels and
//! reward structures, parsed from sketch text after hole/constant
//! substitution, without a dependency on an external expression-manager
//! library (an out-of-scope external collaborator — see `SPEC_FULL.md` §3).

use std::collections::HashMap;

use crate::error::{Result, SynthesisError};

use super::expr::Expr;
use super::parser::{parse_expr, parse_update, UpdateTerm};

/// A declared, bounded-range integer (or boolean, represented as `0..1`)
/// variable.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub min: i64,
    pub max: i64,
    pub init: i64,
}

/// One guarded command: `[action] guard -> update;`.
#[derive(Debug, Clone)]
pub struct Command {
    pub action: Option<String>,
    pub guard: Expr,
    pub updates: Vec<UpdateTerm>,
}

/// One line of a `rewards "name" ... endrewards` block: a transition reward
/// earned when `action`/`guard` match the source state of a taken command.
#[derive(Debug, Clone)]
pub struct RewardItem {
    pub action: Option<String>,
    pub guard: Expr,
    pub value: Expr,
}

/// A hole declared by `hole <type> <name> in { opt1, opt2, ... };`, with its
/// option labels resolved to literal values.
#[derive(Debug, Clone)]
pub struct HoleDecl {
    pub name: String,
    pub option_labels: Vec<String>,
    pub option_values: Vec<f64>,
}

/// The parsed sketch program: declarations plus the guarded commands that
/// define its transition structure.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub variables: Vec<VarDecl>,
    pub commands: Vec<Command>,
    pub labels: HashMap<String, Expr>,
    pub rewards: HashMap<String, Vec<RewardItem>>,
    pub holes: Vec<HoleDecl>,
    /// Variables declared `observable <name>;`, defining the POMDP's
    /// observation classes as the tuple of their values (see `SPEC_FULL.md`
    /// §4.8's note that memory-unfolded holes are consumed, not produced,
    /// by this crate).
    pub observables: Vec<String>,
}

/// Rewrites `hole <type> <name> in { opt1, opt2, ... };` lines to
/// `const <type> <name>;`, returning the rewritten body and the original
/// option-label lists, exactly as `PrismParser.load_sketch_prism` does.
fn rewrite_holes(text: &str) -> (String, Vec<(String, Vec<String>)>) {
    let mut output = String::new();
    let mut holes = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("hole ") {
            // Split on the whitespace-delimited `in` keyword, not a bare
            // substring match: `int` itself contains "in", which would
            // otherwise split a `hole int ...` declaration one character
            // into its own type keyword.
            if let Some((header, options)) = rest.split_once(" in ") {
                let options = options.trim();
                if let Some(options) = options
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix("};").or_else(|| s.strip_suffix("}")))
                {
                    let mut parts = header.split_whitespace();
                    let hole_type = parts.next().unwrap_or_default();
                    let hole_name = parts.next().unwrap_or_default();
                    let option_labels: Vec<String> =
                        options.split(',').map(|s| s.trim().to_string()).collect();
                    holes.push((hole_name.to_string(), option_labels));
                    output.push_str(&format!("const {} {};\n", hole_type, hole_name));
                    continue;
                }
            }
        }
        output.push_str(line);
        output.push('\n');
    }
    (output, holes)
}

/// Applies a `--constants "k1=v1,k2=v2"` string, substituting each
/// whole-word occurrence of `k` with its value everywhere in `text`. Mirrors
/// `PrismParser.map_constants` + `prism.define_constants().substitute_constants()`,
/// done here as textual substitution since this crate's expression model has
/// no separate constant-propagation pass.
fn substitute_constants(text: &str, constants_str: &str) -> Result<String> {
    let constants_str = constants_str.replace(' ', "");
    if constants_str.is_empty() {
        return Ok(text.to_string());
    }
    let mut result = text.to_string();
    for definition in constants_str.split(',') {
        let (name, value) = definition.split_once('=').ok_or_else(|| {
            SynthesisError::parse(format!("expected key=value pair, got '{}'", definition))
        })?;
        result = replace_word(&result, name, value);
    }
    Ok(result)
}

/// Replaces whole-word occurrences of `name` with `value` in `text`,
/// skipping occurrences that are part of a longer identifier.
fn replace_word(text: &str, name: &str, value: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let name_chars: Vec<char> = name.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let matches = chars[i..].starts_with(&name_chars[..])
            && !chars
                .get(i.wrapping_sub(1))
                .is_some_and(|c| c.is_alphanumeric() || *c == '_')
            && !chars
                .get(i + name_chars.len())
                .is_some_and(|c| c.is_alphanumeric() || *c == '_');
        if matches {
            output.push_str(value);
            i += name_chars.len();
        } else {
            output.push(chars[i]);
            i += 1;
        }
    }
    output
}

/// Reads and parses a sketch file: rewrites hole declarations, substitutes
/// `--constants`, and parses the remaining PRISM-subset body.
///
/// # Errors
///
/// Returns [`SynthesisError::Parse`] on a malformed statement and
/// [`SynthesisError::UndefinedConstant`] if a declared constant is neither a
/// hole nor given a value by `constants_str`.
pub fn parse_sketch(text: &str, constants_str: &str) -> Result<Program> {
    let (rewritten, hole_definitions) = rewrite_holes(text);
    let substituted = substitute_constants(&rewritten, constants_str)?;

    let mut program = Program::default();
    let mut declared_consts: HashMap<String, Option<f64>> = HashMap::new();
    let hole_names: std::collections::HashSet<&str> =
        hole_definitions.iter().map(|(name, _)| name.as_str()).collect();

    let mut current_rewards: Option<String> = None;

    for raw_line in substituted.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() || line == "module" {
            continue;
        }
        if line.starts_with("module ") || line == "endmodule" {
            continue;
        }
        if let Some(name) = line.strip_prefix("rewards ") {
            let name = name.trim().trim_matches('"').to_string();
            program.rewards.entry(name.clone()).or_default();
            current_rewards = Some(name);
            continue;
        }
        if line == "endrewards" {
            current_rewards = None;
            continue;
        }
        if let Some(rest) = line.strip_prefix("observable ") {
            let name = rest.trim_end_matches(';').trim().to_string();
            program.observables.push(name);
            continue;
        }
        if let Some(rest) = line.strip_prefix("label ") {
            parse_label(&mut program, rest)?;
            continue;
        }
        if let Some(rest) = line.strip_prefix("const ") {
            parse_const(rest, &mut declared_consts)?;
            continue;
        }
        if let Some(ref reward_name) = current_rewards {
            parse_reward_item(&mut program, reward_name, line)?;
            continue;
        }
        if line.contains("->") {
            parse_command(&mut program, line)?;
            continue;
        }
        if line.contains(':') && line.contains("..") {
            parse_var_decl(&mut program, line)?;
            continue;
        }
        return Err(SynthesisError::parse(format!("unrecognized statement: '{}'", line)));
    }

    for (name, value) in &declared_consts {
        if hole_names.contains(name.as_str()) {
            continue;
        }
        match value {
            Some(_) => {}
            None => return Err(SynthesisError::undefined_constant(name)),
        }
    }

    for (hole_name, option_labels) in hole_definitions {
        let option_values = option_labels
            .iter()
            .map(|label| parse_expr(label).and_then(|e| e.eval(&HashMap::new())))
            .collect::<Result<Vec<_>>>()?;
        program.holes.push(HoleDecl {
            name: hole_name,
            option_labels,
            option_values,
        });
    }

    // bake defined (non-hole) constants directly into every expression by
    // substitution, mirroring `prism.define_constants().substitute_constants()`.
    for (name, value) in declared_consts {
        if let Some(value) = value {
            substitute_program_constant(&mut program, &name, value);
        }
    }

    Ok(program)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(index) => &line[..index],
        None => line,
    }
}

fn parse_label(program: &mut Program, rest: &str) -> Result<()> {
    let rest = rest.trim_end_matches(';');
    let (name, expr) = rest
        .split_once('=')
        .ok_or_else(|| SynthesisError::parse(format!("malformed label: '{}'", rest)))?;
    let name = name.trim().trim_matches('"').to_string();
    program.labels.insert(name, parse_expr(expr.trim())?);
    Ok(())
}

fn parse_const(rest: &str, declared: &mut HashMap<String, Option<f64>>) -> Result<()> {
    let rest = rest.trim_end_matches(';').trim();
    if let Some((decl, value)) = rest.split_once('=') {
        let name = decl.split_whitespace().last().ok_or_else(|| {
            SynthesisError::parse(format!("malformed const declaration: '{}'", rest))
        })?;
        let value = parse_expr(value.trim())?.eval(&HashMap::new())?;
        declared.insert(name.to_string(), Some(value));
    } else {
        let name = rest.split_whitespace().last().ok_or_else(|| {
            SynthesisError::parse(format!("malformed const declaration: '{}'", rest))
        })?;
        declared.entry(name.to_string()).or_insert(None);
    }
    Ok(())
}

fn parse_var_decl(program: &mut Program, line: &str) -> Result<()> {
    let line = line.trim_end_matches(';');
    let (name, rest) = line
        .split_once(':')
        .ok_or_else(|| SynthesisError::parse(format!("malformed variable declaration: '{}'", line)))?;
    let name = name.trim().to_string();

    let (range, init) = match rest.split_once("init") {
        Some((range, init)) => (range.trim(), Some(init.trim())),
        None => (rest.trim(), None),
    };
    let range = range
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    let (min_str, max_str) = range
        .split_once("..")
        .ok_or_else(|| SynthesisError::parse(format!("malformed variable range: '{}'", range)))?;
    let min = parse_expr(min_str.trim())?.eval(&HashMap::new())? as i64;
    let max = parse_expr(max_str.trim())?.eval(&HashMap::new())? as i64;
    let init = match init {
        Some(expr) => parse_expr(expr)?.eval(&HashMap::new())? as i64,
        None => min,
    };

    program.variables.push(VarDecl { name, min, max, init });
    Ok(())
}

fn parse_command(program: &mut Program, line: &str) -> Result<()> {
    let line = line.trim_end_matches(';');
    let (action, rest) = if let Some(stripped) = line.trim_start().strip_prefix('[') {
        let (label, rest) = stripped
            .split_once(']')
            .ok_or_else(|| SynthesisError::parse(format!("unterminated action label in '{}'", line)))?;
        (
            if label.trim().is_empty() {
                None
            } else {
                Some(label.trim().to_string())
            },
            rest,
        )
    } else {
        (None, line)
    };

    let (guard_str, update_str) = rest
        .split_once("->")
        .ok_or_else(|| SynthesisError::parse(format!("command missing '->': '{}'", line)))?;
    let guard = parse_expr(guard_str.trim())?;
    let updates = parse_update(update_str.trim())?;
    program.commands.push(Command { action, guard, updates });
    Ok(())
}

fn parse_reward_item(program: &mut Program, reward_name: &str, line: &str) -> Result<()> {
    let line = line.trim_end_matches(';');
    let (action, rest) = if let Some(stripped) = line.trim_start().strip_prefix('[') {
        let (label, rest) = stripped
            .split_once(']')
            .ok_or_else(|| SynthesisError::parse(format!("unterminated action label in '{}'", line)))?;
        (
            if label.trim().is_empty() {
                None
            } else {
                Some(label.trim().to_string())
            },
            rest,
        )
    } else {
        (None, line)
    };
    let (guard_str, value_str) = rest
        .split_once(':')
        .ok_or_else(|| SynthesisError::parse(format!("malformed reward item: '{}'", line)))?;
    let guard = parse_expr(guard_str.trim())?;
    let value = parse_expr(value_str.trim())?;
    program
        .rewards
        .entry(reward_name.to_string())
        .or_default()
        .push(RewardItem { action, guard, value });
    Ok(())
}

fn substitute_program_constant(program: &mut Program, name: &str, value: f64) {
    for command in &mut program.commands {
        command.guard = command.guard.substitute(name, value);
        for term in &mut command.updates {
            term.probability = term.probability.substitute(name, value);
            for assign in &mut term.assigns {
                assign.value = assign.value.substitute(name, value);
            }
        }
    }
    for expr in program.labels.values_mut() {
        *expr = expr.substitute(name, value);
    }
    for items in program.rewards.values_mut() {
        for item in items {
            item.guard = item.guard.substitute(name, value);
            item.value = item.value.substitute(name, value);
        }
    }
}
