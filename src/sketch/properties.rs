//! Parses a properties file into a [`Specification`], over this crate's own
//! small formula grammar (`P=? [F "label"]` / `R{"name"}=? [F "label"]`).

use crate::error::{Result, SynthesisError};
use crate::specification::{
    Comparison, ConstraintProperty, Formula, FormulaKind, OptimalityProperty, OptimizationDirection,
    Specification,
};

/// Parses the properties file contents (already read from disk) into a
/// [`Specification`].
///
/// Each non-empty, non-`//`-comment line holds one property:
/// `P>=0.8 [F "goal"]`, `R{"cost"}<=10 [F "goal"]` for a bounded constraint,
/// or `Pmax=? [F "goal"]` / `R{"cost"}{0.01}min=? [F "goal"]` for the (at
/// most one) optimality objective.
///
/// # Errors
///
/// Returns [`SynthesisError::InvalidSpecification`] if more than one
/// optimality property is given, or if a line has neither a bound nor an
/// optimality marker.
pub fn parse_specification(text: &str) -> Result<Specification> {
    let mut constraints = Vec::new();
    let mut optimality = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let line = line.trim_end_matches(';');

        if let Some(parsed) = parse_optimality_line(line)? {
            if optimality.is_some() {
                return Err(SynthesisError::invalid_specification(
                    "two optimality formulae specified",
                ));
            }
            optimality = Some(parsed);
        } else {
            constraints.push(parse_constraint_line(line)?);
        }
    }

    Ok(Specification::new(constraints, optimality))
}

fn parse_optimality_line(line: &str) -> Result<Option<OptimalityProperty>> {
    let (direction, prefix) = if line.contains("max=?") {
        (OptimizationDirection::Maximize, "max=?")
    } else if line.contains("min=?") {
        (OptimizationDirection::Minimize, "min=?")
    } else {
        return Ok(None);
    };

    let (head, tail) = line
        .split_once(prefix)
        .expect("prefix was just found in line");
    let epsilon = parse_relative_error(head)?;
    let head = strip_relative_error(head);
    let formula = parse_formula(&format!("{}{}", head, tail))?;
    Ok(Some(OptimalityProperty {
        formula,
        direction,
        epsilon,
    }))
}

fn parse_relative_error(head: &str) -> Result<f64> {
    match head.rfind('{').zip(head.rfind('}')) {
        Some((open, close)) if open < close => head[open + 1..close]
            .parse::<f64>()
            .map_err(|e| SynthesisError::parse(format!("invalid relative error: {}", e))),
        _ => Ok(0.0),
    }
}

fn strip_relative_error(head: &str) -> String {
    match head.rfind('{').zip(head.rfind('}')) {
        Some((open, close)) if open < close => {
            format!("{}{}", &head[..open], &head[close + 1..])
        }
        _ => head.to_string(),
    }
}

fn parse_constraint_line(line: &str) -> Result<ConstraintProperty> {
    let (head, comparison) = if let Some(rest) = line.find(">=").map(|i| (i, 2)) {
        (rest, Comparison::AtLeast(0.0))
    } else if let Some(rest) = line.find("<=").map(|i| (i, 2)) {
        (rest, Comparison::AtMost(0.0))
    } else {
        return Err(SynthesisError::invalid_specification(format!(
            "property has neither a bound nor an optimality marker: '{}'",
            line
        )));
    };
    let (op_index, op_len) = head;
    let prefix = &line[..op_index];
    let rest = &line[op_index + op_len..];
    let split = rest
        .find(|c: char| c == '[')
        .ok_or_else(|| SynthesisError::parse(format!("malformed property: '{}'", line)))?;
    let bound_str = rest[..split].trim();
    let bound: f64 = bound_str
        .parse()
        .map_err(|e| SynthesisError::parse(format!("invalid bound '{}': {}", bound_str, e)))?;
    let comparison = match comparison {
        Comparison::AtLeast(_) => Comparison::AtLeast(bound),
        Comparison::AtMost(_) => Comparison::AtMost(bound),
    };
    let formula = parse_formula(&format!("{}=?{}", prefix, &rest[split..]))?;
    Ok(ConstraintProperty { formula, comparison })
}

/// Parses `P=? [F "label"]` or `R{"name"}=? [F "label"]` into a [`Formula`].
fn parse_formula(text: &str) -> Result<Formula> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('P') {
        let rest = rest.trim_start_matches("=?").trim();
        let target = parse_bracketed_target(rest)?;
        Ok(Formula {
            kind: FormulaKind::Reachability { target_label: target },
        })
    } else if let Some(rest) = text.strip_prefix('R') {
        let open = rest
            .find('{')
            .ok_or_else(|| SynthesisError::parse(format!("expected reward name in '{}'", text)))?;
        let close = rest[open..]
            .find('}')
            .ok_or_else(|| SynthesisError::parse(format!("unterminated reward name in '{}'", text)))?
            + open;
        let reward_name = rest[open + 1..close].trim().trim_matches('"').to_string();
        let rest = rest[close + 1..].trim_start_matches("=?").trim();
        let target = parse_bracketed_target(rest)?;
        Ok(Formula {
            kind: FormulaKind::Reward {
                reward_name,
                target_label: target,
            },
        })
    } else {
        Err(SynthesisError::parse(format!(
            "unsupported formula kind in '{}'",
            text
        )))
    }
}

fn parse_bracketed_target(rest: &str) -> Result<String> {
    let rest = rest
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| SynthesisError::parse(format!("expected '[F \"label\"]', got '{}'", rest)))?
        .trim();
    let rest = rest
        .strip_prefix('F')
        .ok_or_else(|| SynthesisError::parse(format!("expected 'F \"label\"', got '{}'", rest)))?
        .trim();
    Ok(rest.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_constraint() {
        let spec = parse_specification(r#"P>=0.8 [F "goal"];"#).unwrap();
        assert_eq!(spec.constraints.len(), 1);
        assert!(spec.optimality.is_none());
        assert_eq!(spec.constraints[0].comparison, Comparison::AtLeast(0.8));
    }

    #[test]
    fn test_parse_optimality_with_epsilon() {
        let spec = parse_specification(r#"R{"cost"}{0.05}min=? [F "goal"];"#).unwrap();
        let optimality = spec.optimality.unwrap();
        assert_eq!(optimality.epsilon, 0.05);
        assert_eq!(optimality.direction, OptimizationDirection::Minimize);
        assert!(matches!(optimality.formula.kind, FormulaKind::Reward { .. }));
    }

    #[test]
    fn test_two_optimality_properties_rejected() {
        let text = "Pmax=? [F \"a\"];\nPmin=? [F \"b\"];\n";
        assert!(parse_specification(text).is_err());
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let text = "// a comment\n\nP>=0.5 [F \"goal\"];\n";
        let spec = parse_specification(text).unwrap();
        assert_eq!(spec.constraints.len(), 1);
    }
}
