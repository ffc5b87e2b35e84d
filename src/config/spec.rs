//! Node group declarations
//!
//! A node group is declared on the command line as
//! `<min-servers>:<max-servers>:<machine-type>:<region>:<name>`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Expected layout of a declaration, used in error messages
pub const SPEC_FORMAT: &str = "<min-servers>:<max-servers>:<machine-type>:<region>:<name>";

const NAME_PATTERN: &str = r"^[a-z0-9A-Z]+[a-z0-9A-Z._-]*[a-z0-9A-Z]+$|^[a-z0-9A-Z]$";

/// Errors that can occur while parsing a node group declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("expected format `<min-servers>:<max-servers>:<machine-type>:<region>:<name>` got {0}")]
    WrongFieldCount(String),

    #[error("failed to set min size: {0}, expected non-negative integer")]
    InvalidMinSize(String),

    #[error("failed to set max size: {0}, expected non-negative integer")]
    InvalidMaxSize(String),

    #[error("max size {max} is smaller than min size {min}")]
    InvalidBounds { min: usize, max: usize },

    #[error("empty {0} field")]
    EmptyField(&'static str),

    #[error("invalid node group name `{0}`")]
    InvalidName(String),
}

/// A parsed and validated node group declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeGroupSpec {
    pub name: String,
    pub min_size: usize,
    pub max_size: usize,
    pub instance_type: String,
    pub region: String,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(NAME_PATTERN).expect("node group name pattern is valid"))
}

/// Check a node group name against the allowed pattern
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

// ============================================================================
// SBIO: Pure parsing functions (no I/O)
// ============================================================================

/// Parse a single declaration into a [`NodeGroupSpec`].
pub fn parse_node_group_spec(declaration: &str) -> Result<NodeGroupSpec, SpecError> {
    let tokens: Vec<&str> = declaration.split(':').collect();
    let [min, max, instance_type, region, name] = tokens.as_slice() else {
        return Err(SpecError::WrongFieldCount(declaration.to_string()));
    };

    let min_size = min
        .parse::<usize>()
        .map_err(|_| SpecError::InvalidMinSize(min.to_string()))?;
    let max_size = max
        .parse::<usize>()
        .map_err(|_| SpecError::InvalidMaxSize(max.to_string()))?;

    if max_size < min_size {
        return Err(SpecError::InvalidBounds {
            min: min_size,
            max: max_size,
        });
    }
    if instance_type.is_empty() {
        return Err(SpecError::EmptyField("machine-type"));
    }
    if region.is_empty() {
        return Err(SpecError::EmptyField("region"));
    }
    if !is_valid_name(name) {
        return Err(SpecError::InvalidName(name.to_string()));
    }

    Ok(NodeGroupSpec {
        name: name.to_string(),
        min_size,
        max_size,
        instance_type: instance_type.to_string(),
        region: region.to_string(),
    })
}

impl FromStr for NodeGroupSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_node_group_spec(s)
    }
}

impl fmt::Display for NodeGroupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.min_size, self.max_size, self.instance_type, self.region, self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_spec() {
        let spec = parse_node_group_spec("1:5:CX22:nbg1:pool-1").unwrap();
        assert_eq!(spec.min_size, 1);
        assert_eq!(spec.max_size, 5);
        assert_eq!(spec.instance_type, "CX22");
        assert_eq!(spec.region, "nbg1");
        assert_eq!(spec.name, "pool-1");
    }

    #[test]
    fn test_display_matches_declaration() {
        let declaration = "0:3:cpx31:fsn1:Node.Pool_2";
        let spec: NodeGroupSpec = declaration.parse().unwrap();
        assert_eq!(spec.to_string(), declaration);
    }

    #[test]
    fn test_wrong_field_count() {
        for declaration in ["", "1:2:cx22:nbg1", "1:2:cx22:nbg1:pool:extra", "pool"] {
            let result = parse_node_group_spec(declaration);
            assert_eq!(
                result,
                Err(SpecError::WrongFieldCount(declaration.to_string())),
                "declaration {:?}",
                declaration
            );
        }
    }

    #[test]
    fn test_wrong_field_count_names_format() {
        let err = parse_node_group_spec("1:2").unwrap_err();
        assert!(err.to_string().contains(SPEC_FORMAT));
    }

    #[test]
    fn test_non_integer_sizes() {
        assert_eq!(
            parse_node_group_spec("one:5:cx22:nbg1:pool"),
            Err(SpecError::InvalidMinSize("one".to_string()))
        );
        assert_eq!(
            parse_node_group_spec("1:-5:cx22:nbg1:pool"),
            Err(SpecError::InvalidMaxSize("-5".to_string()))
        );
        assert_eq!(
            parse_node_group_spec("-1:5:cx22:nbg1:pool"),
            Err(SpecError::InvalidMinSize("-1".to_string()))
        );
    }

    #[test]
    fn test_max_below_min() {
        assert_eq!(
            parse_node_group_spec("4:2:cx22:nbg1:pool"),
            Err(SpecError::InvalidBounds { min: 4, max: 2 })
        );
    }

    #[test]
    fn test_equal_bounds_and_zero_sizes() {
        assert!(parse_node_group_spec("0:0:cx22:nbg1:pool").is_ok());
        assert!(parse_node_group_spec("3:3:cx22:nbg1:pool").is_ok());
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(
            parse_node_group_spec("1:2::nbg1:pool"),
            Err(SpecError::EmptyField("machine-type"))
        );
        assert_eq!(
            parse_node_group_spec("1:2:cx22::pool"),
            Err(SpecError::EmptyField("region"))
        );
    }

    #[test]
    fn test_name_validation() {
        for name in ["a", "7", "node-1", "Node.Pool_2", "ab"] {
            assert!(is_valid_name(name), "{} should be valid", name);
        }
        for name in ["-abc", "abc-", "", "_", "a b", "pool/1"] {
            assert!(!is_valid_name(name), "{} should be invalid", name);
        }
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert_eq!(
            parse_node_group_spec("1:2:cx22:nbg1:-abc"),
            Err(SpecError::InvalidName("-abc".to_string()))
        );
        assert_eq!(
            parse_node_group_spec("1:2:cx22:nbg1:"),
            Err(SpecError::InvalidName(String::new()))
        );
    }
}
