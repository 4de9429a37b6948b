//! Declared types of variables, parameters and user-defined value types

use std::fmt;

use solidity_parser::Location;

use crate::model::ExprId;

/// A type as written in a declaration.
///
/// User-defined names are not resolved while building the document. They keep a handle
/// to the expression node of their last path segment, which the resolver looks up on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationType {
    pub shape: TypeShape,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Elementary(String),
    UserDefined {
        path: String,
        reference: Option<ExprId>,
    },
    Mapping {
        key: Box<DeclarationType>,
        value: Box<DeclarationType>,
    },
    Array {
        base: Box<DeclarationType>,
        length: Option<String>,
    },
    Function {
        parameters: Vec<DeclarationType>,
        returns: Vec<DeclarationType>,
    },
}

impl DeclarationType {
    /// Canonical signature of the type, usable as an equality key.
    ///
    /// Elementary aliases are expanded (`uint` becomes `uint256`), mappings render as
    /// `mapping(K => V)` and arrays as `T[]` or `T[N]`.
    #[must_use]
    pub fn type_string(&self) -> String {
        match &self.shape {
            TypeShape::Elementary(name) => canonical_elementary(name).to_string(),
            TypeShape::UserDefined { path, .. } => path.clone(),
            TypeShape::Mapping { key, value } => {
                format!("mapping({} => {})", key.type_string(), value.type_string())
            }
            TypeShape::Array { base, length } => {
                format!("{}[{}]", base.type_string(), length.as_deref().unwrap_or_default())
            }
            TypeShape::Function {
                parameters,
                returns,
            } => {
                let parameters = join_type_strings(parameters);
                if returns.is_empty() {
                    format!("function({parameters})")
                } else {
                    format!("function({parameters}) returns ({})", join_type_strings(returns))
                }
            }
        }
    }

    /// Name compared by `using ... for` directives: the canonical elementary name, the last
    /// segment of a user-defined path, the element name of an array, or `mapping`.
    #[must_use]
    pub fn name(&self) -> String {
        match &self.shape {
            TypeShape::Elementary(name) => canonical_elementary(name)
                .trim_end_matches(" payable")
                .to_string(),
            TypeShape::UserDefined { path, .. } => {
                path.rsplit('.').next().unwrap_or(path).to_string()
            }
            TypeShape::Array { base, .. } => base.name(),
            TypeShape::Mapping { .. } => "mapping".to_string(),
            TypeShape::Function { .. } => "function".to_string(),
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.shape, TypeShape::Array { .. })
    }

    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(self.shape, TypeShape::Mapping { .. })
    }

    /// The user-defined name this type is ultimately about: the value of a mapping, the
    /// element of an array, or the type itself.
    #[must_use]
    pub fn innermost_reference(&self) -> Option<ExprId> {
        match &self.shape {
            TypeShape::UserDefined { reference, .. } => *reference,
            TypeShape::Mapping { value, .. } => value.innermost_reference(),
            TypeShape::Array { base, .. } => base.innermost_reference(),
            TypeShape::Elementary(_) | TypeShape::Function { .. } => None,
        }
    }
}

impl fmt::Display for DeclarationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            TypeShape::Elementary(name) => f.write_str(name),
            TypeShape::UserDefined { path, .. } => f.write_str(path),
            TypeShape::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
            TypeShape::Array { base, length } => {
                write!(f, "{base}[{}]", length.as_deref().unwrap_or_default())
            }
            TypeShape::Function { .. } => f.write_str(&self.type_string()),
        }
    }
}

fn join_type_strings(types: &[DeclarationType]) -> String {
    types
        .iter()
        .map(DeclarationType::type_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Expand the elementary aliases to their canonical form.
#[must_use]
pub fn canonical_elementary(name: &str) -> &str {
    match name {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        other => other,
    }
}
