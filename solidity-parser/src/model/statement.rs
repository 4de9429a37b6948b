use serde::Serialize;

use crate::model::{Expression, Identifier, Location, VariableDeclaration};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchClause {
    pub name: Option<Identifier>,
    pub parameters: Vec<VariableDeclaration>,
    pub body: Block,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Block(Block),
    Unchecked(Block),
    /// `uint a = 1;` or `(uint a, , bool c) = f();`
    VariableDeclaration {
        declarations: Vec<Option<VariableDeclaration>>,
        initializer: Option<Expression>,
        location: Location,
    },
    Expression {
        expression: Expression,
        location: Location,
    },
    If {
        condition: Expression,
        then: Box<Statement>,
        otherwise: Option<Box<Statement>>,
        location: Location,
    },
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
        location: Location,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
        location: Location,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
        location: Location,
    },
    Return {
        value: Option<Expression>,
        location: Location,
    },
    Emit {
        event: Expression,
        location: Location,
    },
    /// `revert CustomError(...)`; `revert("reason")` is a plain call expression.
    Revert {
        error: Expression,
        location: Location,
    },
    Try {
        expression: Expression,
        returns: Vec<VariableDeclaration>,
        body: Block,
        catches: Vec<CatchClause>,
        location: Location,
    },
    /// Inline assembly. The Yul body is skipped, only the range is kept.
    Assembly {
        location: Location,
    },
    Break(Location),
    Continue(Location),
}

impl Statement {
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::Block(block) | Self::Unchecked(block) => &block.location,
            Self::VariableDeclaration { location, .. }
            | Self::Expression { location, .. }
            | Self::If { location, .. }
            | Self::For { location, .. }
            | Self::While { location, .. }
            | Self::DoWhile { location, .. }
            | Self::Return { location, .. }
            | Self::Emit { location, .. }
            | Self::Revert { location, .. }
            | Self::Try { location, .. }
            | Self::Assembly { location }
            | Self::Break(location)
            | Self::Continue(location) => location,
        }
    }
}
