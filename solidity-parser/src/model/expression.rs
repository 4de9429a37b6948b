use serde::Serialize;

use crate::model::{Identifier, Location, TypeName};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExpressionKind {
    Identifier(Identifier),
    Literal(Literal),
    /// An elementary type used as a value, such as the callee of `address(x)`.
    ElementaryType(String),
    MemberAccess {
        expression: Box<Expression>,
        member: Identifier,
    },
    Index {
        base: Box<Expression>,
        index: Option<Box<Expression>>,
    },
    IndexRange {
        base: Box<Expression>,
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
    },
    Call {
        callee: Box<Expression>,
        arguments: CallArguments,
    },
    /// `f{value: 1, gas: 2}`
    CallOptions {
        callee: Box<Expression>,
        options: Vec<NamedArgument>,
    },
    New(TypeName),
    /// `type(T)`
    TypeInfo(TypeName),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assignment {
        operator: AssignmentOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    Tuple(Vec<Option<Expression>>),
    Array(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CallArguments {
    Positional(Vec<Expression>),
    Named(Vec<NamedArgument>),
}

impl CallArguments {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(arguments) => arguments.len(),
            Self::Named(arguments) => arguments.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the argument expressions in source order.
    pub fn expressions(&self) -> Box<dyn Iterator<Item = &Expression> + '_> {
        match self {
            Self::Positional(arguments) => Box::new(arguments.iter()),
            Self::Named(arguments) => Box::new(arguments.iter().map(|a| &a.value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedArgument {
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    Bool(bool),
    Number {
        value: String,
        unit: Option<String>,
    },
    String(String),
    HexString(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOperator {
    Not,
    BitNot,
    Negate,
    Plus,
    Delete,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitOr,
    BitXor,
    BitAnd,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssignmentOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitOr,
    BitAnd,
    BitXor,
    ShiftLeft,
    ShiftRight,
}

impl Expression {
    pub(crate) fn new(kind: ExpressionKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub(crate) fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        let location = left.location.join(&right.location);
        Self::new(
            ExpressionKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            location,
        )
    }

    pub(crate) fn assignment(
        operator: AssignmentOperator,
        left: Expression,
        right: Expression,
    ) -> Self {
        let location = left.location.join(&right.location);
        Self::new(
            ExpressionKind::Assignment {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            location,
        )
    }

    pub(crate) fn conditional(
        condition: Expression,
        if_true: Expression,
        if_false: Expression,
    ) -> Self {
        let location = condition.location.join(&if_false.location);
        Self::new(
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            location,
        )
    }

    /// The identifier this expression consists of, if it is a bare identifier.
    #[must_use]
    pub fn as_identifier(&self) -> Option<&Identifier> {
        if let ExpressionKind::Identifier(identifier) = &self.kind {
            Some(identifier)
        } else {
            None
        }
    }
}

/// Operators applied after a primary expression, folded left to right.
#[derive(Debug)]
pub(crate) enum PostfixOperation {
    Member(Identifier),
    Index(Option<Expression>),
    Range(Option<Expression>, Option<Expression>),
    Call(CallArguments),
    Options(Vec<NamedArgument>),
    Increment,
    Decrement,
}

impl PostfixOperation {
    pub(crate) fn apply(self, base: Expression, end: usize) -> Expression {
        let location = Location::new(base.location.start, end);
        let base = Box::new(base);
        let kind = match self {
            Self::Member(member) => ExpressionKind::MemberAccess {
                expression: base,
                member,
            },
            Self::Index(index) => ExpressionKind::Index {
                base,
                index: index.map(Box::new),
            },
            Self::Range(start, end) => ExpressionKind::IndexRange {
                base,
                start: start.map(Box::new),
                end: end.map(Box::new),
            },
            Self::Call(arguments) => ExpressionKind::Call {
                callee: base,
                arguments,
            },
            Self::Options(options) => ExpressionKind::CallOptions {
                callee: base,
                options,
            },
            Self::Increment => ExpressionKind::Unary {
                operator: UnaryOperator::PostIncrement,
                operand: base,
            },
            Self::Decrement => ExpressionKind::Unary {
                operator: UnaryOperator::PostDecrement,
                operand: base,
            },
        };
        Expression::new(kind, location)
    }
}
