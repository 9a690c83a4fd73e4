use super::definition::{FilterConfig, FilterOperator};

/// Why a raw filter value was not turned into a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownOperator(String),
    OperatorNotAllowed(FilterOperator),
    WrongArity { operator: FilterOperator, count: usize },
    NoFields,
    InvalidValue(String),
    EnumValueNotAllowed(String),
    Unsupported(FilterOperator),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperator(op) => write!(f, "unknown operator '{op}'"),
            Self::OperatorNotAllowed(op) => write!(f, "operator '{op}' not allowed"),
            Self::WrongArity { operator, count } => {
                write!(f, "operator '{operator}' does not take {count} value(s)")
            }
            Self::NoFields => f.write_str("no target columns"),
            Self::InvalidValue(value) => write!(f, "cannot parse value '{value}'"),
            Self::EnumValueNotAllowed(value) => write!(f, "'{value}' is not an allowed value"),
            Self::Unsupported(op) => write!(f, "operator '{op}' unsupported for this type"),
        }
    }
}

/// A parsed `"<op>:<v1,v2,...>"` filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOperation {
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl FilterOperation {
    /// Splits on the first `:`. Without one the whole string is a single `eq` value.
    /// Values are split on `,` with no escaping.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::UnknownOperator`] when the prefix is not an operator name.
    pub fn parse(raw: &str) -> Result<Self, Rejection> {
        match raw.split_once(':') {
            None => Ok(Self {
                operator: FilterOperator::Eq,
                values: vec![raw.to_string()],
            }),
            Some((op, rest)) => {
                let operator = op
                    .parse()
                    .map_err(|_| Rejection::UnknownOperator(op.to_string()))?;
                Ok(Self {
                    operator,
                    values: rest.split(',').map(str::to_string).collect(),
                })
            }
        }
    }

    /// Checks the operator against the config and the value count against the operator.
    ///
    /// # Errors
    ///
    /// Returns the first rule the operation breaks.
    pub fn validate(&self, config: &FilterConfig) -> Result<(), Rejection> {
        if !config.allowed_operators().contains(&self.operator) {
            return Err(Rejection::OperatorNotAllowed(self.operator));
        }
        if !self.operator.accepts_arity(self.values.len()) {
            return Err(Rejection::WrongArity {
                operator: self.operator,
                count: self.values.len(),
            });
        }
        Ok(())
    }

    /// The single value of a unary operation.
    #[must_use]
    pub fn first(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }
}
