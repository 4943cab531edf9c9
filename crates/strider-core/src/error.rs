//! Assembly and evaluation error types.

/// Component namespace in which a name collision occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    VariableGroup,
    ConstraintSet,
    CostTerm,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::VariableGroup => "variable group",
            ComponentKind::ConstraintSet => "constraint set",
            ComponentKind::CostTerm => "cost term",
        }
    }
}

/// Errors raised during problem assembly or at the first evaluation.
///
/// All of these are programmer errors in the driver; numerical issues
/// (NaN/Inf residuals) are passed through to the solver untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum NlpError {
    /// Two components of the same kind share a name.
    DuplicateName { kind: ComponentKind, name: String },
    /// Structural mutation after the container froze.
    FrozenContainer { container: &'static str },
    /// A constraint set or cost term depends on an unregistered group.
    UnlinkedGroup { consumer: String, group: String },
    /// A buffer or slice length disagrees with the declared dimension.
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Evaluation was requested on a facade with zero variables.
    EmptyProblem,
}

impl NlpError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            NlpError::DuplicateName { .. } => "NAME_DUPLICATE",
            NlpError::FrozenContainer { .. } => "CONTAINER_FROZEN",
            NlpError::UnlinkedGroup { .. } => "GROUP_UNLINKED",
            NlpError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            NlpError::EmptyProblem => "PROBLEM_EMPTY",
        }
    }
}

impl std::fmt::Display for NlpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NlpError::DuplicateName { kind, name } => write!(
                f,
                "[{}] A {} named '{}' is already registered",
                self.code(),
                kind.as_str(),
                name
            ),
            NlpError::FrozenContainer { container } => write!(
                f,
                "[{}] The {} container is frozen; register everything before the first flat access or link",
                self.code(),
                container
            ),
            NlpError::UnlinkedGroup { consumer, group } => write!(
                f,
                "[{}] '{}' depends on variable group '{}' which was never registered",
                self.code(),
                consumer,
                group
            ),
            NlpError::ShapeMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "[{}] {}: expected length {}, got {}",
                self.code(),
                context,
                expected,
                actual
            ),
            NlpError::EmptyProblem => write!(
                f,
                "[{}] Evaluation requested but no variables are registered",
                self.code()
            ),
        }
    }
}

impl std::error::Error for NlpError {}
