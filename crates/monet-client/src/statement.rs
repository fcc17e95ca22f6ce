//! Server-side prepared statements.

use monet_types::ParamType;

/// A server-side prepared statement.
///
/// The id is meaningful only against the connection that prepared it;
/// exec and deallocate must go through that same connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    id: String,
    parameters: Vec<ParamType>,
}

impl PreparedStatement {
    pub(crate) fn new(id: String, parameters: Vec<ParamType>) -> Self {
        Self { id, parameters }
    }

    /// The server-assigned statement id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Placeholder types in parameter order.
    #[must_use]
    pub fn parameters(&self) -> &[ParamType] {
        &self.parameters
    }

    /// Number of placeholders.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.parameters.len()
    }
}
