#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("edge {from} -> {to} references an unknown node: {node}")]
    MissingEndpoint {
        from: String,
        to: String,
        node: String,
    },
    #[error("root node does not appear in the graph: {root}")]
    UnknownRoot { root: String },
    #[error("{name} = {value} is out of range (expected {expected})")]
    InvalidRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

impl Error {
    /// `true` for structural input problems (unknown ids), as opposed to bad configuration.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::MissingEndpoint { .. } | Error::UnknownRoot { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
