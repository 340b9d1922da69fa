pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Schema or reference violation in an input document. Raised before any
    /// solving; the message cites the first invalid record found.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// A constraint set that cannot be satisfied. The solver itself never
    /// returns this (it degrades to a best-effort layout and reports residual
    /// violation in its stats); strict callers promote the flag to this error.
    #[error("infeasible constraints: {0}")]
    InfeasibleConstraints(String),

    /// A drawing references a node id absent from the graph, or vice versa.
    #[error("render input mismatch: {0}")]
    RenderInputMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
