use crate::tree::TreeId;

/// Rejected [`TreeConfig`](crate::TreeConfig) values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("initial capacity must be at least 1")]
    ZeroCapacity,
    #[error("max parallelism must be at least 1")]
    ZeroParallelism,
}

/// Errors returned by [`Tree`](crate::Tree) and [`TreeRegistry`](crate::TreeRegistry).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("tree {0} is disposed")]
    Disposed(TreeId),
    #[error("invalid tree configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
