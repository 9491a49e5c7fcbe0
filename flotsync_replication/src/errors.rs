use snafu::prelude::*;

pub type Result<T> = std::result::Result<T, ReplicationError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReplicationError {
    #[snafu(display(
        "a node needs at least one known node (itself included) to place keys against"
    ))]
    NoKnownNodes,
}
