use cubit::CubitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CubitTestError {
    #[error("seed rejected: {0}")]
    Seed(#[source] CubitError),

    #[error("expected states {expected} but got {actual}")]
    States { expected: String, actual: String },

    #[error("expected errors {expected:?} but got {actual:?}")]
    Errors {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}
