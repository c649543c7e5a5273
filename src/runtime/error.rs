use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable `{name}`")]
    UndefinedVariable { name: String },
    #[error("Undefined function `{name}`")]
    UndefinedFunction { name: String },
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch { message: String },
    #[error("Domain error: {message}")]
    DomainError { message: String },
    #[error("Arithmetic error: {message}")]
    ArithmeticError { message: String },
    #[error("`return` outside of a function body")]
    ReturnOutsideFunction,
}
