use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsError {
    #[error("JS evaluation error: {0}")]
    Eval(String),

    #[error("JS function call error: {0}")]
    Call(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("host function registration failed: {0}")]
    Host(String),
}
