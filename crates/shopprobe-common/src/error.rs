use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Failures that end a dependent chain of probe steps.
///
/// Non-fatal outcomes (verifier mismatches, burst and cache verdicts) are not
/// errors; they are carried in their own report types.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A step returned a status other than the one it declared.
    #[error("{step}: expected HTTP {expected}, got {actual}")]
    UnexpectedStatus {
        step: String,
        expected: u16,
        actual: String,
        /// Pretty JSON if the body parsed, raw text otherwise.
        body: String,
    },

    /// None of the extraction strategies found the field.
    #[error("response shape not recognized: no `{field}` under {}", .tried.join(", "))]
    ShapeNotRecognized { field: String, tried: Vec<String> },

    /// A step tried to read a session slot no earlier step populated.
    #[error("session context has no `{slot}` yet")]
    MissingContext { slot: &'static str },

    /// A step tried to overwrite a slot populated by an earlier step.
    #[error("session context `{slot}` is already set")]
    ContextAlreadySet { slot: &'static str },

    #[error("transport failure on {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid URL for {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("purchase quantity {quantity} exceeds initial stock {stock}")]
    QuantityExceedsStock { quantity: u32, stock: u32 },

    #[error("cart total for price {price} x {quantity} does not fit in cents")]
    TotalOutOfRange { price: f64, quantity: u32 },

    #[error("failed to read config file {path}: {reason}")]
    File { path: String, reason: String },
}
