pub(crate) const DEFAULT_LISTEN: &str = "0.0.0.0:5001";
pub(crate) const MINED_MESSAGE: &str = "Block mined successfully!";
pub(crate) const VALID_MESSAGE: &str = "All good. The chain is valid.";
pub(crate) const INVALID_MESSAGE: &str = "The chain is not valid.";
