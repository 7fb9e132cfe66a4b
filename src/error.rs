use std::fmt;

/// Error taxonomy shared by adapters, the orchestrator and composers.
/// Implements Clone so results can be replayed by the retry helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Required credential (or other setting) is missing
    Configuration(String)
  , /// Provider name is not part of the supported set
    UnknownProvider(String)
  , /// No usable prompt or an out-of-range parameter
    InvalidRequest(String)
  , /// Vendor answered with a rate limit (HTTP 429)
    RateLimited(String)
  , /// Vendor rejected the credential (HTTP 401/403)
    AuthenticationFailed(String)
  , /// Connect failure, timeout or broken response stream
    ConnectionFailed(String)
  , /// Any other vendor failure, including undecodable replies
    VendorError(String)
}

impl Error
{   /// Whether a caller may retry the same call after a backoff.
    pub fn is_retryable(&self) -> bool
    {   matches!(
          self,
          Error::RateLimited(_) | Error::ConnectionFailed(_)
        )
    }

    /// Short machine-friendly label, used by the CLI output.
    pub fn kind(&self) -> &'static str
    {   match self
        {   Error::Configuration(_) => "configuration_error"
          , Error::UnknownProvider(_) => "unknown_provider"
          , Error::InvalidRequest(_) => "invalid_request"
          , Error::RateLimited(_) => "rate_limited"
          , Error::AuthenticationFailed(_) => "authentication_failed"
          , Error::ConnectionFailed(_) => "connection_failed"
          , Error::VendorError(_) => "vendor_error"
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Configuration(msg) => {
              write!(f, "Configuration error: {}", msg)
            }
          , Error::UnknownProvider(name) => {
              write!(f, "Unknown provider: {}", name)
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::RateLimited(msg) => {
              write!(f, "Rate limit exceeded: {}", msg)
            }
          , Error::AuthenticationFailed(msg) => {
              write!(f, "Authentication failed: {}", msg)
            }
          , Error::ConnectionFailed(msg) => {
              write!(f, "Connection error: {}", msg)
            }
          , Error::VendorError(msg) => {
              write!(f, "Vendor error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
