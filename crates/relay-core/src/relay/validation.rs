//! Echo validation of relay responses.
//!
//! A service node signs the request it actually served and echoes it back with the
//! response. If the echo differs from what was sent, the node answered a different
//! question and the response cannot be trusted.

use crate::transport::{RelayPayload, RelayResponse};

/// Checks that `response` echoes `sent` exactly.
///
/// # Errors
///
/// Returns a description of the first mismatching field, or of a missing echo.
pub fn validate_echo(sent: &RelayPayload, response: &RelayResponse) -> Result<(), String> {
    let Some(echo) = response.request.as_ref() else {
        return Err("response carries no request echo".to_string());
    };

    let mismatch = |field: &str, expected: &str, actual: &str| -> Result<(), String> {
        Err(format!("{field} mismatch: sent '{expected}', echoed '{actual}'"))
    };

    if echo.chain_id != sent.chain_id {
        return mismatch("chain", &sent.chain_id, &echo.chain_id);
    }
    if echo.data != sent.data {
        return mismatch("data", &sent.data, &echo.data);
    }
    if echo.method != sent.method {
        return mismatch("method", &sent.method, &echo.method);
    }
    if echo.path != sent.path {
        return mismatch("path", &sent.path, &echo.path);
    }
    if echo.headers != sent.headers {
        return Err("headers mismatch".to_string());
    }
    Ok(())
}
