use serde::Serialize;
use thiserror::Error;

/// Classified failures that cross the command/event boundary to the kiosk UI.
///
/// Everything here is recoverable without restarting the process; the session
/// controller decides which screen the guest lands on after each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum KioskError {
    #[error("camera unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("generation service unreachable: {0}")]
    ServiceUnreachable(String),

    #[error("generation service credential is not configured")]
    MissingCredential,

    #[error("generation service returned no image")]
    NoImageReturned,

    #[error("admin pin rejected by the store")]
    Unauthorized,

    #[error("settings store unreachable: {0}")]
    StoreUnreachable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_tagged_kind() {
        let value = serde_json::to_value(KioskError::NoImageReturned).unwrap();
        assert_eq!(value["kind"], "noImageReturned");

        let value =
            serde_json::to_value(KioskError::HardwareUnavailable("no device".into())).unwrap();
        assert_eq!(value["kind"], "hardwareUnavailable");
        assert_eq!(value["detail"], "no device");
    }
}
