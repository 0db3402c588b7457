//! Rendering of chaincode payloads and errors for the shell surfaces.

use rolltreppe_chaincode::ChaincodeError;

/// Turn a raw payload into a JSON value.
///
/// Records and record lists are embedded as JSON; anything else (IDs,
/// counters, empty payloads) stays a string so `"0001"` is not read as `1`.
pub(crate) fn to_json(payload: &[u8]) -> serde_json::Value {
    if matches!(payload.first(), Some(b'[') | Some(b'{')) {
        if let Ok(value) = serde_json::from_slice(payload) {
            return value;
        }
    }
    serde_json::Value::String(String::from_utf8_lossy(payload).into_owned())
}

pub(crate) fn error_message(err: &ChaincodeError) -> String {
    format!("{}: {}", err.code(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stay_strings() {
        assert_eq!(to_json(b"0001"), serde_json::json!("0001"));
        assert_eq!(to_json(b""), serde_json::json!(""));
    }

    #[test]
    fn records_are_embedded() {
        assert_eq!(to_json(b"[]"), serde_json::json!([]));
        assert_eq!(
            to_json(br#"{"TicketID":"0001"}"#),
            serde_json::json!({"TicketID": "0001"})
        );
    }

    #[test]
    fn broken_json_falls_back_to_text() {
        assert_eq!(to_json(b"{\"broken\":"), serde_json::json!("{\"broken\":"));
    }

    #[test]
    fn error_message_leads_with_code() {
        let err = ChaincodeError::UnknownFunction("nope".to_string());
        assert_eq!(error_message(&err), "UnknownFunction: unknown function: 'nope'");
    }
}
