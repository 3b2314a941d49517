use crate::error::EditError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

const IMAGE_FIELD: &str = "bytesBase64Encoded";

/// Extract and decode the first returned image from a `:predict` response
///
/// A prediction may carry the base64 data directly or nested under `image`;
/// both are probed, in that order.
pub fn decode_prediction(body: &[u8]) -> Result<Vec<u8>, EditError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| EditError::UnrecognizedResponseShape(format!("invalid JSON: {}", e)))?;

    let Some(object) = value.as_object() else {
        return Err(EditError::UnrecognizedResponseShape(
            "response is not a JSON object".to_string(),
        ));
    };

    let predictions = match object.get("predictions") {
        None | Some(Value::Null) => return Err(EditError::EmptyResult),
        Some(Value::Array(predictions)) => predictions,
        Some(_) => {
            return Err(EditError::UnrecognizedResponseShape(
                "predictions is not an array".to_string(),
            ))
        }
    };
    let first = predictions.first().ok_or(EditError::EmptyResult)?;

    let encoded = first
        .get(IMAGE_FIELD)
        .and_then(Value::as_str)
        .or_else(|| {
            first
                .get("image")
                .and_then(|image| image.get(IMAGE_FIELD))
                .and_then(Value::as_str)
        })
        .ok_or_else(|| {
            EditError::UnrecognizedResponseShape(format!(
                "prediction has no {} field",
                IMAGE_FIELD
            ))
        })?;

    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| EditError::Encoding(format!("invalid base64 in prediction: {}", e)))?;
    if bytes.is_empty() {
        return Err(EditError::EmptyResult);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_top_level_image_field() {
        let body = br#"{"predictions": [{"bytesBase64Encoded": "aGVsbG8=", "mimeType": "image/png"}]}"#;
        assert_eq!(decode_prediction(body).unwrap(), b"hello");
    }

    #[test]
    fn reads_image_nested_one_level() {
        let body = br#"{"predictions": [{"image": {"bytesBase64Encoded": "aGk="}}]}"#;
        assert_eq!(decode_prediction(body).unwrap(), b"hi");
    }

    #[test]
    fn direct_field_wins_over_nested() {
        let body = br#"{"predictions": [{"bytesBase64Encoded": "YQ==", "image": {"bytesBase64Encoded": "Yg=="}}]}"#;
        assert_eq!(decode_prediction(body).unwrap(), b"a");
    }

    #[test]
    fn empty_or_missing_predictions_are_empty_results() {
        assert!(matches!(
            decode_prediction(br#"{"predictions": []}"#),
            Err(EditError::EmptyResult)
        ));
        assert!(matches!(
            decode_prediction(br#"{"deployedModelId": "1"}"#),
            Err(EditError::EmptyResult)
        ));
    }

    #[test]
    fn unknown_prediction_layout_is_rejected() {
        let body = br#"{"predictions": [{"raiFilteredReason": "blocked"}]}"#;
        assert!(matches!(
            decode_prediction(body),
            Err(EditError::UnrecognizedResponseShape(_))
        ));
        assert!(matches!(
            decode_prediction(b"not json"),
            Err(EditError::UnrecognizedResponseShape(_))
        ));
    }

    #[test]
    fn bad_base64_is_an_encoding_error() {
        let body = br#"{"predictions": [{"bytesBase64Encoded": "***"}]}"#;
        assert!(matches!(decode_prediction(body), Err(EditError::Encoding(_))));
    }
}
