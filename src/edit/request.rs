use super::translate::translate_instruction;
use crate::error::EditError;
use crate::mask::MaskBuffer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::ImageReader;
use serde::Serialize;
use std::io::Cursor;

/// Everything needed for one remote edit
///
/// Without a mask the service edits the whole image.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Encoded original image (PNG, JPEG, ...)
    pub image: Vec<u8>,
    pub mask: Option<MaskBuffer>,
    pub instruction: String,
    pub sample_count: u32,
}

impl EditRequest {
    pub fn new(image: Vec<u8>, instruction: impl Into<String>) -> Self {
        Self {
            image,
            mask: None,
            instruction: instruction.into(),
            sample_count: 1,
        }
    }

    pub fn with_mask(mut self, mask: Option<MaskBuffer>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }
}

/// Request body for the image-edit `:predict` endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditPayload {
    pub instances: Vec<Instance>,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub prompt: String,
    pub image: EncodedImage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskField>,
}

/// The service expects the mask image nested one level deeper than the
/// source image: `"mask": { "image": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskField {
    pub image: EncodedImage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedImage {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64_encoded: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameters {
    #[serde(rename = "sampleCount")]
    pub sample_count: u32,
}

/// Build the wire payload for `request`
///
/// The instruction goes through [`translate_instruction`] first. A mask must
/// have exactly the original image's pixel dimensions.
pub fn build_payload(request: &EditRequest) -> Result<EditPayload, EditError> {
    if request.image.is_empty() {
        return Err(EditError::Encoding("original image is empty".to_string()));
    }

    let mask = match &request.mask {
        Some(mask) => {
            let dimensions = image_dimensions(&request.image)?;
            if mask.dimensions() != dimensions {
                return Err(EditError::Encoding(format!(
                    "mask is {}x{} but image is {}x{}",
                    mask.width(),
                    mask.height(),
                    dimensions.0,
                    dimensions.1
                )));
            }
            let png = mask
                .encode_png()
                .map_err(|e| EditError::Encoding(e.to_string()))?;
            Some(MaskField {
                image: encode(&png)?,
            })
        }
        None => None,
    };

    let prompt = translate_instruction(&request.instruction).into_owned();
    tracing::debug!(
        "Built edit payload: {} image bytes, mask={}, prompt={:?}",
        request.image.len(),
        mask.is_some(),
        prompt
    );

    Ok(EditPayload {
        instances: vec![Instance {
            prompt,
            image: encode(&request.image)?,
            mask,
        }],
        parameters: Parameters {
            sample_count: request.sample_count,
        },
    })
}

fn encode(bytes: &[u8]) -> Result<EncodedImage, EditError> {
    if bytes.is_empty() {
        return Err(EditError::Encoding("encoded image is empty".to_string()));
    }
    Ok(EncodedImage {
        bytes_base64_encoded: BASE64.encode(bytes),
    })
}

fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), EditError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| EditError::Encoding(e.to_string()))?
        .into_dimensions()
        .map_err(|e| EditError::Encoding(format!("cannot read original image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use serde_json::json;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn omits_mask_field_without_mask() {
        let image = png_bytes(2, 2);
        let payload = build_payload(&EditRequest::new(image.clone(), "add a hat")).unwrap();

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "instances": [{
                    "prompt": "add a hat",
                    "image": { "bytesBase64Encoded": BASE64.encode(&image) }
                }],
                "parameters": { "sampleCount": 1 }
            })
        );
    }

    #[test]
    fn nests_mask_image_twice() {
        let image = png_bytes(2, 2);
        let mut mask = MaskBuffer::new(2, 2);
        mask.set(0, 0, true);
        let request = EditRequest::new(image, "add a hat").with_mask(Some(mask.clone()));

        let value = serde_json::to_value(build_payload(&request).unwrap()).unwrap();
        let encoded = value["instances"][0]["mask"]["image"]["bytesBase64Encoded"]
            .as_str()
            .unwrap();

        let png = BASE64.decode(encoded).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(MaskBuffer::from_luma(&decoded), mask);
        assert!(value["instances"][0]["mask"].get("bytesBase64Encoded").is_none());
    }

    #[test]
    fn translates_known_instruction() {
        let request = EditRequest::new(png_bytes(1, 1), "arka planı plaj yap");
        let payload = build_payload(&request).unwrap();
        assert_eq!(
            payload.instances[0].prompt,
            "Change the background to a sunny beach"
        );
    }

    #[test]
    fn empty_image_is_an_encoding_error() {
        let result = build_payload(&EditRequest::new(Vec::new(), "anything"));
        assert!(matches!(result, Err(EditError::Encoding(_))));
    }

    #[test]
    fn mask_must_match_original_dimensions() {
        let request =
            EditRequest::new(png_bytes(4, 4), "x").with_mask(Some(MaskBuffer::new(2, 2)));
        assert!(matches!(build_payload(&request), Err(EditError::Encoding(_))));
    }

    #[test]
    fn sample_count_is_forwarded() {
        let request = EditRequest::new(png_bytes(1, 1), "x").with_sample_count(4);
        assert_eq!(build_payload(&request).unwrap().parameters.sample_count, 4);
    }
}
