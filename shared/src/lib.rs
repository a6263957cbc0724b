use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, FromRepr};

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct PredictionRequest {
    pub image: Option<String>,
    #[serde(rename = "imageData")]
    pub image_data: Option<String>,
    pub filename: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct PredictionResponse {
    pub result: String,
    pub confidence: f32,
    pub image_url: Option<String>,
}

// Variant order matches the output layer of the trained network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount, FromRepr)]
pub enum TumorClass {
    #[strum(serialize = "Glioma Tumor")]
    Glioma,
    #[strum(serialize = "Meningioma Tumor")]
    Meningioma,
    #[strum(serialize = "No Tumor")]
    NoTumor,
    #[strum(serialize = "Pituitary Tumor")]
    Pituitary,
}

impl TumorClass {
    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::EnumCount as _;

    #[test]
    fn class_labels_match_model_output_order() {
        let expected = [
            "Glioma Tumor",
            "Meningioma Tumor",
            "No Tumor",
            "Pituitary Tumor",
        ];
        for (index, label) in expected.iter().enumerate() {
            let class = TumorClass::from_index(index).unwrap();
            assert_eq!(class.label(), *label);
        }
    }

    #[test]
    fn out_of_range_index_has_no_class() {
        assert_eq!(TumorClass::COUNT, 4);
        assert!(TumorClass::from_index(TumorClass::COUNT).is_none());
    }

    #[test]
    fn request_accepts_camel_case_image_data() {
        let request: PredictionRequest =
            serde_json::from_str(r#"{"imageData": "aGVsbG8=", "filename": "scan.jpg"}"#).unwrap();
        assert_eq!(request.image_data.as_deref(), Some("aGVsbG8="));
        assert_eq!(request.filename.as_deref(), Some("scan.jpg"));
        assert!(request.image.is_none());
    }

    #[test]
    fn response_serializes_wire_field_names() {
        let response = PredictionResponse {
            result: TumorClass::NoTumor.label(),
            confidence: 97.42,
            image_url: Some("/uploads/scan.jpg".to_string()),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"], "No Tumor");
        assert_eq!(value["image_url"], "/uploads/scan.jpg");
        assert!((value["confidence"].as_f64().unwrap() - 97.42).abs() < 1e-3);
    }
}
