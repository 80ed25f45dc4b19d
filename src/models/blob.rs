use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Binary file embedded in a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileBlob {
    pub file_name: String,
    pub mime_type: String,
    pub size: usize,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileBlob {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size: data.len(),
            data,
            uploaded_at: Utc::now(),
        }
    }
}

/// Serde adapter storing bytes as standard base64 text.
pub mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_stored_as_base64() {
        let blob = FileBlob::new("c.pdf", "application/pdf", b"%PDF-1.4".to_vec());
        let value = serde_json::to_value(&blob).unwrap();
        assert_eq!(value["data"], "JVBERi0xLjQ=");
        assert_eq!(value["size"], 8);
        let back: FileBlob = serde_json::from_value(value).unwrap();
        assert_eq!(back.data, b"%PDF-1.4");
    }
}
