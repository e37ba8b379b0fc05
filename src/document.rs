//! Document codec boundary.
//!
//! Documents travel over the wire as BSON. Anything implementing [`serde::Serialize`]
//! can be handed to an operation as a document; encoding fails for values that do not
//! serialize to a top-level document (e.g. a bare integer).
//!
//! # Example
//! ```rust
//! use bson::doc;
//! use docwire::document::{Marshal, decode};
//!
//! let bytes = doc! { "name": "docwire" }.marshal().unwrap();
//! let back: bson::Document = decode(&bytes).unwrap();
//! assert_eq!(back.get_str("name").unwrap(), "docwire");
//! ```
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),
    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),
}

/// A value that can be written to the wire as an encoded document.
pub trait Marshal: Send {
    fn marshal(&self) -> Result<Vec<u8>, DocumentError>;
}

impl<T: Serialize + Send> Marshal for T {
    fn marshal(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(bson::to_vec(self)?)
    }
}

/// Decodes a raw reply document.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DocumentError> {
    Ok(bson::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use bson::{Document, doc};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Account {
        id: i32,
        email: String,
    }

    #[test]
    fn struct_round_trips_through_bson() {
        let account = Account {
            id: 7,
            email: "a@example.com".into(),
        };
        let bytes = account.marshal().unwrap();

        // leading int32 is the document's own length
        assert_eq!(
            i32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize,
            bytes.len()
        );
        assert_eq!(decode::<Account>(&bytes).unwrap(), account);
    }

    #[test]
    fn empty_document_is_five_bytes() {
        let bytes = Document::new().marshal().unwrap();
        assert_eq!(bytes, vec![5, 0, 0, 0, 0]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode::<Document>(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DocumentError::Decode(_)));
    }

    #[test]
    fn boxed_documents_marshal() {
        let docs: Vec<Box<dyn Marshal>> = vec![Box::new(doc! { "a": 1 }), Box::new(Document::new())];
        let sizes = docs
            .iter()
            .map(|d| d.marshal().unwrap().len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![12, 5]);
    }
}
