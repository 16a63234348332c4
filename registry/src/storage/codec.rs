use serde::{Serialize, de::DeserializeOwned};

use super::error::CodecError;

/// Converts stored objects to and from bytes.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, object: &T) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, object: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(object).map_err(CodecError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use event_types::{Event, ObjectReference};

    #[test]
    fn test_preserves_every_field() {
        let mut event = Event::new("default", "foo")
            .with_reason("forTesting")
            .with_involved_object(ObjectReference::new("default", "bar"));
        event.message = "pulled image".to_string();
        event.count = 3;
        event.first_timestamp = Some(Utc::now());
        event.metadata.uid = "b5b2c8a4".to_string();
        event.metadata.creation_timestamp = Some(Utc::now());
        event
            .metadata
            .labels
            .insert("tier".to_string(), "backend".to_string());

        let bytes = JsonCodec.encode(&event).unwrap();
        let decoded: Event = JsonCodec.decode(&bytes).unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<Event, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
