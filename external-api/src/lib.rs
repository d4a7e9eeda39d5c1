//! Defines the messaging interface between the matcher node and its clients

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod bus_message;
pub mod http;
pub mod types;

/// An empty request/response type
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EmptyRequestResponse {}

impl Serialize for EmptyRequestResponse {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_none()
    }
}

impl<'de> Deserialize<'de> for EmptyRequestResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept a null or absent body
        let _ = Option::<()>::deserialize(deserializer)?;
        Ok(EmptyRequestResponse {})
    }
}
