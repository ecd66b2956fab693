use super::errors::*;
use crate::rmps;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a message for the transport. Field names are kept in the encoding so that nodes
/// can evolve their message shapes independently.
pub fn marshal<T: Serialize>(obj: &T) -> Result<Bytes> {
	let data = rmps::to_vec_named(obj)?;
	Ok(Bytes::from(data))
}

/// Decodes a message received from the transport
pub fn unmarshal<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
	let obj = rmps::from_slice(data)?;
	Ok(obj)
}
