//! Serde adapters for config shapes TOML cannot express directly.

use firmswap_types::ChainId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// TOML table keys are strings; chain-keyed maps round-trip through a
/// string-keyed intermediate.
pub mod chain_id_map {
	use super::*;
	use serde::de::Error;

	pub fn serialize<S, V>(
		map: &HashMap<ChainId, V>,
		serializer: S,
	) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
		V: Serialize,
	{
		let raw: HashMap<String, &V> =
			map.iter().map(|(k, v)| (k.0.to_string(), v)).collect();
		raw.serialize(serializer)
	}

	pub fn deserialize<'de, D, V>(deserializer: D) -> Result<HashMap<ChainId, V>, D::Error>
	where
		D: Deserializer<'de>,
		V: Deserialize<'de>,
	{
		let raw = HashMap::<String, V>::deserialize(deserializer)?;
		raw.into_iter()
			.map(|(k, v)| {
				k.parse::<u64>()
					.map(|id| (ChainId(id), v))
					.map_err(|e| D::Error::custom(format!("invalid chain id {:?}: {}", k, e)))
			})
			.collect()
	}
}
