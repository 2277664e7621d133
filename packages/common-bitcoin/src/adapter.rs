use bitcoin::consensus::{Decodable, Encodable};
use cosmwasm_schema::schemars::{gen, schema, JsonSchema};
use cosmwasm_schema::serde::{de, ser, Deserialize, Serialize};
use cosmwasm_std::Binary;
use derive_more::{Deref, DerefMut};

/// Wraps a `bitcoin` consensus-encodable type so it can be stored and
/// (de)serialized through `cw-storage-plus` as a length-prefixed byte string,
/// instead of round-tripping through the `bitcoin` crate's own JSON
/// representation (which several of its types do not implement).
#[derive(Clone, Debug, PartialEq, Eq, Deref, DerefMut)]
pub struct Adapter<T> {
    inner: T,
}

impl<T> Adapter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> From<T> for Adapter<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Default> Default for Adapter<T> {
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}

impl<T: Copy> Copy for Adapter<T> {}

impl<T: Encodable> Serialize for Adapter<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut dest = Binary::default();
        self.inner
            .consensus_encode(&mut dest.0)
            .map_err(ser::Error::custom)?;
        dest.serialize(serializer)
    }
}

impl<'de, T: Decodable> Deserialize<'de> for Adapter<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let v = Binary::deserialize(deserializer)?;
        let inner: T = Decodable::consensus_decode(&mut v.as_slice()).map_err(de::Error::custom)?;
        Ok(inner.into())
    }
}

impl<T> JsonSchema for Adapter<T> {
    fn schema_name() -> String {
        <Binary as JsonSchema>::schema_name()
    }

    fn schema_id() -> std::borrow::Cow<'static, str> {
        <Binary as JsonSchema>::schema_id()
    }

    fn json_schema(gen: &mut gen::SchemaGenerator) -> schema::Schema {
        <Binary as JsonSchema>::json_schema(gen)
    }
}
