use core::fmt;
use core::marker::PhantomData;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Tree;
use crate::Result;
use crate::engine::{Engine, Order};

/// Serializes as a JSON object: member names are the display form of each key,
/// members appear in ascending key order.
impl<K, V, E> Serialize for Tree<K, V, E>
where
    K: fmt::Display,
    V: Serialize,
    E: Engine<K, V>,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let engine = self.read();
        let mut map = serializer.serialize_map(Some(engine.len()))?;
        let mut failure = None;
        engine.visit(Order::Asc, None, &mut |key, value| {
            match map.serialize_entry(&key.to_string(), value) {
                Ok(()) => true,
                Err(error) => {
                    failure = Some(error);
                    false
                }
            }
        });
        if let Some(error) = failure {
            return Err(error);
        }
        map.end()
    }
}

impl<K, V, E> Tree<K, V, E>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
    E: Engine<K, V>,
{
    /// Stores every member of the JSON object `json`, converting member names
    /// to keys the way serde converts map keys (so numeric keys parse from
    /// their quoted form). Existing entries are kept or overwritten.
    ///
    /// The whole document is decoded before the tree is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if `json` is not an object
    /// of matching keys and values. The tree is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtree::{AvlTree, Comparator};
    ///
    /// let tree: AvlTree<i32, String> = AvlTree::new(Comparator::natural());
    /// tree.unmarshal_json(r#"{"2": "two", "1": "one"}"#).unwrap();
    /// assert_eq!(tree.keys(), vec![1, 2]);
    /// assert_eq!(serde_json::to_string(&tree).unwrap(), r#"{"1":"one","2":"two"}"#);
    /// ```
    pub fn unmarshal_json(&self, json: &str) -> Result<()> {
        let members = decode_members(json)?;
        self.sets(members);
        Ok(())
    }
}

/// Decodes a complete JSON object into its members, in document order.
pub(crate) fn decode_members<K, V>(json: &str) -> Result<Vec<(K, V)>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let members = deserializer.deserialize_map(Members(PhantomData))?;
    deserializer.end()?;
    Ok(members)
}

/// Collects map members as `(key, value)` pairs.
struct Members<K, V>(PhantomData<fn() -> (K, V)>);

impl<'de, K, V> Visitor<'de> for Members<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = Vec<(K, V)>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> core::result::Result<Self::Value, A::Error> {
        let mut members = Vec::new();
        while let Some(member) = map.next_entry::<K, V>()? {
            members.push(member);
        }
        Ok(members)
    }
}

/// Builds a tree with the engine's default (natural order) comparator, without
/// internal locking.
impl<'de, K, V, E> Deserialize<'de> for Tree<K, V, E>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
    E: Engine<K, V> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let members = deserializer.deserialize_map(Members(PhantomData))?;
        let mut engine = E::default();
        for (key, value) in members {
            engine.insert(key, value);
        }
        Ok(Self::from_engine(engine, false))
    }
}
