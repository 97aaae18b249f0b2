//! Packet schema definitions and the column superset they imply.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Column name for the running packet counter.
pub const COL_PACKET_NUM: &str = "PacketNum";

/// Column name for the packet id byte.
pub const COL_ID: &str = "ID";

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse schema file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Duplicate packet id 0x{0:02X} in schema file")]
    DuplicateId(u8),
}

/// One payload field of a packet.
///
/// `size` is in bytes; multi-byte fields are big-endian. A 1-byte field
/// may additionally expand into named bit columns, LSB-first (`bits[0]` is
/// the least-significant bit).
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub size: u8,
    #[serde(default)]
    pub bits: Vec<String>,
}

/// Wire description of one packet type.
#[derive(Debug, Clone, Deserialize)]
pub struct PacketSchema {
    /// Packet id byte (second byte of the frame).
    pub id: u8,
    /// Expected value of the NUM_BYTES byte.
    pub num_bytes: u8,
    /// Expected total frame length in bytes, delimiters included.
    pub length: usize,
    /// Payload fields in wire order.
    pub fields: Vec<FieldSpec>,
    /// Extra column names this packet type contributes to the superset
    /// (columns it shares with other packet types).
    #[serde(default)]
    pub all_fields: Vec<String>,
}

/// The full set of packet schemas for one capture format, plus the column
/// superset derived from them.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    by_id: HashMap<u8, PacketSchema>,
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
}

impl SchemaSet {
    /// Load a schema set from a JSON file containing an array of
    /// [`PacketSchema`] objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let schemas: Vec<PacketSchema> =
            serde_json::from_str(&text).map_err(|source| SchemaError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_schemas(schemas)
    }

    /// Build a schema set from already-parsed schemas.
    pub fn from_schemas(schemas: Vec<PacketSchema>) -> Result<Self, SchemaError> {
        let columns = compute_columns(&schemas);
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut by_id = HashMap::with_capacity(schemas.len());
        for schema in schemas {
            if by_id.contains_key(&schema.id) {
                return Err(SchemaError::DuplicateId(schema.id));
            }
            by_id.insert(schema.id, schema);
        }

        Ok(Self {
            by_id,
            columns,
            column_index,
        })
    }

    /// Look up the schema for a packet id byte.
    pub fn schema_for(&self, packet_id: u8) -> Option<&PacketSchema> {
        self.by_id.get(&packet_id)
    }

    /// Number of packet types in the set.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The column superset, ordered `PacketNum`, `ID`, then the remaining
    /// names sorted.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Index of a column within [`columns`](Self::columns).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }
}

/// Build the column superset across all packet types: the fixed
/// `PacketNum`/`ID` columns, every field name, every bit name, and every
/// `all_fields` entry, deduplicated and sorted after the fixed prefix.
fn compute_columns(schemas: &[PacketSchema]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for schema in schemas {
        names.extend(schema.all_fields.iter().cloned());
        for field in &schema.fields {
            names.push(field.name.clone());
            names.extend(field.bits.iter().cloned());
        }
    }
    names.retain(|n| n != COL_PACKET_NUM && n != COL_ID);
    names.sort();
    names.dedup();

    let mut columns = vec![COL_PACKET_NUM.to_string(), COL_ID.to_string()];
    columns.extend(names);
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schemas() -> Vec<PacketSchema> {
        serde_json::from_str(
            r#"[
                {
                    "id": 20,
                    "num_bytes": 5,
                    "length": 10,
                    "fields": [
                        {"name": "Altitude", "size": 3},
                        {"name": "Flags", "size": 1, "bits": ["GearDown", "FlapsOut"]}
                    ],
                    "all_fields": ["Airspeed"]
                },
                {
                    "id": 21,
                    "num_bytes": 4,
                    "length": 9,
                    "fields": [{"name": "Airspeed", "size": 3}]
                }
            ]"#,
        )
        .expect("sample schemas parse")
    }

    #[test]
    fn columns_start_with_packet_num_and_id() {
        let set = SchemaSet::from_schemas(sample_schemas()).unwrap();
        assert_eq!(&set.columns()[..2], &["PacketNum", "ID"]);
    }

    #[test]
    fn columns_cover_fields_bits_and_all_fields_sorted() {
        let set = SchemaSet::from_schemas(sample_schemas()).unwrap();
        assert_eq!(
            set.columns(),
            &[
                "PacketNum",
                "ID",
                "Airspeed",
                "Altitude",
                "Flags",
                "FlapsOut",
                "GearDown"
            ]
        );
    }

    #[test]
    fn column_index_matches_order() {
        let set = SchemaSet::from_schemas(sample_schemas()).unwrap();
        assert_eq!(set.column_index("PacketNum"), Some(0));
        assert_eq!(set.column_index("Altitude"), Some(3));
        assert_eq!(set.column_index("NoSuchColumn"), None);
    }

    #[test]
    fn schema_lookup_by_id() {
        let set = SchemaSet::from_schemas(sample_schemas()).unwrap();
        assert!(set.schema_for(20).is_some());
        assert!(set.schema_for(21).is_some());
        assert!(set.schema_for(99).is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut schemas = sample_schemas();
        schemas[1].id = 20;
        assert!(matches!(
            SchemaSet::from_schemas(schemas),
            Err(SchemaError::DuplicateId(_))
        ));
    }
}
