use apache_avro::types::Value;
use apache_avro::Schema;

use crate::error::SerializationError;
use crate::normalize::NormalizedRecord;
use crate::schema::SchemaHandle;

// Confluent wire format: magic byte, 4 byte big-endian schema id, then the avro datum
const MAGIC_BYTE: u8 = 0;

#[derive(Clone, Copy)]
enum FieldValue<'a> {
    Text(&'a str),
    Count(u64),
}

fn record_field<'a>(record: &'a NormalizedRecord, name: &str) -> Option<FieldValue<'a>> {
    match name.to_ascii_uppercase().as_str() {
        "ID" | "VIDEO_ID" => Some(FieldValue::Text(&record.id)),
        "TITLE" => Some(FieldValue::Text(&record.title)),
        "VIEWS" | "VIEW_COUNT" => Some(FieldValue::Count(record.view_count)),
        "LIKES" | "LIKE_COUNT" => Some(FieldValue::Count(record.like_count)),
        "COMMENTS" | "COMMENT_COUNT" => Some(FieldValue::Count(record.comment_count)),
        _ => None,
    }
}

/// Encodes records against a registry schema, taking field names and types from the schema.
#[derive(Clone)]
pub struct AvroSerializer {
    handle: SchemaHandle,
}

impl AvroSerializer {
    pub fn new(handle: SchemaHandle) -> Result<Self, SerializationError> {
        match handle.schema() {
            Schema::Record(_) => Ok(Self { handle }),
            other => Err(SerializationError::NotARecord(format!("{other:?}"))),
        }
    }

    pub fn serialize(&self, record: &NormalizedRecord) -> Result<Vec<u8>, SerializationError> {
        let schema = self.handle.schema();
        let Schema::Record(record_schema) = schema else {
            return Err(SerializationError::NotARecord(format!("{schema:?}")));
        };

        let mut fields = Vec::with_capacity(record_schema.fields.len());
        for field in &record_schema.fields {
            let value = match record_field(record, &field.name) {
                Some(value) => encode_field(&field.name, &field.schema, value)?,
                None => null_value(&field.name, &field.schema)?,
            };
            fields.push((field.name.clone(), value));
        }

        let datum = apache_avro::to_avro_datum(schema, Value::Record(fields))?;
        let mut payload = Vec::with_capacity(datum.len() + 5);
        payload.push(MAGIC_BYTE);
        payload.extend_from_slice(&self.handle.id.to_be_bytes());
        payload.extend_from_slice(&datum);
        Ok(payload)
    }
}

fn encode_field(name: &str, schema: &Schema, value: FieldValue) -> Result<Value, SerializationError> {
    match (schema, value) {
        (Schema::String, FieldValue::Text(text)) => Ok(Value::String(text.to_string())),
        (Schema::Long, FieldValue::Count(n)) => i64::try_from(n)
            .map(Value::Long)
            .map_err(|_| SerializationError::OutOfRange {
                field: name.to_string(),
                value: n,
            }),
        (Schema::Int, FieldValue::Count(n)) => i32::try_from(n)
            .map(Value::Int)
            .map_err(|_| SerializationError::OutOfRange {
                field: name.to_string(),
                value: n,
            }),
        (Schema::Union(union), value) => {
            for (index, variant) in union.variants().iter().enumerate() {
                if matches!(variant, Schema::Null) {
                    continue;
                }
                match encode_field(name, variant, value) {
                    Ok(encoded) => return Ok(Value::Union(index as u32, Box::new(encoded))),
                    Err(e @ SerializationError::OutOfRange { .. }) => return Err(e),
                    Err(_) => continue,
                }
            }
            Err(incompatible(name, schema))
        }
        _ => Err(incompatible(name, schema)),
    }
}

fn null_value(name: &str, schema: &Schema) -> Result<Value, SerializationError> {
    match schema {
        Schema::Null => Ok(Value::Null),
        Schema::Union(union) => union
            .variants()
            .iter()
            .position(|variant| matches!(variant, Schema::Null))
            .map(|index| Value::Union(index as u32, Box::new(Value::Null)))
            .ok_or_else(|| SerializationError::UnmappedField {
                field: name.to_string(),
            }),
        _ => Err(SerializationError::UnmappedField {
            field: name.to_string(),
        }),
    }
}

fn incompatible(name: &str, schema: &Schema) -> SerializationError {
    SerializationError::IncompatibleField {
        field: name.to_string(),
        schema: format!("{schema:?}"),
    }
}
