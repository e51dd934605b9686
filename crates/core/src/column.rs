// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Serialize, Serializer, ser::SerializeStruct};
use serde_json::{Map, Value, json};

/// A single column of a declared resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
	pub name: String,
	pub data_type: DataType,
	pub required: bool,
	pub unique: bool,
	pub primary_key: bool,
	pub default: Option<String>,
	pub annotations: Vec<(String, Value)>,
	pub comment: Option<String>,
	pub ttl: Option<String>,
	pub codec: Option<String>,
	pub materialized: Option<String>,
}

impl Column {
	pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
		Self {
			name: name.into(),
			data_type,
			required: true,
			unique: false,
			primary_key: false,
			default: None,
			annotations: vec![],
			comment: None,
			ttl: None,
			codec: None,
			materialized: None,
		}
	}

	pub fn primary_key(mut self) -> Self {
		self.primary_key = true;
		self
	}

	pub fn optional(mut self) -> Self {
		self.required = false;
		self
	}

	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}

	pub fn default(mut self, expression: impl Into<String>) -> Self {
		self.default = Some(expression.into());
		self
	}

	pub fn ttl(mut self, expression: impl Into<String>) -> Self {
		self.ttl = Some(expression.into());
		self
	}

	pub fn codec(mut self, codec: impl Into<String>) -> Self {
		self.codec = Some(codec.into());
		self
	}

	pub fn materialized(mut self, expression: impl Into<String>) -> Self {
		self.materialized = Some(expression.into());
		self
	}

	pub fn comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = Some(comment.into());
		self
	}

	pub fn annotation(mut self, key: impl Into<String>, value: Value) -> Self {
		self.annotations.push((key.into(), value));
		self
	}

	/// Whether `value` is acceptable for this column, honoring `required`.
	pub fn accepts(&self, value: Option<&Value>) -> bool {
		match value {
			None | Some(Value::Null) => {
				!self.required || self.default.is_some() || matches!(self.data_type, DataType::Nullable { .. })
			}
			Some(value) => self.data_type.accepts(value),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EnumValue {
	Int(u8),
	String(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumMember {
	pub name: String,
	pub value: EnumValue,
}

/// Column data type. Compound types nest, forming a finite tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
	String,
	FixedString {
		length: u64,
	},
	Boolean,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	Float32,
	Float64,
	Decimal {
		precision: u8,
		scale: u8,
	},
	DateTime {
		precision: Option<u8>,
	},
	Date,
	Date16,
	Uuid,
	Json,
	Bytes,
	IpV4,
	IpV6,
	Array {
		element_type: Box<DataType>,
		element_nullable: bool,
	},
	Nullable(Box<DataType>),
	Nested {
		name: String,
		columns: Vec<Column>,
		jwt: bool,
	},
	NamedTuple(Vec<(String, DataType)>),
	Map {
		key_type: Box<DataType>,
		value_type: Box<DataType>,
	},
	Enum {
		name: String,
		values: Vec<EnumMember>,
	},
}

impl DataType {
	pub fn array(element_type: DataType) -> Self {
		DataType::Array {
			element_type: Box::new(element_type),
			element_nullable: false,
		}
	}

	pub fn nullable(inner: DataType) -> Self {
		DataType::Nullable(Box::new(inner))
	}

	pub fn map(key_type: DataType, value_type: DataType) -> Self {
		DataType::Map {
			key_type: Box::new(key_type),
			value_type: Box::new(value_type),
		}
	}

	fn scalar_name(&self) -> Option<String> {
		let name = match self {
			DataType::String => "String".to_string(),
			DataType::FixedString {
				length,
			} => format!("FixedString({length})"),
			DataType::Boolean => "Boolean".to_string(),
			DataType::Int8 => "Int8".to_string(),
			DataType::Int16 => "Int16".to_string(),
			DataType::Int32 => "Int32".to_string(),
			DataType::Int64 => "Int64".to_string(),
			DataType::UInt8 => "UInt8".to_string(),
			DataType::UInt16 => "UInt16".to_string(),
			DataType::UInt32 => "UInt32".to_string(),
			DataType::UInt64 => "UInt64".to_string(),
			DataType::Float32 => "Float32".to_string(),
			DataType::Float64 => "Float64".to_string(),
			DataType::Decimal {
				precision,
				scale,
			} => format!("Decimal({precision}, {scale})"),
			DataType::DateTime {
				precision: None,
			} => "DateTime".to_string(),
			DataType::DateTime {
				precision: Some(precision),
			} => format!("DateTime({precision})"),
			DataType::Date => "Date".to_string(),
			DataType::Date16 => "Date16".to_string(),
			DataType::Uuid => "UUID".to_string(),
			DataType::Json => "Json".to_string(),
			DataType::Bytes => "Bytes".to_string(),
			DataType::IpV4 => "IPv4".to_string(),
			DataType::IpV6 => "IPv6".to_string(),
			_ => return None,
		};
		Some(name)
	}

	/// JSON schema fragment describing values of this type.
	pub fn json_schema(&self) -> Value {
		match self {
			DataType::String | DataType::FixedString { .. } | DataType::Bytes => json!({"type": "string"}),
			DataType::Boolean => json!({"type": "boolean"}),
			DataType::Int8
			| DataType::Int16
			| DataType::Int32
			| DataType::Int64
			| DataType::UInt8
			| DataType::UInt16
			| DataType::UInt32
			| DataType::UInt64 => json!({"type": "integer"}),
			DataType::Float32 | DataType::Float64 | DataType::Decimal { .. } => json!({"type": "number"}),
			DataType::DateTime { .. } => json!({"type": "string", "format": "date-time"}),
			DataType::Date | DataType::Date16 => json!({"type": "string", "format": "date"}),
			DataType::Uuid => json!({"type": "string", "format": "uuid"}),
			DataType::IpV4 => json!({"type": "string", "format": "ipv4"}),
			DataType::IpV6 => json!({"type": "string", "format": "ipv6"}),
			DataType::Json => json!({}),
			DataType::Array {
				element_type,
				element_nullable,
			} => {
				let items = if *element_nullable {
					json!({"anyOf": [element_type.json_schema(), {"type": "null"}]})
				} else {
					element_type.json_schema()
				};
				json!({"type": "array", "items": items})
			}
			DataType::Nullable(inner) => json!({"anyOf": [inner.json_schema(), {"type": "null"}]}),
			DataType::Nested {
				columns,
				..
			} => object_schema(columns.iter().map(|c| (c.name.as_str(), &c.data_type, c.required))),
			DataType::NamedTuple(fields) => {
				object_schema(fields.iter().map(|(name, data_type)| (name.as_str(), data_type, true)))
			}
			DataType::Map {
				value_type,
				..
			} => json!({"type": "object", "additionalProperties": value_type.json_schema()}),
			DataType::Enum {
				values,
				..
			} => {
				let values: Vec<Value> = values.iter().map(|m| enum_value_json(&m.value)).collect();
				json!({ "enum": values })
			}
		}
	}

	/// A plausible value of this type, used to drive dry invocations.
	pub fn sample(&self) -> Value {
		match self {
			DataType::String | DataType::FixedString { .. } | DataType::Bytes => json!(""),
			DataType::Boolean => json!(false),
			DataType::Int8
			| DataType::Int16
			| DataType::Int32
			| DataType::Int64
			| DataType::UInt8
			| DataType::UInt16
			| DataType::UInt32
			| DataType::UInt64 => json!(0),
			DataType::Float32 | DataType::Float64 | DataType::Decimal { .. } => json!(0.0),
			DataType::DateTime { .. } => json!("1970-01-01T00:00:00Z"),
			DataType::Date | DataType::Date16 => json!("1970-01-01"),
			DataType::Uuid => json!("00000000-0000-0000-0000-000000000000"),
			DataType::IpV4 => json!("0.0.0.0"),
			DataType::IpV6 => json!("::"),
			DataType::Json | DataType::Map { .. } => json!({}),
			DataType::Array { .. } => json!([]),
			DataType::Nullable(_) => Value::Null,
			DataType::Nested {
				columns,
				..
			} => Value::Object(columns.iter().map(|c| (c.name.clone(), c.data_type.sample())).collect()),
			DataType::NamedTuple(fields) => {
				Value::Object(fields.iter().map(|(name, data_type)| (name.clone(), data_type.sample())).collect())
			}
			DataType::Enum {
				values,
				..
			} => values.first().map(|m| enum_value_json(&m.value)).unwrap_or(Value::Null),
		}
	}

	pub fn accepts(&self, value: &Value) -> bool {
		match self {
			DataType::String
			| DataType::FixedString { .. }
			| DataType::Bytes
			| DataType::DateTime { .. }
			| DataType::Date
			| DataType::Date16
			| DataType::Uuid
			| DataType::IpV4
			| DataType::IpV6 => value.is_string(),
			DataType::Boolean => value.is_boolean(),
			DataType::Int8
			| DataType::Int16
			| DataType::Int32
			| DataType::Int64
			| DataType::UInt8
			| DataType::UInt16
			| DataType::UInt32
			| DataType::UInt64 => value.is_i64() || value.is_u64(),
			DataType::Float32 | DataType::Float64 | DataType::Decimal { .. } => value.is_number(),
			DataType::Json => true,
			DataType::Array {
				element_type,
				element_nullable,
			} => match value {
				Value::Array(items) => items
					.iter()
					.all(|item| (item.is_null() && *element_nullable) || element_type.accepts(item)),
				_ => false,
			},
			DataType::Nullable(inner) => value.is_null() || inner.accepts(value),
			DataType::Nested {
				columns,
				..
			} => match value {
				Value::Object(fields) => columns.iter().all(|c| c.accepts(fields.get(&c.name))),
				_ => false,
			},
			DataType::NamedTuple(fields) => match value {
				Value::Object(object) => fields.iter().all(|(name, data_type)| {
					object.get(name).map(|v| data_type.accepts(v)).unwrap_or(false)
				}),
				_ => false,
			},
			DataType::Map {
				value_type,
				..
			} => match value {
				Value::Object(object) => object.values().all(|v| value_type.accepts(v)),
				_ => false,
			},
			DataType::Enum {
				values,
				..
			} => values.iter().any(|m| enum_value_json(&m.value) == *value),
		}
	}
}

fn enum_value_json(value: &EnumValue) -> Value {
	match value {
		EnumValue::Int(i) => json!(i),
		EnumValue::String(s) => json!(s),
	}
}

pub(crate) fn object_schema<'a>(fields: impl Iterator<Item = (&'a str, &'a DataType, bool)>) -> Value {
	let mut properties = Map::new();
	let mut required = vec![];
	for (name, data_type, is_required) in fields {
		properties.insert(name.to_string(), data_type.json_schema());
		if is_required {
			required.push(Value::String(name.to_string()));
		}
	}
	json!({
		"type": "object",
		"properties": properties,
		"required": required,
	})
}

impl Serialize for DataType {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		if let Some(name) = self.scalar_name() {
			return serializer.serialize_str(&name);
		}
		match self {
			DataType::Array {
				element_type,
				element_nullable,
			} => {
				let mut state = serializer.serialize_struct("Array", 2)?;
				state.serialize_field("elementType", element_type)?;
				state.serialize_field("elementNullable", element_nullable)?;
				state.end()
			}
			DataType::Nullable(inner) => {
				let mut state = serializer.serialize_struct("Nullable", 1)?;
				state.serialize_field("nullable", inner)?;
				state.end()
			}
			DataType::Nested {
				name,
				columns,
				jwt,
			} => {
				let mut state = serializer.serialize_struct("Nested", 3)?;
				state.serialize_field("name", name)?;
				state.serialize_field("columns", columns)?;
				state.serialize_field("jwt", jwt)?;
				state.end()
			}
			DataType::NamedTuple(fields) => {
				let mut state = serializer.serialize_struct("NamedTuple", 1)?;
				state.serialize_field("fields", fields)?;
				state.end()
			}
			DataType::Map {
				key_type,
				value_type,
			} => {
				let mut state = serializer.serialize_struct("Map", 2)?;
				state.serialize_field("keyType", key_type)?;
				state.serialize_field("valueType", value_type)?;
				state.end()
			}
			DataType::Enum {
				name,
				values,
			} => {
				let mut state = serializer.serialize_struct("Enum", 2)?;
				state.serialize_field("name", name)?;
				state.serialize_field("values", values)?;
				state.end()
			}
			// every remaining variant has a scalar name
			_ => serializer.serialize_str("Unknown"),
		}
	}
}
