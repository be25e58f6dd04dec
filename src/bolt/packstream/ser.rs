//! Conversion of any `serde::Serialize` value into a [`PackStreamValue`].
//!
//! Query parameters are accepted as arbitrary serializable data (a
//! `serde_json::json!` literal, a `#[derive(Serialize)]` struct, an
//! `IndexMap`, ...). Everything funnels through [`ValueSerializer`], which
//! rejects integers that do not fit in a signed 64-bit PackStream integer.

use serde::ser::{self, Serialize};

use super::types::{PackStreamMap, PackStreamValue};
use super::PackStreamError;

/// Serialize `value` into a PackStream value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<PackStreamValue, PackStreamError> {
    value.serialize(ValueSerializer)
}

/// Serialize `value` into a parameter map. `()` and `None` mean "no
/// parameters".
pub fn to_parameters<T: Serialize + ?Sized>(value: &T) -> Result<PackStreamMap, PackStreamError> {
    match to_value(value)? {
        PackStreamValue::Map(map) => Ok(map),
        PackStreamValue::Null => Ok(PackStreamMap::new()),
        other => Err(PackStreamError::Serialization(format!(
            "query parameters must serialize to a map, got {}",
            other.type_name()
        ))),
    }
}

impl ser::Error for PackStreamError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        PackStreamError::Serialization(msg.to_string())
    }
}

fn out_of_range(value: impl ToString) -> PackStreamError {
    PackStreamError::IntegerOutOfRange(value.to_string())
}

/// Serializer whose output is a [`PackStreamValue`].
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = VariantSerializer<SeqSerializer>;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = VariantSerializer<MapSerializer>;

    fn serialize_bool(self, v: bool) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v))
    }

    fn serialize_i128(self, v: i128) -> Result<PackStreamValue, PackStreamError> {
        i64::try_from(v)
            .map(PackStreamValue::Integer)
            .map_err(|_| out_of_range(v))
    }

    fn serialize_u8(self, v: u8) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Integer(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<PackStreamValue, PackStreamError> {
        i64::try_from(v)
            .map(PackStreamValue::Integer)
            .map_err(|_| out_of_range(v))
    }

    fn serialize_u128(self, v: u128) -> Result<PackStreamValue, PackStreamError> {
        i64::try_from(v)
            .map(PackStreamValue::Integer)
            .map_err(|_| out_of_range(v))
    }

    fn serialize_f32(self, v: f32) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<PackStreamValue, PackStreamError> {
        // no byte-array type on this wire; send a list of small integers
        Ok(PackStreamValue::List(
            v.iter().map(|b| PackStreamValue::Integer((*b).into())).collect(),
        ))
    }

    fn serialize_none(self) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<PackStreamValue, PackStreamError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::from(variant))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<PackStreamValue, PackStreamError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<PackStreamValue, PackStreamError> {
        let mut map = PackStreamMap::with_capacity(1);
        map.insert(variant.to_string(), to_value(value)?);
        Ok(PackStreamValue::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer, PackStreamError> {
        Ok(SeqSerializer {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer, PackStreamError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqSerializer, PackStreamError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<SeqSerializer>, PackStreamError> {
        Ok(VariantSerializer {
            variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapSerializer, PackStreamError> {
        Ok(MapSerializer {
            map: PackStreamMap::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapSerializer, PackStreamError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSerializer<MapSerializer>, PackStreamError> {
        Ok(VariantSerializer {
            variant,
            inner: self.serialize_map(Some(len))?,
        })
    }
}

/// Collects sequence and tuple elements into a list.
pub struct SeqSerializer {
    items: Vec<PackStreamValue>,
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PackStreamError> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::List(self.items))
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PackStreamError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PackStreamError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        ser::SerializeSeq::end(self)
    }
}

/// Collects map entries and struct fields. Keys must serialize to strings.
pub struct MapSerializer {
    map: PackStreamMap,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), PackStreamError> {
        match to_value(key)? {
            PackStreamValue::String(s) => {
                self.next_key = Some(s);
                Ok(())
            }
            other => Err(PackStreamError::Serialization(format!(
                "map keys must be strings, got {}",
                other.type_name()
            ))),
        }
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PackStreamError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| PackStreamError::Serialization("map value without key".into()))?;
        self.map.insert(key, to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Map(self.map))
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PackStreamError> {
        self.map.insert(key.to_string(), to_value(value)?);
        Ok(())
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        Ok(PackStreamValue::Map(self.map))
    }
}

/// Wraps a tuple or struct variant as `{variant: payload}`.
pub struct VariantSerializer<S> {
    variant: &'static str,
    inner: S,
}

impl<S> VariantSerializer<S> {
    fn wrap(variant: &'static str, payload: PackStreamValue) -> PackStreamValue {
        let mut map = PackStreamMap::with_capacity(1);
        map.insert(variant.to_string(), payload);
        PackStreamValue::Map(map)
    }
}

impl ser::SerializeTupleVariant for VariantSerializer<SeqSerializer> {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), PackStreamError> {
        ser::SerializeSeq::serialize_element(&mut self.inner, value)
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        let payload = ser::SerializeSeq::end(self.inner)?;
        Ok(Self::wrap(self.variant, payload))
    }
}

impl ser::SerializeStructVariant for VariantSerializer<MapSerializer> {
    type Ok = PackStreamValue;
    type Error = PackStreamError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PackStreamError> {
        ser::SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> Result<PackStreamValue, PackStreamError> {
        let payload = ser::SerializeStruct::end(self.inner)?;
        Ok(Self::wrap(self.variant, payload))
    }
}
