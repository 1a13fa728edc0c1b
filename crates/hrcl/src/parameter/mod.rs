// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node parameters: typed name/value pairs with service exposure.
//!
//! Each node holds a parameter map; [`ParameterService`] publishes the
//! standard six operations (get, get types, set, set atomically, list,
//! describe) over the normal service machinery so other nodes can query and
//! mutate them remotely.

mod service;

pub use service::ParameterService;

use crate::error::Result;
use crate::msg::{wire, Message};

/// Runtime type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    NotSet,
    Bool,
    Integer,
    Double,
    String,
    Bytes,
}

impl ParameterType {
    fn tag(self) -> u8 {
        match self {
            ParameterType::NotSet => 0,
            ParameterType::Bool => 1,
            ParameterType::Integer => 2,
            ParameterType::Double => 3,
            ParameterType::String => 4,
            ParameterType::Bytes => 5,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ParameterType::NotSet),
            1 => Ok(ParameterType::Bool),
            2 => Ok(ParameterType::Integer),
            3 => Ok(ParameterType::Double),
            4 => Ok(ParameterType::String),
            5 => Ok(ParameterType::Bytes),
            other => Err(crate::error::Error::Serialization(format!(
                "unknown parameter type tag {}",
                other
            ))),
        }
    }
}

/// A parameter's value. `NotSet` doubles as the deletion marker: setting a
/// parameter to `NotSet` removes it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl ParameterValue {
    #[must_use]
    pub fn kind(&self) -> ParameterType {
        match self {
            ParameterValue::NotSet => ParameterType::NotSet,
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Integer(_) => ParameterType::Integer,
            ParameterValue::Double(_) => ParameterType::Double,
            ParameterValue::String(_) => ParameterType::String,
            ParameterValue::Bytes(_) => ParameterType::Bytes,
        }
    }

    fn put(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind().tag());
        match self {
            ParameterValue::NotSet => {}
            ParameterValue::Bool(value) => buf.push(u8::from(*value)),
            ParameterValue::Integer(value) => wire::put_i64(buf, *value),
            ParameterValue::Double(value) => wire::put_f64(buf, *value),
            ParameterValue::String(value) => wire::put_str(buf, value),
            ParameterValue::Bytes(value) => wire::put_bytes(buf, value),
        }
    }

    fn get(cursor: &mut wire::Cursor<'_>) -> Result<Self> {
        match ParameterType::from_tag(cursor.get_u8()?)? {
            ParameterType::NotSet => Ok(ParameterValue::NotSet),
            ParameterType::Bool => Ok(ParameterValue::Bool(cursor.get_u8()? != 0)),
            ParameterType::Integer => Ok(ParameterValue::Integer(cursor.get_i64()?)),
            ParameterType::Double => Ok(ParameterValue::Double(cursor.get_f64()?)),
            ParameterType::String => Ok(ParameterValue::String(cursor.get_str()?)),
            ParameterType::Bytes => Ok(ParameterValue::Bytes(cursor.get_bytes()?)),
        }
    }
}

/// A named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    #[must_use]
    pub fn new(name: &str, value: ParameterValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Outcome of one set operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SetParametersResult {
    pub successful: bool,
    pub reason: String,
}

impl SetParametersResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            successful: true,
            reason: String::new(),
        }
    }

    #[must_use]
    pub fn rejected(reason: &str) -> Self {
        Self {
            successful: false,
            reason: reason.to_string(),
        }
    }
}

/// Name and runtime type of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParameterType,
}

fn put_string_list(buf: &mut Vec<u8>, names: &[String]) {
    wire::put_u32(buf, names.len() as u32);
    for name in names {
        wire::put_str(buf, name);
    }
}

fn get_string_list(cursor: &mut wire::Cursor<'_>) -> Result<Vec<String>> {
    let count = cursor.get_u32()? as usize;
    let mut names = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        names.push(cursor.get_str()?);
    }
    Ok(names)
}

macro_rules! impl_name_list_message {
    ($ty:ident, $type_name:literal) => {
        /// Request carrying a list of parameter names.
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $ty {
            pub names: Vec<String>,
        }

        impl Message for $ty {
            fn type_name() -> &'static str {
                $type_name
            }

            fn encode(&self) -> Result<Vec<u8>> {
                let mut buf = Vec::new();
                put_string_list(&mut buf, &self.names);
                Ok(buf)
            }

            fn decode(buf: &[u8]) -> Result<Self> {
                let mut cursor = wire::Cursor::new(buf);
                let names = get_string_list(&mut cursor)?;
                cursor.finish()?;
                Ok(Self { names })
            }
        }
    };
}

impl_name_list_message!(GetParametersRequest, "hrcl/GetParametersRequest");
impl_name_list_message!(GetParameterTypesRequest, "hrcl/GetParameterTypesRequest");
impl_name_list_message!(DescribeParametersRequest, "hrcl/DescribeParametersRequest");

/// Response carrying parameter values, in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetParametersResponse {
    pub values: Vec<ParameterValue>,
}

impl Message for GetParametersResponse {
    fn type_name() -> &'static str {
        "hrcl/GetParametersResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::put_u32(&mut buf, self.values.len() as u32);
        for value in &self.values {
            value.put(&mut buf);
        }
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let count = cursor.get_u32()? as usize;
        let mut values = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            values.push(ParameterValue::get(&mut cursor)?);
        }
        cursor.finish()?;
        Ok(Self { values })
    }
}

/// Response carrying parameter runtime types, in request order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetParameterTypesResponse {
    pub types: Vec<ParameterType>,
}

impl Message for GetParameterTypesResponse {
    fn type_name() -> &'static str {
        "hrcl/GetParameterTypesResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::put_u32(&mut buf, self.types.len() as u32);
        for kind in &self.types {
            buf.push(kind.tag());
        }
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let count = cursor.get_u32()? as usize;
        let mut types = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            types.push(ParameterType::from_tag(cursor.get_u8()?)?);
        }
        cursor.finish()?;
        Ok(Self { types })
    }
}

/// Request carrying parameters to set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetParametersRequest {
    pub parameters: Vec<Parameter>,
}

impl Message for SetParametersRequest {
    fn type_name() -> &'static str {
        "hrcl/SetParametersRequest"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::put_u32(&mut buf, self.parameters.len() as u32);
        for parameter in &self.parameters {
            wire::put_str(&mut buf, &parameter.name);
            parameter.value.put(&mut buf);
        }
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let count = cursor.get_u32()? as usize;
        let mut parameters = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let name = cursor.get_str()?;
            let value = ParameterValue::get(&mut cursor)?;
            parameters.push(Parameter { name, value });
        }
        cursor.finish()?;
        Ok(Self { parameters })
    }
}

/// Response carrying one result per submitted parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetParametersResponse {
    pub results: Vec<SetParametersResult>,
}

impl Message for SetParametersResponse {
    fn type_name() -> &'static str {
        "hrcl/SetParametersResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::put_u32(&mut buf, self.results.len() as u32);
        for result in &self.results {
            buf.push(u8::from(result.successful));
            wire::put_str(&mut buf, &result.reason);
        }
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let count = cursor.get_u32()? as usize;
        let mut results = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let successful = cursor.get_u8()? != 0;
            let reason = cursor.get_str()?;
            results.push(SetParametersResult { successful, reason });
        }
        cursor.finish()?;
        Ok(Self { results })
    }
}

/// Response for the atomic set: a single all-or-nothing result.
#[derive(Debug, Clone, PartialEq)]
pub struct SetParametersAtomicallyResponse {
    pub result: SetParametersResult,
}

impl Message for SetParametersAtomicallyResponse {
    fn type_name() -> &'static str {
        "hrcl/SetParametersAtomicallyResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.push(u8::from(self.result.successful));
        wire::put_str(&mut buf, &self.result.reason);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let successful = cursor.get_u8()? != 0;
        let reason = cursor.get_str()?;
        cursor.finish()?;
        Ok(Self {
            result: SetParametersResult { successful, reason },
        })
    }
}

/// Request listing parameters under the given prefixes (all when empty).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListParametersRequest {
    pub prefixes: Vec<String>,
}

impl Message for ListParametersRequest {
    fn type_name() -> &'static str {
        "hrcl/ListParametersRequest"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        put_string_list(&mut buf, &self.prefixes);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let prefixes = get_string_list(&mut cursor)?;
        cursor.finish()?;
        Ok(Self { prefixes })
    }
}

/// Response carrying matching parameter names, sorted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListParametersResponse {
    pub names: Vec<String>,
}

impl Message for ListParametersResponse {
    fn type_name() -> &'static str {
        "hrcl/ListParametersResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        put_string_list(&mut buf, &self.names);
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let names = get_string_list(&mut cursor)?;
        cursor.finish()?;
        Ok(Self { names })
    }
}

/// Response carrying one descriptor per requested name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescribeParametersResponse {
    pub descriptors: Vec<ParameterDescriptor>,
}

impl Message for DescribeParametersResponse {
    fn type_name() -> &'static str {
        "hrcl/DescribeParametersResponse"
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        wire::put_u32(&mut buf, self.descriptors.len() as u32);
        for descriptor in &self.descriptors {
            wire::put_str(&mut buf, &descriptor.name);
            buf.push(descriptor.kind.tag());
        }
        Ok(buf)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = wire::Cursor::new(buf);
        let count = cursor.get_u32()? as usize;
        let mut descriptors = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let name = cursor.get_str()?;
            let kind = ParameterType::from_tag(cursor.get_u8()?)?;
            descriptors.push(ParameterDescriptor { name, kind });
        }
        cursor.finish()?;
        Ok(Self { descriptors })
    }
}
