//! EIP-712 typed structured data hashing.
//!
//! Two variants are supported, matching what wallets expose as
//! `eth_signTypedData_v3` and `eth_signTypedData_v4`:
//!
//! - **V3**: struct fields without a value are skipped; array types are rejected.
//! - **V4**: every field is encoded; arrays are hashed element-wise; a missing
//!   nested struct encodes as the zero word.
//!
//! See <https://eips.ethereum.org/EIPS/eip-712>.

use crate::domain::methods::TypedDataVersion;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Keccak256};
use std::collections::{BTreeMap, BTreeSet};

/// 32-byte EIP-712 word / digest
pub type Word = [u8; 32];

/// Name of the domain separator struct
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One member of a struct type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Struct definitions keyed by type name
pub type TypeDefs = BTreeMap<String, Vec<TypedField>>;

/// The `eth_signTypedData` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: TypeDefs,
    pub primary_type: String,
    #[serde(default)]
    pub domain: Value,
    #[serde(default)]
    pub message: Value,
}

impl TypedData {
    /// Parse from the JSON text or object a dapp passes as a parameter.
    pub fn from_param(param: &Value) -> Result<Self, TypedDataError> {
        let parsed = match param {
            Value::String(raw) => serde_json::from_str(raw),
            other => serde_json::from_value(other.clone()),
        };
        parsed.map_err(|e| TypedDataError::Malformed(e.to_string()))
    }
}

/// Typed data hashing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypedDataError {
    #[error("malformed typed data: {0}")]
    Malformed(String),

    #[error("no type definition for {0}")]
    MissingType(String),

    #[error("missing value for field {field} of type {ty}")]
    MissingValue { field: String, ty: String },

    #[error("arrays are unimplemented in eth_signTypedData_v3; use eth_signTypedData_v4")]
    ArraysUnsupported,

    #[error("invalid value for field {field} of type {ty}: {reason}")]
    InvalidValue {
        field: String,
        ty: String,
        reason: String,
    },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

/// One-shot Keccak-256
pub fn keccak256(data: impl AsRef<[u8]>) -> Word {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    hasher.finalize().into()
}

/// Compute the `\x19\x01 ‖ domainSeparator ‖ hashStruct(message)` digest.
pub fn eip712_hash(data: &TypedData, version: TypedDataVersion) -> Result<Word, TypedDataError> {
    let mut types = data.types.clone();
    types.entry(DOMAIN_TYPE.to_string()).or_default();

    let encoder = Encoder {
        types: &types,
        version,
    };

    let mut buf = Vec::with_capacity(66);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(&encoder.hash_struct(DOMAIN_TYPE, &data.domain)?);
    if data.primary_type != DOMAIN_TYPE {
        buf.extend_from_slice(&encoder.hash_struct(&data.primary_type, &data.message)?);
    }
    Ok(keccak256(buf))
}

/// EIP-712 `encodeType`: primary type first, then referenced types sorted by name.
pub fn encode_type(primary: &str, types: &TypeDefs) -> Result<String, TypedDataError> {
    if !types.contains_key(primary) {
        return Err(TypedDataError::MissingType(primary.to_string()));
    }

    let mut deps = BTreeSet::new();
    collect_dependencies(primary, types, &mut deps);
    deps.remove(primary);

    let mut encoded = String::new();
    for name in std::iter::once(primary).chain(deps.iter().map(String::as_str)) {
        let fields = types
            .get(name)
            .ok_or_else(|| TypedDataError::MissingType(name.to_string()))?;
        let members: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", f.ty, f.name))
            .collect();
        encoded.push_str(&format!("{}({})", name, members.join(",")));
    }
    Ok(encoded)
}

/// keccak256 of [`encode_type`]
pub fn type_hash(primary: &str, types: &TypeDefs) -> Result<Word, TypedDataError> {
    encode_type(primary, types).map(keccak256)
}

fn collect_dependencies(ty: &str, types: &TypeDefs, found: &mut BTreeSet<String>) {
    let base = base_type(ty);
    if found.contains(base) {
        return;
    }
    let Some(fields) = types.get(base) else {
        return;
    };
    found.insert(base.to_string());
    for field in fields {
        collect_dependencies(&field.ty, types, found);
    }
}

/// Leading identifier of a type, dropping any array suffix (`Person[2][]` -> `Person`).
fn base_type(ty: &str) -> &str {
    let end = ty
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(ty.len());
    &ty[..end]
}

struct Encoder<'a> {
    types: &'a TypeDefs,
    version: TypedDataVersion,
}

impl Encoder<'_> {
    fn hash_struct(&self, ty: &str, data: &Value) -> Result<Word, TypedDataError> {
        self.encode_data(ty, data).map(keccak256)
    }

    fn encode_data(&self, ty: &str, data: &Value) -> Result<Vec<u8>, TypedDataError> {
        let fields = self
            .types
            .get(ty)
            .ok_or_else(|| TypedDataError::MissingType(ty.to_string()))?;

        let mut out = Vec::with_capacity(32 * (fields.len() + 1));
        out.extend_from_slice(&type_hash(ty, self.types)?);

        for field in fields {
            let value = data.get(&field.name).filter(|v| !v.is_null());
            match self.version {
                TypedDataVersion::V3 => {
                    if let Some(value) = value {
                        let word = self.encode_field(&field.name, &field.ty, Some(value))?;
                        out.extend_from_slice(&word);
                    }
                }
                TypedDataVersion::V4 => {
                    out.extend_from_slice(&self.encode_field(&field.name, &field.ty, value)?);
                }
            }
        }
        Ok(out)
    }

    fn encode_field(
        &self,
        name: &str,
        ty: &str,
        value: Option<&Value>,
    ) -> Result<Word, TypedDataError> {
        if self.types.contains_key(ty) {
            return match value {
                Some(value) => self.hash_struct(ty, value),
                None => Ok([0u8; 32]),
            };
        }

        let value = value.ok_or_else(|| TypedDataError::MissingValue {
            field: name.to_string(),
            ty: ty.to_string(),
        })?;

        if ty == "bytes" {
            return Ok(keccak256(parse_bytes(name, ty, value)?));
        }

        if ty == "string" {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(keccak256(text.as_bytes()));
        }

        if ty.ends_with(']') {
            if self.version == TypedDataVersion::V3 {
                return Err(TypedDataError::ArraysUnsupported);
            }
            let inner = ty
                .rfind('[')
                .map(|idx| &ty[..idx])
                .ok_or_else(|| TypedDataError::UnsupportedType(ty.to_string()))?;
            let items = value.as_array().ok_or_else(|| invalid(name, ty, "expected an array"))?;

            let mut buf = Vec::with_capacity(items.len() * 32);
            for item in items {
                let item = Some(item).filter(|v| !v.is_null());
                buf.extend_from_slice(&self.encode_field(name, inner, item)?);
            }
            return Ok(keccak256(buf));
        }

        encode_atomic(name, ty, value)
    }
}

fn invalid(field: &str, ty: &str, reason: impl Into<String>) -> TypedDataError {
    TypedDataError::InvalidValue {
        field: field.to_string(),
        ty: ty.to_string(),
        reason: reason.into(),
    }
}

/// ABI-encode a single static value into one word.
fn encode_atomic(name: &str, ty: &str, value: &Value) -> Result<Word, TypedDataError> {
    let mut word = [0u8; 32];

    if ty == "address" {
        let n = parse_uint(name, ty, value)?;
        if n.bits() > 160 {
            return Err(invalid(name, ty, "address wider than 20 bytes"));
        }
        n.to_big_endian(&mut word);
        return Ok(word);
    }

    if ty == "bool" {
        let flag = match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_u64().map(|n| n != 0).unwrap_or(false),
            Value::String(s) => s == "true" || s == "1",
            _ => return Err(invalid(name, ty, "expected a boolean")),
        };
        word[31] = flag as u8;
        return Ok(word);
    }

    if let Some(bits) = ty.strip_prefix("uint") {
        let bits = int_width(name, ty, bits)?;
        let n = parse_uint(name, ty, value)?;
        if n.bits() > bits {
            return Err(invalid(name, ty, "value out of range"));
        }
        n.to_big_endian(&mut word);
        return Ok(word);
    }

    if let Some(bits) = ty.strip_prefix("int") {
        let bits = int_width(name, ty, bits)?;
        let (negative, magnitude) = parse_int(name, ty, value)?;
        let limit = U256::one() << (bits - 1);
        let in_range = if negative {
            magnitude <= limit
        } else {
            magnitude < limit
        };
        if !in_range {
            return Err(invalid(name, ty, "value out of range"));
        }
        let encoded = if negative {
            (!magnitude).overflowing_add(U256::one()).0
        } else {
            magnitude
        };
        encoded.to_big_endian(&mut word);
        return Ok(word);
    }

    if let Some(len) = ty.strip_prefix("bytes") {
        let len: usize = len
            .parse()
            .map_err(|_| TypedDataError::UnsupportedType(ty.to_string()))?;
        if len == 0 || len > 32 {
            return Err(TypedDataError::UnsupportedType(ty.to_string()));
        }
        let bytes = parse_bytes(name, ty, value)?;
        if bytes.len() > len {
            return Err(invalid(name, ty, "too many bytes"));
        }
        word[..bytes.len()].copy_from_slice(&bytes);
        return Ok(word);
    }

    Err(TypedDataError::UnsupportedType(ty.to_string()))
}

fn int_width(name: &str, ty: &str, suffix: &str) -> Result<usize, TypedDataError> {
    if suffix.is_empty() {
        return Ok(256);
    }
    match suffix.parse::<usize>() {
        Ok(bits) if bits > 0 && bits <= 256 && bits % 8 == 0 => Ok(bits),
        _ => Err(invalid(name, ty, "invalid integer width")),
    }
}

fn parse_uint(name: &str, ty: &str, value: &Value) -> Result<U256, TypedDataError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| invalid(name, ty, "expected a non-negative integer")),
        Value::String(s) => {
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                if hex.is_empty() {
                    return Ok(U256::zero());
                }
                U256::from_str_radix(hex, 16).map_err(|_| invalid(name, ty, "invalid hex number"))
            } else {
                U256::from_dec_str(s).map_err(|_| invalid(name, ty, "invalid decimal number"))
            }
        }
        _ => Err(invalid(name, ty, "expected a number")),
    }
}

/// Returns (is_negative, magnitude).
fn parse_int(name: &str, ty: &str, value: &Value) -> Result<(bool, U256), TypedDataError> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) if v < 0 => Ok((true, U256::from(v.unsigned_abs()))),
            Some(v) => Ok((false, U256::from(v as u64))),
            None => parse_uint(name, ty, value).map(|m| (false, m)),
        },
        Value::String(s) => match s.strip_prefix('-') {
            Some(rest) => {
                let magnitude = parse_uint(name, ty, &Value::String(rest.to_string()))?;
                Ok((!magnitude.is_zero(), magnitude))
            }
            None => parse_uint(name, ty, value).map(|m| (false, m)),
        },
        _ => Err(invalid(name, ty, "expected a number")),
    }
}

fn parse_bytes(name: &str, ty: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    match value {
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => hex::decode(hex).map_err(|e| invalid(name, ty, e.to_string())),
            None => Ok(s.as_bytes().to_vec()),
        },
        Value::Array(items) => items
            .iter()
            .map(|b| {
                b.as_u64()
                    .filter(|b| *b <= 0xff)
                    .map(|b| b as u8)
                    .ok_or_else(|| invalid(name, ty, "expected byte values"))
            })
            .collect(),
        _ => Err(invalid(name, ty, "expected hex bytes")),
    }
}
