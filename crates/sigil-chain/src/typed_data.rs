//! EIP-712 typed-data validation and hashing.
//!
//! The encoder only runs [`validate`]; the signer receives the document as
//! JSON. Hashing ([`signing_hash`]) is used by the verifier and the local
//! development signer.
//!
//! When `types` does not declare `EIP712Domain`, it is derived from the
//! domain fields that are present, in the order `name`, `version`,
//! `chainId`, `verifyingContract`, `salt`.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256, U256};
use serde_json::Value;
use sigil_core::error::{EncodeError, EncodeResult};
use sigil_core::types::{TypedData, TypedDataField};
use sigil_crypto::verify::keccak256;

/// Name of the domain struct type.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

type Types = BTreeMap<String, Vec<TypedDataField>>;

// ============================================================================
// Type grammar
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atomic {
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Uint(usize),
    Int(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType<'a> {
    Atomic(Atomic),
    Struct(&'a str),
    Array { inner: &'a str, len: Option<usize> },
}

fn parse_atomic(ty: &str) -> Option<Atomic> {
    let bits = |digits: &str| -> Option<usize> {
        let n: usize = digits.parse().ok()?;
        (n > 0 && n <= 256 && n % 8 == 0).then_some(n)
    };

    match ty {
        "address" => Some(Atomic::Address),
        "bool" => Some(Atomic::Bool),
        "string" => Some(Atomic::String),
        "bytes" => Some(Atomic::Bytes),
        "uint" => Some(Atomic::Uint(256)),
        "int" => Some(Atomic::Int(256)),
        _ => {
            if let Some(n) = ty.strip_prefix("bytes") {
                let n: usize = n.parse().ok()?;
                (1..=32).contains(&n).then_some(Atomic::FixedBytes(n))
            } else if let Some(n) = ty.strip_prefix("uint") {
                bits(n).map(Atomic::Uint)
            } else if let Some(n) = ty.strip_prefix("int") {
                bits(n).map(Atomic::Int)
            } else {
                None
            }
        }
    }
}

fn parse_field_type<'a>(types: &Types, ty: &'a str) -> EncodeResult<FieldType<'a>> {
    if let Some(head) = ty.strip_suffix(']') {
        let open = head
            .rfind('[')
            .ok_or_else(|| EncodeError::schema_mismatch(format!("malformed array type '{ty}'")))?;
        let (inner, len) = (&head[..open], &head[open + 1..]);
        let len = if len.is_empty() {
            None
        } else {
            Some(len.parse::<usize>().map_err(|_| {
                EncodeError::schema_mismatch(format!("malformed array length in '{ty}'"))
            })?)
        };
        if inner.is_empty() {
            return Err(EncodeError::schema_mismatch(format!("malformed array type '{ty}'")));
        }
        return Ok(FieldType::Array { inner, len });
    }

    if let Some(atomic) = parse_atomic(ty) {
        return Ok(FieldType::Atomic(atomic));
    }
    if types.contains_key(ty) {
        return Ok(FieldType::Struct(ty));
    }
    Err(EncodeError::schema_mismatch(format!("type '{ty}' is not declared")))
}

// ============================================================================
// Validation
// ============================================================================

/// Checks a typed-data document against its own type declarations.
///
/// # Errors
///
/// Returns [`EncodeError::SchemaMismatch`] if
/// - `primary_type` is not declared in `types`
/// - a declared field references an undeclared, non-atomic type
/// - `message` (recursively) contains a field its type does not declare
/// - the domain contains a field a declared `EIP712Domain` does not list
pub fn validate(typed_data: &TypedData) -> EncodeResult<()> {
    let types = &typed_data.types;

    if !types.contains_key(&typed_data.primary_type) {
        return Err(EncodeError::schema_mismatch(format!(
            "primary type '{}' is not declared",
            typed_data.primary_type
        )));
    }

    for (name, fields) in types {
        for field in fields {
            check_declared(types, &field.r#type).map_err(|e| match e {
                EncodeError::SchemaMismatch { context } => {
                    EncodeError::schema_mismatch(format!("{name}.{}: {context}", field.name))
                }
                other => other,
            })?;
        }
    }

    check_value(types, &typed_data.primary_type, &typed_data.message)?;

    if let Some(declared) = types.get(DOMAIN_TYPE) {
        let domain = domain_value(typed_data)?;
        if let Value::Object(entries) = &domain {
            for key in entries.keys() {
                if !declared.iter().any(|f| &f.name == key) {
                    return Err(EncodeError::schema_mismatch(format!(
                        "domain field '{key}' is not declared in {DOMAIN_TYPE}"
                    )));
                }
            }
        }
    }

    Ok(())
}

fn check_declared(types: &Types, ty: &str) -> EncodeResult<()> {
    match parse_field_type(types, ty)? {
        FieldType::Array { inner, .. } => check_declared(types, inner),
        FieldType::Atomic(_) | FieldType::Struct(_) => Ok(()),
    }
}

fn check_value(types: &Types, ty: &str, value: &Value) -> EncodeResult<()> {
    match parse_field_type(types, ty)? {
        FieldType::Atomic(_) => Ok(()),
        FieldType::Array { inner, .. } => match value {
            Value::Array(items) => items.iter().try_for_each(|item| check_value(types, inner, item)),
            _ => Ok(()),
        },
        FieldType::Struct(name) => {
            let Value::Object(entries) = value else {
                return Err(EncodeError::schema_mismatch(format!(
                    "expected an object for struct '{name}'"
                )));
            };
            let fields = types.get(name).map(Vec::as_slice).unwrap_or_default();
            for (key, inner) in entries {
                let field = fields.iter().find(|f| &f.name == key).ok_or_else(|| {
                    EncodeError::schema_mismatch(format!("field '{key}' is not declared in '{name}'"))
                })?;
                check_value(types, &field.r#type, inner)?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// Hashing
// ============================================================================

/// `encodeType(primary)`: the primary struct followed by every struct it
/// references, sorted by name.
///
/// # Errors
///
/// Returns [`EncodeError::SchemaMismatch`] if `primary` is not declared.
pub fn encode_type(types: &Types, primary: &str) -> EncodeResult<String> {
    let mut deps = BTreeSet::new();
    collect_dependencies(types, primary, &mut deps);
    deps.remove(primary);

    let mut out = format_struct(types, primary)?;
    for dep in deps {
        out.push_str(&format_struct(types, dep)?);
    }
    Ok(out)
}

fn collect_dependencies<'a>(types: &'a Types, name: &str, found: &mut BTreeSet<&'a str>) {
    let Some((key, fields)) = types.get_key_value(name) else {
        return;
    };
    if !found.insert(key.as_str()) {
        return;
    }
    for field in fields {
        let base = field.r#type.split('[').next().unwrap_or_default();
        collect_dependencies(types, base, found);
    }
}

fn format_struct(types: &Types, name: &str) -> EncodeResult<String> {
    let fields = types
        .get(name)
        .ok_or_else(|| EncodeError::schema_mismatch(format!("type '{name}' is not declared")))?;
    let members: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.r#type, f.name))
        .collect();
    Ok(format!("{name}({})", members.join(",")))
}

/// `keccak256(encodeType(name))`.
///
/// # Errors
///
/// See [`encode_type`].
pub fn type_hash(types: &Types, name: &str) -> EncodeResult<B256> {
    encode_type(types, name).map(|encoded| B256::from(keccak256(encoded.as_bytes())))
}

/// `hashStruct(value) = keccak256(typeHash || encodeData(value))`.
///
/// # Errors
///
/// Returns [`EncodeError::SchemaMismatch`] for undeclared types and
/// [`EncodeError::InvalidField`] for values that do not fit their type.
pub fn hash_struct(types: &Types, name: &str, value: &Value) -> EncodeResult<B256> {
    let fields = types
        .get(name)
        .ok_or_else(|| EncodeError::schema_mismatch(format!("type '{name}' is not declared")))?;
    let Value::Object(entries) = value else {
        return Err(EncodeError::invalid_field(name, "expected an object"));
    };

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(type_hash(types, name)?.as_slice());
    for field in fields {
        let item = entries
            .get(&field.name)
            .ok_or_else(|| EncodeError::invalid_field(&field.name, format!("missing in '{name}'")))?;
        encoded.extend_from_slice(&encode_value(types, &field.name, &field.r#type, item)?);
    }
    Ok(B256::from(keccak256(&encoded)))
}

fn encode_value(types: &Types, field: &str, ty: &str, value: &Value) -> EncodeResult<[u8; 32]> {
    match parse_field_type(types, ty)? {
        FieldType::Struct(name) => hash_struct(types, name, value).map(|h| h.0),
        FieldType::Array { inner, len } => {
            let Value::Array(items) = value else {
                return Err(EncodeError::invalid_field(field, "expected an array"));
            };
            if let Some(expected) = len {
                if items.len() != expected {
                    return Err(EncodeError::invalid_field(
                        field,
                        format!("expected {expected} elements, got {}", items.len()),
                    ));
                }
            }
            let mut concat = Vec::with_capacity(32 * items.len());
            for item in items {
                concat.extend_from_slice(&encode_value(types, field, inner, item)?);
            }
            Ok(keccak256(&concat))
        }
        FieldType::Atomic(atomic) => encode_atomic(field, atomic, value),
    }
}

fn encode_atomic(field: &str, atomic: Atomic, value: &Value) -> EncodeResult<[u8; 32]> {
    let mut word = [0u8; 32];
    match atomic {
        Atomic::String => {
            let s = value
                .as_str()
                .ok_or_else(|| EncodeError::invalid_field(field, "expected a string"))?;
            Ok(keccak256(s.as_bytes()))
        }
        Atomic::Bytes => Ok(keccak256(&hex_value(field, value)?)),
        Atomic::Bool => {
            let b = value
                .as_bool()
                .ok_or_else(|| EncodeError::invalid_field(field, "expected a boolean"))?;
            word[31] = u8::from(b);
            Ok(word)
        }
        Atomic::Address => {
            let s = value
                .as_str()
                .ok_or_else(|| EncodeError::invalid_field(field, "expected an address string"))?;
            let address: Address = s
                .parse()
                .map_err(|_| EncodeError::invalid_field(field, format!("invalid address '{s}'")))?;
            word[12..].copy_from_slice(address.as_slice());
            Ok(word)
        }
        Atomic::FixedBytes(n) => {
            let bytes = hex_value(field, value)?;
            if bytes.len() != n {
                return Err(EncodeError::invalid_field(
                    field,
                    format!("expected {n} bytes, got {}", bytes.len()),
                ));
            }
            word[..n].copy_from_slice(&bytes);
            Ok(word)
        }
        Atomic::Uint(bits) => {
            let (negative, magnitude) = integer_value(field, value)?;
            if (negative && !magnitude.is_zero()) || magnitude.bit_len() > bits {
                return Err(EncodeError::invalid_field(field, format!("out of range for uint{bits}")));
            }
            Ok(magnitude.to_be_bytes::<32>())
        }
        Atomic::Int(bits) => {
            let (negative, magnitude) = integer_value(field, value)?;
            let limit = U256::from(1u8) << (bits - 1);
            let in_range = if negative { magnitude <= limit } else { magnitude < limit };
            if !in_range {
                return Err(EncodeError::invalid_field(field, format!("out of range for int{bits}")));
            }
            let twos = if negative {
                U256::ZERO.wrapping_sub(magnitude)
            } else {
                magnitude
            };
            Ok(twos.to_be_bytes::<32>())
        }
    }
}

fn hex_value(field: &str, value: &Value) -> EncodeResult<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| EncodeError::invalid_field(field, "expected a hex string"))?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|_| EncodeError::invalid_field(field, format!("invalid hex '{s}'")))
}

/// Returns `(is_negative, magnitude)` for a JSON number or decimal/hex string.
fn integer_value(field: &str, value: &Value) -> EncodeResult<(bool, U256)> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok((false, U256::from(u)))
            } else if let Some(i) = n.as_i64() {
                Ok((i < 0, U256::from(i.unsigned_abs())))
            } else {
                Err(EncodeError::invalid_field(field, format!("{n} is not an integer")))
            }
        }
        Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            let parsed = match digits.strip_prefix("0x") {
                Some(hex) => U256::from_str_radix(hex, 16),
                None => U256::from_str_radix(digits, 10),
            };
            if digits.is_empty() {
                return Err(EncodeError::invalid_field(field, "empty integer"));
            }
            parsed
                .map(|m| (negative, m))
                .map_err(|_| EncodeError::invalid_field(field, format!("invalid integer '{s}'")))
        }
        _ => Err(EncodeError::invalid_field(field, "expected an integer")),
    }
}

// ============================================================================
// Domain and digest
// ============================================================================

fn domain_value(typed_data: &TypedData) -> EncodeResult<Value> {
    serde_json::to_value(&typed_data.domain)
        .map_err(|e| EncodeError::invalid_field("domain", e.to_string()))
}

fn derived_domain_fields(typed_data: &TypedData) -> Vec<TypedDataField> {
    let domain = &typed_data.domain;
    let mut fields = Vec::with_capacity(5);
    if domain.name.is_some() {
        fields.push(TypedDataField::new("name", "string"));
    }
    if domain.version.is_some() {
        fields.push(TypedDataField::new("version", "string"));
    }
    if domain.chain_id.is_some() {
        fields.push(TypedDataField::new("chainId", "uint256"));
    }
    if domain.verifying_contract.is_some() {
        fields.push(TypedDataField::new("verifyingContract", "address"));
    }
    if domain.salt.is_some() {
        fields.push(TypedDataField::new("salt", "bytes32"));
    }
    fields
}

fn effective_types(typed_data: &TypedData) -> Cow<'_, Types> {
    if typed_data.types.contains_key(DOMAIN_TYPE) {
        Cow::Borrowed(&typed_data.types)
    } else {
        let mut types = typed_data.types.clone();
        types.insert(DOMAIN_TYPE.to_string(), derived_domain_fields(typed_data));
        Cow::Owned(types)
    }
}

/// `hashStruct(EIP712Domain, domain)`.
///
/// # Errors
///
/// See [`hash_struct`].
pub fn domain_separator(typed_data: &TypedData) -> EncodeResult<B256> {
    let types = effective_types(typed_data);
    hash_struct(&types, DOMAIN_TYPE, &domain_value(typed_data)?)
}

/// `keccak256(0x19 || 0x01 || domainSeparator || hashStruct(message))`.
///
/// # Errors
///
/// Everything [`validate`] and [`hash_struct`] can return.
pub fn signing_hash(typed_data: &TypedData) -> EncodeResult<B256> {
    validate(typed_data)?;

    let types = effective_types(typed_data);
    let separator = hash_struct(&types, DOMAIN_TYPE, &domain_value(typed_data)?)?;

    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(&[0x19, 0x01]);
    preimage.extend_from_slice(separator.as_slice());
    if typed_data.primary_type != DOMAIN_TYPE {
        let message = hash_struct(&types, &typed_data.primary_type, &typed_data.message)?;
        preimage.extend_from_slice(message.as_slice());
    }
    Ok(B256::from(keccak256(&preimage)))
}
