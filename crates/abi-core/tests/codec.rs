// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Golden vectors and rejection cases for the JSON ⇄ binary codecs.

use abi_core::{load_schema, AbiError, ConversionMode, Name, ResolvedAbi, SchemaSource};

const TRANSFER_ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "types": [{"new_type_name": "account_name", "type": "name"}],
    "structs": [
        {"name": "transfer", "base": "", "fields": [
            {"name": "from", "type": "account_name"},
            {"name": "to", "type": "account_name"},
            {"name": "amount", "type": "uint64"}
        ]},
        {"name": "pay", "base": "", "fields": [
            {"name": "to", "type": "name"},
            {"name": "quantity", "type": "asset"},
            {"name": "memo", "type": "string"}
        ]},
        {"name": "tail", "base": "", "fields": [
            {"name": "a", "type": "uint32"},
            {"name": "b", "type": "string$"}
        ]},
        {"name": "link", "base": "", "fields": [
            {"name": "value", "type": "uint32"},
            {"name": "next", "type": "link?"}
        ]}
    ],
    "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}]
}"#;

fn schema() -> ResolvedAbi {
    load_schema(SchemaSource::Json(TRANSFER_ABI)).expect("schema loads")
}

fn transfer_bytes() -> Vec<u8> {
    let mut expected = Vec::new();
    expected.extend_from_slice(&3773036822876127232u64.to_le_bytes()); // alice
    expected.extend_from_slice(&4399453885987553280u64.to_le_bytes()); // bob
    expected.extend_from_slice(&1000u64.to_le_bytes());
    expected
}

#[test]
fn golden_transfer_action() {
    let abi = schema();
    let ty = abi
        .get_action_type(Name::encode("transfer").expect("name"))
        .expect("action");
    let json = r#"{"from":"alice","to":"bob","amount":1000}"#;
    let bytes = abi.json_to_bin(ty, json, ConversionMode::Strict).expect("encode");
    assert_eq!(bytes, transfer_bytes());
    assert_eq!(abi.bin_to_json(ty, &bytes).expect("decode"), json);
}

#[test]
fn reorderable_accepts_what_strict_rejects() {
    let abi = schema();
    let ty = abi.get_type("transfer").expect("type");
    let shuffled = r#"{"amount":1000,"from":"alice","to":"bob"}"#;
    let bytes = abi
        .json_to_bin(ty, shuffled, ConversionMode::Reorderable)
        .expect("reorderable");
    assert_eq!(bytes, transfer_bytes());

    let err = abi
        .json_to_bin(ty, shuffled, ConversionMode::Strict)
        .unwrap_err();
    assert_eq!(
        err.root(),
        &AbiError::FieldOrder {
            expected: "from".into(),
            found: "amount".into(),
        }
    );
}

#[test]
fn missing_and_unknown_fields() {
    let abi = schema();
    let ty = abi.get_type("transfer").expect("type");
    for mode in [ConversionMode::Strict, ConversionMode::Reorderable] {
        let err = abi
            .json_to_bin(ty, r#"{"from":"alice","to":"bob"}"#, mode)
            .unwrap_err();
        assert_eq!(err.root(), &AbiError::MissingField("amount".into()));

        let err = abi
            .json_to_bin(ty, r#"{"from":"alice","to":"bob","amount":1,"fee":2}"#, mode)
            .unwrap_err();
        assert_eq!(err.root(), &AbiError::UnknownField("fee".into()));
    }
}

#[test]
fn duplicate_keys_are_rejected_in_both_modes() {
    let abi = schema();
    let ty = abi.get_type("transfer").expect("type");
    let json = r#"{"from":"alice","from":"carol","to":"bob","amount":1}"#;
    for mode in [ConversionMode::Strict, ConversionMode::Reorderable] {
        let err = abi.json_to_bin(ty, json, mode).unwrap_err();
        assert_eq!(err.root(), &AbiError::DuplicateKey("from".into()), "{mode:?}");
    }
}

#[test]
fn integer_overflow_is_reported() {
    let abi = schema();
    let ty = abi.get_type("transfer").expect("type");
    let json = r#"{"from":"alice","to":"bob","amount":"18446744073709551616"}"#;
    let err = abi.json_to_bin(ty, json, ConversionMode::Strict).unwrap_err();
    assert!(matches!(err.root(), AbiError::NumericOverflow(_)), "{err}");
    // the message names where it happened
    assert!(err.to_string().contains("amount"), "{err}");
}

#[test]
fn wide_number_literals_are_never_rounded() {
    let abi = load_schema(SchemaSource::Json(
        r#"{"version":"eosio::abi/1.1","structs":[
            {"name":"signed","base":"","fields":[{"name":"a","type":"int64"}]},
            {"name":"wide","base":"","fields":[{"name":"a","type":"uint128"}]}
        ]}"#,
    ))
    .expect("schema");
    let signed = abi.get_type("signed").expect("signed");
    let wide = abi.get_type("wide").expect("wide");

    let err = abi
        .json_to_bin(signed, r#"{"a":-9223372036854775809}"#, ConversionMode::Strict)
        .unwrap_err();
    assert!(matches!(err.root(), AbiError::NumericOverflow(_)), "{err}");

    let bytes = abi
        .json_to_bin(wide, r#"{"a":18446744073709551617}"#, ConversionMode::Strict)
        .expect("uint128 literal");
    assert_eq!(bytes, (u128::from(u64::MAX) + 2).to_le_bytes());
    assert_eq!(
        abi.bin_to_json(wide, &bytes).expect("decode"),
        r#"{"a":"18446744073709551617"}"#
    );

    let err = abi
        .json_to_bin(wide, r#"{"a":1e30}"#, ConversionMode::Strict)
        .unwrap_err();
    assert!(matches!(err.root(), AbiError::InvalidValue(_)), "{err}");
}

#[test]
fn asset_payload() {
    let abi = schema();
    let ty = abi.get_type("pay").expect("type");
    let json = r#"{"to":"bob","quantity":"1.0000 EOS","memo":"thanks"}"#;
    let bytes = abi.json_to_bin(ty, json, ConversionMode::Strict).expect("encode");
    assert_eq!(&bytes[8..16], &10000i64.to_le_bytes());
    assert_eq!(&bytes[16..24], &[4, b'E', b'O', b'S', 0, 0, 0, 0]);
    assert_eq!(abi.bin_to_json(ty, &bytes).expect("decode"), json);
}

#[test]
fn extension_tail() {
    let abi = schema();
    let ty = abi.get_type("tail").expect("type");

    let short = abi
        .json_to_bin(ty, r#"{"a":1}"#, ConversionMode::Strict)
        .expect("encode without extension");
    assert_eq!(short, [1, 0, 0, 0]);
    assert_eq!(abi.bin_to_json(ty, &short).expect("decode"), r#"{"a":1}"#);

    let full = abi
        .json_to_bin(ty, r#"{"a":1,"b":"x"}"#, ConversionMode::Strict)
        .expect("encode with extension");
    assert_eq!(full, [1, 0, 0, 0, 1, b'x']);
    assert_eq!(abi.bin_to_json(ty, &full).expect("decode"), r#"{"a":1,"b":"x"}"#);

    let err = abi.bin_to_json(ty, &[1, 0, 0]).unwrap_err();
    assert_eq!(err.root(), &AbiError::UnexpectedEnd);
}

#[test]
fn optional_fields_may_be_omitted() {
    let abi = schema();
    let ty = abi.get_type("link").expect("type");
    let bytes = abi
        .json_to_bin(ty, r#"{"value":7}"#, ConversionMode::Strict)
        .expect("encode");
    assert_eq!(bytes, [7, 0, 0, 0, 0]);
    assert_eq!(
        abi.bin_to_json(ty, &bytes).expect("decode"),
        r#"{"value":7,"next":null}"#
    );
}

fn nested_links(depth: usize) -> String {
    let mut json = String::from("null");
    for i in 0..depth {
        json = format!(r#"{{"value":{i},"next":{json}}}"#);
    }
    json
}

#[test]
fn recursion_is_bounded() {
    let abi = schema();
    let ty = abi.get_type("link").expect("type");

    let shallow = nested_links(3);
    let bytes = abi
        .json_to_bin(ty, &shallow, ConversionMode::Strict)
        .expect("shallow");
    assert_eq!(abi.bin_to_json(ty, &bytes).expect("decode"), shallow);

    let deep = nested_links(40);
    let err = abi.json_to_bin(ty, &deep, ConversionMode::Strict).unwrap_err();
    assert_eq!(err.root(), &AbiError::RecursionLimit);

    let mut bytes = Vec::new();
    for _ in 0..40 {
        bytes.extend_from_slice(&[0, 0, 0, 0, 1]);
    }
    bytes.extend_from_slice(&[0, 0, 0, 0, 0]);
    let err = abi.bin_to_json(ty, &bytes).unwrap_err();
    assert_eq!(err.root(), &AbiError::RecursionLimit);
}

#[test]
fn variant_tags_survive_appended_alternatives() {
    let v1 = load_schema(SchemaSource::Json(
        r#"{"version":"eosio::abi/1.1","variants":[{"name":"v","types":["uint8","string"]}]}"#,
    ))
    .expect("v1");
    let v2 = load_schema(SchemaSource::Json(
        r#"{"version":"eosio::abi/1.1","variants":[{"name":"v","types":["uint8","string","bool"]}]}"#,
    ))
    .expect("v2");
    let t1 = v1.get_type("v").expect("v1 type");
    let t2 = v2.get_type("v").expect("v2 type");

    let json = r#"["string","hi"]"#;
    let old = v1.json_to_bin(t1, json, ConversionMode::Strict).expect("v1 encode");
    let new = v2.json_to_bin(t2, json, ConversionMode::Strict).expect("v2 encode");
    assert_eq!(old, new);
    assert_eq!(v2.bin_to_json(t2, &old).expect("v2 decode"), json);

    // numeric selectors are accepted on input
    let by_tag = v1.json_to_bin(t1, r#"[1,"hi"]"#, ConversionMode::Strict).expect("tag");
    assert_eq!(by_tag, old);

    let err = v1
        .json_to_bin(t1, r#"["bool",true]"#, ConversionMode::Strict)
        .unwrap_err();
    assert!(matches!(err.root(), AbiError::UnknownVariantAlternative(_)));
}

#[test]
fn malformed_json_and_trailing_bytes() {
    let abi = schema();
    let ty = abi.get_type("transfer").expect("type");
    let err = abi
        .json_to_bin(ty, r#"{"from":"alice""#, ConversionMode::Strict)
        .unwrap_err();
    assert!(matches!(err.root(), AbiError::Json(_)));

    let mut bytes = transfer_bytes();
    bytes.push(0);
    assert_eq!(
        abi.bin_to_json(ty, &bytes).unwrap_err(),
        AbiError::TrailingBytes(1)
    );
}
