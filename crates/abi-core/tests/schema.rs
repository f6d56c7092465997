// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Schema documents: JSON ⇄ binary stability, version gate, registry.

use abi_core::{
    abi_bin_to_json, abi_json_to_bin, decode_abi_def, load_schema, AbiError, ContractRegistry,
    Name, SchemaSource,
};

const TOKEN_ABI: &str = r###"{
    "version": "eosio::abi/1.2",
    "types": [{"new_type_name": "account_name", "type": "name"}],
    "structs": [
        {"name": "account", "base": "", "fields": [{"name": "balance", "type": "asset"}]},
        {"name": "transfer", "base": "", "fields": [
            {"name": "from", "type": "account_name"},
            {"name": "to", "type": "account_name"},
            {"name": "quantity", "type": "asset"},
            {"name": "memo", "type": "string"}
        ]}
    ],
    "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": "## Transfer"}],
    "tables": [{"name": "accounts", "index_type": "i64", "key_names": [], "key_types": [], "type": "account"}],
    "ricardian_clauses": [{"id": "terms", "body": "be nice"}],
    "error_messages": [{"error_code": 42, "error_msg": "overdrawn"}],
    "abi_extensions": [{"tag": 1, "value": "CAFE"}],
    "variants": [{"name": "balance_or_error", "types": ["asset", "string"]}],
    "action_results": [{"name": "transfer", "result_type": "balance_or_error"}]
}"###;

#[test]
fn schema_document_round_trip_is_stable() {
    let bytes = abi_json_to_bin(TOKEN_ABI).expect("json to bin");
    let json = abi_bin_to_json(&bytes).expect("bin to json");
    assert_eq!(abi_json_to_bin(&json).expect("second pass"), bytes);
    assert_eq!(abi_bin_to_json(&bytes).expect("again"), json);

    let def = decode_abi_def(SchemaSource::Binary(&bytes)).expect("decode");
    assert_eq!(def.abi_extensions[0].value, vec![0xca, 0xfe]);
    assert_eq!(def.error_messages[0].error_code, 42);
    assert_eq!(def.action_results.len(), 1);
}

#[test]
fn resolved_messages() {
    let abi = load_schema(SchemaSource::Json(TOKEN_ABI)).expect("load");
    assert_eq!(abi.version(), "eosio::abi/1.2");
    let transfer = Name::encode("transfer").expect("name");
    assert_eq!(abi.action_type_name(transfer).expect("action"), "transfer");
    assert_eq!(
        abi.action_result_type_name(transfer).expect("result"),
        "balance_or_error"
    );
    let accounts = Name::encode("accounts").expect("name");
    assert_eq!(
        abi.get_table_type(accounts).expect("table"),
        abi.get_type("account").expect("type")
    );

    let ty = abi.get_action_result_type(transfer).expect("result type");
    let bytes = abi
        .json_to_bin(ty, r#"["string","overdrawn"]"#, abi_core::ConversionMode::Strict)
        .expect("encode");
    assert_eq!(bytes[0], 1);
}

#[test]
fn binary_documents_load_too() {
    let bytes = abi_json_to_bin(TOKEN_ABI).expect("json to bin");
    let from_bin = load_schema(SchemaSource::Binary(&bytes)).expect("binary load");
    let from_json = load_schema(SchemaSource::Json(TOKEN_ABI)).expect("json load");
    assert_eq!(from_bin.node_count(), from_json.node_count());
}

#[test]
fn unsupported_version_leaves_registry_unchanged() {
    let registry = ContractRegistry::new();
    let token = Name::encode("eosio.token").expect("name");
    let loaded = registry
        .load(token, SchemaSource::Json(TOKEN_ABI))
        .expect("load");

    let newer = TOKEN_ABI.replace("eosio::abi/1.2", "eosio::abi/2.0");
    let err = registry
        .load(token, SchemaSource::Json(&newer))
        .unwrap_err();
    assert_eq!(
        err.root(),
        &AbiError::UnsupportedVersion("eosio::abi/2.0".into())
    );
    assert_eq!(registry.len(), 1);
    let current = registry.get(token).expect("still loaded");
    assert!(std::sync::Arc::ptr_eq(&loaded, &current));

    let other = Name::encode("other").expect("name");
    assert!(registry.load(other, SchemaSource::Json(&newer)).is_err());
    assert!(!registry.contains(other));
}

#[test]
fn truncated_binary_document() {
    let bytes = abi_json_to_bin(TOKEN_ABI).expect("json to bin");
    let err = load_schema(SchemaSource::Binary(&bytes[..10])).unwrap_err();
    assert_eq!(err.root(), &AbiError::UnexpectedEnd);
}
