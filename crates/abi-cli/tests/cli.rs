// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end runs of the `abi-cli` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ABI: &str = r#"{
    "version": "eosio::abi/1.1",
    "structs": [{"name": "transfer", "base": "", "fields": [
        {"name": "from", "type": "name"},
        {"name": "to", "type": "name"},
        {"name": "amount", "type": "uint64"}
    ]}],
    "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}],
    "tables": [{"name": "ledger", "index_type": "i64", "key_names": [], "key_types": [], "type": "transfer"}]
}"#;

const TRANSFER_HEX: &str = "0000000000855c340000000000000e3de803000000000000";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("abi.json"), ABI).expect("write abi");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn abi(&self) -> PathBuf {
        self.path("abi.json")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("abi-cli").expect("binary");
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path("prefs.json"));
        cmd
    }
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn name_encode_and_decode() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["name", "encode", "eosio"])
        .assert()
        .success()
        .stdout("6138663577826885632\n");
    fx.cmd()
        .args(["name", "decode", "6138663591592764928"])
        .assert()
        .success()
        .stdout("eosio.token\n");
    fx.cmd()
        .args(["name", "encode", "Bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid character"));
}

#[test]
fn json_to_bin_by_action() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["json-to-bin", "--abi", arg(&fx.abi()), "--type", "transfer"])
        .args(["--kind", "action"])
        .arg(r#"{"from":"alice","to":"bob","amount":1000}"#)
        .assert()
        .success()
        .stdout(format!("{TRANSFER_HEX}\n"));
}

#[test]
fn strict_and_reorderable() {
    let fx = Fixture::new();
    let shuffled = r#"{"amount":1000,"from":"alice","to":"bob"}"#;
    fx.cmd()
        .args(["json-to-bin", "--abi", arg(&fx.abi()), "--type", "transfer", shuffled])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected field \"from\""));
    fx.cmd()
        .args(["json-to-bin", "--abi", arg(&fx.abi()), "--type", "transfer"])
        .args(["--reorderable", shuffled])
        .assert()
        .success()
        .stdout(format!("{TRANSFER_HEX}\n"));
}

#[test]
fn bin_to_json_by_table() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["bin-to-json", "--abi", arg(&fx.abi()), "--type", "ledger"])
        .args(["--kind", "table", TRANSFER_HEX])
        .assert()
        .success()
        .stdout("{\"from\":\"alice\",\"to\":\"bob\",\"amount\":1000}\n");
}

#[test]
fn schema_documents_convert_both_ways() {
    let fx = Fixture::new();
    let out = fx
        .cmd()
        .args(["abi-to-bin", arg(&fx.abi())])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let hex_text = String::from_utf8(out).expect("utf-8");
    let bytes = hex::decode(hex_text.trim()).expect("hex output");
    fs::write(fx.path("abi.bin"), &bytes).expect("write bin");

    fx.cmd()
        .args(["abi-to-json", arg(&fx.path("abi.bin"))])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{\"version\":\"eosio::abi/1.1\""));

    // binary schemas are accepted wherever --abi is
    fx.cmd()
        .args(["bin-to-json", "--abi", arg(&fx.path("abi.bin")), "--type", "transfer"])
        .arg(TRANSFER_HEX)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"alice\""));
}

#[test]
fn inspect_lists_messages() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["inspect", "--abi", arg(&fx.abi())])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("version: eosio::abi/1.1")
                .and(predicate::str::contains("action"))
                .and(predicate::str::contains("ledger")),
        );
}

#[test]
fn unsupported_version_is_an_error() {
    let fx = Fixture::new();
    fs::write(
        fx.path("future.json"),
        ABI.replace("eosio::abi/1.1", "eosio::abi/2.0"),
    )
    .expect("write");
    fx.cmd()
        .args(["inspect", "--abi", arg(&fx.path("future.json"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported abi version"));
}

#[test]
fn saved_preferences_apply() {
    let fx = Fixture::new();
    fx.cmd()
        .args(["config", "save", "--mode", "reorderable", "--pretty", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reorderable\""));
    assert!(fx.path("prefs.json").exists());

    // reorderable is now the default
    fx.cmd()
        .args(["json-to-bin", "--abi", arg(&fx.abi()), "--type", "transfer"])
        .arg(r#"{"to":"bob","amount":1000,"from":"alice"}"#)
        .assert()
        .success()
        .stdout(format!("{TRANSFER_HEX}\n"));

    fx.cmd()
        .args(["bin-to-json", "--abi", arg(&fx.abi()), "--type", "transfer", TRANSFER_HEX])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n  \"from\": \"alice\""));
}

#[test]
fn broken_preferences_fall_back_to_defaults() {
    let fx = Fixture::new();
    fs::write(fx.path("prefs.json"), "not json").expect("write");
    fx.cmd()
        .args(["name", "decode", "0"])
        .assert()
        .success()
        .stdout("\n")
        .stderr(predicate::str::contains("preferences not loaded"));
}
