// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;

const LIB: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");

fn snare() -> Command {
    Command::cargo_bin("snare").unwrap()
}

#[test]
fn text_summary() {
    snare()
        .args(["-l", LIB])
        .args(["-w", "strstr+0x0[str,str]", "-w", "0x89ab[buf:64,int]"])
        .args(["-s", "openat,write", "--tname-whitelist", "main"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(indoc! {"
            hook point 0: strstr[str,str]
            hook point 1: 0x89ab[buf,int]
            watch:openat,write
            uprobe_point_args_map: 2 records
        "}))
        .stdout(predicate::str::contains("common_filter: 1 records\n"))
        .stdout(predicate::str::contains("syscall_filter: 1 records\n"))
        .stdout(predicate::str::contains("config_map: 1 records\n"))
        .stdout(predicate::str::contains("rev_filter: 9 records\n"))
        .stdout(predicate::str::ends_with("thread_filter: 11 records\n"));
}

#[test]
fn filters_only() {
    snare()
        .assert()
        .success()
        .stdout(predicate::str::starts_with("common_filter: 1 records\n"))
        .stdout(predicate::str::contains("syscall").not())
        .stdout(predicate::str::contains("uprobe").not());
}

#[test]
fn hex_dump() {
    snare()
        .args(["--format", "hex"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "rev_filter 2f7362696e2f7375000000000000000000000000000000000000000000000000 01000000\n",
        ))
        .stdout(predicate::str::is_match("(?m)^config_map 00000000 [0-9a-f]{8}00000000$").unwrap());
}

#[test]
fn x86_numbering() {
    snare()
        .args(["--arch", "x86-64", "-s", "openat", "--format", "hex"])
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "syscall_filter 00000000 ",
            "00000000", // is_32bit
            "00000000", // hook_all
            "01000000", // mask
            "01010000", // 257
        )));
}

#[test]
fn unknown_type() {
    snare()
        .args(["-l", LIB, "-w", "write[int,foo]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid hook point"))
        .stderr(predicate::str::contains(
            "parse for write[int,foo] failed, unknown type: foo",
        ));
}

#[test]
fn unknown_syscall() {
    snare()
        .args(["-s", "openat,frobnicate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "syscall [frobnicate] is not in the syscall table",
        ));
}

#[test]
fn missing_library() {
    snare()
        .args(["-l", "/nonexistent/libfoo.so", "-w", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "library /nonexistent/libfoo.so is not accessible",
        ));
}

#[test]
fn hook_points_need_a_library() {
    snare()
        .args(["-w", "strstr[str,str]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hook points need a library"));
}

#[test]
fn too_many_pids() {
    let pids = (1..=21).map(|p| p.to_string()).collect::<Vec<_>>().join(",");
    snare()
        .args(["--pids-blacklist", &pids])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "max pid blacklist count is 20, provided count:21",
        ));
}

#[test]
fn long_thread_name() {
    snare()
        .args(["--tname-blacklist", "averyveryverylongname"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("thread name max len is 16"));
}
