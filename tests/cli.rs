use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help() {
    cargo_bin_cmd!("aslap")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("as slow as possible"))
        .stdout(predicate::str::contains("--base"))
        .stdout(predicate::str::contains("--step"))
        .stdout(predicate::str::contains("--bits"))
        .stdout(predicate::str::contains("--debug"));
}

#[test]
fn test_copies_input() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "0", "--step", "0", "--bits", "3"])
        .write_stdin("AB")
        .assert()
        .success()
        .stdout("AB");
}

#[test]
fn test_copies_multibyte_and_invalid_input() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "0s", "--step", "1ns"])
        .write_stdin(&b"h\xc3\xa9\xe2\x82\xac\xff!\n"[..])
        .assert()
        .success()
        .stdout("h\u{e9}\u{20ac}\u{fffd}!\n");
}

#[test]
fn test_debug() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "0", "--step", "1ns", "--debug"])
        .write_stdin("A")
        .assert()
        .success()
        .stdout("\"A\" U+0041 1ns\n");
}

#[test]
fn test_debug_from_env() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "0", "--step", "1us"])
        .env("ASLAP_DEBUG", "true")
        .write_stdin("\u{20ac}")
        .assert()
        .success()
        .stdout("\"\u{20ac}\" U+20AC 4\u{b5}s\n");
}

#[test]
fn test_too_many_bits() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "0", "--step", "0", "--bits", "8"])
        .write_stdin("AB")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("too many bits: 8"));
}

#[test]
fn test_too_many_bits_from_env() {
    cargo_bin_cmd!("aslap")
        .env("ASLAP_BITS", "9")
        .write_stdin("AB")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("too many bits: 9"));
}

#[test]
fn test_bad_duration() {
    cargo_bin_cmd!("aslap")
        .args(["--base", "soon"])
        .write_stdin("AB")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--base"));
}

#[test]
fn test_debug_zero_delay() {
    cargo_bin_cmd!("aslap")
        .args(["--base=-0s", "--step", "0", "--debug"])
        .write_stdin("A")
        .assert()
        .success()
        .stdout("\"A\" U+0041 0s\n");
}
