use std::process::Command;

#[test]
fn main_rejects_invalid_update_rate() {
    let bin = env!("CARGO_BIN_EXE_vumeter");
    let output = Command::new(bin)
        .args(["--updates", "0"])
        .output()
        .expect("run vumeter");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--updates"));
}

#[test]
fn main_rejects_invalid_channel_count() {
    let bin = env!("CARGO_BIN_EXE_vumeter");
    let output = Command::new(bin)
        .args(["--channels", "129"])
        .output()
        .expect("run vumeter");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--channels"));
}

#[test]
fn main_prints_usage() {
    let bin = env!("CARGO_BIN_EXE_vumeter");
    let output = Command::new(bin)
        .arg("--help")
        .output()
        .expect("run vumeter");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--rate"));
    assert!(stdout.contains("--device"));
}
