use assert_cmd::Command;

#[test]
fn seed_prints_the_sample_catalog() {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    let assert = cmd.arg("seed").assert().success();
    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("seeded 5 books"));
    assert!(stdout.contains("1984 by George Orwell (1949)"));
}
