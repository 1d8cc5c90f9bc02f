use assert_cmd::Command;
use tempfile::TempDir;

fn cli() -> Command {
    Command::cargo_bin("bookstore-cli").unwrap()
}

#[test]
fn help_lists_subcommands() {
    let output = cli().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    for subcommand in ["serve", "init-db", "openapi"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in:\n{stdout}");
    }
}

#[test]
fn openapi_prints_book_paths() {
    let config = TempDir::new().unwrap();
    let output = cli()
        .args(["--config-dir", config.path().to_str().unwrap(), "openapi"])
        .env_remove("BOOKSTORE_ENV")
        .output()
        .unwrap();
    assert!(output.status.success());

    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(document["paths"]["/books"]["post"].is_object());
    assert!(document["paths"]["/books/{isbn}"]["get"].is_object());
}

#[test]
fn init_db_creates_database_file() {
    let config = TempDir::new().unwrap();
    let db_path = config.path().join("books.db");
    std::fs::write(
        config.path().join("base.toml"),
        format!("[database]\npath = {:?}\n", db_path.display().to_string()),
    )
    .unwrap();

    cli()
        .args(["--config-dir", config.path().to_str().unwrap(), "init-db"])
        .env_remove("BOOKSTORE_ENV")
        .assert()
        .success();

    assert!(db_path.exists());
}

#[test]
fn unknown_environment_fails() {
    let config = TempDir::new().unwrap();
    cli()
        .args(["--config-dir", config.path().to_str().unwrap(), "openapi"])
        .env("BOOKSTORE_ENV", "qa")
        .assert()
        .failure();
}
