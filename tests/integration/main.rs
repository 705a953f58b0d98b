//! Integration tests for lambda-lambda

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn lambda_lambda(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("lambda-lambda");
        cmd.env("LAMBDA_LAMBDA_CONFIG", config_dir.path().join("config.toml"))
            .env_remove("GIT_TOKEN")
            .env_remove("GIT_USERNAME")
            .env_remove("GIT_EMAIL");
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build and deploy Lambda functions"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lambda-lambda"));
    }

    #[test]
    fn config_path_follows_env() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path().join("config.toml").display().to_string(),
            ));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[deploy]"))
            .stdout(predicate::str::contains("lambda-lambda-lambda"));
    }

    #[test]
    fn config_set_then_show_masks_token() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["config", "set", "github.git_token", "ghp_secret"])
            .assert()
            .success();
        lambda_lambda(&temp)
            .args(["config", "set", "deploy.memory_mb", "1024"])
            .assert()
            .success();

        lambda_lambda(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("********"))
            .stdout(predicate::str::contains("memory_mb = 1024"))
            .stdout(predicate::str::contains("ghp_secret").not());
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"))
            .stderr(predicate::str::contains("github.git_username"));
    }

    #[test]
    fn config_set_rejects_non_integer() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["config", "set", "deploy.timeout_secs", "soon"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expects an integer"));
    }

    #[test]
    fn setup_without_bucket_hints() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["setup", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No deploy bucket configured"))
            .stderr(predicate::str::contains("--bucket"));
    }

    #[test]
    fn build_requires_repo() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["build", "--function", "orders-api"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--repo"));
    }

    #[test]
    fn build_help() {
        let temp = TempDir::new().unwrap();
        lambda_lambda(&temp)
            .args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--component"));
    }
}
