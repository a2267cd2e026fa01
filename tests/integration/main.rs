//! Integration tests for Shellkeep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated config, state, and store directories for one test
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self::with_worker("")
        }

        /// Sandbox whose config carries extra `[worker]` settings
        fn with_worker(worker: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let sandbox = Self { dir };
            sandbox.write_config(worker);
            sandbox
        }

        fn write_config(&self, worker: &str) {
            let config = format!(
                "[general]\njournal = false\n\n[worker]\n{}\n\n[store]\npath = {:?}\n",
                worker,
                self.store_path()
            );
            std::fs::write(self.config_path(), config).unwrap();
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn store_path(&self) -> PathBuf {
            self.dir.path().join("caches")
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn cmd(&self) -> Command {
            let mut cmd = shellkeep();
            cmd.env("SHELLKEEP_CONFIG", self.config_path())
                .env("XDG_STATE_HOME", self.root().join("state"))
                .current_dir(self.root())
                .arg("--no-local");
            cmd
        }
    }

    fn shellkeep() -> Command {
        cargo_bin_cmd!("shellkeep")
    }

    #[test]
    fn help_displays() {
        shellkeep()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline shell cache"));
    }

    #[test]
    fn version_displays() {
        shellkeep()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shellkeep"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_includes_defaults() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[worker]"))
            .stdout(predicate::str::contains("opsiyon-cache-v2"))
            .stdout(predicate::str::contains("/static/app.js?v=3"));
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let sandbox = Sandbox::with_worker("namespace = \"../escape\"");
        sandbox
            .cmd()
            .args(["fetch", "/"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache namespace"));
    }

    #[test]
    fn cache_list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache namespaces found."));
    }

    #[test]
    fn status_without_install() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("opsiyon-cache-v2"))
            .stdout(predicate::str::contains("No namespaces"));
    }

    #[test]
    fn offline_api_call_gets_synthesized_503() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["fetch", "--offline", "--include-body", "/api/calc"])
            .assert()
            .success()
            .stdout(predicate::str::contains("network-first"))
            .stdout(predicate::str::contains("503"))
            .stdout(predicate::str::contains(r#"{"error":"offline"}"#));
    }

    #[test]
    fn non_get_is_declined() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["fetch", "--offline", "-X", "POST", "/api/calc"])
            .assert()
            .success()
            .stdout(predicate::str::contains("declined"));
    }

    #[test]
    fn cross_origin_is_declined() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["fetch", "--offline", "https://cdn.example/chart.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cross-origin"))
            .stdout(predicate::str::contains("declined"));
    }

    #[test]
    fn offline_static_miss_without_shell_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["fetch", "--offline", "/static/app.js?v=3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request failed"));
    }

    #[test]
    fn offline_install_fails_and_stores_nothing() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["install", "--offline"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Precache failed for /"));

        sandbox
            .cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn activate_without_install_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not fully installed"))
            .stderr(predicate::str::contains("shellkeep install"));
    }

    #[test]
    fn cache_clear_requires_confirmation() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache namespaces to clear."));
    }
}

mod lifecycle_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_config(dir: &TempDir, origin: &str, namespace: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        let config = format!(
            "[general]\njournal = false\n\n[worker]\nnamespace = {:?}\norigin = {:?}\n\n[store]\npath = {:?}\n",
            namespace,
            origin,
            dir.path().join("caches")
        );
        std::fs::write(&path, config).unwrap();
        path
    }

    fn cmd(dir: &TempDir, config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("shellkeep");
        cmd.env("SHELLKEEP_CONFIG", config)
            .env("XDG_STATE_HOME", dir.path().join("state"))
            .current_dir(dir.path())
            .arg("--no-local");
        cmd
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn install_then_serve_offline_then_upgrade() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<shell>"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, &server.uri(), "app-cache-v1");

        cmd(&dir, &config)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed app-cache-v1"))
            .stdout(predicate::str::contains("/manifest.webmanifest"));

        cmd(&dir, &config)
            .args(["fetch", "--offline", "--include-body", "/"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache-first"))
            .stdout(predicate::str::contains("<shell>"));

        cmd(&dir, &config)
            .args(["fetch", "--offline", "--include-body", "/some/deep/link"])
            .assert()
            .success()
            .stdout(predicate::str::contains("<shell>"));

        let config = write_config(&dir, &server.uri(), "app-cache-v2");
        cmd(&dir, &config).arg("install").assert().success();

        cmd(&dir, &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("app-cache-v2\n"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_upgrade_keeps_previous_namespace() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let ok = Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("v1"))
            .mount_as_scoped(&server)
            .await;
        let config = write_config(&dir, &server.uri(), "app-cache-v1");
        cmd(&dir, &config).arg("install").assert().success();
        drop(ok);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let config = write_config(&dir, &server.uri(), "app-cache-v2");
        cmd(&dir, &config)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("server answered 404"));

        cmd(&dir, &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("app-cache-v1\n"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn install_without_activate_then_activate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let config = write_config(&dir, &server.uri(), "app-cache-v1");
        cmd(&dir, &config).arg("install").assert().success();
        let config = write_config(&dir, &server.uri(), "app-cache-v2");
        cmd(&dir, &config)
            .args(["install", "--no-activate"])
            .assert()
            .success();

        cmd(&dir, &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("app-cache-v1\napp-cache-v2\n"));

        cmd(&dir, &config)
            .arg("activate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted stale namespace app-cache-v1"));

        cmd(&dir, &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("app-cache-v2\n"));
    }
}
