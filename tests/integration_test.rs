//! Integration tests for the pveaudit CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INSECURE_SSHD: &str =
    "PermitRootLogin yes\nPasswordAuthentication yes\nPort 22\nMaxAuthTries 10\n";

const HARDENED_SSHD: &str =
    "PermitRootLogin prohibit-password\nPasswordAuthentication no\nPort 2222\nMaxAuthTries 3\n";

const SECURE_FW: &str =
    "[OPTIONS]\nenable: 1\npolicy_in: DROP\n[RULES]\nIN ACCEPT -p tcp -dport 22\n";

const USER_CFG: &str = "\
user:root@pam:1:0:::root@example.com:::
tfa:root@pam:totp
user:ops@pve:1:0:Ops::::x:
token:ops@pve!monitoring:1900000000:1::
acl:1:/:ops@pve:PVEAuditor:
";

const LXC_CONF: &str = "# Container 101\nhostname: web\nunprivileged: 1\n";

const STORAGE_CFG: &str = "dir: local\n\tpath /var/lib/vz\n\tcontent iso,backup\n";

#[allow(deprecated)]
fn get_cmd() -> Command {
    let mut cmd = Command::cargo_bin("pveaudit").unwrap();
    cmd.env_remove("PVEAUDIT_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

fn hardened_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "sshd_config", HARDENED_SSHD);
    write(temp_dir.path(), "cluster.fw", SECURE_FW);
    write(temp_dir.path(), "user.cfg", USER_CFG);
    write(temp_dir.path(), "lxc.conf", LXC_CONF);
    write(temp_dir.path(), "storage.cfg", STORAGE_CFG);
    temp_dir
}

#[test]
fn test_help_lists_commands() {
    get_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("audit"))
        .stdout(predicate::str::contains("rules"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_insecure_sshd_exits_with_critical() {
    let temp_dir = TempDir::new().unwrap();
    let sshd = write(temp_dir.path(), "sshd_config", INSECURE_SSHD);

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--sshd-config", &sshd])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("root-ssh-password"))
        .stdout(predicate::str::contains("MaxAuthTries=10"))
        .stdout(predicate::str::contains("12 of 16 rules passed"));
}

#[test]
fn test_hardened_directory_passes() {
    let temp_dir = hardened_dir();

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--dir", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("All rules passed."))
        .stdout(predicate::str::contains("16 of 16 rules passed"));
}

#[test]
fn test_json_report() {
    let temp_dir = hardened_dir();
    let sshd = write(temp_dir.path(), "sshd_config", INSECURE_SSHD);

    let output = get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--dir", ".", "--sshd-config", &sshd, "--format", "json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(json["findings"].as_array().unwrap().len(), 16);
    assert_eq!(json["files_analyzed"].as_array().unwrap().len(), 5);
    assert_eq!(json["categories"][0]["category"], "ssh");
    assert_eq!(json["categories"][0]["score"], 15);
    // (15 * 25 + 100 * 75) / 100 = 78.75
    assert_eq!(json["overall_score"], 79);
    assert_eq!(json["grade"], "C");
}

#[test]
fn test_missing_input_file_is_a_runtime_error() {
    let temp_dir = TempDir::new().unwrap();

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--user-cfg", "does-not-exist.cfg"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to read user.cfg input"));
}

#[test]
fn test_invalid_arguments_exit_with_4() {
    get_cmd()
        .args(["audit", "--format", "sarif"])
        .assert()
        .code(4);

    get_cmd()
        .args(["audit", "--fail-under", "150"])
        .assert()
        .code(4);
}

#[test]
fn test_fail_under_turns_warnings_into_failure() {
    let temp_dir = TempDir::new().unwrap();
    let sshd = write(
        temp_dir.path(),
        "sshd_config",
        "PermitRootLogin no\nPasswordAuthentication no\nPort 22\n",
    );

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--sshd-config", &sshd])
        .assert()
        .code(2);

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--sshd-config", &sshd, "--fail-under", "99"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("score 98 is below the required 99"));
}

#[test]
fn test_markdown_report_written_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = write(
        temp_dir.path(),
        "storage.cfg",
        "nfs: backups\n\texport /srv/backups\n\tserver 10.0.0.20\n\toptions no_root_squash\n",
    );
    let report_path = temp_dir.path().join("report.md");

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["audit", "--storage-cfg", &storage, "-f", "markdown", "-o"])
        .arg(&report_path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Report written to"));

    let report = fs::read_to_string(&report_path).unwrap();
    assert!(report.contains("### `nfs-no-root-squash`"));
    assert!(report.contains("no_root_squash set on NFS storage: backups"));
}

#[test]
fn test_config_file_inputs_and_report_defaults() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "fw", "[OPTIONS]\nenable: 0\n");
    write(
        temp_dir.path(),
        ".pveaudit.toml",
        "[inputs]\ncluster_fw = \"fw\"\nsshd_config = \"missing\"\n\n[report]\nformat = \"json\"\n",
    );

    let output = get_cmd()
        .current_dir(temp_dir.path())
        .arg("audit")
        .output()
        .unwrap();

    // The missing sshd_config is skipped, the disabled firewall is critical
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["files_analyzed"], serde_json::json!(["cluster.fw"]));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Skipping input"));
}

#[test]
fn test_invalid_config_file_is_a_runtime_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(temp_dir.path(), "custom.toml", "[report\nformat = 1\n");

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["--config", &config, "audit", "--dir", "."])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_rules_command_json() {
    let output = get_cmd().args(["rules", "--format", "json"]).output().unwrap();

    assert!(output.status.success());
    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = rules.as_array().unwrap();
    assert_eq!(rules.len(), 16);
    assert_eq!(rules[0]["id"], "root-ssh-password");
    assert!(rules.iter().all(|r| r.get("evaluate").is_none()));
}

#[test]
fn test_rules_command_terminal() {
    get_cmd()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("api-token-no-expiry"))
        .stdout(predicate::str::contains("16 rules"));
}

#[test]
fn test_init_command_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".pveaudit.toml");

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--non-interactive"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[inputs]"));
    assert!(content.contains("/etc/ssh/sshd_config"));
    assert!(content.contains("[report]"));
}

#[test]
fn test_init_command_refuses_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), ".pveaudit.toml", "[report]\nfail_under = 80\n");

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--non-interactive"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("already exists"));

    get_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--non-interactive", "--force"])
        .assert()
        .success();
}
