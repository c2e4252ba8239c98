mod common;

use common::{FakeServer, write_script};
use mysql_entrypoint::credentials::{CredentialSet, EnvSnapshot};
use mysql_entrypoint::{Config, Entrypoint, EntrypointError, Handoff, InitializationState};
use nix::unistd::{User, geteuid};
use std::fs;
use std::path::PathBuf;

fn config_for(fake: &FakeServer) -> Config {
    let tzinfo = fake.root.join("mysql_tzinfo_to_sql");
    write_script(
        &tzinfo,
        &format!("echo tzinfo >> \"{}\"", fake.calls.display()),
    );
    Config {
        server_command: fake.program_str(),
        init_dir: fake.root.join("initdb.d"),
        tzinfo_to_sql: tzinfo.display().to_string(),
        admin: "true".to_string(),
        ..Config::default()
    }
}

fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
    EnvSnapshot::from_pairs(pairs.iter().copied())
}

#[tokio::test]
async fn non_server_commands_pass_through_untouched() {
    let fake = FakeServer::new("passthrough", 0);
    let cfg = config_for(&fake);
    let env = snapshot(&[]);

    let outcome = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(vec!["bash".into(), "-c".into(), "echo hi".into()])
        .await
        .unwrap();
    assert_eq!(outcome.state, None);
    match outcome.handoff {
        Handoff::Exec(cmd) => assert_eq!(cmd.argv(), ["bash", "-c", "echo hi"]),
        other => panic!("unexpected handoff: {other:?}"),
    }
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn help_requests_skip_bootstrap() {
    let fake = FakeServer::new("help", 0);
    let cfg = config_for(&fake);
    let env = snapshot(&[]);

    let outcome = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(vec!["--verbose".into(), "--help".into()])
        .await
        .unwrap();
    assert_eq!(outcome.state, None);
    match outcome.handoff {
        Handoff::Exec(cmd) => assert_eq!(cmd.program(), fake.program_str()),
        other => panic!("unexpected handoff: {other:?}"),
    }
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn existing_data_directory_is_not_bootstrapped_again() {
    let fake = FakeServer::new("existing", 0);
    fs::create_dir_all(fake.data_dir.join("mysql")).unwrap();
    let cfg = config_for(&fake);
    // No credentials at all: only a fresh directory needs them.
    let env = snapshot(&[]);

    for _ in 0..2 {
        let outcome = Entrypoint::new(&cfg, &env)
            .privileged(false)
            .run(vec!["--max-connections=50".into()])
            .await
            .unwrap();
        assert_eq!(outcome.state, Some(InitializationState::Initialized));
        assert!(outcome.init_files.is_empty());
        match outcome.handoff {
            Handoff::Exec(cmd) => {
                assert_eq!(cmd.program(), fake.program_str());
                assert_eq!(cmd.args(), ["--max-connections=50".to_string()]);
            }
            other => panic!("unexpected handoff: {other:?}"),
        }
    }

    let calls = fake.calls();
    assert!(!calls.contains("--initialize-insecure"));
    assert!(!calls.contains("--daemonize"));
    assert!(!calls.contains("tzinfo"));
    assert!(fake.socket.parent().unwrap().is_dir());
    assert!(fake.pid_file.parent().unwrap().is_dir());
    assert_eq!(fs::read_link(&fake.default_socket).unwrap(), fake.socket);
}

#[tokio::test]
async fn fresh_directory_without_password_option_fails_before_touching_disk() {
    let fake = FakeServer::new("missing-cred", 0);
    let cfg = config_for(&fake);
    let env = snapshot(&[("MYSQL_DATABASE", "shop")]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EntrypointError::MissingCredential));
    assert!(!fake.data_dir.exists());
    assert!(!fake.calls().contains("--initialize-insecure"));
}

#[tokio::test]
async fn root_as_application_user_is_rejected() {
    let fake = FakeServer::new("root-user", 0);
    let cfg = config_for(&fake);
    let env = snapshot(&[
        ("MYSQL_ROOT_PASSWORD", "pw"),
        ("MYSQL_USER", "root"),
        ("MYSQL_PASSWORD", "pw"),
    ]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InvalidCredential");
    assert!(!fake.data_dir.exists());
}

#[tokio::test]
async fn credential_conflict_aborts_before_any_child_runs() {
    let fake = FakeServer::new("conflict", 0);
    let secret = fake.root.join("secret");
    fs::write(&secret, "from-file\n").unwrap();
    let cfg = config_for(&fake);
    let secret_path = secret.display().to_string();
    let env = snapshot(&[
        ("MYSQL_ROOT_PASSWORD", "literal"),
        ("MYSQL_ROOT_PASSWORD_FILE", secret_path.as_str()),
    ]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "ConfigConflict");
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn broken_server_configuration_is_reported() {
    let fake = FakeServer::new("broken-config", 0);
    let program = fake.root.join("broken-mysqld");
    write_script(&program, "echo 'unknown option --bogus' >&2\nexit 1");
    let cfg = Config {
        server_command: program.display().to_string(),
        ..config_for(&fake)
    };
    let env = snapshot(&[("MYSQL_ALLOW_EMPTY_PASSWORD", "yes")]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(vec!["--bogus".into()])
        .await
        .unwrap_err();
    match err {
        EntrypointError::IntrospectionFailure { detail, .. } => {
            assert!(detail.contains("unknown option --bogus"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn failed_temporary_server_stops_before_any_sql() {
    let fake = FakeServer::new("daemonize", 1);
    let cfg = config_for(&fake);
    let env = snapshot(&[("MYSQL_ALLOW_EMPTY_PASSWORD", "yes")]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(false)
        .run(Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "TemporaryServerFailure");

    let calls = fake.calls();
    let init = calls.find("--initialize-insecure").unwrap();
    let daemon = calls.find("--daemonize").unwrap();
    assert!(init < daemon);
    assert!(!calls.contains("tzinfo"));
    assert!(fake.data_dir.join("mysql").is_dir());
}

#[tokio::test]
async fn privileged_run_prepares_directories_and_reexecs() {
    let Ok(Some(me)) = User::from_uid(geteuid()) else {
        return;
    };
    let fake = FakeServer::new("privileged", 0);
    let cfg = Config {
        service_user: me.name.clone(),
        ..config_for(&fake)
    };
    let secret = fake.root.join("root-password");
    fs::write(&secret, "s3cret\n").unwrap();
    let secret_path = secret.display().to_string();
    let db_file = fake.root.join("database");
    fs::write(&db_file, "shop\n").unwrap();
    let db_path = db_file.display().to_string();
    let flag_file = fake.root.join("skip-tz");
    fs::write(&flag_file, "yes").unwrap();
    let flag_path = flag_file.display().to_string();
    let env = snapshot(&[
        ("MYSQL_ROOT_PASSWORD_FILE", secret_path.as_str()),
        ("MYSQL_DATABASE_FILE", db_path.as_str()),
        ("MYSQL_INITDB_SKIP_TZINFO_FILE", flag_path.as_str()),
        ("MYSQL_USER", "app"),
    ]);

    let outcome = Entrypoint::new(&cfg, &env)
        .privileged(true)
        .entrypoint_path("/usr/local/bin/docker-entrypoint")
        .run(vec!["--port=3307".into()])
        .await
        .unwrap();

    assert_eq!(outcome.state, Some(InitializationState::Fresh));
    let mut removed = outcome.env.removed().to_vec();
    removed.sort();
    assert_eq!(
        removed,
        [
            "MYSQL_DATABASE_FILE",
            "MYSQL_INITDB_SKIP_TZINFO_FILE",
            "MYSQL_ROOT_PASSWORD_FILE",
        ]
    );
    // File-sourced values travel as literals; literal ones are inherited as-is.
    assert_eq!(outcome.env.get("MYSQL_ROOT_PASSWORD"), Some("s3cret"));
    assert_eq!(outcome.env.get("MYSQL_DATABASE"), Some("shop"));
    assert_eq!(outcome.env.get("MYSQL_INITDB_SKIP_TZINFO"), Some("1"));
    assert_eq!(outcome.env.get("MYSQL_USER"), None);

    // The re-invoked process sees only what the handoff passes on.
    let mut inherited = vec![("MYSQL_USER".to_string(), "app".to_string())];
    for name in [
        "MYSQL_ROOT_PASSWORD",
        "MYSQL_DATABASE",
        "MYSQL_INITDB_SKIP_TZINFO",
    ] {
        if let Some(value) = outcome.env.get(name) {
            inherited.push((name.to_string(), value.to_string()));
        }
    }
    let reexec = CredentialSet::resolve(&EnvSnapshot::from_pairs(inherited))
        .unwrap()
        .credentials;
    reexec.validate_for_fresh().unwrap();
    assert_eq!(reexec.root_password.as_deref(), Some("s3cret"));
    assert_eq!(reexec.app_database.as_deref(), Some("shop"));
    assert!(reexec.skip_tzinfo);
    match outcome.handoff {
        Handoff::ReexecAsServiceUser {
            account,
            entrypoint,
            argv,
        } => {
            assert_eq!(account.name, me.name);
            assert_eq!(entrypoint, PathBuf::from("/usr/local/bin/docker-entrypoint"));
            assert_eq!(argv, vec![fake.program_str(), "--port=3307".to_string()]);
        }
        other => panic!("unexpected handoff: {other:?}"),
    }

    // Directories exist; bootstrap is left to the re-invoked process.
    assert!(fake.data_dir.is_dir());
    assert!(!fake.data_dir.join("mysql").exists());
    assert!(!fake.calls().contains("--initialize-insecure"));
}

#[tokio::test]
async fn unknown_service_user_is_fatal_when_privileged() {
    let fake = FakeServer::new("unknown-user", 0);
    fs::create_dir_all(fake.data_dir.join("mysql")).unwrap();
    let cfg = Config {
        service_user: "no-such-entrypoint-user".to_string(),
        ..config_for(&fake)
    };
    let env = snapshot(&[]);

    let err = Entrypoint::new(&cfg, &env)
        .privileged(true)
        .run(Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EntrypointError::UnknownServiceUser(name) if name == "no-such-entrypoint-user"));
}
