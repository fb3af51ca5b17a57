use osf_web::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const CRYPTO_KEY_B64: &str = "YWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWE=";
const JWT_SECRET: &str = "config-loader-test-secret";

const VARS: &[&str] = &[
    "OSF_PROFILE",
    "OSF_API_BIND_ADDR",
    "OSF_LOG_LEVEL",
    "OSF_CRYPTO_KEY",
    "OSF_JWT_SECRET",
    "OSF_DOMAIN",
    "OSF_CAS_SERVER_URL",
    "OSF_SANCTION_TOKEN_TTL_HOURS",
    "OSF_GITHUB_CLIENT_ID",
    "OSF_GITHUB_CLIENT_SECRET",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn set_secrets() {
    unsafe {
        env::set_var("OSF_CRYPTO_KEY", CRYPTO_KEY_B64);
        env::set_var("OSF_JWT_SECRET", JWT_SECRET);
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn loads_defaults_when_only_secrets_are_set() {
    let _guard = env_guard();
    clear_env();
    set_secrets();

    let temp_dir = TempDir::new().unwrap();
    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.domain, "http://localhost:5000/");
    assert_eq!(cfg.crypto_key.as_deref(), Some([b'a'; 32].as_slice()));
    assert_eq!(cfg.sanction_token_ttl_hours, 48);
    assert!(cfg.github.pair().is_none());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();
    set_secrets();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "OSF_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(&temp_dir, ".env.test", "OSF_API_BIND_ADDR=192.168.0.10:5000\n");
    write_env_file(&temp_dir, ".env.test.local", "OSF_API_BIND_ADDR=10.0.0.5:6000\n");
    write_env_file(
        &temp_dir,
        ".env.local",
        "OSF_PROFILE=test\nOSF_API_BIND_ADDR=127.0.0.1:4000\nOSF_LOG_LEVEL=debug\n",
    );

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("layered config loads");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.log_level, "debug");
    clear_env();
}

#[test]
fn process_env_overrides_files() {
    let _guard = env_guard();
    clear_env();
    set_secrets();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "OSF_API_BIND_ADDR=127.0.0.1:3000\nOSF_GITHUB_CLIENT_ID=from-file\n",
    );
    unsafe {
        env::set_var("OSF_API_BIND_ADDR", "127.0.0.1:9000");
        env::set_var("OSF_GITHUB_CLIENT_SECRET", "from-env");
        env::set_var("OSF_DOMAIN", "https://osf.example.org");
    }

    let cfg = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf())
        .load()
        .expect("config loads");

    assert_eq!(cfg.api_bind_addr, "127.0.0.1:9000");
    assert_eq!(
        cfg.github.pair(),
        Some(("from-file".to_string(), "from-env".to_string()))
    );
    assert_eq!(cfg.domain, "https://osf.example.org/");
    assert_eq!(cfg.web_url("/abc12/"), "https://osf.example.org/abc12/");
    clear_env();
}

#[test]
fn missing_secrets_fail_validation() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
    assert!(matches!(loader.load(), Err(ConfigError::MissingCryptoKey)));

    unsafe {
        env::set_var("OSF_CRYPTO_KEY", CRYPTO_KEY_B64);
    }
    assert!(matches!(loader.load(), Err(ConfigError::MissingJwtSecret)));
    clear_env();
}

#[test]
fn malformed_values_are_reported() {
    let _guard = env_guard();
    clear_env();
    set_secrets();
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());

    unsafe {
        env::set_var("OSF_CRYPTO_KEY", "not base64!");
    }
    assert!(matches!(
        loader.load(),
        Err(ConfigError::InvalidCryptoKeyBase64 { .. })
    ));

    unsafe {
        env::set_var("OSF_CRYPTO_KEY", "c2hvcnQ=");
    }
    assert!(matches!(
        loader.load(),
        Err(ConfigError::InvalidCryptoKeyLength { length: 5 })
    ));

    set_secrets();
    unsafe {
        env::set_var("OSF_API_BIND_ADDR", "not-an-address");
    }
    assert!(matches!(
        loader.load(),
        Err(ConfigError::InvalidBindAddr { .. })
    ));

    unsafe {
        env::remove_var("OSF_API_BIND_ADDR");
        env::set_var("OSF_SANCTION_TOKEN_TTL_HOURS", "0");
    }
    assert!(matches!(
        loader.load(),
        Err(ConfigError::InvalidSanctionTokenTtl { value: 0 })
    ));
    clear_env();
}
