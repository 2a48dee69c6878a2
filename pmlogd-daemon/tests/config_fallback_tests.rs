//! Configuration fallback behavior at daemon startup.
//!
//! A broken or missing configuration file must never leave the daemon
//! without routing tables: the hard-coded default configuration is
//! installed instead, and startup continues.

use std::fs;

use tempfile::TempDir;

use pmlogd_core::config::{CONTEXT_GLOBAL, DEFAULT_LOG_FILE_PATH, OUTPUT_STDLOG};
use pmlogd_core::RoutingConfig;
use pmlogd_router::LogRouter;

#[test]
fn test_missing_file_installs_default() {
    let config = RoutingConfig::load_or_default("/nonexistent/pmlogd.conf");

    config.validate().expect("default config should validate");
    assert_eq!(config.outputs()[0].name, OUTPUT_STDLOG);
    assert_eq!(
        config.outputs()[0].path.to_str(),
        Some(DEFAULT_LOG_FILE_PATH)
    );
    assert!(config.resolve_context(CONTEXT_GLOBAL).is_some());
}

#[test]
fn test_malformed_file_installs_default() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("pmlogd.conf");
    fs::write(&path, "this is not a keyed config file").expect("should write file");

    let config = RoutingConfig::load_or_default(&path);
    config.validate().expect("default config should validate");
    assert_eq!(config.outputs()[0].name, OUTPUT_STDLOG);
}

#[test]
fn test_wrong_first_output_installs_default() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("pmlogd.conf");
    fs::write(
        &path,
        "[OUTPUT=kernlog]\nFile=/var/log/kern.log\n\n[CONTEXT=<global>]\nRule1=*.*,kernlog\n",
    )
    .expect("should write file");

    let config = RoutingConfig::load_or_default(&path);
    assert_eq!(config.outputs()[0].name, OUTPUT_STDLOG);
    assert_eq!(
        config.outputs()[0].path.to_str(),
        Some(DEFAULT_LOG_FILE_PATH)
    );
}

#[test]
fn test_default_config_builds_a_working_router() {
    // The fallback tables must always produce a usable router.
    let config = RoutingConfig::load_or_default("/nonexistent/pmlogd.conf");
    let router = LogRouter::new(config);
    assert!(router.is_ok(), "default config should build a router");
}

#[test]
fn test_valid_file_is_used_as_written() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("pmlogd.conf");
    fs::write(
        &path,
        "[OUTPUT=stdlog]\nFile=/var/log/messages\nMaxSize=2M\nRotations=3\n\n\
         [CONTEXT=<global>]\nRule1=*.*,stdlog\n",
    )
    .expect("should write file");

    let config = RoutingConfig::load_or_default(&path);
    assert_eq!(config.outputs()[0].max_size, 2 * 1024 * 1024);
    assert_eq!(config.outputs()[0].rotations, 3);
}
