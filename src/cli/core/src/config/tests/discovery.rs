/* src/cli/core/src/config/tests/discovery.rs */

use super::*;

#[test]
fn finds_config_in_ancestor() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(tmp.path().join("cms.toml"), "[serve]\nport = 4100\n").unwrap();
  let nested = tmp.path().join("pages/drafts");
  std::fs::create_dir_all(&nested).unwrap();

  let found = find_cms_config(&nested).unwrap();
  assert_eq!(found, tmp.path().canonicalize().unwrap().join("cms.toml"));
  let config = load_cms_config(&found).unwrap();
  assert_eq!(config.serve.port, 4100);
}

#[test]
fn resolve_falls_back_to_defaults() {
  let tmp = tempfile::tempdir().unwrap();
  let (path, config) = resolve_config(None, tmp.path()).unwrap();
  // a cms.toml further up the real filesystem would be picked up here
  if path.is_none() {
    assert_eq!(config.serve.port, 4000);
  }
}

#[test]
fn explicit_path_must_exist() {
  let tmp = tempfile::tempdir().unwrap();
  let missing = tmp.path().join("nope.toml");
  let err = resolve_config(Some(&missing), tmp.path()).unwrap_err();
  assert!(err.to_string().contains("failed to read"));
}

#[test]
fn invalid_file_reports_path() {
  let tmp = tempfile::tempdir().unwrap();
  let path = tmp.path().join("cms.toml");
  std::fs::write(&path, "[api]\ntimeout_secs = 0\n").unwrap();
  let err = load_cms_config(&path).unwrap_err();
  assert!(format!("{err:#}").contains("timeout_secs"));
}

#[test]
fn api_flag_overrides_discovered_base_url() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(
    tmp.path().join("cms.toml"),
    "[api]\nbase_url = \"https://cms.example.com\"\ntimeout_secs = 3\n\n[render]\nsite_id = 2\n",
  )
  .unwrap();
  let site = tmp.path().join("site");
  std::fs::create_dir_all(&site).unwrap();

  let (path, mut config) = resolve_config(None, &site).unwrap();
  assert!(path.is_some());
  apply_api_override(&mut config, " http://localhost:5001 ").unwrap();
  assert_eq!(config.api.base_url, "http://localhost:5001");
  assert_eq!(config.api.timeout_secs, 3);
  assert_eq!(config.render.site_id, Some(2));
}

#[test]
fn blank_api_flag_is_rejected() {
  let mut config = CmsConfig::default();
  let err = apply_api_override(&mut config, "  ").unwrap_err();
  let message = format!("{err:#}");
  assert!(message.contains("--api"), "{message}");
  assert!(message.contains("base_url"), "{message}");
}
