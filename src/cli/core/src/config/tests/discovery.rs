/* src/cli/core/src/config/tests/discovery.rs */

use crate::config::{find_sugar_config, load_sugar_config};

#[test]
fn config_is_found_in_a_parent_directory() {
  let tmp = tempfile::tempdir().unwrap();
  std::fs::write(tmp.path().join("sugar.toml"), "[cache]\ndebug = true\n").unwrap();
  let nested = tmp.path().join("templates/pages");
  std::fs::create_dir_all(&nested).unwrap();

  let found = find_sugar_config(&nested).unwrap();
  assert_eq!(found, tmp.path().canonicalize().unwrap().join("sugar.toml"));
  assert!(load_sugar_config(&found).unwrap().cache.debug);
}

#[test]
fn missing_config_names_the_start_dir() {
  let tmp = tempfile::tempdir().unwrap();
  // A sugar.toml above the temp dir would be found instead.
  if find_sugar_config(tmp.path()).is_ok() {
    return;
  }
  let err = find_sugar_config(tmp.path()).unwrap_err();
  assert!(err.to_string().starts_with("sugar.toml not found"));
}

#[test]
fn invalid_configs_are_rejected() {
  let tmp = tempfile::tempdir().unwrap();
  let path = tmp.path().join("sugar.toml");

  std::fs::write(&path, "[loader]\npaths = []\n").unwrap();
  let err = load_sugar_config(&path).unwrap_err();
  assert!(err.to_string().contains("at least one template root"));

  std::fs::write(&path, "[compiler]\ndirective_prefix = \"\"\n").unwrap();
  assert!(load_sugar_config(&path).is_err());

  std::fs::write(&path, "[compiler\n").unwrap();
  let err = load_sugar_config(&path).unwrap_err();
  assert!(err.to_string().starts_with("failed to parse"));
}
