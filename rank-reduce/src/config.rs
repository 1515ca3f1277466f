//! Job configuration.
use serde::Deserialize;
use crate::{GroupSize, Rank};

const DEFAULT_PROC_COUNT: GroupSize = 4;

/// What each member does with its local value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sum every value onto the root; only the root prints.
    Reduce,
    /// Every member prints its own value; no collective call is made.
    PerRank,
}

impl Mode {
    pub fn from_use_reduction(use_reduction: bool) -> Mode {
        if use_reduction {
            Mode::Reduce
        } else {
            Mode::PerRank
        }
    }
}

/// Settings shared by the job binaries, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Members to launch (local group only)
    pub procs: GroupSize,
    /// Rank receiving the aggregate
    pub root: Rank,
    /// Reduce onto the root instead of printing on every member
    pub use_reduction: bool,
    /// Check the aggregate against the closed form
    pub verify: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            procs: DEFAULT_PROC_COUNT,
            root: 0,
            use_reduction: true,
            verify: false,
        }
    }
}

impl Config {
    pub fn mode(&self) -> Mode {
        Mode::from_use_reduction(self.use_reduction)
    }

    /// Names of settings that have no effect in the configured mode.
    pub fn ignored_settings(&self) -> Vec<&'static str> {
        let mut ignored = vec![];
        if self.mode() == Mode::PerRank {
            if self.root != 0 {
                ignored.push("root");
            }
            if self.verify {
                ignored.push("verify");
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_keys_take_defaults() {
        let cfg: Config = serde_yaml::from_str("root: 2\n").unwrap();
        assert_eq!(cfg, Config { root: 2, ..Config::default() });
        assert_eq!(cfg.mode(), Mode::Reduce);
    }

    #[test]
    fn full_config() {
        let cfg: Config = serde_yaml::from_str(
            "procs: 3\nroot: 1\nuse_reduction: false\nverify: true\n",
        )
        .unwrap();
        assert_eq!(
            cfg,
            Config {
                procs: 3,
                root: 1,
                use_reduction: false,
                verify: true,
            },
        );
        assert_eq!(cfg.mode(), Mode::PerRank);
    }

    #[test]
    fn per_rank_mode_ignores_root_and_verify() {
        let cfg = Config {
            root: 1,
            use_reduction: false,
            verify: true,
            ..Config::default()
        };
        assert_eq!(cfg.ignored_settings(), vec!["root", "verify"]);
        assert!(Config { root: 1, verify: true, ..Config::default() }.ignored_settings().is_empty());
        assert!(Config { use_reduction: false, ..Config::default() }.ignored_settings().is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<Config>("rank: 1\n").is_err());
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = crate::load_config::<Config, _>("/nonexistent/rank-reduce.yaml").unwrap_err();
        assert_eq!(err, crate::Error::Io(std::io::ErrorKind::NotFound));
    }
}
