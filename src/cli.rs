use crate::config::RuntimeConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    menu_root: Option<PathBuf>,
    start_menu: Option<String>,
    settings: Option<PathBuf>,
    frame_dt: Option<f32>,
    log: Option<String>,
    ticks: Option<u32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // program name
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "menus" => overrides.menu_root = Some(PathBuf::from(value)),
                "start" => overrides.start_menu = Some(value),
                "settings" => overrides.settings = Some(PathBuf::from(value)),
                "dt" => {
                    let dt = value.parse::<f32>().with_context(|| format!("Invalid dt '{value}'"))?;
                    if !(dt.is_finite() && dt > 0.0) {
                        bail!("Invalid dt '{value}'. Expected a positive number of seconds.");
                    }
                    overrides.frame_dt = Some(dt);
                }
                "log" => overrides.log = Some(value),
                "ticks" => {
                    overrides.ticks = Some(value.parse::<u32>().with_context(|| format!("Invalid ticks '{value}'"))?);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --menus, --start, --settings, --dt, --log, --ticks."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn ticks(&self) -> Option<u32> {
        self.ticks
    }

    pub fn into_config_overrides(self) -> RuntimeConfigOverrides {
        RuntimeConfigOverrides {
            menu_root: self.menu_root,
            start_menu: self.start_menu,
            settings_path: self.settings,
            frame_dt: self.frame_dt,
            log_filter: self.log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_numbers() {
        let args = ["beatmenu", "--menus", "fixtures/menus", "--start", "title", "--dt", "0.02", "--ticks", "90"];
        let cli = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(cli.ticks(), Some(90));
        let overrides = cli.into_config_overrides();
        assert_eq!(overrides.menu_root, Some(PathBuf::from("fixtures/menus")));
        assert_eq!(overrides.start_menu.as_deref(), Some("title"));
        assert_eq!(overrides.frame_dt, Some(0.02));
    }

    #[test]
    fn latest_flag_wins() {
        let args = ["beatmenu", "--start", "a", "--start", "b"];
        let overrides = CliOverrides::parse(args).expect("parse overrides").into_config_overrides();
        assert_eq!(overrides.start_menu.as_deref(), Some("b"));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["beatmenu", "--start"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_bad_dt() {
        let err = CliOverrides::parse(["beatmenu", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"));
        assert!(CliOverrides::parse(["beatmenu", "--dt", "-1"]).is_err());
    }
}
