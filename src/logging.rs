use std::sync::Once;

static INIT: Once = Once::new();

/// Installs `env_logger` as the `log` backend. Later calls are ignored.
///
/// `filter` uses the `env_logger` directive syntax and wins over `RUST_LOG`;
/// with neither set, `info` and above are shown.
pub fn init(filter: Option<&str>) {
    INIT.call_once(|| {
        builder(env_logger::Env::default(), filter).init();
        log::debug!("logging initialized");
    });
}

fn builder(env: env_logger::Env, filter: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env.default_filter_or("info"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    use std::env;

    fn max_level(var: &str, filter: Option<&str>) -> LevelFilter {
        builder(env_logger::Env::new().filter(var), filter)
            .build()
            .filter()
    }

    #[test]
    fn setting_beats_environment() {
        env::set_var("INTRO_LOG_SETTING_TEST", "warn");
        assert_eq!(max_level("INTRO_LOG_SETTING_TEST", Some("debug")), LevelFilter::Debug);
        env::remove_var("INTRO_LOG_SETTING_TEST");
    }

    #[test]
    fn environment_is_used_without_a_setting() {
        env::set_var("INTRO_LOG_ENV_TEST", "warn");
        assert_eq!(max_level("INTRO_LOG_ENV_TEST", None), LevelFilter::Warn);
        env::remove_var("INTRO_LOG_ENV_TEST");
    }

    #[test]
    fn defaults_to_info() {
        assert_eq!(max_level("INTRO_LOG_UNSET_TEST", None), LevelFilter::Info);
    }
}
