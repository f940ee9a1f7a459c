//! This module contains functionality to initialise tracing Subscribers for
//! console output and rolling file output.
//!
//! To get started, see [`Tracing`].

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::rolling::{InitError, RollingFileAppender};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, layer::SubscriberExt};

use crate::tracing::settings::*;

pub mod settings;

type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors which can be encountered when initialising [`Tracing`].
#[derive(Debug, Snafu)]
pub enum Error {
    /// Indicates that [`Tracing`] failed to install the rolling file appender.
    #[snafu(display("failed to initialize rolling file appender"))]
    InitRollingFileAppender {
        #[allow(missing_docs)]
        source: InitError,
    },

    /// Indicates that [`Tracing`] failed to set the global default subscriber.
    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber {
        #[allow(missing_docs)]
        source: SetGlobalDefaultError,
    },
}

/// Easily initialize a set of pre-configured [`Subscriber`][1] layers.
///
/// # Usage
///
/// Hold onto the value returned by [`Tracing::init`] for as long as logs should be
/// emitted.
///
/// ```
/// # use kubeforge_telemetry::tracing::{Tracing, Error};
/// # use tracing::level_filters::LevelFilter;
/// # fn main() -> Result<(), Error> {
/// let _tracing_guard = Tracing::builder()
///     .service_name("kubeforge")
///     .with_console_output(("KUBEFORGE_LOG", LevelFilter::INFO))
///     .build()
///     .init()?;
///
/// tracing::info!("log a message");
/// # Ok(())
/// # }
/// ```
///
/// Console logs are written to stderr, so that stdout stays free for command output.
/// File logs are written as one JSON object per line into a directory, rolled over
/// according to the configured [`Rotation`].
///
/// # Environment Variables and CLI Arguments
///
/// The pre-configured instance created by [`Tracing::pre_configured`] reads the
/// following environment variables to override the default levels:
///
/// - `KUBEFORGE_LOG`: console log level filter.
/// - `KUBEFORGE_FILE_LOG`: rolling file log level filter.
///
/// The outputs themselves are toggled by [`TelemetryOptions`], which can be flattened
/// into a CLI when the `clap` feature is enabled.
///
/// [1]: tracing::Subscriber
pub struct Tracing {
    service_name: &'static str,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,
}

impl Tracing {
    /// The environment variable used to set the console log level filter.
    pub const CONSOLE_LOG_LEVEL: &str = "KUBEFORGE_LOG";
    /// The environment variable used to set the rolling file log level filter.
    pub const FILE_LOG_LEVEL: &str = "KUBEFORGE_FILE_LOG";
    /// The filename suffix used for the rolling file logs.
    pub const FILE_LOG_SUFFIX: &str = "tracing-rs.json";

    /// Creates and returns a [`TracingBuilder`].
    pub fn builder() -> TracingBuilder<builder_state::PreServiceName> {
        TracingBuilder::default()
    }

    /// Creates an returns a pre-configured [`Tracing`] instance which can be initialized by
    /// calling [`Tracing::init()`].
    ///
    /// ### Default Levels
    ///
    /// - Console logs: INFO
    /// - File logs: INFO
    ///
    /// ### Default Values
    ///
    /// - If `file_log_rotation_period` is [`None`], this function will use a default value of
    ///   [`RotationPeriod::Never`].
    pub fn pre_configured(service_name: &'static str, options: TelemetryOptions) -> Self {
        let TelemetryOptions {
            console_log_disabled,
            console_log_format,
            file_log_directory,
            file_log_rotation_period,
        } = options;

        let file_log_rotation_period = file_log_rotation_period.unwrap_or_default();

        let console_log_settings = if console_log_disabled {
            ConsoleLogSettings::Disabled
        } else {
            Settings::builder()
                .with_environment_variable(Self::CONSOLE_LOG_LEVEL)
                .with_default_level(LevelFilter::INFO)
                .console_log_settings_builder()
                .with_log_format(console_log_format.unwrap_or_default().into())
                .build()
        };

        Self::builder()
            .service_name(service_name)
            .with_console_output(console_log_settings)
            .with_file_output(file_log_directory.map(|log_directory| {
                Settings::builder()
                    .with_environment_variable(Self::FILE_LOG_LEVEL)
                    .with_default_level(LevelFilter::INFO)
                    .file_log_settings_builder(log_directory, Self::FILE_LOG_SUFFIX)
                    .with_rotation_period(file_log_rotation_period)
                    .build()
            }))
            .build()
    }

    /// Initialize the configured tracing subscribers.
    ///
    /// Subscribers are installed as the global default, which can only happen once
    /// per process.
    pub fn init(self) -> Result<Self> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Sync + Send>> = Vec::new();

        if let ConsoleLogSettings::Enabled {
            common_settings,
            log_format,
        } = &self.console_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );
            let console_output_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

            match log_format {
                Format::Plain => {
                    layers.push(console_output_layer.with_filter(env_filter_layer).boxed());
                }
                Format::Json => {
                    layers.push(
                        console_output_layer
                            .json()
                            .with_filter(env_filter_layer)
                            .boxed(),
                    );
                }
            }
        }

        if let FileLogSettings::Enabled {
            common_settings,
            file_log_dir,
            rotation_period,
            filename_suffix,
        } = &self.file_log_settings
        {
            let env_filter_layer = env_filter_builder(
                common_settings.environment_variable,
                common_settings.default_level,
            );

            let file_appender = RollingFileAppender::builder()
                .rotation(rotation_period.clone())
                .filename_prefix(self.service_name.to_string())
                .filename_suffix(filename_suffix)
                .build(file_log_dir)
                .context(InitRollingFileAppenderSnafu)?;

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_filter(env_filter_layer)
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        Ok(self)
    }
}

/// This trait is only used for the typestate builder and cannot be implemented
/// outside of this crate.
///
/// The only reason it has pub visibility is because it needs to be at least as
/// visible as the types that use it.
#[doc(hidden)]
pub trait BuilderState: private::Sealed {}

#[doc(hidden)]
mod private {
    use super::*;

    pub trait Sealed {}

    impl Sealed for builder_state::PreServiceName {}
    impl Sealed for builder_state::Config {}
}

/// This module holds the possible states that the builder is in.
#[doc(hidden)]
mod builder_state {
    /// The initial state, before the service name is set.
    #[derive(Default)]
    pub struct PreServiceName;

    /// The state that allows you to configure the supported [`Subscriber`][1]
    /// [`Layer`][2].
    ///
    /// [1]: tracing::Subscriber
    /// [2]: tracing_subscriber::layer::Layer
    #[derive(Default)]
    pub struct Config;
}

#[doc(hidden)]
impl BuilderState for builder_state::PreServiceName {}

#[doc(hidden)]
impl BuilderState for builder_state::Config {}

/// Makes it easy to build a valid [`Tracing`] instance.
#[derive(Default)]
pub struct TracingBuilder<S: BuilderState> {
    service_name: Option<&'static str>,
    console_log_settings: ConsoleLogSettings,
    file_log_settings: FileLogSettings,

    /// Allow the generic to be used (needed for impls).
    _marker: std::marker::PhantomData<S>,
}

impl TracingBuilder<builder_state::PreServiceName> {
    /// Set the service name, used as the prefix of rolling log files.
    pub fn service_name(self, service_name: &'static str) -> TracingBuilder<builder_state::Config> {
        TracingBuilder {
            service_name: Some(service_name),
            ..Default::default()
        }
    }
}

impl TracingBuilder<builder_state::Config> {
    /// Enable the console output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_console_output(self, console_log_settings: impl Into<ConsoleLogSettings>) -> Self {
        Self {
            service_name: self.service_name,
            console_log_settings: console_log_settings.into(),
            file_log_settings: self.file_log_settings,
            _marker: self._marker,
        }
    }

    /// Enable the file output tracing subscriber and set the default
    /// [`LevelFilter`] which is overridable through the given environment
    /// variable.
    pub fn with_file_output(self, file_log_settings: impl Into<FileLogSettings>) -> Self {
        Self {
            service_name: self.service_name,
            console_log_settings: self.console_log_settings,
            file_log_settings: file_log_settings.into(),
            _marker: self._marker,
        }
    }

    /// Consumes self and returns a valid [`Tracing`] instance.
    ///
    /// Once built, you can call [`Tracing::init`] to enable the configured
    /// tracing subscribers.
    pub fn build(self) -> Tracing {
        Tracing {
            service_name: self.service_name.unwrap_or_default(),
            console_log_settings: self.console_log_settings,
            file_log_settings: self.file_log_settings,
        }
    }
}

/// Create an [`EnvFilter`] configured with the given environment variable and default [`Directive`].
fn env_filter_builder(env_var: &str, default_directive: impl Into<Directive>) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(env_var)
        .with_default_directive(default_directive.into())
        .from_env_lossy()
}

/// Contains options which can be passed to [`Tracing::pre_configured()`].
///
/// Additionally, this struct can be used as CLI arguments. This functionality is only
/// available if the feature `clap` is enabled.
#[cfg_attr(feature = "clap", derive(clap::Args, PartialEq, Eq))]
#[derive(Debug, Default)]
pub struct TelemetryOptions {
    /// Disable console logs.
    #[cfg_attr(feature = "clap", arg(long, env = "KUBEFORGE_CONSOLE_LOG_DISABLED"))]
    pub console_log_disabled: bool,

    /// Output FORMAT of console logs.
    #[cfg_attr(
        feature = "clap",
        arg(long, env = "KUBEFORGE_CONSOLE_LOG_FORMAT", value_name = "FORMAT")
    )]
    pub console_log_format: Option<ConsoleLogFormat>,

    /// Enable logging to files located in the specified DIRECTORY.
    #[cfg_attr(
        feature = "clap",
        arg(
            long,
            env = "KUBEFORGE_FILE_LOG_DIRECTORY",
            value_name = "DIRECTORY",
            group = "file_log"
        )
    )]
    pub file_log_directory: Option<PathBuf>,

    /// Time PERIOD after which log files are rolled over.
    #[cfg_attr(
        feature = "clap",
        arg(
            long,
            env = "KUBEFORGE_FILE_LOG_ROTATION_PERIOD",
            value_name = "PERIOD",
            requires = "file_log"
        )
    )]
    pub file_log_rotation_period: Option<RotationPeriod>,
}

/// Supported console log output formats.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[allow(missing_docs)]
pub enum ConsoleLogFormat {
    #[default]
    Plain,
    Json,
}

impl From<ConsoleLogFormat> for Format {
    fn from(value: ConsoleLogFormat) -> Self {
        match value {
            ConsoleLogFormat::Plain => Self::Plain,
            ConsoleLogFormat::Json => Self::Json,
        }
    }
}

/// Supported periods when the log file is rolled over.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "PascalCase")]
#[allow(missing_docs)]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,

    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Minutely => Self::MINUTELY,
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use rstest::rstest;
    use settings::Settings;
    use tracing::level_filters::LevelFilter;
    use tracing_appender::rolling::Rotation;

    use super::*;

    #[test]
    fn builder_basic_construction() {
        let tracing = Tracing::builder().service_name("test").build();

        assert_eq!(tracing.service_name, "test");
        assert!(tracing.console_log_settings.is_disabled());
        assert!(tracing.file_log_settings.is_disabled());
    }

    #[test]
    fn builder_with_console_output() {
        let tracing = Tracing::builder()
            .service_name("test")
            .with_console_output(
                Settings::builder()
                    .with_environment_variable("ABC_A")
                    .with_default_level(LevelFilter::TRACE)
                    .build(),
            )
            .with_console_output(
                Settings::builder()
                    .with_environment_variable("ABC_B")
                    .with_default_level(LevelFilter::DEBUG)
                    .build(),
            )
            .build();

        assert_eq!(
            tracing.console_log_settings,
            ConsoleLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: "ABC_B",
                    default_level: LevelFilter::DEBUG,
                },
                log_format: Format::Plain,
            }
        );
    }

    #[test]
    fn builder_with_file_output() {
        let tracing = Tracing::builder()
            .service_name("test")
            .with_file_output(
                Settings::builder()
                    .with_environment_variable("ABC_FILE")
                    .with_default_level(LevelFilter::INFO)
                    .file_log_settings_builder(PathBuf::from("/tmp/logs"), "tracing-rs.json")
                    .with_rotation_period(Rotation::DAILY)
                    .build(),
            )
            .build();

        assert_eq!(
            tracing.file_log_settings,
            FileLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: "ABC_FILE",
                    default_level: LevelFilter::INFO,
                },
                file_log_dir: PathBuf::from("/tmp/logs"),
                rotation_period: Rotation::DAILY,
                filename_suffix: "tracing-rs.json".to_owned(),
            }
        );
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn builder_with_console_toggle(#[case] enabled: bool) {
        let tracing = Tracing::builder()
            .service_name("test")
            .with_console_output(("ABC_A", LevelFilter::WARN, enabled))
            .build();

        assert_eq!(tracing.console_log_settings.is_enabled(), enabled);
    }

    #[rstest]
    #[case(RotationPeriod::Minutely, Rotation::MINUTELY)]
    #[case(RotationPeriod::Hourly, Rotation::HOURLY)]
    #[case(RotationPeriod::Daily, Rotation::DAILY)]
    #[case(RotationPeriod::Never, Rotation::NEVER)]
    fn rotation_period_conversion(#[case] period: RotationPeriod, #[case] expected: Rotation) {
        assert_eq!(Rotation::from(period), expected);
    }

    #[test]
    fn pre_configured() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: false,
            console_log_format: Some(ConsoleLogFormat::Json),
            file_log_directory: Some(PathBuf::from("/tmp/logs")),
            file_log_rotation_period: None,
        });

        assert_eq!(
            tracing.console_log_settings,
            ConsoleLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: Tracing::CONSOLE_LOG_LEVEL,
                    default_level: LevelFilter::INFO,
                },
                log_format: Format::Json,
            }
        );
        assert_eq!(
            tracing.file_log_settings,
            FileLogSettings::Enabled {
                common_settings: Settings {
                    environment_variable: Tracing::FILE_LOG_LEVEL,
                    default_level: LevelFilter::INFO,
                },
                file_log_dir: PathBuf::from("/tmp/logs"),
                rotation_period: Rotation::NEVER,
                filename_suffix: Tracing::FILE_LOG_SUFFIX.to_owned(),
            }
        );
    }

    #[test]
    fn pre_configured_console_disabled() {
        let tracing = Tracing::pre_configured("test", TelemetryOptions {
            console_log_disabled: true,
            ..Default::default()
        });

        assert!(tracing.console_log_settings.is_disabled());
        assert!(tracing.file_log_settings.is_disabled());
    }
}
