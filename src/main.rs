//! Webmail Window CLI tool
//!
//! Sets the LED color of the Webmail Window USB notifier, a HID device which lights
//! any combination of its red, green and blue LEDs based on a single output report.

use std::env;
use std::ffi::OsString;
use std::process;

use clap::error::ErrorKind;
use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{Error, TransportError};
use crate::pattern::LedMask;
use crate::registry::{DeviceFinder, DeviceId, Registry};
use crate::transport::{HidApiTransport, HidTransport};

mod error;
mod led;
mod pattern;
mod registry;
mod transport;

/// Webmail Window vendor and product ID.
const WEBMAIL_WINDOW: DeviceId = DeviceId::new(0x1294, 0x1320);

/// Text printed when no usable LED pattern was passed.
const USAGE: &str = "usage: webmailwindow -c [r|g|b|rg|rb|gb|rgb|none]";

/// Requested LED state.
#[derive(Debug, Copy, Clone)]
struct Config {
    mask: LedMask,
}

impl Config {
    /// Read the LED pattern from the command line, if any usable one was passed.
    ///
    /// Only help and version requests are returned as errors.
    fn from_args<I>(args: I) -> Result<Option<Self>, clap::Error>
    where
        I: IntoIterator,
        I::Item: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        match cli().try_get_matches_from(&args) {
            Ok(matches) => Ok(Self::from_cli(&matches)),
            Err(err)
                if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
            {
                Err(err)
            },
            // Unknown flags must not hide a valid pattern.
            Err(err) => {
                debug!("Scanning raw arguments after parse error: {:?}", err.kind());
                Ok(Self::from_raw_args(&args))
            },
        }
    }

    /// Read the LED pattern from clap matches.
    fn from_cli(matches: &ArgMatches) -> Option<Self> {
        let patterns = matches.get_many::<String>("color").into_iter().flatten();
        let mask = LedMask::from_patterns(patterns.map(String::as_str))?;
        Some(Self { mask })
    }

    /// Read the LED pattern from every `-c <pattern>` pair in the argument list.
    fn from_raw_args(args: &[OsString]) -> Option<Self> {
        let patterns: Vec<_> = args
            .windows(2)
            .filter(|pair| {
                let flag = pair[0].to_string_lossy();
                flag.starts_with("-c") || flag == "--color"
            })
            .map(|pair| pair[1].to_string_lossy())
            .collect();

        let mask = LedMask::from_patterns(patterns.iter().map(|pattern| &**pattern))?;
        Some(Self { mask })
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    process::exit(execute(env::args_os(), HidApiTransport::new));
}

/// Run the CLI and return the process exit code.
fn execute<I, T, F>(args: I, connect: F) -> i32
where
    I: IntoIterator,
    I::Item: Into<OsString> + Clone,
    T: HidTransport,
    F: FnOnce() -> Result<T, TransportError>,
{
    // Without an LED pattern there is nothing to do.
    let config = match Config::from_args(args) {
        Ok(Some(config)) => config,
        Ok(None) => {
            println!("{}", USAGE);
            return 0;
        },
        Err(err) => {
            let _ = err.print();
            return 0;
        },
    };

    match apply(connect, &config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("\x1b[31mError:\x1b[0m {err}");
            1
        },
    }
}

/// Find the Webmail Window and set its LED pattern.
fn apply<T, F>(connect: F, config: &Config) -> Result<(), Error>
where
    T: HidTransport,
    F: FnOnce() -> Result<T, TransportError>,
{
    let finder = DeviceFinder::new(WEBMAIL_WINDOW);

    // Without HID access no device can be attached.
    let transport = match connect() {
        Ok(transport) => transport,
        Err(err) => {
            warn!("Failed to find HID devices: {err}");
            return Err(Error::NotFound(finder.target()));
        },
    };

    let mut registry = Registry::build(&transport);

    let result = match finder.find(&registry) {
        Some(record) => led::set_led(&transport, record, config.mask),
        None => Err(Error::NotFound(finder.target())),
    };

    if !registry.is_empty() {
        registry.destroy_all();
    }

    result
}

/// Get clap CLI parameters.
fn cli() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("color")
                .help("LED color pattern [r|g|b|rg|rb|gb|rgb|none]")
                .long("color")
                .short('c')
                .num_args(0..=1)
                .action(ArgAction::Append),
        )
        .arg(Arg::new("ignored").num_args(1..).action(ArgAction::Append).hide(true))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::transport::mock::MockTransport;

    fn mask(args: &[&str]) -> Option<LedMask> {
        Config::from_args(args).unwrap().map(|config| config.mask)
    }

    fn devices(count: usize, target: Option<usize>) -> Vec<DeviceId> {
        (0..count)
            .map(|i| match target {
                Some(target) if target == i => WEBMAIL_WINDOW,
                _ => DeviceId::new(0x046d, 0xc000 + i as u16),
            })
            .collect()
    }

    #[test]
    fn parse_pattern() {
        assert_eq!(mask(&["webmailwindow", "-c", "rg"]).map(LedMask::bits), Some(0x3));
        assert_eq!(mask(&["webmailwindow", "--color", "none"]), Some(LedMask::NONE));
    }

    #[test]
    fn last_flag_wins() {
        assert_eq!(mask(&["webmailwindow", "-c", "r", "-c", "b"]), Some(LedMask::BLUE));
        assert_eq!(
            mask(&["webmailwindow", "-c", "r", "-c", "b"]),
            mask(&["webmailwindow", "-c", "b"])
        );
    }

    #[test]
    fn missing_pattern() {
        assert_eq!(mask(&["webmailwindow"]), None);
        assert_eq!(mask(&["webmailwindow", "-c"]), None);
        assert_eq!(mask(&["webmailwindow", "-c", "xyz"]), None);
    }

    #[test]
    fn stray_arguments_ignored() {
        assert_eq!(mask(&["webmailwindow", "-c", "g", "please"]), Some(LedMask::GREEN));
    }

    #[test]
    fn unknown_flag_before_pattern() {
        assert_eq!(mask(&["webmailwindow", "-v", "-c", "r"]), Some(LedMask::RED));
    }

    #[test]
    fn unknown_flag_after_pattern() {
        assert_eq!(mask(&["webmailwindow", "-c", "r", "--foo"]), Some(LedMask::RED));
    }

    #[test]
    fn hyphenated_pattern() {
        assert_eq!(mask(&["webmailwindow", "-c", "-rgb"]).map(LedMask::bits), Some(0x7));
    }

    #[test]
    fn unknown_flags_keep_last_pattern() {
        let args = ["webmailwindow", "-c", "r", "-x", "--color", "b", "-c", "xyz"];
        assert_eq!(mask(&args), Some(LedMask::BLUE));
        assert_eq!(mask(&["webmailwindow", "-v", "-c"]), None);
    }

    #[test]
    fn help_is_not_a_pattern() {
        assert!(Config::from_args(["webmailwindow", "--help"]).is_err());
    }

    #[test]
    fn unknown_flag_still_writes() {
        let transport = MockTransport::new(devices(2, Some(1)));
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-v", "-c", "r"], move || Ok(transport));

        assert_eq!(status, 0);
        assert_eq!(log.borrow().enumerations, 1);
        assert_eq!(log.borrow().reports, vec![led::report(LedMask::RED).to_vec()]);
    }

    #[test]
    fn usage_skips_enumeration() {
        let connected = Cell::new(false);
        let connect = || {
            connected.set(true);
            Ok(MockTransport::new(devices(1, Some(0))))
        };

        assert_eq!(execute(["webmailwindow", "-c"], connect), 0);
        assert!(!connected.get());
    }

    #[test]
    fn missing_device() {
        let transport = MockTransport::new(Vec::new());
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-c", "r"], move || Ok(transport));

        assert_eq!(status, 1);
        assert_eq!(log.borrow().enumerations, 1);
    }

    #[test]
    fn missing_device_message() {
        let config = Config { mask: LedMask::RED };
        let err = apply(|| Ok(MockTransport::new(devices(3, None))), &config).unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("cannot find"));
    }

    #[test]
    fn hid_unavailable() {
        let config = Config { mask: LedMask::RED };
        let connect = || -> Result<MockTransport, TransportError> {
            Err(TransportError::Api("permission denied".into()))
        };

        assert!(matches!(apply(connect, &config), Err(Error::NotFound(_))));
    }

    #[test]
    fn enumeration_failure() {
        let mut transport = MockTransport::new(devices(2, Some(1)));
        transport.fail_enumerate = true;
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-c", "b"], move || Ok(transport));

        assert_eq!(status, 1);
        assert!(log.borrow().reports.is_empty());
    }

    #[test]
    fn set_none() {
        let transport = MockTransport::new(devices(1, Some(0)));
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-c", "none"], move || Ok(transport));

        assert_eq!(status, 0);
        assert_eq!(log.borrow().reports, vec![led::report(LedMask::NONE).to_vec()]);
    }

    #[test]
    fn no_leak_for_every_position() {
        for count in 1..5 {
            for position in 0..count {
                let transport = MockTransport::new(devices(count, Some(position)));
                let log = transport.log.clone();

                let status = execute(["webmailwindow", "-c", "rgb"], move || Ok(transport));

                let log = log.borrow();
                assert_eq!(status, 0);
                assert_eq!(log.opens, count + 1);
                assert_eq!(log.closes, log.opens);
                assert_eq!(log.reports.len(), 1);
            }
        }
    }

    #[test]
    fn no_leak_on_failure() {
        let mut transport = MockTransport::new(devices(3, Some(2)));
        transport.fail_write = true;
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-c", "r"], move || Ok(transport));

        assert_eq!(status, 1);
        assert_eq!(log.borrow().opens, 4);
        assert_eq!(log.borrow().closes, 4);
    }

    #[test]
    fn open_failure() {
        let mut transport = MockTransport::new(devices(2, Some(0)));
        transport.fail_open = true;
        let log = transport.log.clone();

        let status = execute(["webmailwindow", "-c", "g"], move || Ok(transport));

        assert_eq!(status, 1);
        assert_eq!(log.borrow().opens, 2);
        assert_eq!(log.borrow().closes, 2);
    }
}
