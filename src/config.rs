use crate::gamepad::MAX_USER_INDEX;
use crate::patterns::{BLACK_RANGE, WHITE_RANGE};
use clap::{Parser, ValueEnum};
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    /// Fixed pattern, no controls
    Static,
    /// Step the inner square with a nits readout
    Adjustable,
    /// Max-white and min-black calibration with held-key repeat
    Dual,
}

/// HDR peak-white / near-black calibration pattern
#[derive(Parser, Debug)]
#[command(name = "hdrcalib", version, about)]
pub struct Args {
    /// Pattern variant
    #[arg(long, value_enum, default_value_t = Variant::Dual)]
    pub variant: Variant,

    /// Open a 1920x1080 window instead of going fullscreen
    #[arg(long)]
    pub windowed: bool,

    /// XInput controller index (0-3)
    #[arg(long, default_value_t = 0)]
    pub gamepad: u32,

    /// Starting inner brightness for white calibration, in nits
    #[arg(long, default_value_t = 800.0)]
    pub white_nits: f32,

    /// Starting inner brightness for black calibration, in nits
    #[arg(long, default_value_t = 0.1)]
    pub black_nits: f32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("gamepad index {0} out of range (0-{max})", max = MAX_USER_INDEX)]
    GamepadIndex(u32),

    #[error("{name} must be within {min}..={max} nits, got {value}")]
    NitsOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub variant: Variant,
    pub windowed: bool,
    pub gamepad_index: u32,
    pub white_nits: f32,
    pub black_nits: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: Variant::Dual,
            windowed: false,
            gamepad_index: 0,
            white_nits: 800.0,
            black_nits: 0.1,
        }
    }
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.gamepad > MAX_USER_INDEX {
            return Err(ConfigError::GamepadIndex(args.gamepad));
        }
        check_nits("white-nits", args.white_nits, WHITE_RANGE)?;
        check_nits("black-nits", args.black_nits, BLACK_RANGE)?;

        Ok(Self {
            variant: args.variant,
            windowed: args.windowed,
            gamepad_index: args.gamepad,
            white_nits: args.white_nits,
            black_nits: args.black_nits,
        })
    }
}

fn check_nits(name: &'static str, value: f32, range: RangeInclusive<f32>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::NitsOutOfRange {
        name,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let args = Args::try_parse_from(std::iter::once("hdrcalib").chain(args.iter().copied()))
            .expect("arguments should parse");
        Config::try_from(args)
    }

    #[test]
    fn defaults() {
        assert_eq!(parse(&[]).unwrap(), Config::default());
    }

    #[test]
    fn flags() {
        let config = parse(&["--variant", "adjustable", "--windowed", "--gamepad", "2", "-vv"]).unwrap();
        assert_eq!(config.variant, Variant::Adjustable);
        assert!(config.windowed);
        assert_eq!(config.gamepad_index, 2);
        assert_eq!(Args::try_parse_from(["hdrcalib", "-vv"]).unwrap().verbose, 2);

        let config = parse(&["--variant", "static", "--white-nits", "1000"]).unwrap();
        assert_eq!(config.variant, Variant::Static);
        assert_eq!(config.white_nits, 1000.0);
    }

    #[test]
    fn rejects_bad_gamepad_index() {
        assert_eq!(parse(&["--gamepad", "4"]), Err(ConfigError::GamepadIndex(4)));
    }

    #[test]
    fn rejects_out_of_range_levels() {
        assert!(matches!(
            parse(&["--white-nits", "12000"]),
            Err(ConfigError::NitsOutOfRange { name: "white-nits", .. })
        ));
        assert!(matches!(
            parse(&["--black-nits", "7.5"]),
            Err(ConfigError::NitsOutOfRange { name: "black-nits", .. })
        ));
        assert!(parse(&["--black-nits", "NaN"]).is_err());
    }

    #[test]
    fn unknown_variant_is_a_parse_error() {
        assert!(Args::try_parse_from(["hdrcalib", "--variant", "sdr"]).is_err());
    }
}
