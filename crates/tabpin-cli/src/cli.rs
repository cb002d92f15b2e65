//! Command-line definition and the merge of flags, config-file profile,
//! and config-file defaults into the effective mapping options.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};

use tabpin_core::{
    Affinity, AlignConfig, AspectMode, DeviceId, HorizontalAffinity, VerticalAffinity,
};

use crate::apply::{MapOptions, OutputSelector};
use crate::config::{Config, Profile};

/// Restrict an absolute pointing device (tablet, touchscreen) to one
/// output of a multi-monitor X11 setup.
#[derive(Parser, Debug)]
#[command(name = "tabpin", version, about)]
pub struct Cli {
    /// XInput device id to map (see --list-devices).
    #[arg(short = 'd', long, value_name = "ID", conflicts_with = "all")]
    pub device: Option<DeviceId>,

    /// Map every device with absolute axes.
    #[arg(long)]
    pub all: bool,

    /// Target output by index (see --list-outputs).
    #[arg(short = 'o', long, value_name = "INDEX", conflicts_with = "output_name")]
    pub output: Option<usize>,

    /// Target output by name, e.g. "DP-1".
    #[arg(long, value_name = "NAME")]
    pub output_name: Option<String>,

    /// Pick the target output by clicking it with the device. This is the
    /// default when no output is named.
    #[arg(short = 'i', long, conflicts_with_all = ["output", "output_name"])]
    pub interactive: bool,

    /// How the device's shape is fitted to the output.
    #[arg(long, value_enum, value_name = "MODE")]
    pub aspect: Option<AspectArg>,

    /// Horizontal placement of the mapped region within the output.
    #[arg(long, value_enum, value_name = "SIDE")]
    pub halign: Option<HorizontalArg>,

    /// Vertical placement of the mapped region within the output.
    #[arg(long, value_enum, value_name = "SIDE")]
    pub valign: Option<VerticalArg>,

    /// Match physical units: a millimeter of pen travel moves the cursor
    /// one millimeter on screen. Needs the output's physical dimensions.
    #[arg(long)]
    pub one_to_one: bool,

    /// Compute and print the matrix without writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip reading the property back after writing.
    #[arg(long)]
    pub no_verify: bool,

    /// Restore the identity transform instead of restricting.
    #[arg(long)]
    pub reset: bool,

    /// List active outputs and exit.
    #[arg(long)]
    pub list_outputs: bool,

    /// List pointer devices with absolute axes and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// Configuration file (default: $XDG_CONFIG_HOME/tabpin/config.toml).
    #[arg(long, value_name = "PATH", env = "TABPIN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// `--aspect` values; mirrors [`AspectMode`] with clap's kebab-case names.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectArg {
    None,
    Fit,
    MatchWidth,
    MatchHeight,
}

impl From<AspectArg> for AspectMode {
    fn from(value: AspectArg) -> Self {
        match value {
            AspectArg::None => AspectMode::None,
            AspectArg::Fit => AspectMode::Fit,
            AspectArg::MatchWidth => AspectMode::MatchWidth,
            AspectArg::MatchHeight => AspectMode::MatchHeight,
        }
    }
}

/// `--halign` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalArg {
    Left,
    Right,
    Centered,
}

impl From<HorizontalArg> for HorizontalAffinity {
    fn from(value: HorizontalArg) -> Self {
        match value {
            HorizontalArg::Left => HorizontalAffinity::Left,
            HorizontalArg::Right => HorizontalAffinity::Right,
            HorizontalArg::Centered => HorizontalAffinity::Centered,
        }
    }
}

/// `--valign` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalArg {
    Top,
    Bottom,
    Centered,
}

impl From<VerticalArg> for VerticalAffinity {
    fn from(value: VerticalArg) -> Self {
        match value {
            VerticalArg::Top => VerticalAffinity::Top,
            VerticalArg::Bottom => VerticalAffinity::Bottom,
            VerticalArg::Centered => VerticalAffinity::Centered,
        }
    }
}

/// Which devices an action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Device(DeviceId),
    AllPointers,
}

/// What the invocation asks for, after flag validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListOutputs,
    ListDevices,
    Reset(Target),
    Apply(Target),
}

impl Cli {
    /// Validates the flag combination into a single action.
    pub fn action(&self) -> anyhow::Result<Action> {
        if self.list_outputs {
            return Ok(Action::ListOutputs);
        }
        if self.list_devices {
            return Ok(Action::ListDevices);
        }
        let target = if self.all {
            Target::AllPointers
        } else if let Some(id) = self.device {
            Target::Device(id)
        } else {
            bail!("pass --device <ID> or --all to choose what to map");
        };
        if self.reset {
            Ok(Action::Reset(target))
        } else {
            Ok(Action::Apply(target))
        }
    }

    /// The output selector, with the profile's output name as a fallback
    /// and interactive picking as the final default.
    pub fn output_selector(&self, profile: Option<&Profile>) -> OutputSelector {
        if let Some(index) = self.output {
            return OutputSelector::Index(index);
        }
        if let Some(name) = &self.output_name {
            return OutputSelector::Name(name.clone());
        }
        if self.interactive {
            return OutputSelector::Interactive;
        }
        if let Some(name) = profile.and_then(|p| p.output_name.as_ref()) {
            return OutputSelector::Name(name.clone());
        }
        OutputSelector::Interactive
    }

    /// Merges flags over the profile over the config-file defaults.
    ///
    /// Boolean flags only switch their setting on (`--one-to-one`) or off
    /// (`--no-verify`); their absence defers to profile and defaults.
    pub fn map_options(&self, config: &Config, profile: Option<&Profile>) -> MapOptions {
        let aspect = self
            .aspect
            .map(AspectMode::from)
            .or_else(|| profile.and_then(|p| p.aspect))
            .unwrap_or(config.defaults.aspect);
        let horizontal = self
            .halign
            .map(HorizontalAffinity::from)
            .or_else(|| profile.and_then(|p| p.halign))
            .unwrap_or(config.defaults.halign);
        let vertical = self
            .valign
            .map(VerticalAffinity::from)
            .or_else(|| profile.and_then(|p| p.valign))
            .unwrap_or(config.defaults.valign);
        let one_to_one = self.one_to_one
            || profile
                .and_then(|p| p.one_to_one)
                .unwrap_or(config.defaults.one_to_one);
        let verify = if self.no_verify {
            false
        } else {
            profile
                .and_then(|p| p.verify)
                .unwrap_or(config.defaults.verify)
        };

        MapOptions {
            align: AlignConfig {
                aspect,
                affinity: Affinity {
                    horizontal,
                    vertical,
                },
            },
            one_to_one,
            verify,
            dry_run: self.dry_run,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
