//! Device profiles and the bring-up sequence
//!
//! Each profile is a row in a static table: the ordered AT steps that take
//! the modem from command mode into CMUX mode, and how the frame size is
//! chosen. Running a profile is a straight walk over its steps.

use crate::config::Config;
use crate::core::at::{exchange, BringUpError, Command, ExchangeOutcome, ExchangeSettings, Importance};
use crate::core::at::Importance::{BestEffort, Required};
use crate::core::transport::{LineTransport, MuxParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported modem families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// Generic 27.010 modem (Quectel M95 and alike)
    #[default]
    Default,
    /// SIMCom SIM900: hardware flow control, frame size capped at 255
    Sim900,
    /// Telit: extended command set and explicit port speed
    Telit,
}

impl DeviceProfile {
    /// All profiles
    pub const ALL: [DeviceProfile; 3] = [Self::Default, Self::Sim900, Self::Telit];

    /// Profile name as used on the command line
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Table row for this profile
    pub fn spec(self) -> &'static ProfileSpec {
        match self {
            Self::Default => &DEFAULT,
            Self::Sim900 => &SIM900,
            Self::Telit => &TELIT,
        }
    }

    /// Frame size actually negotiated for a configured MTU
    pub fn effective_mtu(self, configured: u16) -> u16 {
        match self.spec().mtu {
            MtuPolicy::Configured => configured,
            MtuPolicy::Fixed(mtu) => mtu,
        }
    }

    /// Build the concrete command list for `config`
    pub fn plan(self, config: &Config) -> BringUpPlan {
        let params = MuxParams::new(self.effective_mtu(config.mtu), config.mux_baud_class);
        let commands = self
            .spec()
            .steps
            .iter()
            .map(|step| step.render(config, &params))
            .collect();
        BringUpPlan { commands, params }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown profile name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device type: {0}")]
pub struct UnknownProfile(pub String);

impl FromStr for DeviceProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

/// How a profile picks the frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtuPolicy {
    /// Use the configured MTU
    Configured,
    /// Always use this value, whatever was configured
    Fixed(u16),
}

/// One step of a bring-up table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A literal command
    Fixed(&'static str, Importance),
    /// `AT+IPR=<speed>`: tell the modem the port speed
    AnnounceSpeed(Importance),
    /// `AT+CMUX=0,0,<baud>,<mtu>,<timers>`: enter CMUX with explicit parameters
    EnableMux(Importance),
    /// `AT+CMUX=0`: enter CMUX with the modem's own parameters
    EnableMuxDefaults(Importance),
}

impl Step {
    fn render(&self, config: &Config, params: &MuxParams) -> Command {
        let (text, importance) = match *self {
            Self::Fixed(text, importance) => (text.to_string(), importance),
            Self::AnnounceSpeed(importance) => (format!("AT+IPR={}", config.speed.bps()), importance),
            Self::EnableMux(importance) => (params.cmux_command(), importance),
            Self::EnableMuxDefaults(importance) => ("AT+CMUX=0".to_string(), importance),
        };
        match importance {
            Importance::Required => Command::required(text),
            Importance::BestEffort => Command::best_effort(text),
        }
    }
}

/// Static description of a profile
#[derive(Debug)]
pub struct ProfileSpec {
    /// Name used on the command line
    pub name: &'static str,
    /// Bring-up steps in order
    pub steps: &'static [Step],
    /// Frame size policy
    pub mtu: MtuPolicy,
}

static DEFAULT: ProfileSpec = ProfileSpec {
    name: "default",
    steps: &[
        Step::Fixed("AT+GMM", BestEffort),
        Step::Fixed("AT", BestEffort),
        Step::EnableMux(Required),
    ],
    mtu: MtuPolicy::Configured,
};

static SIM900: ProfileSpec = ProfileSpec {
    name: "sim900",
    steps: &[
        Step::Fixed("AAAT", Required),
        Step::Fixed("AT+IFC=2,2", Required),
        Step::Fixed("AT+GMM", BestEffort),
        Step::Fixed("AT", BestEffort),
        Step::EnableMux(Required),
    ],
    mtu: MtuPolicy::Fixed(255),
};

static TELIT: ProfileSpec = ProfileSpec {
    name: "telit",
    steps: &[
        Step::Fixed("AT#SELINT=2", Required),
        Step::Fixed("ATE0V1&K3&D2", Required),
        Step::AnnounceSpeed(Required),
        Step::Fixed("AT#CMUXMODE=0", Required),
        Step::EnableMuxDefaults(BestEffort),
    ],
    mtu: MtuPolicy::Configured,
};

/// Concrete commands and mux parameters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringUpPlan {
    /// Commands to send, in order
    pub commands: Vec<Command>,
    /// Parameters for the mode switch
    pub params: MuxParams,
}

/// Run the bring-up commands of `profile` in order.
///
/// Stops at the first required command that does not return `OK`. On
/// success the modem is in CMUX mode and the returned parameters must be
/// applied to the line discipline.
pub fn sequence<L>(
    line: &mut L,
    profile: DeviceProfile,
    config: &Config,
    settings: &ExchangeSettings,
) -> Result<MuxParams, BringUpError>
where
    L: LineTransport + ?Sized,
{
    let plan = profile.plan(config);
    tracing::info!("Bringing up {} modem ({} commands, mtu {})", profile, plan.commands.len(), plan.params.mtu);

    for command in &plan.commands {
        let outcome = exchange(line, command, settings);
        tracing::debug!("{} -> {}", command, outcome);

        match outcome {
            ExchangeOutcome::Success(_) => {}
            outcome if command.is_required() => {
                return Err(BringUpError::Rejected {
                    command: command.to_string(),
                    outcome,
                });
            }
            outcome => tracing::warn!("{}: bad response ({})", command, outcome),
        }
    }

    Ok(plan.params)
}
