pub mod command;
pub mod config;
pub mod guard;
pub mod irq;
pub mod params;
pub mod session;
pub mod state_machine;

pub use command::{ChipStatus, CircuitMode, Command, CommandStatus, PacketStatus};
pub use config::{
    BleSetting, ChipConfig, FlrcSetting, GfskSetting, HostSettings, LoraSetting, ModeProfile,
    ModeProfiles, RadioConfig, RegisterSettings, Setting, ValidatedConfig,
};
pub use guard::{BusyGuard, BusyPolicy};
pub use irq::{DioMapping, IrqFlags};
pub use params::{ModulationParams, PacketParams, RadioMode};
pub use session::Session;
pub use state_machine::{
    DropReason, InboundFrame, LinkStats, OutboundFrame, RadioEvent, RadioState, RadioStateMachine,
};
