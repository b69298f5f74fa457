//! Power-management notifications delivered to the application window.
//!
//! These are observed and logged only; no layout state depends on them.

use std::fmt;

/// A decoded `WM_POWERBROADCAST` event code (`PBT_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    QuerySuspend,
    QueryStandby,
    QuerySuspendFailed,
    QueryStandbyFailed,
    Suspend,
    Standby,
    ResumeCritical,
    ResumeSuspend,
    ResumeStandby,
    BatteryLow,
    PowerStatusChange,
    OemEvent,
    ResumeAutomatic,
    PowerSettingChange,
    /// A code this build does not know about.
    Other(u32),
}

impl PowerEvent {
    /// Decodes the `wParam` of a `WM_POWERBROADCAST` message.
    pub fn from_code(code: u32) -> Self {
        match code {
            0x0000 => PowerEvent::QuerySuspend,
            0x0001 => PowerEvent::QueryStandby,
            0x0002 => PowerEvent::QuerySuspendFailed,
            0x0003 => PowerEvent::QueryStandbyFailed,
            0x0004 => PowerEvent::Suspend,
            0x0005 => PowerEvent::Standby,
            0x0006 => PowerEvent::ResumeCritical,
            0x0007 => PowerEvent::ResumeSuspend,
            0x0008 => PowerEvent::ResumeStandby,
            0x0009 => PowerEvent::BatteryLow,
            0x000A => PowerEvent::PowerStatusChange,
            0x000B => PowerEvent::OemEvent,
            0x0012 => PowerEvent::ResumeAutomatic,
            0x8013 => PowerEvent::PowerSettingChange,
            other => PowerEvent::Other(other),
        }
    }

    /// The Win32 constant name, used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            PowerEvent::QuerySuspend => "PBT_APMQUERYSUSPEND",
            PowerEvent::QueryStandby => "PBT_APMQUERYSTANDBY",
            PowerEvent::QuerySuspendFailed => "PBT_APMQUERYSUSPENDFAILED",
            PowerEvent::QueryStandbyFailed => "PBT_APMQUERYSTANDBYFAILED",
            PowerEvent::Suspend => "PBT_APMSUSPEND",
            PowerEvent::Standby => "PBT_APMSTANDBY",
            PowerEvent::ResumeCritical => "PBT_APMRESUMECRITICAL",
            PowerEvent::ResumeSuspend => "PBT_APMRESUMESUSPEND",
            PowerEvent::ResumeStandby => "PBT_APMRESUMESTANDBY",
            PowerEvent::BatteryLow => "PBT_APMBATTERYLOW",
            PowerEvent::PowerStatusChange => "PBT_APMPOWERSTATUSCHANGE",
            PowerEvent::OemEvent => "PBT_APMOEMEVENT",
            PowerEvent::ResumeAutomatic => "PBT_APMRESUMEAUTOMATIC",
            PowerEvent::PowerSettingChange => "PBT_POWERSETTINGCHANGE",
            PowerEvent::Other(_) => "PBT_UNKNOWN",
        }
    }
}

impl fmt::Display for PowerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerEvent::Other(code) => write!(f, "PBT_UNKNOWN({code:#06x})"),
            known => f.write_str(known.name()),
        }
    }
}
