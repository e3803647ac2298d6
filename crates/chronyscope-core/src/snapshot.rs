//! Snapshot value objects.
//!
//! Snapshots are only built by the validators in [`crate::validate`], after
//! every field has been checked. Once built they hold no reference to the
//! session that produced them and are never mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default sample count for [`SourceStats::has_sufficient_samples`].
pub const DEFAULT_MIN_SAMPLES: u32 = 4;

/// Leap second indicator of the `tracking` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapStatus {
    /// No leap second pending.
    Normal,
    /// A second will be inserted at the end of the day.
    InsertSecond,
    /// A second will be deleted at the end of the day.
    DeleteSecond,
    /// Clock not synchronized.
    Unsynchronized,
}

impl LeapStatus {
    /// Maps the native value, `None` outside 0..=3.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::InsertSecond),
            2 => Some(Self::DeleteSecond),
            3 => Some(Self::Unsynchronized),
            _ => None,
        }
    }

    /// Native value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LeapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::InsertSecond => "insert second",
            Self::DeleteSecond => "delete second",
            Self::Unsynchronized => "unsynchronized",
        };
        f.write_str(name)
    }
}

/// Selection state of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Currently used for synchronization.
    Selected,
    /// Cannot be selected (bad measurements, unreachable).
    NonSelectable,
    /// Disagrees with the majority.
    Falseticker,
    /// Too much jitter.
    Jittery,
    /// Acceptable but not selected.
    Unselected,
    /// Candidate for selection.
    Selectable,
}

impl SourceState {
    /// Maps the native value, `None` outside 0..=5.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Selected),
            1 => Some(Self::NonSelectable),
            2 => Some(Self::Falseticker),
            3 => Some(Self::Jittery),
            4 => Some(Self::Unselected),
            5 => Some(Self::Selectable),
            _ => None,
        }
    }

    /// Native value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Name as printed by `chronyc sources -v`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::NonSelectable => "nonselectable",
            Self::Falseticker => "falseticker",
            Self::Jittery => "jittery",
            Self::Unselected => "unselected",
            Self::Selectable => "selectable",
        }
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How chronyd talks to a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// NTP client.
    Client,
    /// NTP symmetric peer.
    Peer,
    /// Local reference clock (GPS, PPS).
    ReferenceClock,
}

impl SourceMode {
    /// Maps the native value, `None` outside 0..=2.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Client),
            1 => Some(Self::Peer),
            2 => Some(Self::ReferenceClock),
            _ => None,
        }
    }

    /// Native value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Peer => "peer",
            Self::ReferenceClock => "reference clock",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders a reference ID.
///
/// Reference clocks use ASCII names ("GPS", "PPS"); NTP sources use the IPv4
/// address in network byte order. An ID whose bytes are all printable ASCII
/// or NUL is shown as text with trailing NULs removed, anything else as a
/// dotted quad.
#[must_use]
pub fn ref_id_to_name(ref_id: u32) -> String {
    let bytes = ref_id.to_be_bytes();
    if bytes.iter().all(|&b| b == 0 || (0x20..0x7f).contains(&b)) {
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        return bytes[..end].iter().map(|&b| char::from(b)).collect();
    }
    let [a, b, c, d] = bytes;
    format!("{a}.{b}.{c}.{d}")
}

/// Synchronization state from the `tracking` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub(crate) reference_id: u32,
    pub(crate) reference_id_name: String,
    pub(crate) reference_ip: String,
    pub(crate) stratum: u8,
    pub(crate) leap_status: LeapStatus,
    pub(crate) ref_time: f64,
    pub(crate) offset: f64,
    pub(crate) last_offset: f64,
    pub(crate) rms_offset: f64,
    pub(crate) frequency: f64,
    pub(crate) residual_freq: f64,
    pub(crate) skew: f64,
    pub(crate) root_delay: f64,
    pub(crate) root_dispersion: f64,
    pub(crate) update_interval: f64,
}

impl TrackingStatus {
    /// Reference identifier.
    #[must_use]
    pub const fn reference_id(&self) -> u32 {
        self.reference_id
    }

    /// Reference identifier rendered by [`ref_id_to_name`].
    #[must_use]
    pub fn reference_id_name(&self) -> &str {
        &self.reference_id_name
    }

    /// Address of the reference, as reported by chronyd.
    #[must_use]
    pub fn reference_ip(&self) -> &str {
        &self.reference_ip
    }

    /// Stratum, 0..=15.
    #[must_use]
    pub const fn stratum(&self) -> u8 {
        self.stratum
    }

    /// Leap status.
    #[must_use]
    pub const fn leap_status(&self) -> LeapStatus {
        self.leap_status
    }

    /// Time of the last measurement, epoch seconds.
    #[must_use]
    pub const fn ref_time(&self) -> f64 {
        self.ref_time
    }

    /// Current correction, seconds.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Offset at the last update, seconds.
    #[must_use]
    pub const fn last_offset(&self) -> f64 {
        self.last_offset
    }

    /// RMS of recent offsets, seconds.
    #[must_use]
    pub const fn rms_offset(&self) -> f64 {
        self.rms_offset
    }

    /// Frequency error, ppm.
    #[must_use]
    pub const fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Residual frequency, ppm.
    #[must_use]
    pub const fn residual_freq(&self) -> f64 {
        self.residual_freq
    }

    /// Frequency error bound, ppm.
    #[must_use]
    pub const fn skew(&self) -> f64 {
        self.skew
    }

    /// Root delay, seconds.
    #[must_use]
    pub const fn root_delay(&self) -> f64 {
        self.root_delay
    }

    /// Root dispersion, seconds.
    #[must_use]
    pub const fn root_dispersion(&self) -> f64 {
        self.root_dispersion
    }

    /// Interval between the last two clock updates, seconds.
    #[must_use]
    pub const fn update_interval(&self) -> f64 {
        self.update_interval
    }

    /// True when chronyd follows a reference at a valid stratum.
    #[must_use]
    pub const fn is_synchronized(&self) -> bool {
        self.reference_id != 0 && self.stratum < 16
    }

    /// True when a leap second insertion or deletion is scheduled.
    #[must_use]
    pub const fn is_leap_pending(&self) -> bool {
        matches!(
            self.leap_status,
            LeapStatus::InsertSecond | LeapStatus::DeleteSecond
        )
    }
}

/// One time source from the `sources` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub(crate) address: String,
    pub(crate) poll: i32,
    pub(crate) stratum: u8,
    pub(crate) state: SourceState,
    pub(crate) mode: SourceMode,
    pub(crate) flags: u64,
    pub(crate) reachability: u8,
    pub(crate) last_sample_ago: u64,
    pub(crate) orig_latest_meas: f64,
    pub(crate) latest_meas: f64,
    pub(crate) latest_meas_err: f64,
}

impl Source {
    /// Address, or the reference ID name for reference clocks.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Polling interval as a base-2 exponent of seconds.
    #[must_use]
    pub const fn poll(&self) -> i32 {
        self.poll
    }

    /// Stratum, 0..=15.
    #[must_use]
    pub const fn stratum(&self) -> u8 {
        self.stratum
    }

    /// Selection state.
    #[must_use]
    pub const fn state(&self) -> SourceState {
        self.state
    }

    /// Source mode.
    #[must_use]
    pub const fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Raw source flags.
    #[must_use]
    pub const fn flags(&self) -> u64 {
        self.flags
    }

    /// Reachability register, last eight polls.
    #[must_use]
    pub const fn reachability(&self) -> u8 {
        self.reachability
    }

    /// Seconds since the last sample.
    #[must_use]
    pub const fn last_sample_ago(&self) -> u64 {
        self.last_sample_ago
    }

    /// Original last sample offset, seconds.
    #[must_use]
    pub const fn orig_latest_meas(&self) -> f64 {
        self.orig_latest_meas
    }

    /// Adjusted last sample offset, seconds.
    #[must_use]
    pub const fn latest_meas(&self) -> f64 {
        self.latest_meas
    }

    /// Last sample error bound, seconds.
    #[must_use]
    pub const fn latest_meas_err(&self) -> f64 {
        self.latest_meas_err
    }

    /// True if any of the last eight polls got a reply.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        self.reachability > 0
    }

    /// True if chronyd currently synchronizes to this source.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.state == SourceState::Selected
    }

    /// Mode name.
    #[must_use]
    pub const fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    /// State name.
    #[must_use]
    pub const fn state_name(&self) -> &'static str {
        self.state.name()
    }
}

/// Statistics for one source from the `sourcestats` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub(crate) reference_id: u32,
    pub(crate) address: String,
    pub(crate) samples: u32,
    pub(crate) runs: u32,
    pub(crate) span: u32,
    pub(crate) std_dev: f64,
    pub(crate) resid_freq: f64,
    pub(crate) skew: f64,
    pub(crate) offset: f64,
    pub(crate) offset_err: f64,
}

impl SourceStats {
    /// Reference identifier.
    #[must_use]
    pub const fn reference_id(&self) -> u32 {
        self.reference_id
    }

    /// Address. Empty for reference clocks.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Retained samples.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Runs of residuals with the same sign.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Interval covered by the samples, seconds.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.span
    }

    /// Sample standard deviation, seconds.
    #[must_use]
    pub const fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Residual frequency, ppm.
    #[must_use]
    pub const fn resid_freq(&self) -> f64 {
        self.resid_freq
    }

    /// Frequency error bound, ppm.
    #[must_use]
    pub const fn skew(&self) -> f64 {
        self.skew
    }

    /// Estimated offset, seconds.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Offset error bound, seconds.
    #[must_use]
    pub const fn offset_err(&self) -> f64 {
        self.offset_err
    }

    /// True with at least `minimum` samples; see [`DEFAULT_MIN_SAMPLES`].
    #[must_use]
    pub const fn has_sufficient_samples(&self, minimum: u32) -> bool {
        self.samples >= minimum
    }
}

/// Real-time clock calibration from the `rtcdata` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcData {
    pub(crate) ref_time: f64,
    pub(crate) samples: u32,
    pub(crate) runs: u32,
    pub(crate) span: u32,
    pub(crate) offset: f64,
    pub(crate) freq_offset: f64,
}

impl RtcData {
    /// Time of the last RTC measurement, epoch seconds.
    #[must_use]
    pub const fn ref_time(&self) -> f64 {
        self.ref_time
    }

    /// Calibration samples.
    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    /// Runs of residuals with the same sign.
    #[must_use]
    pub const fn runs(&self) -> u32 {
        self.runs
    }

    /// Interval covered by the samples, seconds.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.span
    }

    /// RTC offset from system time, seconds.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// RTC drift, ppm.
    #[must_use]
    pub const fn freq_offset(&self) -> f64 {
        self.freq_offset
    }

    /// True once chronyd has at least one calibration sample.
    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.samples > 0
    }
}
