//! Report descriptors: which report to ask for and which fields to read.
//!
//! Field names are case-sensitive and must match libchrony's introspection
//! vocabulary exactly ("reference ID", "RMS offset", ...). A name libchrony
//! does not know surfaces as a library error, never as missing data.

use std::fmt;

/// Decoded type a descriptor expects for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed integer.
    Integer,
    /// Unsigned integer.
    UInteger,
    /// Double-precision float.
    Float,
    /// Time value, decoded to epoch seconds.
    Time,
    /// String.
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::UInteger => "unsigned integer",
            Self::Float => "float",
            Self::Time => "timespec",
            Self::String => "string",
        };
        f.write_str(name)
    }
}

/// One (name, type) pair of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Native field name.
    pub name: &'static str,
    /// Expected decoded type.
    pub ty: FieldType,
}

impl FieldSpec {
    const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// How many records a report has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one record. `optional` singletons may be unavailable on a
    /// daemon that does not run the subsystem behind them.
    Singleton {
        /// Whether the report may be unavailable.
        optional: bool,
    },
    /// Zero or more records.
    Multi,
}

/// Report kinds this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// `tracking`.
    Tracking,
    /// `sources`.
    Sources,
    /// `sourcestats`.
    SourceStats,
    /// `rtcdata`.
    RtcData,
}

impl ReportKind {
    /// All report kinds.
    pub const ALL: [Self; 4] = [Self::Tracking, Self::Sources, Self::SourceStats, Self::RtcData];

    /// The builtin descriptor for this kind.
    #[must_use]
    pub const fn descriptor(self) -> &'static ReportDescriptor {
        match self {
            Self::Tracking => &TRACKING,
            Self::Sources => &SOURCES,
            Self::SourceStats => &SOURCE_STATS,
            Self::RtcData => &RTC_DATA,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().name)
    }
}

/// Compile-time description of one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDescriptor {
    /// Report name understood by libchrony.
    pub name: &'static str,
    /// Singleton or multi-record.
    pub cardinality: Cardinality,
    /// Fields to read, in order.
    pub fields: &'static [FieldSpec],
}

impl ReportDescriptor {
    /// Looks up a field spec by native name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Returns true for singleton reports.
    #[must_use]
    pub const fn is_singleton(&self) -> bool {
        matches!(self.cardinality, Cardinality::Singleton { .. })
    }
}

use FieldType::{Float, Integer, String as Str, Time, UInteger};

/// `tracking` report.
pub const TRACKING: ReportDescriptor = ReportDescriptor {
    name: "tracking",
    cardinality: Cardinality::Singleton { optional: false },
    fields: &[
        FieldSpec::new("reference ID", UInteger),
        FieldSpec::new("address", Str),
        FieldSpec::new("stratum", UInteger),
        FieldSpec::new("leap status", UInteger),
        FieldSpec::new("reference time", Time),
        FieldSpec::new("current correction", Float),
        FieldSpec::new("last offset", Float),
        FieldSpec::new("RMS offset", Float),
        FieldSpec::new("frequency offset", Float),
        FieldSpec::new("residual frequency", Float),
        FieldSpec::new("skew", Float),
        FieldSpec::new("root delay", Float),
        FieldSpec::new("root dispersion", Float),
        FieldSpec::new("last update interval", Float),
    ],
};

/// `sources` report.
pub const SOURCES: ReportDescriptor = ReportDescriptor {
    name: "sources",
    cardinality: Cardinality::Multi,
    fields: &[
        FieldSpec::new("address", Str),
        FieldSpec::new("reference ID", UInteger),
        FieldSpec::new("poll", Integer),
        FieldSpec::new("stratum", UInteger),
        FieldSpec::new("state", UInteger),
        FieldSpec::new("mode", UInteger),
        FieldSpec::new("flags", UInteger),
        FieldSpec::new("reachability", UInteger),
        FieldSpec::new("last sample ago", UInteger),
        FieldSpec::new("original last sample offset", Float),
        FieldSpec::new("adjusted last sample offset", Float),
        FieldSpec::new("last sample error", Float),
    ],
};

/// `sourcestats` report.
pub const SOURCE_STATS: ReportDescriptor = ReportDescriptor {
    name: "sourcestats",
    cardinality: Cardinality::Multi,
    fields: &[
        FieldSpec::new("reference ID", UInteger),
        FieldSpec::new("address", Str),
        FieldSpec::new("samples", UInteger),
        FieldSpec::new("runs", UInteger),
        FieldSpec::new("span", UInteger),
        FieldSpec::new("standard deviation", Float),
        FieldSpec::new("residual frequency", Float),
        FieldSpec::new("skew", Float),
        FieldSpec::new("offset", Float),
        FieldSpec::new("offset error", Float),
    ],
};

/// `rtcdata` report. Only present when chronyd tracks the RTC.
pub const RTC_DATA: ReportDescriptor = ReportDescriptor {
    name: "rtcdata",
    cardinality: Cardinality::Singleton { optional: true },
    fields: &[
        FieldSpec::new("reference time", Time),
        FieldSpec::new("samples", UInteger),
        FieldSpec::new("runs", UInteger),
        FieldSpec::new("span", UInteger),
        FieldSpec::new("offset", Float),
        FieldSpec::new("frequency offset", Float),
    ],
};

/// Immutable table of the descriptors a driver works with.
///
/// Built once and handed to the [`ReportDriver`](crate::driver::ReportDriver);
/// there is no global mutable registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorTable {
    tracking: ReportDescriptor,
    sources: ReportDescriptor,
    source_stats: ReportDescriptor,
    rtc_data: ReportDescriptor,
}

impl DescriptorTable {
    /// The descriptors matching libchrony's field vocabulary.
    #[must_use]
    pub const fn builtin() -> Self {
        Self {
            tracking: TRACKING,
            sources: SOURCES,
            source_stats: SOURCE_STATS,
            rtc_data: RTC_DATA,
        }
    }

    /// Replaces one descriptor. Intended for compatibility testing against
    /// other libchrony versions.
    #[must_use]
    pub const fn with(mut self, kind: ReportKind, descriptor: ReportDescriptor) -> Self {
        match kind {
            ReportKind::Tracking => self.tracking = descriptor,
            ReportKind::Sources => self.sources = descriptor,
            ReportKind::SourceStats => self.source_stats = descriptor,
            ReportKind::RtcData => self.rtc_data = descriptor,
        }
        self
    }

    /// Returns the descriptor for `kind`.
    #[must_use]
    pub const fn get(&self, kind: ReportKind) -> &ReportDescriptor {
        match kind {
            ReportKind::Tracking => &self.tracking,
            ReportKind::Sources => &self.sources,
            ReportKind::SourceStats => &self.source_stats,
            ReportKind::RtcData => &self.rtc_data,
        }
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::builtin()
    }
}
