//! Validators: check a decoded record and build its snapshot.
//!
//! Each validator is pure. The first violated rule aborts that record with an
//! invalid-value data error naming the field and value; bounds are fixed.

use crate::classify::{NativeFailure, Stage, classify};
use crate::error::{ChronyError, Result};
use crate::record::FieldMap;
use crate::snapshot::{
    LeapStatus, RtcData, Source, SourceMode, SourceState, SourceStats, TrackingStatus,
    ref_id_to_name,
};

/// Highest valid stratum.
pub const MAX_STRATUM: u64 = 15;
/// Highest valid reachability register value.
pub const MAX_REACHABILITY: u64 = 255;

fn invalid(field: &'static str, value: impl ToString, rule: &'static str) -> ChronyError {
    let err = classify(
        Stage::Validate,
        NativeFailure::InvalidValue {
            field,
            value: value.to_string(),
            rule,
        },
    );
    tracing::warn!(field, rule, "record failed validation");
    err
}

fn finite(fields: &FieldMap, name: &'static str) -> Result<f64> {
    let value = fields.float(name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(name, value, "must be finite"))
    }
}

fn non_negative(value: f64, name: &'static str) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else if value.is_finite() {
        Err(invalid(name, value, "must be non-negative"))
    } else {
        Err(invalid(name, value, "must be finite"))
    }
}

fn finite_time(fields: &FieldMap, name: &'static str) -> Result<f64> {
    let value = fields.time(name)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(name, value, "must be finite"))
    }
}

fn bounded(fields: &FieldMap, name: &'static str, max: u64) -> Result<u64> {
    let value = fields.uinteger(name)?;
    if value <= max {
        Ok(value)
    } else {
        Err(invalid(name, value, "out of range"))
    }
}

fn narrow<T: TryFrom<u64>>(fields: &FieldMap, name: &'static str) -> Result<T> {
    let value = fields.uinteger(name)?;
    T::try_from(value).map_err(|_| invalid(name, value, "out of range"))
}

fn stratum(fields: &FieldMap) -> Result<u8> {
    let value = bounded(fields, "stratum", MAX_STRATUM)?;
    u8::try_from(value).map_err(|_| invalid("stratum", value, "out of range"))
}

/// Validates a `tracking` record.
pub fn tracking(fields: &FieldMap) -> Result<TrackingStatus> {
    let reference_id: u32 = narrow(fields, "reference ID")?;
    let stratum = stratum(fields)?;
    let leap_raw = fields.uinteger("leap status")?;
    let leap_status =
        LeapStatus::from_raw(leap_raw).ok_or_else(|| invalid("leap status", leap_raw, "out of range"))?;

    let ref_time = non_negative(finite_time(fields, "reference time")?, "reference time")?;
    let offset = finite(fields, "current correction")?;
    let last_offset = finite(fields, "last offset")?;
    let rms_offset = non_negative(finite(fields, "RMS offset")?, "RMS offset")?;
    let frequency = finite(fields, "frequency offset")?;
    let residual_freq = finite(fields, "residual frequency")?;
    let skew = non_negative(finite(fields, "skew")?, "skew")?;
    let root_delay = non_negative(finite(fields, "root delay")?, "root delay")?;
    let root_dispersion = non_negative(finite(fields, "root dispersion")?, "root dispersion")?;
    let update_interval = non_negative(
        finite(fields, "last update interval")?,
        "last update interval",
    )?;

    Ok(TrackingStatus {
        reference_id,
        reference_id_name: ref_id_to_name(reference_id),
        reference_ip: fields.string("address")?.to_string(),
        stratum,
        leap_status,
        ref_time,
        offset,
        last_offset,
        rms_offset,
        frequency,
        residual_freq,
        skew,
        root_delay,
        root_dispersion,
        update_interval,
    })
}

/// Validates a `sources` record.
///
/// Reference clocks report an empty address; the reference ID name is used
/// instead, and the result must not be empty.
pub fn source(fields: &FieldMap) -> Result<Source> {
    let mut address = fields.string("address")?.to_string();
    if address.is_empty() {
        let reference_id: u32 = narrow(fields, "reference ID")?;
        address = ref_id_to_name(reference_id);
    }
    if address.is_empty() {
        return Err(invalid("address", "\"\"", "must not be empty"));
    }

    let poll_raw = fields.integer("poll")?;
    let poll = i32::try_from(poll_raw).map_err(|_| invalid("poll", poll_raw, "out of range"))?;
    let stratum = stratum(fields)?;
    let state_raw = fields.uinteger("state")?;
    let state =
        SourceState::from_raw(state_raw).ok_or_else(|| invalid("state", state_raw, "out of range"))?;
    let mode_raw = fields.uinteger("mode")?;
    let mode =
        SourceMode::from_raw(mode_raw).ok_or_else(|| invalid("mode", mode_raw, "out of range"))?;
    let reachability = bounded(fields, "reachability", MAX_REACHABILITY)?;
    let reachability =
        u8::try_from(reachability).map_err(|_| invalid("reachability", reachability, "out of range"))?;

    let orig_latest_meas = finite(fields, "original last sample offset")?;
    let latest_meas = finite(fields, "adjusted last sample offset")?;
    let latest_meas_err = non_negative(finite(fields, "last sample error")?, "last sample error")?;

    Ok(Source {
        address,
        poll,
        stratum,
        state,
        mode,
        flags: fields.uinteger("flags")?,
        reachability,
        last_sample_ago: fields.uinteger("last sample ago")?,
        orig_latest_meas,
        latest_meas,
        latest_meas_err,
    })
}

/// Validates a `sourcestats` record.
pub fn source_stats(fields: &FieldMap) -> Result<SourceStats> {
    let std_dev = non_negative(finite(fields, "standard deviation")?, "standard deviation")?;
    let resid_freq = finite(fields, "residual frequency")?;
    let skew = non_negative(finite(fields, "skew")?, "skew")?;
    let offset = finite(fields, "offset")?;
    let offset_err = non_negative(finite(fields, "offset error")?, "offset error")?;

    Ok(SourceStats {
        reference_id: narrow(fields, "reference ID")?,
        address: fields.string("address")?.to_string(),
        samples: narrow(fields, "samples")?,
        runs: narrow(fields, "runs")?,
        span: narrow(fields, "span")?,
        std_dev,
        resid_freq,
        skew,
        offset,
        offset_err,
    })
}

/// Validates an `rtcdata` record.
pub fn rtc_data(fields: &FieldMap) -> Result<RtcData> {
    let ref_time = non_negative(finite_time(fields, "reference time")?, "reference time")?;
    let offset = finite(fields, "offset")?;
    let freq_offset = finite(fields, "frequency offset")?;

    Ok(RtcData {
        ref_time,
        samples: narrow(fields, "samples")?,
        runs: narrow(fields, "runs")?,
        span: narrow(fields, "span")?,
        offset,
        freq_offset,
    })
}
