use serde_derive::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const PARAM_START: usize = 0;
pub const PARAM_STOP: usize = 1;
pub const PARAM_SEEK: usize = 2;
pub const NUM_PARAMS: usize = 3;

pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub min: u32,
    pub max: u32,
    pub step: u32,
    pub default: u32,
}

pub static PARAMS: [ParamSpec; NUM_PARAMS] = [
    ParamSpec {
        name: "Fade-in duration on playback start",
        label: "Start duration (ms)",
        min: 0,
        max: 5000,
        step: 50,
        default: 500,
    },
    ParamSpec {
        name: "Fade-out duration on playback stop",
        label: "Stop duration (ms)",
        min: 0,
        max: 5000,
        step: 50,
        default: 500,
    },
    ParamSpec {
        name: "Fade-in/fade-out duration when seeking",
        label: "Seek duration (ms)",
        min: 0,
        max: 2000,
        step: 50,
        default: 100,
    },
];

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("invalid param index ({0})")]
    InvalidIndex(usize),
}

/// The three configurable fade durations, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Durations {
    pub start_ms: u32,
    pub stop_ms: u32,
    pub seek_ms: u32,
}

impl Durations {
    pub fn new() -> Durations {
        Durations {
            start_ms: PARAMS[PARAM_START].default,
            stop_ms: PARAMS[PARAM_STOP].default,
            seek_ms: PARAMS[PARAM_SEEK].default,
        }
    }

    pub fn get(&self, index: usize) -> Result<u32, Error> {
        match index {
            PARAM_START => Ok(self.start_ms),
            PARAM_STOP => Ok(self.stop_ms),
            PARAM_SEEK => Ok(self.seek_ms),
            _ => Err(Error::InvalidIndex(index)),
        }
    }

    pub fn set(&mut self, index: usize, ms: u32) -> Result<(), Error> {
        let spec = param_spec(index)?;
        let ms = ms.clamp(spec.min, spec.max);
        match index {
            PARAM_START => self.start_ms = ms,
            PARAM_STOP => self.stop_ms = ms,
            _ => self.seek_ms = ms,
        }
        Ok(())
    }

    /// Every duration forced into its parameter's range.
    pub fn clamped(self) -> Durations {
        let clamp = |index: usize, ms: u32| ms.clamp(PARAMS[index].min, PARAMS[index].max);
        Durations {
            start_ms: clamp(PARAM_START, self.start_ms),
            stop_ms: clamp(PARAM_STOP, self.stop_ms),
            seek_ms: clamp(PARAM_SEEK, self.seek_ms),
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Durations::new()
    }
}

/// Process-wide durations; every open stream reads them on each buffer,
/// so a change reaches existing streams immediately.
#[derive(Clone)]
pub struct SharedDurations {
    ms: Arc<[AtomicU32; NUM_PARAMS]>,
}

impl SharedDurations {
    pub fn new(durations: Durations) -> SharedDurations {
        SharedDurations {
            ms: Arc::new([
                AtomicU32::new(durations.start_ms),
                AtomicU32::new(durations.stop_ms),
                AtomicU32::new(durations.seek_ms),
            ]),
        }
    }

    pub fn load(&self) -> Durations {
        Durations {
            start_ms: self.ms[PARAM_START].load(Ordering::Relaxed),
            stop_ms: self.ms[PARAM_STOP].load(Ordering::Relaxed),
            seek_ms: self.ms[PARAM_SEEK].load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, durations: Durations) {
        self.ms[PARAM_START].store(durations.start_ms, Ordering::Relaxed);
        self.ms[PARAM_STOP].store(durations.stop_ms, Ordering::Relaxed);
        self.ms[PARAM_SEEK].store(durations.seek_ms, Ordering::Relaxed);
    }
}

impl Default for SharedDurations {
    fn default() -> Self {
        SharedDurations::new(Durations::new())
    }
}

fn param_spec(index: usize) -> Result<&'static ParamSpec, Error> {
    PARAMS.get(index).ok_or(Error::InvalidIndex(index))
}

pub fn num_params() -> usize {
    NUM_PARAMS
}

/// Descriptive name for the host's parameter list; empty for an invalid index.
pub fn param_name(index: usize) -> &'static str {
    match param_spec(index) {
        Ok(spec) => spec.name,
        Err(err) => {
            warn!("param_name: {}", err);
            ""
        }
    }
}

/// Host configuration dialog, one spin button per parameter.
pub fn config_dialog() -> String {
    PARAMS
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            format!(
                "property \"{}\" spinbtn[{},{},{}] {} {};\n",
                spec.label, spec.min, spec.max, spec.step, index, spec.default
            )
        })
        .collect()
}

// Longest prefix of `text` that reads as a decimal float: sign, digits with
// at most one '.', then an optional exponent.
fn float_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return "";
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    &text[..end]
}

/// Lenient millisecond parsing: leading number only, anything else is 0.
/// Negative values become 0, fractions are truncated.
pub fn parse_ms(text: &str) -> u32 {
    match float_prefix(text.trim()).parse::<f64>() {
        Ok(value) if value > 0.0 => {
            if value >= u32::MAX as f64 {
                u32::MAX
            } else {
                value.trunc() as u32
            }
        }
        _ => 0,
    }
}

/// Per-instance parameters of one fade stream.
///
/// Writes go to this instance and to the process-wide durations.
pub struct FadeParams {
    durations: Durations,
    shared: SharedDurations,
}

impl FadeParams {
    pub fn new(shared: SharedDurations) -> FadeParams {
        FadeParams {
            durations: shared.load(),
            shared,
        }
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Parses `value` leniently and stores it; an invalid index is logged and ignored.
    pub fn set(&mut self, index: usize, value: &str) {
        if let Err(err) = self.try_set(index, value) {
            warn!("set_param: {}", err);
        }
    }

    pub fn try_set(&mut self, index: usize, value: &str) -> Result<(), Error> {
        self.durations.set(index, parse_ms(value))?;
        self.shared.store(self.durations);
        debug!(
            "{} = {} ms",
            PARAMS[index].label,
            self.durations.get(index)?
        );
        Ok(())
    }

    /// The stored value as text; empty for an invalid index.
    pub fn get(&self, index: usize) -> String {
        match self.try_get(index) {
            Ok(value) => value,
            Err(err) => {
                warn!("get_param: {}", err);
                String::new()
            }
        }
    }

    pub fn try_get(&self, index: usize) -> Result<String, Error> {
        Ok(format!("{:.6}", self.durations.get(index)? as f32))
    }
}
