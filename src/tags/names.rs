//! The custom frames this crate persists, and helpers for their values.

use serde_json::{Map, Value};

/// Names of the user-text frames, reproduced verbatim on disk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FrameName {
    /// Free text attached to the recording.
    Content,
    Guid,
    /// `YYYY-MM-DD`
    CreatedOnDate,
    /// ISO-8601 with a numeric UTC offset.
    CreatedOnTs,
    /// Seconds with exactly one fractional digit.
    DurationSec,
    ChecksumMd5Audio,
    /// Opaque JSON object.
    GenerationParams,
}

impl FrameName {
    pub const ALL: [FrameName; 7] = [
        FrameName::Content,
        FrameName::Guid,
        FrameName::CreatedOnDate,
        FrameName::CreatedOnTs,
        FrameName::DurationSec,
        FrameName::ChecksumMd5Audio,
        FrameName::GenerationParams,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FrameName::Content => "Content",
            FrameName::Guid => "GUID",
            FrameName::CreatedOnDate => "CREATED_ON_DATE",
            FrameName::CreatedOnTs => "CREATED_ON_TS",
            FrameName::DurationSec => "DURATION_SEC",
            FrameName::ChecksumMd5Audio => "CHECKSUM_MD5_AUDIO",
            FrameName::GenerationParams => "GENERATION_PARAMS",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }
}

/// Values of the known frames as read from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameValues {
    pub content: Option<String>,
    pub guid: Option<String>,
    pub created_on_date: Option<String>,
    pub created_on_ts: Option<String>,
    pub duration_sec: Option<String>,
    pub checksum_md5_audio: Option<String>,
    pub generation_params: Option<String>,
}

impl FrameValues {
    pub fn get(&self, name: FrameName) -> Option<&str> {
        self.slot(name).as_deref()
    }

    pub fn set(&mut self, name: FrameName, value: Option<String>) {
        *self.slot_mut(name) = value;
    }

    fn slot(&self, name: FrameName) -> &Option<String> {
        match name {
            FrameName::Content => &self.content,
            FrameName::Guid => &self.guid,
            FrameName::CreatedOnDate => &self.created_on_date,
            FrameName::CreatedOnTs => &self.created_on_ts,
            FrameName::DurationSec => &self.duration_sec,
            FrameName::ChecksumMd5Audio => &self.checksum_md5_audio,
            FrameName::GenerationParams => &self.generation_params,
        }
    }

    fn slot_mut(&mut self, name: FrameName) -> &mut Option<String> {
        match name {
            FrameName::Content => &mut self.content,
            FrameName::Guid => &mut self.guid,
            FrameName::CreatedOnDate => &mut self.created_on_date,
            FrameName::CreatedOnTs => &mut self.created_on_ts,
            FrameName::DurationSec => &mut self.duration_sec,
            FrameName::ChecksumMd5Audio => &mut self.checksum_md5_audio,
            FrameName::GenerationParams => &mut self.generation_params,
        }
    }

    /// Fill a slot only if it is still empty; the first frame in the tag wins.
    pub(crate) fn fill(&mut self, name: &str, value: String) {
        if let Some(name) = FrameName::from_name(name) {
            let slot = self.slot_mut(name);
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    /// Duration stored in `DURATION_SEC`, in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_sec.as_deref().and_then(parse_duration_secs)
    }

    /// `GENERATION_PARAMS` parsed as a JSON object.
    pub fn generation_params(&self) -> Option<Map<String, Value>> {
        match serde_json::from_str::<Value>(self.generation_params.as_deref()?) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Strip control characters (code points below 32) and trim.
pub fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| (*c as u32) >= 32)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Format seconds with exactly one fractional digit, e.g. `3.5`.
pub fn format_duration_secs(ms: u64) -> String {
    let tenths = (ms + 50) / 100;
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Parse a `DURATION_SEC` value back into milliseconds.
pub fn parse_duration_secs(value: &str) -> Option<u64> {
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}
