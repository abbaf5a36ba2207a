use std::ffi::{OsStr, OsString};

use super::WorkKey;

pub const ARTIFACT_EXT: &str = "txt";
pub const TEMP_EXT: &str = "tmp";

pub fn encode_key(key: WorkKey) -> OsString {
    format!("{key}.{ARTIFACT_EXT}").into()
}

/// Only canonical names round-trip, so `007.txt` or `+7.txt` are not mistaken for `7.txt`.
pub fn decode_key(name: &OsStr) -> Option<WorkKey> {
    let stem = name.to_str()?.strip_suffix(ARTIFACT_EXT)?.strip_suffix('.')?;
    let key = stem.parse().ok()?;

    (encode_key(key).as_os_str() == name).then_some(key)
}
