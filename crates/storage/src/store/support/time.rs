#![forbid(unsafe_code)]

/// Unix seconds; category timestamps are stored at second precision.
pub(in crate::store) fn now_secs() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as i64
}
