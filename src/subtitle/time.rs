//! ASS 时间戳与秒之间的相互转换。

use tracing::warn;

/// 截断到厘秒前加上的容差，用于吸收 `1.29 * 100 = 128.999…` 这类浮点误差。
const CENTISECOND_EPSILON: f64 = 1e-6;

/// 将秒格式化为 ASS 时间字符串 `H:MM:SS.CC` (小时:分钟:秒.厘秒)。
///
/// 数值被截断到厘秒，整秒部分永远不会被进位。负数和 NaN 视为 0。
#[must_use]
pub fn seconds_to_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let total_cs = (seconds * 100.0 + CENTISECOND_EPSILON).floor() as u64;
    let cs = total_cs % 100;
    let total_seconds = total_cs / 100;
    let secs = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{secs:02}.{cs:02}")
}

/// 解析 ASS 时间字符串 (H:MM:SS.frac) 并转换为秒。
///
/// 格式错误时返回 `0.0` 并记录警告，不会返回错误。
#[must_use]
pub fn timestamp_to_seconds(text: &str) -> f64 {
    match try_timestamp_to_seconds(text) {
        Some(seconds) => seconds,
        None => {
            warn!("无法解析 ASS 时间戳 '{}'，使用 0.0 代替", text.trim());
            0.0
        }
    }
}

/// 严格版本的解析，格式错误时返回 `None`。
pub(crate) fn try_timestamp_to_seconds(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return None;
    };

    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;

    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    (total.is_finite() && total >= 0.0).then_some(total)
}
