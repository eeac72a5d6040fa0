/// 音量换算
///
/// 内部统一保存线性增益（0.0 - 1.0）。
/// - 线性刻度：0 - 100（百分比）
/// - 对数刻度：毫贝（mB），0 为满音量，下限 -6000 mB 视为静音
pub const LINEAR_MAX: i64 = 100;
pub const MILLIBEL_MIN: i64 = -6000;

/// 刻度值 -> 线性增益
pub fn level_to_gain(level: i64, linear: bool) -> f64 {
    if linear {
        level.clamp(0, LINEAR_MAX) as f64 / LINEAR_MAX as f64
    } else {
        let mb = level.clamp(MILLIBEL_MIN, 0);
        if mb <= MILLIBEL_MIN {
            0.0
        } else {
            10f64.powf(mb as f64 / 2000.0)
        }
    }
}

/// 线性增益 -> 刻度值
pub fn gain_to_level(gain: f64, linear: bool) -> i64 {
    let gain = gain.clamp(0.0, 1.0);
    if linear {
        (gain * LINEAR_MAX as f64).round() as i64
    } else if gain <= 0.0 {
        MILLIBEL_MIN
    } else {
        ((2000.0 * gain.log10()).round() as i64).max(MILLIBEL_MIN)
    }
}
