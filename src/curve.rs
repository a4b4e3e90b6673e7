/// Maps a ramp position in [0, 1] to a gain multiplier in [0, 1].
///
/// Exponential `2^x - 1`: true silence at 0, unity at 1, perceptually even
/// loudness steps in between. Out-of-range input is clamped.
pub fn gain(position: f64) -> f32 {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };
    (position.exp2() - 1.0) as f32
}
