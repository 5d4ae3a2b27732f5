use ratatui::style::Color;

/// Color used when there is nothing to scale against
pub const NEUTRAL: Color = Color::Rgb(128, 128, 128);

/// Weight of the global (log-scaled) intensity in the blend
const GLOBAL_WEIGHT: f64 = 0.7;
/// Weight of the frame's share among its siblings in the blend
const LOCAL_WEIGHT: f64 = 0.3;

const GREEN_HIGH: f64 = 230.0;
const GREEN_MID: f64 = 150.0;
const GREEN_KNEE: f64 = 0.3;

/// Heat color for a frame.
///
/// `relative_ratio` is the frame's count divided by the total of its
/// siblings (itself included). Hotter frames get less green, drifting from
/// yellow through orange to red.
pub fn heat_color(count: u64, max_count: u64, relative_ratio: f64) -> Color {
    if max_count == 0 {
        return NEUTRAL;
    }
    let blended = blended_ratio(count, max_count, relative_ratio);
    Color::Rgb(255, green_for(blended), 0)
}

/// Mix of log-compressed global intensity and local sibling share, in `[0, 1]`
pub fn blended_ratio(count: u64, max_count: u64, relative_ratio: f64) -> f64 {
    let global = (count as f64 / max_count as f64).clamp(0.0, 1.0);
    let log_ratio = ((1.0 + 7.0 * global).log2() / 8f64.log2()).clamp(0.0, 1.0);
    let local = if relative_ratio.is_finite() {
        relative_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    GLOBAL_WEIGHT * log_ratio + LOCAL_WEIGHT * local
}

fn green_for(blended: f64) -> u8 {
    let green = if blended < GREEN_KNEE {
        GREEN_HIGH - (GREEN_HIGH - GREEN_MID) * (blended / GREEN_KNEE)
    } else {
        GREEN_MID * (1.0 - (blended - GREEN_KNEE) / (1.0 - GREEN_KNEE))
    };
    green.round().clamp(0.0, 255.0) as u8
}
