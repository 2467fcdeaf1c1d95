// Extensions — optional helpers decoupled from the runtime core.

pub mod easing;

pub use easing::{ease, ease_vec2, lerp, lerp_vec2, Easing};
