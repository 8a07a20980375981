//! Built-in Hearing Presets

/// Named preset: gains in dB for the 500 Hz, 2 kHz and 4 kHz bands
pub type Preset = (&'static str, [f32; 3]);

/// List of built-in presets
pub const PRESETS: &[Preset] = &[
    ("Flat", [0.0, 0.0, 0.0]),
    ("Mild High-Frequency Loss", [0.0, 6.0, 10.0]),
    ("Moderate High-Frequency Loss", [2.0, 12.0, 20.0]),
    ("Speech Clarity", [-3.0, 8.0, 6.0]),
    ("Low-Frequency Loss", [12.0, 4.0, 0.0]),
];

/// Look up a preset by name, ignoring ASCII case and surrounding whitespace
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|(n, _)| n.eq_ignore_ascii_case(name))
}
