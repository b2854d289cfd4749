//! Synthesis models and preset voices the service ships with.
//!
//! UI layers render these as dropdown choices; uploaded clones are listed
//! separately through `SpeechService::list_voices`.

/// (display label, model id)
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("CosyVoice2-0.5B", "FunAudioLLM/CosyVoice2-0.5B"),
    ("Fish Speech 1.5", "fishaudio/fish-speech-1.5"),
    ("Fish Speech 1.4", "fishaudio/fish-speech-1.4"),
    ("GPT-SoVITS", "RVC-Boss/GPT-SoVITS"),
];

pub const DEFAULT_MODEL: &str = "FunAudioLLM/CosyVoice2-0.5B";

/// Model used when uploading recorded samples as voice clones.
pub const CLONE_MODEL: &str = "fishaudio/fish-speech-1.5";

/// (display label, voice id)
pub const PRESET_VOICES: &[(&str, &str)] = &[
    ("Alex", "fishaudio/fish-speech-1.5:alex"),
    ("Benjamin", "fishaudio/fish-speech-1.5:benjamin"),
    ("Charles", "fishaudio/fish-speech-1.5:charles"),
    ("David", "fishaudio/fish-speech-1.5:david"),
    ("Anna", "fishaudio/fish-speech-1.5:anna"),
    ("Bella", "fishaudio/fish-speech-1.5:bella"),
    ("Claire", "fishaudio/fish-speech-1.5:claire"),
    ("Diana", "fishaudio/fish-speech-1.5:diana"),
];
