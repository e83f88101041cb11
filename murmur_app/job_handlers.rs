pub mod proactive_checkin;
pub mod process_voice_interaction;
pub mod summarize_profile;
