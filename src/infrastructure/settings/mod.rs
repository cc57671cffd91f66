pub mod file_agent_settings;

pub use file_agent_settings::FileAgentSettingsSource;
