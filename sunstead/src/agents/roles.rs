use crate::llm::prompts;

/// Role variants for everything that can answer a query. Each role carries
/// a display name (persisted with messages and returned in telemetry) and a
/// permitted-tool subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Manager,
    SolarController,
    EnergyOrchestrator,
    Research,
    KbDirect,
}

impl AgentRole {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::SolarController => "Solar Controller",
            Self::EnergyOrchestrator => "Energy Orchestrator",
            Self::Research => "Research",
            Self::KbDirect => "Documentation Search",
        }
    }

    /// Tool names this role may call. The registry subset is built from
    /// these; a role never sees tools outside its list.
    pub fn permitted_tools(self) -> &'static [&'static str] {
        match self {
            Self::Manager | Self::KbDirect => &[],
            Self::SolarController => &[
                "current_status",
                "detailed_status",
                "historical_stats",
                "time_series",
                "kb_search",
            ],
            Self::EnergyOrchestrator => &[
                "current_status",
                "detailed_status",
                "historical_stats",
                "time_series",
                "kb_search",
                "optimize_battery",
                "coordinate_miners",
                "create_energy_plan",
            ],
            Self::Research => &["kb_search", "web_search", "extract_url"],
        }
    }

    pub fn backstory(self) -> &'static str {
        match self {
            Self::Manager => prompts::manager_backstory(),
            Self::SolarController => prompts::solar_controller_backstory(),
            Self::EnergyOrchestrator => prompts::energy_orchestrator_backstory(),
            Self::Research => prompts::research_backstory(),
            Self::KbDirect => "",
        }
    }
}
