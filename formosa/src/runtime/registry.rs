use formosa_store::entity::AgentMode;
use serde::{Deserialize, Serialize};

/// Mode-driven capability record: which tool families one execution composes.
///
/// Produced by the pure function [`ToolRequirements::for_mode`]; the runtime assembles
/// the actual tool set from it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ToolRequirements {
    pub buy_sell_tools: bool,
    pub portfolio_tools: bool,
    pub memory_mcp: bool,
    pub casual_market_mcp: bool,
    pub perplexity_mcp: bool,
    pub fundamental_agent: bool,
    pub technical_agent: bool,
    pub risk_agent: bool,
    pub sentiment_agent: bool,
}

/// Field-level difference between two requirement records.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct RequirementsDiff {
    /// Capabilities enabled only in the first record.
    pub only_a: Vec<&'static str>,
    /// Capabilities enabled only in the second record.
    pub only_b: Vec<&'static str>,
    /// Capabilities enabled in both.
    pub shared: Vec<&'static str>,
}

impl ToolRequirements {
    /// Capability set of an execution mode.
    ///
    /// REBALANCING is the analysis-only variant: no buy/sell tools and a reduced
    /// sub-analyst panel, everything else shared with TRADING.
    pub fn for_mode(mode: AgentMode) -> Self {
        match mode {
            AgentMode::Trading => Self {
                buy_sell_tools: true,
                portfolio_tools: true,
                memory_mcp: true,
                casual_market_mcp: true,
                perplexity_mcp: true,
                fundamental_agent: true,
                technical_agent: true,
                risk_agent: true,
                sentiment_agent: true,
            },
            AgentMode::Rebalancing => Self {
                buy_sell_tools: false,
                portfolio_tools: true,
                memory_mcp: true,
                casual_market_mcp: true,
                perplexity_mcp: true,
                fundamental_agent: false,
                technical_agent: true,
                risk_agent: true,
                sentiment_agent: false,
            },
        }
    }

    fn fields(&self) -> [(&'static str, bool); 9] {
        [
            ("buy_sell_tools", self.buy_sell_tools),
            ("portfolio_tools", self.portfolio_tools),
            ("memory_mcp", self.memory_mcp),
            ("casual_market_mcp", self.casual_market_mcp),
            ("perplexity_mcp", self.perplexity_mcp),
            ("fundamental_agent", self.fundamental_agent),
            ("technical_agent", self.technical_agent),
            ("risk_agent", self.risk_agent),
            ("sentiment_agent", self.sentiment_agent),
        ]
    }

    /// Capability difference between two records.
    pub fn diff(a: Self, b: Self) -> RequirementsDiff {
        let mut diff = RequirementsDiff::default();
        for ((name, in_a), (_, in_b)) in a.fields().into_iter().zip(b.fields()) {
            match (in_a, in_b) {
                (true, true) => diff.shared.push(name),
                (true, false) => diff.only_a.push(name),
                (false, true) => diff.only_b.push(name),
                (false, false) => {}
            }
        }
        diff
    }
}
