use crate::engine::trading::PortfolioSnapshot;
use formosa_store::entity::{AgentMode, agent::Agent};
use std::fmt::Write;

/// Build the system instructions of one execution.
///
/// Pure function of (agent config, mode, portfolio snapshot, memory digest): identical
/// inputs always produce identical instructions.
pub fn build_instructions(
    agent: &Agent,
    mode: AgentMode,
    portfolio: &PortfolioSnapshot,
    memory_digest: &str,
) -> String {
    let mut text = String::new();

    let _ = writeln!(
        text,
        "You are {name}, an autonomous trading agent on the simulated Taiwan stock market.",
        name = agent.name
    );
    if !agent.description.is_empty() {
        let _ = writeln!(text, "Profile: {}", agent.description);
    }

    let _ = writeln!(text, "\n## Capital and constraints");
    let _ = writeln!(text, "- Initial funds: {} TWD", agent.initial_funds);
    let _ = writeln!(text, "- Available cash: {} TWD", portfolio.cash_balance);
    let _ = writeln!(
        text,
        "- Maximum single-position size: {}% of the portfolio",
        agent.max_position_size
    );
    let _ = writeln!(
        text,
        "- Order quantities are whole board lots (multiples of 1000 shares)."
    );
    let _ = writeln!(
        text,
        "- A 0.1425% commission applies to every buy and sell."
    );

    if !agent.investment_preferences.is_empty() {
        let _ = writeln!(
            text,
            "\n## Investment preferences\n{}",
            agent.investment_preferences.join(", ")
        );
    }

    let _ = writeln!(text, "\n## Current portfolio");
    let _ = writeln!(text, "- Total value: {} TWD", portfolio.total_value);
    if portfolio.holdings.is_empty() {
        let _ = writeln!(text, "- No open positions.");
    }
    for holding in &portfolio.holdings {
        let _ = writeln!(
            text,
            "- {} {}: {} shares @ avg cost {}",
            holding.ticker, holding.company_name, holding.quantity, holding.average_cost
        );
    }

    if !memory_digest.is_empty() {
        let _ = writeln!(text, "\n## Notes from previous sessions\n{memory_digest}");
    }

    let _ = writeln!(text, "\n## Task");
    match mode {
        AgentMode::Trading => {
            let _ = writeln!(
                text,
                "Run one trading session. Research market conditions with your tools, \
                 consult the analyst tools where useful, and place buy/sell orders that \
                 fit your strategy and constraints. Give a decision reason with every \
                 order. Finish with a concise JSON summary of what you did and why."
            );
        }
        AgentMode::Rebalancing => {
            let _ = writeln!(
                text,
                "Run one rebalancing review. Re-evaluate every open position against \
                 current market conditions and your strategy. You cannot place orders in \
                 this mode; instead produce a concise JSON summary with your assessment \
                 and concrete rebalancing recommendations."
            );
        }
    }

    text
}
