//! History log sentences.
//!
//! Each event renders the `historyRecord` text stored on a `HistoryLog` node.

use serde::{Deserialize, Serialize};

use crate::types::{Amount, ChurchLevel, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HistoryEvent {
    ServantAppointed {
        servant: String,
        role: Role,
        church: String,
    },
    ServantRemoved {
        servant: String,
        role: Role,
        church: String,
    },
    MemberRegistered {
        member: String,
        fellowship: String,
    },
    MemberMoved {
        member: String,
        from: String,
        to: String,
    },
    MemberDetailsUpdated {
        member: String,
        fields: Vec<String>,
    },
    UnitStarted {
        unit: String,
        level: ChurchLevel,
        parent: String,
    },
    UnitClosed {
        unit: String,
        level: ChurchLevel,
    },
    UnitMoved {
        unit: String,
        level: ChurchLevel,
        from: String,
        to: String,
    },
    BankingConfirmed {
        church: String,
        level: ChurchLevel,
        teller: String,
        amount: Amount,
    },
}

impl HistoryEvent {
    pub fn record(&self) -> String {
        match self {
            Self::ServantAppointed {
                servant,
                role,
                church,
            } => format!(
                "{servant} became the {} of {church} {}",
                role.kind.title(),
                role.level
            ),
            Self::ServantRemoved {
                servant,
                role,
                church,
            } => format!(
                "{servant} was removed as the {} of {church} {}",
                role.kind.title(),
                role.level
            ),
            Self::MemberRegistered { member, fellowship } => {
                format!("{member} joined {fellowship} Fellowship")
            }
            Self::MemberMoved { member, from, to } => {
                format!("{member} moved from {from} Fellowship to {to} Fellowship")
            }
            Self::MemberDetailsUpdated { member, fields } => {
                format!("{member}'s details were updated: {}", fields.join(", "))
            }
            Self::UnitStarted {
                unit,
                level,
                parent,
            } => {
                let parent_level = level.parent().unwrap_or(*level);
                format!("{unit} {level} was started under {parent} {parent_level}")
            }
            Self::UnitClosed { unit, level } => format!("{unit} {level} was closed down"),
            Self::UnitMoved {
                unit,
                level,
                from,
                to,
            } => {
                let parent_level = level.parent().unwrap_or(*level);
                format!("{unit} {level} was moved from {from} {parent_level} to {to} {parent_level}")
            }
            Self::BankingConfirmed {
                church,
                level,
                teller,
                amount,
            } => format!("{teller} confirmed the banking of {amount} for {church} {level}"),
        }
    }

    /// Leadership changes open or close a service log in addition to the history log.
    pub fn is_leadership_change(&self) -> bool {
        match self {
            Self::ServantAppointed { role, .. } | Self::ServantRemoved { role, .. } => {
                role.kind == crate::types::ServantKind::Leader
            }
            _ => false,
        }
    }
}
