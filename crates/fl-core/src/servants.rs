//! Declarative servant configuration.
//!
//! Every (kind, level) pair that can be appointed has one entry describing
//! the role claim, the graph relationship, whether the unit can hold more
//! than one such servant, and who may appoint or remove it. The API runs a
//! single generic make/remove handler over this table.

use crate::error::Result;
use crate::permissions::{permit_admin, permit_admin_arrivals};
use crate::types::{ChurchLevel, Role, ServantKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServantConfig {
    pub role: Role,
    pub relationship: &'static str,
    pub single_holder: bool,
    /// Roles allowed to appoint or remove this servant.
    pub permitted: Vec<Role>,
}

/// Look up the configuration for appointing `kind` at `level`.
pub fn servant_config(kind: ServantKind, level: ChurchLevel) -> Result<ServantConfig> {
    let role = Role::new(kind, level)?;
    let permitted = match kind {
        ServantKind::Leader | ServantKind::Admin => permit_admin(level.parent().unwrap_or(level)),
        ServantKind::ArrivalsAdmin | ServantKind::ArrivalsCounter | ServantKind::ArrivalsPayer => {
            permit_admin_arrivals(level)
        }
        ServantKind::Teller | ServantKind::SheepSeeker => permit_admin(level),
    };

    Ok(ServantConfig {
        role,
        relationship: kind.relationship(),
        single_holder: kind.is_single_holder(),
        permitted,
    })
}

/// Every configured (kind, level) pair.
pub fn all_servant_configs() -> Vec<ServantConfig> {
    ServantKind::ALL
        .into_iter()
        .flat_map(|kind| kind.levels().iter().map(move |level| (kind, *level)))
        .filter_map(|(kind, level)| servant_config(kind, level).ok())
        .collect()
}

/// Whether a servant keeps their identity account after losing one role.
/// `roles_before_removal` counts every servant relationship they held,
/// including the one being removed.
pub fn keeps_identity_account(roles_before_removal: i64) -> bool {
    roles_before_removal > 1
}

/// An email/SMS message sent to a servant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServantMessage {
    pub subject: String,
    pub body: String,
}

pub fn appointment_message(first_name: &str, role: Role, church_name: &str) -> ServantMessage {
    ServantMessage {
        subject: format!("FL Servanthood Status Update: {}", role.kind.title()),
        body: format!(
            "Hi {first_name},\n\nCongratulations on being made the {} of {church_name} {}. \
             You can now carry out this duty on the FL admin portal.",
            role.kind.title(),
            role.level
        ),
    }
}

pub fn removal_message(first_name: &str, role: Role, church_name: &str) -> ServantMessage {
    ServantMessage {
        subject: format!("FL Servanthood Status Update: {}", role.kind.title()),
        body: format!(
            "Hi {first_name},\n\nWe regret to inform you that you have been removed as the {} \
             of {church_name} {}. Thank you for your service.",
            role.kind.title(),
            role.level
        ),
    }
}
