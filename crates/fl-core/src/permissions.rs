//! Role-based permission checks.
//!
//! Each `permit_*` helper yields the roles of one or more servant kinds at a
//! level and every level above it. A mutation is allowed when the caller
//! holds at least one of the permitted roles.

use crate::types::{ChurchLevel, Role, ServantKind};

/// Check whether any of the user's roles is in the permitted set.
pub fn is_auth(permitted: &[Role], user_roles: &[Role]) -> bool {
    user_roles.iter().any(|role| permitted.contains(role))
}

/// Roles of `kind` at `level` and above, limited to levels where the kind exists.
pub fn roles_at_or_above(kind: ServantKind, level: ChurchLevel) -> Vec<Role> {
    level
        .at_or_above()
        .filter(|l| kind.exists_at(*l))
        .map(|l| Role { kind, level: l })
        .collect()
}

fn union(kinds: &[ServantKind], level: ChurchLevel) -> Vec<Role> {
    kinds
        .iter()
        .flat_map(|kind| roles_at_or_above(*kind, level))
        .collect()
}

pub fn permit_leader(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::Leader, level)
}

pub fn permit_admin(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::Admin, level)
}

pub fn permit_leader_admin(level: ChurchLevel) -> Vec<Role> {
    union(&[ServantKind::Leader, ServantKind::Admin], level)
}

pub fn permit_arrivals(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::ArrivalsAdmin, level)
}

pub fn permit_admin_arrivals(level: ChurchLevel) -> Vec<Role> {
    union(&[ServantKind::Admin, ServantKind::ArrivalsAdmin], level)
}

/// Arrivals counters, plus the arrivals admins who supervise them.
pub fn permit_arrivals_counter(level: ChurchLevel) -> Vec<Role> {
    union(&[ServantKind::ArrivalsCounter, ServantKind::ArrivalsAdmin], level)
}

pub fn permit_arrivals_payer(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::ArrivalsPayer, level)
}

pub fn permit_teller(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::Teller, level)
}

pub fn permit_sheep_seeker(level: ChurchLevel) -> Vec<Role> {
    roles_at_or_above(ServantKind::SheepSeeker, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(s: &str) -> Role {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_auth() {
        let permitted = permit_admin(ChurchLevel::Council);
        assert!(is_auth(&permitted, &[role("adminCouncil")]));
        assert!(is_auth(&permitted, &[role("leaderFellowship"), role("adminStream")]));
        assert!(!is_auth(&permitted, &[role("adminGovernorship")]));
        assert!(!is_auth(&permitted, &[]));
    }

    #[test]
    fn test_permit_leader_includes_higher_levels() {
        let roles = permit_leader(ChurchLevel::Oversight);
        assert_eq!(roles, vec![role("leaderOversight"), role("leaderDenomination")]);
    }

    #[test]
    fn test_permit_admin_skips_levels_without_admins() {
        let roles = permit_admin(ChurchLevel::Fellowship);
        assert_eq!(roles.len(), 6);
        assert_eq!(roles[0], role("adminGovernorship"));
    }

    #[test]
    fn test_permit_teller_only_at_stream() {
        assert_eq!(permit_teller(ChurchLevel::Council), vec![role("tellerStream")]);
        assert!(permit_teller(ChurchLevel::Campus).is_empty());
    }

    #[test]
    fn test_permit_leader_admin_union() {
        let roles = permit_leader_admin(ChurchLevel::Campus);
        assert!(roles.contains(&role("leaderCampus")));
        assert!(roles.contains(&role("adminDenomination")));
        assert!(!roles.contains(&role("leaderStream")));
    }

    #[test]
    fn test_permit_arrivals_counter_includes_arrivals_admins() {
        let roles = permit_arrivals_counter(ChurchLevel::Stream);
        assert!(roles.contains(&role("arrivalsCounterStream")));
        assert!(roles.contains(&role("arrivalsAdminCampus")));
        assert!(!roles.contains(&role("arrivalsAdminCouncil")));
    }
}
