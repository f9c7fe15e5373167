//! Church unit structure rules.

use crate::error::{FlError, Result};
use crate::types::ChurchLevel;

/// A fellowship closes only once its members have moved on; any other unit
/// closes only once its children have been closed or moved.
pub fn ensure_can_close(level: ChurchLevel, member_count: i64, active_children: i64) -> Result<()> {
    if level == ChurchLevel::Fellowship {
        if member_count > 0 {
            return Err(FlError::Conflict(format!(
                "This fellowship has {member_count} members. Please move them before closing it down"
            )));
        }
        return Ok(());
    }
    if active_children > 0 {
        let child = level.child().map(|c| c.label()).unwrap_or("unit");
        return Err(FlError::Conflict(format!(
            "This {level} has {active_children} active {child}(s). Please close them down first"
        )));
    }
    Ok(())
}

pub fn validate_church_name(name: &str) -> Result<String> {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(FlError::Validation("Please give the church a name".into()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fellowship_with_members_cannot_close() {
        let err = ensure_can_close(ChurchLevel::Fellowship, 3, 0).unwrap_err();
        assert!(matches!(err, FlError::Conflict(_)));
        assert!(ensure_can_close(ChurchLevel::Fellowship, 0, 0).is_ok());
    }

    #[test]
    fn test_unit_with_children_cannot_close() {
        assert!(ensure_can_close(ChurchLevel::Bacenta, 40, 2).is_err());
        assert!(ensure_can_close(ChurchLevel::Bacenta, 40, 0).is_ok());
    }

    #[test]
    fn test_church_name_is_collapsed() {
        assert_eq!(validate_church_name("  Legon   Campus ").unwrap(), "Legon Campus");
        assert!(validate_church_name("   ").is_err());
    }
}
