//! Arrivals and bussing rules.

use serde::{Deserialize, Serialize};

use crate::banking::TransactionStatus;
use crate::config::PolicyConfig;
use crate::error::{FlError, Result};
use crate::types::Amount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Sprinter,
    Urvan,
}

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "Car",
            Self::Sprinter => "Sprinter",
            Self::Urvan => "Urvan",
        }
    }
}

impl std::str::FromStr for VehicleType {
    type Err = FlError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Car" => Ok(Self::Car),
            "Sprinter" => Ok(Self::Sprinter),
            "Urvan" => Ok(Self::Urvan),
            other => Err(FlError::Validation(format!("Unknown vehicle type: {other}"))),
        }
    }
}

/// Per-bacenta top-up rates, set by the council.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpRates {
    pub sprinter: Amount,
    pub urvan: Amount,
    pub car: Amount,
}

impl TopUpRates {
    pub fn for_vehicle(&self, vehicle: VehicleType) -> Amount {
        match vehicle {
            VehicleType::Car => self.car,
            VehicleType::Sprinter => self.sprinter,
            VehicleType::Urvan => self.urvan,
        }
    }
}

/// The support the church pays towards one vehicle.
pub fn vehicle_top_up(
    attendance: u32,
    vehicle: VehicleType,
    outbound: bool,
    vehicle_cost: Amount,
    rates: &TopUpRates,
    policy: &PolicyConfig,
) -> Amount {
    if attendance < policy.min_bussing_attendance {
        return Amount::ZERO;
    }

    let mut top_up = rates.for_vehicle(vehicle);
    if outbound {
        top_up = top_up.saturating_mul(policy.outbound_multiplier);
    }
    top_up.min(vehicle_cost).max(Amount::ZERO)
}

/// A vehicle declared on a bussing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleEntry {
    pub vehicle: VehicleType,
    pub attendance: u32,
    pub cost: Amount,
    pub outbound: bool,
    pub picture: String,
}

pub fn validate_vehicles(vehicles: &[VehicleEntry]) -> Result<()> {
    if vehicles.is_empty() {
        return Err(FlError::Validation("Please add at least one vehicle".into()));
    }
    for v in vehicles {
        if v.cost.is_negative() {
            return Err(FlError::Validation("Vehicle cost cannot be negative".into()));
        }
        if v.picture.trim().is_empty() {
            return Err(FlError::Validation(format!(
                "Please upload a picture of the {}",
                v.vehicle.as_str()
            )));
        }
    }
    Ok(())
}

/// Check that vehicle support may be sent for a confirmed vehicle.
pub fn ensure_can_pay(
    arrived: bool,
    top_up: Amount,
    status: Option<TransactionStatus>,
) -> Result<()> {
    if !arrived {
        return Err(FlError::Validation(
            "This vehicle has not been confirmed by an arrivals counter".into(),
        ));
    }
    match status {
        Some(TransactionStatus::Success) => {
            return Err(FlError::Conflict(
                "Money has already been sent to this bacenta".into(),
            ))
        }
        Some(TransactionStatus::Pending) => {
            return Err(FlError::Conflict(
                "A payment to this bacenta is already in progress".into(),
            ))
        }
        _ => {}
    }
    if top_up.is_zero() {
        return Err(FlError::Validation(
            "This vehicle does not qualify for a top up".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> TopUpRates {
        TopUpRates {
            sprinter: Amount::from_cedis(100.0),
            urvan: Amount::from_cedis(60.0),
            car: Amount::ZERO,
        }
    }

    #[test]
    fn test_outbound_top_up_on_huge_rates_is_capped_by_cost() {
        let huge = Amount::from_cedis(1e18);
        let rates = TopUpRates {
            sprinter: huge,
            ..rates()
        };
        let top_up = vehicle_top_up(
            20,
            VehicleType::Sprinter,
            true,
            huge,
            &rates,
            &PolicyConfig::default(),
        );
        assert_eq!(top_up, huge);
    }

    #[test]
    fn test_no_top_up_below_minimum_attendance() {
        let policy = PolicyConfig::default();
        let top_up = vehicle_top_up(
            7,
            VehicleType::Sprinter,
            false,
            Amount::from_cedis(300.0),
            &rates(),
            &policy,
        );
        assert_eq!(top_up, Amount::ZERO);
    }

    #[test]
    fn test_top_up_at_minimum_attendance() {
        let policy = PolicyConfig::default();
        let top_up = vehicle_top_up(
            8,
            VehicleType::Urvan,
            false,
            Amount::from_cedis(300.0),
            &rates(),
            &policy,
        );
        assert_eq!(top_up, Amount::from_cedis(60.0));
    }

    #[test]
    fn test_outbound_doubles_and_cost_caps() {
        let policy = PolicyConfig::default();
        let doubled = vehicle_top_up(
            20,
            VehicleType::Sprinter,
            true,
            Amount::from_cedis(500.0),
            &rates(),
            &policy,
        );
        assert_eq!(doubled, Amount::from_cedis(200.0));

        let capped = vehicle_top_up(
            20,
            VehicleType::Sprinter,
            true,
            Amount::from_cedis(150.0),
            &rates(),
            &policy,
        );
        assert_eq!(capped, Amount::from_cedis(150.0));
    }

    #[test]
    fn test_cars_without_rate_get_nothing() {
        let policy = PolicyConfig::default();
        let top_up = vehicle_top_up(
            30,
            VehicleType::Car,
            false,
            Amount::from_cedis(80.0),
            &rates(),
            &policy,
        );
        assert_eq!(top_up, Amount::ZERO);
    }

    #[test]
    fn test_cannot_pay_twice() {
        let err = ensure_can_pay(
            true,
            Amount::from_cedis(60.0),
            Some(TransactionStatus::Success),
        )
        .unwrap_err();
        assert!(err.to_string().contains("already been sent"));
    }

    #[test]
    fn test_cannot_pay_unconfirmed_or_zero() {
        assert!(ensure_can_pay(false, Amount::from_cedis(60.0), None).is_err());
        assert!(ensure_can_pay(true, Amount::ZERO, None).is_err());
        assert!(ensure_can_pay(true, Amount(1), Some(TransactionStatus::Failed)).is_ok());
    }

    #[test]
    fn test_validate_vehicles() {
        assert!(validate_vehicles(&[]).is_err());
        let v = VehicleEntry {
            vehicle: VehicleType::Urvan,
            attendance: 12,
            cost: Amount::from_cedis(200.0),
            outbound: false,
            picture: String::new(),
        };
        let err = validate_vehicles(&[v]).unwrap_err();
        assert!(err.to_string().contains("Urvan"));
    }
}
