//! Core domain types for the church hierarchy.
//!
//! Church units, servant kinds and role claims are shared by the graph
//! layer (labels and relationship types) and the API (JWT roles).

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FlError;

// ── Identifiers ───────────────────────────────────────────────────

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = FlError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| FlError::Validation(format!("Invalid id: {s}")))
            }
        }
    };
}

uuid_id!(
    /// A person in the directory.
    MemberId
);
uuid_id!(
    /// Any church unit, from a fellowship up to the denomination.
    ChurchId
);
uuid_id!(
    /// Service records, bussing records, vehicle records, transactions and logs.
    RecordId
);

// ── Church Hierarchy ──────────────────────────────────────────────

/// A level of the church hierarchy, ordered from the smallest unit upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChurchLevel {
    Fellowship,
    Bacenta,
    Governorship,
    Council,
    Stream,
    Campus,
    Oversight,
    Denomination,
}

impl ChurchLevel {
    pub const ALL: [ChurchLevel; 8] = [
        ChurchLevel::Fellowship,
        ChurchLevel::Bacenta,
        ChurchLevel::Governorship,
        ChurchLevel::Council,
        ChurchLevel::Stream,
        ChurchLevel::Campus,
        ChurchLevel::Oversight,
        ChurchLevel::Denomination,
    ];

    /// The Neo4j label of an active unit at this level.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fellowship => "Fellowship",
            Self::Bacenta => "Bacenta",
            Self::Governorship => "Governorship",
            Self::Council => "Council",
            Self::Stream => "Stream",
            Self::Campus => "Campus",
            Self::Oversight => "Oversight",
            Self::Denomination => "Denomination",
        }
    }

    /// The label a unit carries after it has been closed down.
    pub fn closed_label(self) -> &'static str {
        match self {
            Self::Fellowship => "ClosedFellowship",
            Self::Bacenta => "ClosedBacenta",
            Self::Governorship => "ClosedGovernorship",
            Self::Council => "ClosedCouncil",
            Self::Stream => "ClosedStream",
            Self::Campus => "ClosedCampus",
            Self::Oversight => "ClosedOversight",
            Self::Denomination => "ClosedDenomination",
        }
    }

    pub fn parent(self) -> Option<Self> {
        let idx = self as usize;
        Self::ALL.get(idx + 1).copied()
    }

    pub fn child(self) -> Option<Self> {
        let idx = self as usize;
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }

    /// This level and every level above it, smallest first.
    pub fn at_or_above(self) -> impl Iterator<Item = ChurchLevel> {
        Self::ALL.into_iter().filter(move |l| *l >= self)
    }
}

impl fmt::Display for ChurchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChurchLevel {
    type Err = FlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FlError::Validation(format!("Unknown church level: {s}")))
    }
}

// ── Servants ──────────────────────────────────────────────────────

/// The kind of service a member can hold over a church unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServantKind {
    Leader,
    Admin,
    ArrivalsAdmin,
    ArrivalsCounter,
    ArrivalsPayer,
    Teller,
    SheepSeeker,
}

impl ServantKind {
    pub const ALL: [ServantKind; 7] = [
        ServantKind::Leader,
        ServantKind::Admin,
        ServantKind::ArrivalsAdmin,
        ServantKind::ArrivalsCounter,
        ServantKind::ArrivalsPayer,
        ServantKind::Teller,
        ServantKind::SheepSeeker,
    ];

    /// Prefix of the JWT role claim, e.g. `leader` in `leaderFellowship`.
    pub fn claim_prefix(self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Admin => "admin",
            Self::ArrivalsAdmin => "arrivalsAdmin",
            Self::ArrivalsCounter => "arrivalsCounter",
            Self::ArrivalsPayer => "arrivalsPayer",
            Self::Teller => "teller",
            Self::SheepSeeker => "sheepseeker",
        }
    }

    /// Human-readable title used in history logs and notifications.
    pub fn title(self) -> &'static str {
        match self {
            Self::Leader => "Leader",
            Self::Admin => "Admin",
            Self::ArrivalsAdmin => "Arrivals Admin",
            Self::ArrivalsCounter => "Arrivals Counter",
            Self::ArrivalsPayer => "Arrivals Payer",
            Self::Teller => "Teller",
            Self::SheepSeeker => "Sheep Seeker",
        }
    }

    /// Cypher relationship type from the member to the church unit.
    pub fn relationship(self) -> &'static str {
        match self {
            Self::Leader => "LEADS",
            Self::Admin => "IS_ADMIN_FOR",
            Self::ArrivalsAdmin => "DOES_ARRIVALS_FOR",
            Self::ArrivalsCounter => "COUNTS_ARRIVALS_FOR",
            Self::ArrivalsPayer => "CONFIRMS_ARRIVALS_PAYMENT_FOR",
            Self::Teller => "IS_TELLER_FOR",
            Self::SheepSeeker => "IS_SHEEP_SEEKER_FOR",
        }
    }

    /// Levels at which this kind of servant exists.
    pub fn levels(self) -> &'static [ChurchLevel] {
        use ChurchLevel::*;
        match self {
            Self::Leader => &ChurchLevel::ALL,
            Self::Admin => &[Governorship, Council, Stream, Campus, Oversight, Denomination],
            Self::ArrivalsAdmin => &[Governorship, Council, Stream, Campus],
            Self::ArrivalsCounter => &[Stream],
            Self::ArrivalsPayer => &[Council],
            Self::Teller => &[Stream],
            Self::SheepSeeker => &[Stream],
        }
    }

    pub fn exists_at(self, level: ChurchLevel) -> bool {
        self.levels().contains(&level)
    }

    /// Units have at most one leader and one admin; other roles are shared.
    pub fn is_single_holder(self) -> bool {
        matches!(self, Self::Leader | Self::Admin)
    }
}

/// A servant role at a level, as carried in the JWT roles claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub kind: ServantKind,
    pub level: ChurchLevel,
}

impl Role {
    pub fn new(kind: ServantKind, level: ChurchLevel) -> Result<Self, FlError> {
        if !kind.exists_at(level) {
            return Err(FlError::Validation(format!(
                "There is no {} role at {} level",
                kind.title(),
                level
            )));
        }
        Ok(Self { kind, level })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.claim_prefix(), self.level.label())
    }
}

impl FromStr for Role {
    type Err = FlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for kind in ServantKind::ALL {
            let Some(rest) = s.strip_prefix(kind.claim_prefix()) else {
                continue;
            };
            if let Some(level) = ChurchLevel::ALL.into_iter().find(|l| l.label() == rest) {
                return Role::new(kind, level);
            }
        }
        Err(FlError::Validation(format!("Unknown role: {s}")))
    }
}

// ── Money ─────────────────────────────────────────────────────────

/// An amount of Ghana cedis, stored as whole pesewas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(pub i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Largest amount accepted from a client: ten million cedis.
    pub const MAX: Amount = Amount(1_000_000_000);

    pub fn from_cedis(cedis: f64) -> Self {
        Self((cedis * 100.0).round() as i64)
    }

    /// Read a client-supplied cedi amount. Values that are not finite or
    /// larger than [`Amount::MAX`] are rejected.
    pub fn try_from_cedis(cedis: f64) -> Result<Self, FlError> {
        if !cedis.is_finite() || cedis.abs() > Self::MAX.cedis() {
            return Err(FlError::Validation(format!(
                "{cedis} is not an amount the portal can record"
            )));
        }
        Ok(Self::from_cedis(cedis))
    }

    pub fn saturating_mul(self, factor: i64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    pub fn cedis(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn pesewas(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "GHS {sign}{}.{:02}", abs / 100, abs % 100)
    }
}
