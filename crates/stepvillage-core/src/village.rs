//! Village growth: experience grants and the residents they bring.
//!
//! Every level gained welcomes one villager from a fixed roster. A grant
//! that jumps several levels at once welcomes one resident per level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{LevelChange, ProgressionLedger, Resident};

/// Villagers in arrival order, one per level from 2 to 10.
const ROSTER: [(&str, &str); 9] = [
    ("Baker Hana", "bread"),
    ("Gardener Min", "sprout"),
    ("Fisher Joon", "fish"),
    ("Librarian Sora", "book"),
    ("Potter Eun", "vase"),
    ("Musician Tae", "guitar"),
    ("Doctor Yuna", "stethoscope"),
    ("Painter Ari", "palette"),
    ("Mayor Dal", "crown"),
];

/// Outcome of an experience grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpGrant {
    pub amount: u32,
    pub change: LevelChange,
    /// Residents who moved in because of this grant.
    pub new_residents: Vec<Resident>,
}

/// The roster entry that arrives when the village reaches `level`.
pub fn resident_for_level(level: u8, arrived_at: DateTime<Utc>) -> Option<Resident> {
    let index = usize::from(level).checked_sub(2)?;
    let (display_name, icon) = ROSTER.get(index)?;
    Some(Resident {
        id: format!("resident-{}", level),
        display_name: display_name.to_string(),
        icon: icon.to_string(),
        arrived_at,
    })
}

/// Add experience to the ledger and welcome a resident for each level gained.
pub fn grant_exp(ledger: &mut ProgressionLedger, amount: u32, now: DateTime<Utc>) -> ExpGrant {
    let change = ledger.add_village_exp(amount);

    let mut new_residents = Vec::new();
    for level in change.from + 1..=change.to {
        if let Some(resident) = resident_for_level(level, now) {
            if ledger.add_resident(resident.clone()) {
                new_residents.push(resident);
            }
        }
    }

    ExpGrant {
        amount,
        change,
        new_residents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_resident_without_level_up() {
        let mut ledger = ProgressionLedger::default();
        let grant = grant_exp(&mut ledger, 50, noon());
        assert!(!grant.change.leveled_up());
        assert!(grant.new_residents.is_empty());
        assert!(ledger.residents().is_empty());
    }

    #[test]
    fn test_one_resident_per_level() {
        let mut ledger = ProgressionLedger::default();
        let grant = grant_exp(&mut ledger, 460, noon());
        assert_eq!(grant.change, LevelChange { from: 1, to: 4 });
        let ids: Vec<&str> = grant.new_residents.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["resident-2", "resident-3", "resident-4"]);
        assert_eq!(ledger.residents().len(), 3);
        assert!(ledger.residents().iter().all(|r| r.arrived_at == noon()));
    }

    #[test]
    fn test_roster_covers_every_level() {
        assert!(resident_for_level(1, noon()).is_none());
        for level in 2..=10 {
            assert!(resident_for_level(level, noon()).is_some(), "level {}", level);
        }
        assert!(resident_for_level(11, noon()).is_none());
    }

    #[test]
    fn test_max_level_grant_fills_village() {
        let mut ledger = ProgressionLedger::default();
        grant_exp(&mut ledger, 10_000, noon());
        assert_eq!(ledger.village_level(), 10);
        assert_eq!(ledger.residents().len(), 9);
        let again = grant_exp(&mut ledger, 10_000, noon());
        assert!(again.new_residents.is_empty());
    }
}
