//! Birthday gift distribution.
//!
//! Every relative edge `(x, y)` creates two obligations: `x` buys a present
//! in the month of `y`'s birthday, and `y` in the month of `x`'s. A
//! citizen's count for a month is the number of distinct relatives born in
//! that month.

use std::collections::{BTreeMap, HashMap};

use crate::types::{BirthdayDistribution, Citizen, CitizenId, PresentCount};

/// Compute who buys how many presents in each month.
///
/// `citizens` must carry bidirectional relative lists, as returned by the
/// store. Relatives missing from `citizens` are skipped. Buyers within a
/// month are ordered by citizen id.
pub fn birthday_distribution(citizens: &[Citizen]) -> BirthdayDistribution {
    let birth_months: HashMap<CitizenId, u32> = citizens
        .iter()
        .map(|c| (c.citizen_id, c.birth_date.month()))
        .collect();

    let mut counts: BTreeMap<u32, BTreeMap<CitizenId, u32>> = BTreeMap::new();
    for giver in citizens {
        for taker in &giver.relatives {
            if let Some(month) = birth_months.get(taker) {
                *counts
                    .entry(*month)
                    .or_default()
                    .entry(giver.citizen_id)
                    .or_default() += 1;
            }
        }
    }

    let months = counts
        .into_iter()
        .map(|(month, buyers)| {
            let buyers = buyers
                .into_iter()
                .map(|(citizen_id, presents)| PresentCount { citizen_id, presents })
                .collect();
            (month, buyers)
        })
        .collect();

    BirthdayDistribution::from_months(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BirthDate, Gender};

    fn make_citizen(id: i64, birth: &str, relatives: &[i64]) -> Citizen {
        Citizen {
            citizen_id: CitizenId::new(id),
            town: "Moscow".to_string(),
            street: "Lva Tolstogo".to_string(),
            building: "16k7s".to_string(),
            apartment: 7,
            name: format!("Citizen {}", id),
            birth_date: BirthDate::parse(birth).unwrap(),
            gender: Gender::Female,
            relatives: relatives.iter().copied().map(CitizenId::new).collect(),
        }
    }

    fn present(id: i64, presents: u32) -> PresentCount {
        PresentCount {
            citizen_id: CitizenId::new(id),
            presents,
        }
    }

    #[test]
    fn test_single_edge_two_obligations() {
        let citizens = vec![
            make_citizen(1, "26.12.1986", &[2]),
            make_citizen(2, "01.04.1997", &[1]),
        ];
        let dist = birthday_distribution(&citizens);

        assert_eq!(dist.month(4), &[present(1, 1)]);
        assert_eq!(dist.month(12), &[present(2, 1)]);
        assert!(dist.month(1).is_empty());
        assert_eq!(dist.total_presents(), 2);
    }

    #[test]
    fn test_counts_relatives_in_same_month() {
        // 1 is related to 2 and 3, both born in April.
        let citizens = vec![
            make_citizen(1, "26.12.1986", &[2, 3]),
            make_citizen(2, "01.04.1997", &[1]),
            make_citizen(3, "23.04.1990", &[1]),
        ];
        let dist = birthday_distribution(&citizens);

        assert_eq!(dist.month(4), &[present(1, 2)]);
        assert_eq!(dist.month(12), &[present(2, 1), present(3, 1)]);
    }

    #[test]
    fn test_no_relatives_all_months_empty() {
        let citizens = vec![make_citizen(1, "26.12.1986", &[])];
        let dist = birthday_distribution(&citizens);
        assert_eq!(dist, BirthdayDistribution::empty());
    }

    #[test]
    fn test_unknown_taker_skipped() {
        let citizens = vec![make_citizen(1, "26.12.1986", &[9])];
        assert_eq!(birthday_distribution(&citizens).total_presents(), 0);
    }
}
