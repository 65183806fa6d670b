use crate::core::allocation::compute_breakdown;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

fn people(n: usize) -> BTreeSet<String> {
    (0..n).map(|i| format!("emp-{:02}", i)).collect()
}

proptest! {
    // Honoree counts 0, 1 and N keep the collected sum at the total, up to one
    // minor unit of rounding per participant. A lone honoree owes nothing.
    #[test]
    fn prop_shares_add_up_to_total(total in 0u64..10_000_000_000u64, n in 1usize..25, mode in 0u8..3) {
        let participants = people(n);
        let honorees: BTreeSet<String> = match mode {
            0 => BTreeSet::new(),
            1 => participants.iter().take(1).cloned().collect(),
            _ => participants.clone(),
        };
        prop_assume!(!(n == 1 && honorees.len() == 1));

        let total = Decimal::from(total);
        let breakdown = compute_breakdown(total, &participants, &honorees, |_| true, 0).unwrap();

        let slack = Decimal::from(n as u64);
        prop_assert!((breakdown.owed_sum().unwrap() - total).abs() <= slack);
        prop_assert!(breakdown.shares.values().all(|s| s.amount_owed >= Decimal::ZERO));
    }

    #[test]
    fn prop_honorees_never_pay_more_than_others(total in 0u64..1_000_000_000u64, n in 2usize..20, b in 1usize..19) {
        prop_assume!(b < n);
        let participants = people(n);
        let honorees: BTreeSet<String> = participants.iter().take(b).cloned().collect();

        let breakdown = compute_breakdown(Decimal::from(total), &participants, &honorees, |id| id.ends_with('0'), 0).unwrap();

        let payer = breakdown.amount_per_person;
        for share in breakdown.shares.values() {
            prop_assert!(share.amount_owed >= Decimal::ZERO);
            if share.is_honoree {
                prop_assert!(share.amount_owed <= payer);
            } else {
                prop_assert_eq!(share.amount_owed, payer);
            }
        }
        prop_assert_eq!(breakdown.fund_total + breakdown.direct_total, breakdown.owed_sum().unwrap());
    }
}
