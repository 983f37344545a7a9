use std::str::FromStr;

use super::*;
use crate::split::{Income, MincomeProportional};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("inline date error")
}

fn cycle(value: &str) -> Cycle {
    Cycle::from(BigDecimal::from_str(value).expect("inline decimal error"))
}

fn start() -> Event {
    Event::CycleStart(CycleStart::new(Cycle::zero(), date(2021, 1, 1)))
}

fn have_need(name: &str, value: i64, at: &str) -> Event {
    Event::HaveNeed {
        name: name.into(),
        have_need: value.into(),
        cycle: cycle(at),
    }
}

fn payment(from: &str, to: &str, amount: i64, at: &str) -> Event {
    Event::Payment {
        from: from.into(),
        to: to.into(),
        amount: amount.into(),
        cycle: cycle(at),
    }
}

fn exit(name: &str, at: &str) -> Event {
    Event::UserExitsGroup {
        name: name.into(),
        cycle: cycle(at),
    }
}

fn payments(items: &[(&str, &str, i64)]) -> Distribution {
    items
        .iter()
        .map(|(from, to, amount)| Payment::new(*from, *to, *amount))
        .collect()
}

fn options() -> Options {
    Options::new(1000)
}

fn alice_and_bob() -> Vec<Event> {
    vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.2"),
    ]
}

#[test]
fn test_only_creation() -> anyhow::Result<()> {
    let outcome = replay(&[start()], &options(), &MincomeProportional)?;

    assert!(outcome.late_payments().is_empty());
    assert_eq!(outcome.boundaries().len(), 2);

    Ok(())
}

#[test]
fn test_single_cycle_without_payments() -> anyhow::Result<()> {
    assert_eq!(
        outstanding(&alice_and_bob(), &options(), &MincomeProportional)?,
        payments(&[("alice", "bob", 100)])
    );

    Ok(())
}

#[test]
fn test_partial_payment_adjusted() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "0.5"));

    assert_eq!(
        outstanding(&events, &options().adjusted(true), &MincomeProportional)?,
        payments(&[("alice", "bob", 40)])
    );

    Ok(())
}

#[test]
fn test_partial_payment_unadjusted_reports_full_obligation() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "0.5"));

    assert_eq!(
        outstanding(&events, &options(), &MincomeProportional)?,
        payments(&[("alice", "bob", 100)])
    );

    Ok(())
}

#[test]
fn test_overpayment_redirected_to_other_needer() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.2"),
        have_need("carol", -50, "0.3"),
        payment("alice", "bob", 150, "0.5"),
    ];

    let alice_pays_bob = |incomes: &[Income], _: &Money| -> Result<Distribution, SplitError> {
        assert_eq!(incomes.len(), 3);
        Ok(payments(&[("alice", "bob", 100)]))
    };

    assert_eq!(
        outstanding(&events, &options().adjusted(true), &alice_pays_bob)?,
        payments(&[("alice", "carol", 50)])
    );

    Ok(())
}

#[test]
fn test_overpayment_redistribution_with_proportional_split() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.2"),
        have_need("carol", -100, "0.3"),
        payment("alice", "bob", 150, "0.5"),
    ];

    let late = outstanding(&events, &options().adjusted(true), &MincomeProportional)?;

    assert_eq!(late, payments(&[("alice", "carol", 150)]));
    assert!(late.involving("bob").is_empty());

    Ok(())
}

#[test]
fn test_overpayment_split_by_need() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.2"),
        have_need("carol", -75, "0.3"),
        have_need("dave", -25, "0.3"),
        payment("alice", "bob", 140, "0.5"),
    ];

    let fixed = |_: &[Income], _: &Money| -> Result<Distribution, SplitError> {
        Ok(payments(&[("alice", "bob", 100)]))
    };

    let late = outstanding(&events, &options().adjusted(true), &fixed)?;

    assert_eq!(late, payments(&[("alice", "carol", 30), ("alice", "dave", 10)]));
    assert_eq!(late.total(), BigDecimal::from(40));

    Ok(())
}

#[test]
fn test_overpayment_shares_add_up_exactly() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("carol", -10, "0.1"),
        have_need("dave", -10, "0.1"),
        have_need("erin", -10, "0.1"),
        payment("alice", "bob", 200, "0.5"),
    ];

    let fixed = |_: &[Income], _: &Money| -> Result<Distribution, SplitError> {
        Ok(payments(&[("alice", "bob", 100)]))
    };

    let late = outstanding(&events, &options().adjusted(true), &fixed)?;

    assert_eq!(late.len(), 3);
    assert_eq!(late.total(), BigDecimal::from(100));
    assert!(late.iter().all(|p| p.from == "alice"
        && p.amount > BigDecimal::from(33)
        && p.amount < BigDecimal::from(34)));

    Ok(())
}

#[test]
fn test_partial_payment_is_marked() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "0.5"));

    let outcome = replay(&events, &options().adjusted(true), &MincomeProportional)?;
    let obligations = outcome.trailing().obligations().collect_vec();

    assert_eq!(obligations.len(), 1);
    assert_eq!(obligations[0].payment, &Payment::new("alice", "bob", 40));
    assert_eq!(obligations[0].total, BigDecimal::from(100));
    assert!(obligations[0].is_partial());

    Ok(())
}

#[test]
fn test_untouched_obligation_is_not_partial() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "0.5"));

    let outcome = replay(&events, &options(), &MincomeProportional)?;
    let obligations = outcome.trailing().obligations().collect_vec();

    assert_eq!(obligations[0].total, BigDecimal::from(100));
    assert!(!obligations[0].is_partial());

    Ok(())
}

#[test]
fn test_carried_obligation_total_includes_late_payments() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 30, "0.5"));
    events.push(have_need("alice", 100, "1.1"));
    events.push(payment("alice", "bob", 50, "1.5"));

    let outcome = replay(&events, &options().adjusted(true), &MincomeProportional)?;
    let obligations = outcome.trailing().obligations().collect_vec();

    assert_eq!(obligations[0].payment.amount, BigDecimal::from(120));
    assert_eq!(obligations[0].total, BigDecimal::from(170));
    assert!(obligations[0].is_partial());

    Ok(())
}

#[test]
fn test_overpayment_without_other_needers_stays_with_recipient() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 150, "0.5"));

    assert_eq!(
        outstanding(&events, &options().adjusted(true), &MincomeProportional)?,
        payments(&[("alice", "bob", -50)])
    );

    Ok(())
}

#[test]
fn test_kept_overpayment_carries_into_next_cycle() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 150, "0.5"));
    events.push(have_need("alice", 100, "1.5"));

    let outcome = replay(&events, &options(), &MincomeProportional)?;

    assert_eq!(
        outcome.boundaries()[1].late_payments,
        payments(&[("alice", "bob", -50)])
    );
    assert_eq!(outcome.late_payments(), &payments(&[("alice", "bob", 50)]));

    Ok(())
}

#[test]
fn test_overpayer_turned_needer_is_not_paid_by_itself() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.1"),
        have_need("carol", -100, "0.1"),
        payment("alice", "bob", 150, "0.3"),
        have_need("alice", -100, "0.6"),
        have_need("dave", 300, "0.7"),
    ];

    let late = outstanding(&events, &options().adjusted(true), &MincomeProportional)?;

    assert!(late.iter().all(|p| !p.is_self_payment()));
    assert_eq!(late.net_flow("alice", "carol"), BigDecimal::from(150));
    assert_eq!(late.net_flow("dave", "alice"), BigDecimal::from(100));
    assert_eq!(late.net_flow("dave", "bob"), BigDecimal::from(100));
    assert_eq!(late.net_flow("dave", "carol"), BigDecimal::from(100));
    assert_eq!(late.len(), 4);

    Ok(())
}

#[test]
fn test_exited_member_leaves_later_cycles() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0.1"),
        have_need("bob", -100, "0.2"),
        have_need("bob", -50, "0.4"),
        exit("bob", "0.5"),
        have_need("carol", -100, "1.2"),
        have_need("alice", 100, "2.1"),
    ];

    let outcome = replay(&events, &options(), &MincomeProportional)?;

    assert!(outcome
        .boundaries()
        .iter()
        .all(|b| b.late_payments.involving("bob").is_empty()));
    assert_eq!(outcome.boundaries().len(), 4);
    assert_eq!(outcome.late_payments(), &payments(&[("alice", "carol", 200)]));

    Ok(())
}

#[test]
fn test_late_payments_carry_forward() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 30, "0.5"));
    events.push(payment("alice", "bob", 20, "1.5"));

    let unadjusted = replay(&events, &options(), &MincomeProportional)?;
    assert_eq!(
        unadjusted.boundaries()[1].late_payments,
        payments(&[("alice", "bob", 70)])
    );
    assert_eq!(
        unadjusted.late_payments(),
        &payments(&[("alice", "bob", 170)])
    );

    let adjusted = replay(&events, &options().adjusted(true), &MincomeProportional)?;
    assert_eq!(adjusted.late_payments(), &payments(&[("alice", "bob", 150)]));

    Ok(())
}

#[test]
fn test_settled_cycle_leaves_nothing_owed() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 100, "0.5"));

    assert!(outstanding(&events, &options().adjusted(true), &MincomeProportional)?.is_empty());

    Ok(())
}

#[test]
fn test_seeded_late_payments() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events[0] = Event::CycleStart(
        CycleStart::new(Cycle::zero(), date(2021, 1, 1))
            .with_late_payments(payments(&[("alice", "bob", 40)])),
    );

    assert_eq!(
        outstanding(&events, &options(), &MincomeProportional)?,
        payments(&[("alice", "bob", 140)])
    );

    Ok(())
}

#[test]
fn test_time_weighted_proration() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0"),
        have_need("bob", -100, "0.5"),
    ];

    let time_weighted = options().proration(ProrationPolicy::TimeWeighted);

    assert_eq!(
        outstanding(&events, &time_weighted, &MincomeProportional)?,
        payments(&[("alice", "bob", 50)])
    );
    assert_eq!(
        outstanding(&events, &options(), &MincomeProportional)?,
        payments(&[("alice", "bob", 100)])
    );

    Ok(())
}

#[test]
fn test_time_weighted_resets_each_cycle() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 100, "0"),
        have_need("bob", -100, "0.5"),
        have_need("alice", 100, "1.5"),
    ];

    let time_weighted = options().proration(ProrationPolicy::TimeWeighted);
    let outcome = replay(&events, &time_weighted, &MincomeProportional)?;

    assert_eq!(
        outcome.boundaries()[1].late_payments,
        payments(&[("alice", "bob", 50)])
    );
    assert_eq!(outcome.late_payments(), &payments(&[("alice", "bob", 150)]));

    Ok(())
}

#[test]
fn test_due_on() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(have_need("alice", 100, "1.5"));

    let outcome = replay(&events, &options(), &MincomeProportional)?;

    assert_eq!(outcome.due_on()?, date(2021, 2, 28));

    Ok(())
}

#[test]
fn test_no_self_payments_and_one_payment_per_pair() -> anyhow::Result<()> {
    let events = vec![
        start(),
        have_need("alice", 300, "0.1"),
        have_need("bob", -100, "0.1"),
        have_need("carol", -200, "0.2"),
        have_need("dave", 100, "0.2"),
        payment("alice", "bob", 500, "0.4"),
        payment("dave", "carol", 10, "0.6"),
        have_need("bob", 50, "1.2"),
        payment("carol", "alice", 5, "1.3"),
        exit("dave", "2.4"),
    ];

    let outcome = replay(&events, &options().adjusted(true), &MincomeProportional)?;

    for boundary in outcome.boundaries() {
        assert!(boundary.late_payments.iter().all(|p| !p.is_self_payment()));
        assert_eq!(boundary.late_payments.reduce(), boundary.late_payments);
    }

    Ok(())
}

#[test]
fn test_replay_does_not_touch_input() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "1.5"));
    let before = events.clone();

    let _ = replay(&events, &options(), &MincomeProportional)?;

    assert_eq!(events, before);

    Ok(())
}

#[test]
fn test_replay_is_repeatable() -> anyhow::Result<()> {
    let mut events = alice_and_bob();
    events.push(payment("alice", "bob", 60, "1.5"));

    assert_eq!(
        outstanding(&events, &options(), &MincomeProportional)?,
        outstanding(&events, &options(), &MincomeProportional)?
    );

    Ok(())
}

#[test]
fn test_empty_log() {
    assert!(matches!(
        replay(&[], &options(), &MincomeProportional),
        Err(Error::Stream(normalize::Error::Empty))
    ));
}

#[test]
fn test_log_must_start_with_cycle_start() {
    assert!(matches!(
        replay(
            &[have_need("alice", 100, "0.1")],
            &options(),
            &MincomeProportional
        ),
        Err(Error::Stream(normalize::Error::MissingCycleStart(_)))
    ));
}

#[test]
fn test_self_payment_rejected() {
    let mut events = alice_and_bob();
    events.push(payment("alice", "alice", 10, "0.5"));

    assert!(matches!(
        replay(&events, &options(), &MincomeProportional),
        Err(Error::SelfPayment(name)) if name == "alice"
    ));
}

#[test]
fn test_split_failure_propagates() {
    let failing = |_: &[Income], _: &Money| -> Result<Distribution, SplitError> {
        Err(SplitError::Other(anyhow::anyhow!("split unavailable")))
    };

    let result = replay(&alice_and_bob(), &options(), &failing);

    match result {
        Err(Error::Split(SplitError::Other(e))) => {
            assert_eq!(e.to_string(), "split unavailable")
        }
        other => panic!("unexpected {:?}", other),
    }
}
