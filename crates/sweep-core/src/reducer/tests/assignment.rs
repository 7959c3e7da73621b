use super::*;
use pretty_assertions::assert_eq;

#[test]
fn assignment_waits_for_store_confirmation() {
    let mut h = Harness::new();

    let effects = h.user(UserAction::CycleAssignment(sink()));
    assert_eq!(
        effects,
        vec![BoardEffect::Remote(RemoteCall::UpdateAssignment {
            key: sink(),
            assignment: Assignment::new(1).expect("1"),
        })]
    );
    assert_eq!(h.assignment(&sink()), Assignment::UNASSIGNED);
    assert_eq!(h.state.sync.pending_writes, 1);

    let effects = h.remote(RemoteAction::AssignmentConfirmed {
        key: sink(),
        assignment: Assignment::new(1).expect("1"),
    });
    assert_eq!(h.assignment(&sink()), Assignment::new(1).expect("1"));
    assert_eq!(h.state.sync.pending_writes, 0);
    assert_eq!(
        broadcasts(&effects),
        vec![ChannelMessage::assignment(
            &sink(),
            Assignment::new(1).expect("1")
        )]
    );
}

#[test]
fn peer_applies_confirmed_assignment_without_store_call() {
    let mut a = Harness::new();
    let mut b = Harness::new();
    let three = Assignment::new(3).expect("3");

    let request = a.user(UserAction::CycleAssignment(counters()));
    assert_eq!(
        request,
        vec![BoardEffect::Remote(RemoteCall::UpdateAssignment {
            key: counters(),
            assignment: three,
        })]
    );
    let confirmed = a.remote(RemoteAction::AssignmentConfirmed {
        key: counters(),
        assignment: three,
    });

    for message in broadcasts(&confirmed) {
        let effects = b.inbound(message);
        assert!(outbound(&effects).is_empty());
    }
    assert_eq!(a.assignment(&counters()), three);
    assert_eq!(b.assignment(&counters()), three);
    assert!(outbound(&b.effects).is_empty());
}

#[test]
fn rejected_assignment_leaves_value_untouched() {
    let mut h = Harness::new();
    h.user(UserAction::CycleAssignment(tub()));
    let effects = h.remote(RemoteAction::Failed {
        call: RemoteCall::UpdateAssignment {
            key: tub(),
            assignment: Assignment::new(4).expect("4"),
        },
        error: "status 500".to_string(),
    });

    assert_eq!(h.assignment(&tub()), Assignment::new(3).expect("3"));
    assert!(broadcasts(&effects).is_empty());
    assert_eq!(h.state.sync.pending_writes, 0);
}

#[test]
fn assignment_wraps_back_to_unassigned() {
    let mut h = Harness::new();
    h.state.board.task_mut(&tub()).expect("tub").assignment = Assignment::new(6).expect("6");

    let effects = h.user(UserAction::CycleAssignment(tub()));
    assert_eq!(
        effects,
        vec![BoardEffect::Remote(RemoteCall::UpdateAssignment {
            key: tub(),
            assignment: Assignment::UNASSIGNED,
        })]
    );
}
