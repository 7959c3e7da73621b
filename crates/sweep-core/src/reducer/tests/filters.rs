use super::*;
use pretty_assertions::assert_eq;

fn chip(index: u8) -> FilterChip {
    FilterChip::Assignment(Assignment::new(index).expect("assignment"))
}

#[test]
fn toggle_sequences_never_leave_an_empty_selection() {
    let mut h = Harness::new();
    let chips: Vec<FilterChip> = FilterChip::chips().collect();

    // Deterministic walk over every chip, with repeats.
    let mut cursor = 3usize;
    for _ in 0..200 {
        cursor = (cursor * 5 + 1) % chips.len();
        let effects = h.user(UserAction::ToggleFilter(chips[cursor].clone()));
        assert_eq!(
            effects,
            vec![BoardEffect::SavePreferences, BoardEffect::RequestFrame]
        );
        match &h.state.preferences.active_filters {
            ActiveFilters::All => {}
            ActiveFilters::Only(set) => assert!(!set.is_empty()),
        }
    }
}

#[test]
fn specific_chip_excludes_all_and_all_clears_specifics() {
    let mut h = Harness::new();

    h.user(UserAction::ToggleFilter(chip(3)));
    h.user(UserAction::ToggleFilter(chip(2)));
    let filters = &h.state.preferences.active_filters;
    assert!(!filters.is_active(&FilterChip::All));
    assert_eq!(filters.to_keys(), vec!["2".to_string(), "3".to_string()]);

    h.user(UserAction::ToggleFilter(FilterChip::All));
    assert_eq!(h.state.preferences.active_filters, ActiveFilters::All);

    h.user(UserAction::ToggleFilter(chip(5)));
    h.user(UserAction::ToggleFilter(chip(5)));
    assert_eq!(h.state.preferences.active_filters, ActiveFilters::All);
}

#[test]
fn filters_drive_displayed_tasks() {
    let mut h = Harness::new();
    h.user(UserAction::ToggleFilter(chip(3)));

    let shown: Vec<TaskKey> = visibility::displayed(&h.state).tasks().cloned().collect();
    assert_eq!(shown, vec![tub()]);

    h.user(UserAction::ToggleFilter(chip(0)));
    h.user(UserAction::ToggleShowHidden);
    let shown: Vec<String> = visibility::displayed(&h.state)
        .tasks()
        .map(|key| key.task.clone())
        .collect();
    assert_eq!(shown, vec!["Sink", "Shelves", "Mirror", "Tub"]);
}

#[test]
fn display_toggles_are_broadcast_with_value() {
    let mut h = Harness::new();

    let effects = h.user(UserAction::ToggleShowCompleted);
    assert!(h.state.preferences.show_completed);
    assert!(effects.contains(&BoardEffect::SavePreferences));
    assert_eq!(
        broadcasts(&effects),
        vec![ChannelMessage::ToggleShowCompleted { value: Some(true) }]
    );

    let effects = h.user(UserAction::ToggleShowHidden);
    assert_eq!(
        broadcasts(&effects),
        vec![ChannelMessage::ToggleShowHidden { value: Some(true) }]
    );
}

#[test]
fn show_completed_reveals_settled_tasks() {
    let mut h = Harness::new();
    h.user(UserAction::AdvanceProgress(sink()));
    h.settle();
    assert_eq!(h.phase(&sink()), AnimationPhase::Hidden);

    h.user(UserAction::ToggleShowCompleted);
    assert_eq!(h.phase(&sink()), AnimationPhase::Idle);
    assert!(visibility::displayed(&h.state).task_visible(&sink()));

    h.user(UserAction::ToggleShowCompleted);
    assert_eq!(h.phase(&sink()), AnimationPhase::Hidden);
    assert!(!visibility::displayed(&h.state).task_visible(&sink()));
}

#[test]
fn labels_and_title_are_local_preferences() {
    let mut h = Harness::new();

    let effects = h.user(UserAction::SetLabel {
        chip: chip(1),
        label: "  Alex ".to_string(),
    });
    assert!(outbound(&effects).is_empty());
    assert_eq!(h.state.preferences.assignment_label(Assignment::new(1).expect("1")), "Alex");

    h.user(UserAction::ResetLabel(chip(1)));
    assert_eq!(
        h.state.preferences.assignment_label(Assignment::new(1).expect("1")),
        "Magenta"
    );

    h.user(UserAction::SetTitle("Spring Clean".to_string()));
    assert_eq!(h.state.preferences.title(), "Spring Clean");
    let effects = h.user(UserAction::ResetTitle);
    assert_eq!(h.state.preferences.title(), "Cleaning Dashboard");
    assert!(effects.contains(&BoardEffect::SavePreferences));
}

#[test]
fn view_and_navigation_are_broadcast() {
    let mut h = Harness::new();

    let effects = h.user(UserAction::CycleView);
    assert_eq!(h.state.navigation.view, View::Floor("downstairs".to_string()));
    assert_eq!(
        broadcasts(&effects),
        vec![ChannelMessage::SetView {
            view: View::Floor("downstairs".to_string()),
        }]
    );

    let effects = h.user(UserAction::NavigateToRoom(bathroom()));
    assert_eq!(h.state.navigation.view, View::Floor("upstairs".to_string()));
    assert_eq!(h.state.navigation.focused_room, Some(bathroom()));
    assert_eq!(broadcasts(&effects), vec![ChannelMessage::navigate(&bathroom())]);
}
