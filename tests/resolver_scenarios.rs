//! End-to-end resolution scenarios
//!
//! Each test drives a resolver with a simulated clock and checks the exact
//! action stream.

mod common;

use std::sync::Arc;

use common::*;
use padmap::mapping::{
    Action, Binding, ChordMapping, ControllerButton, DoubleTapMapping, GestureEvent,
    GestureMapping, LongHoldMapping, MatchSource, Modifiers, MotionGestureType, Profile,
    RepeatMapping, Resolver, ResolverSettings, SequenceMapping, Trigger, KeyCode,
};
use pretty_assertions::assert_eq;
use ControllerButton::*;

// ========================================================================
// Chords
// ========================================================================

#[test]
fn test_chord_launches_app_exactly_once() {
    let mut profile = profile_with(&[(A, key(KeyCode::SPACE)), (B, key(KeyCode::ESCAPE))]);
    profile
        .add_chord(ChordMapping::new([A, B], launch("com.apple.Safari")).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[press(A, 0), press(B, 15), release(B, 120), release(A, 130)],
        2000,
    );

    assert_eq!(actions(&fired), vec![launch("com.apple.Safari")]);
}

#[test]
fn test_chord_press_order_irrelevant() {
    let mut profile = Profile::new("Test");
    profile
        .add_chord(ChordMapping::new([X, Y, A], key(KeyCode::F)).unwrap())
        .unwrap();

    for order in [[X, Y, A], [A, Y, X], [Y, A, X]] {
        let mut r = resolver(profile.clone());
        let events: Vec<_> = order
            .iter()
            .enumerate()
            .map(|(i, &b)| press(b, i as u64 * 10))
            .collect();
        let fired = run(&mut r, &events, 100);
        assert_eq!(actions(&fired), vec![key(KeyCode::F)], "order {:?}", order);
    }
}

#[test]
fn test_subset_of_chord_falls_back_to_binding() {
    let mut profile = profile_with(&[(A, key(KeyCode::SPACE))]);
    profile
        .add_chord(ChordMapping::new([A, B], launch("com.apple.Safari")).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(&mut r, &[press(A, 0), release(A, 60)], 500);
    assert_eq!(actions(&fired), vec![key(KeyCode::SPACE)]);
}

// ========================================================================
// Layers
// ========================================================================

#[test]
fn test_layer_override_and_fallthrough() {
    let mut profile = profile_with(&[(A, key(KeyCode::SPACE)), (B, key(KeyCode::ESCAPE))]);
    let layer = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;
    profile
        .set_layer_mapping(layer, A, Binding::new(key(KeyCode::RETURN)))
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(LeftBumper, 0),
            press(A, 10),
            release(A, 40),
            // B is not in the layer: base binding applies
            press(B, 50),
            release(B, 80),
            release(LeftBumper, 90),
            press(A, 100),
            release(A, 130),
        ],
        1000,
    );

    assert_eq!(
        actions(&fired),
        vec![key(KeyCode::RETURN), key(KeyCode::ESCAPE), key(KeyCode::SPACE)]
    );
    assert_eq!(
        fired[0].source,
        MatchSource::Binding {
            button: A,
            layer: Some(layer)
        }
    );
    assert_eq!(fired[1].source, MatchSource::Binding { button: B, layer: None });
}

#[test]
fn test_first_layer_wins_when_two_activators_held() {
    let mut profile = Profile::new("Test");
    let first = profile.create_layer("First", Some(LeftBumper)).unwrap().id;
    let second = profile.create_layer("Second", Some(RightBumper)).unwrap().id;
    profile
        .set_layer_mapping(first, A, Binding::new(key(KeyCode::C)))
        .unwrap();
    profile
        .set_layer_mapping(second, A, Binding::new(key(KeyCode::V)))
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[press(RightBumper, 0), press(LeftBumper, 5), press(A, 10), release(A, 30)],
        100,
    );
    assert_eq!(actions(&fired), vec![key(KeyCode::C)]);
}

#[test]
fn test_layer_deleted_while_activator_held() {
    let mut profile = profile_with(&[(A, key(KeyCode::SPACE))]);
    let layer = profile.create_layer("Nav", Some(LeftBumper)).unwrap().id;
    profile
        .set_layer_mapping(layer, A, Binding::new(key(KeyCode::RETURN)))
        .unwrap();
    let mut r = resolver(profile.clone());
    r.handle_event(press(LeftBumper, 0));

    profile.delete_layer(layer).unwrap();
    r.set_profile(Arc::new(profile));

    let fired = run(&mut r, &[press(A, 20), release(A, 40)], 100);
    assert_eq!(actions(&fired), vec![key(KeyCode::SPACE)]);
    assert_eq!(r.active_layer_id(), None);
}

// ========================================================================
// Timing variants
// ========================================================================

#[test]
fn test_repeat_fires_spaced_by_interval() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            DpadRight,
            Binding::new(key(KeyCode::RIGHT_ARROW)).with_repeat(RepeatMapping::new(0.1).unwrap()),
        )
        .unwrap();
    let mut r = resolver(profile);

    let mut fired: Vec<_> = r.handle_event(press(DpadRight, 0)).into_iter().collect();
    for t in (16..350).step_by(16) {
        fired.extend(r.tick(ms(t)));
    }
    fired.extend(r.handle_event(release(DpadRight, 350)));
    fired.extend(r.tick(ms(1000)));

    let times: Vec<_> = fired.iter().map(|f| f.at).collect();
    assert_eq!(times, vec![ms(0), ms(100), ms(200), ms(300)]);
    for pair in times.windows(2) {
        assert_eq!(pair[1] - pair[0], ms(100));
    }
}

#[test]
fn test_repeat_catches_up_after_late_tick() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            DpadRight,
            Binding::new(key(KeyCode::RIGHT_ARROW)).with_repeat(RepeatMapping::new(0.1).unwrap()),
        )
        .unwrap();
    let settings = ResolverSettings {
        repeat_fires_on_press: false,
        ..ResolverSettings::default()
    };
    let mut r = Resolver::with_settings(Arc::new(profile), settings);

    assert_eq!(r.handle_event(press(DpadRight, 0)), None);
    assert_eq!(r.tick(ms(320)).len(), 3);
    assert_eq!(r.tick(ms(330)).len(), 0);
}

#[test]
fn test_long_hold_and_tap_on_same_button() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            B,
            Binding::new(key(KeyCode::ESCAPE)).with_long_hold(
                LongHoldMapping::new(key(KeyCode::W), 0.5).unwrap(),
            ),
        )
        .unwrap();
    let mut r = resolver(profile);

    let tap = run(&mut r, &[press(B, 0), release(B, 100)], 200);
    assert_eq!(actions(&tap), vec![key(KeyCode::ESCAPE)]);

    r.handle_event(press(B, 1000));
    let held = r.tick(ms(1600));
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].trigger, Trigger::LongHold);
    assert_eq!(r.handle_event(release(B, 1700)), None);
}

#[test]
fn test_double_tap_window() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            Y,
            Binding::new(key(KeyCode::SPACE)).with_double_tap(
                DoubleTapMapping::new(key(KeyCode::TAB), 0.3).unwrap(),
            ),
        )
        .unwrap();

    // Second press inside the window
    let mut r = resolver(profile.clone());
    let fired = run(
        &mut r,
        &[press(Y, 0), release(Y, 40), press(Y, 200), release(Y, 240)],
        1000,
    );
    assert_eq!(actions(&fired), vec![key(KeyCode::TAB)]);

    // Second press after the window: two single taps
    let mut r = resolver(profile);
    let mut fired = Vec::new();
    fired.extend(r.handle_event(press(Y, 0)));
    fired.extend(r.handle_event(release(Y, 40)));
    fired.extend(r.tick(ms(400)));
    fired.extend(r.handle_event(press(Y, 500)));
    fired.extend(r.handle_event(release(Y, 540)));
    fired.extend(r.tick(ms(1000)));
    assert_eq!(actions(&fired), vec![key(KeyCode::SPACE), key(KeyCode::SPACE)]);
}

#[test]
fn test_hold_modifier_wraps_other_presses() {
    let mut profile = profile_with(&[(A, key(KeyCode::C))]);
    profile
        .set_mapping(
            LeftTrigger,
            Binding::new(Action::modifiers(Modifiers::COMMAND)).with_hold_modifier(),
        )
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(LeftTrigger, 0),
            press(A, 20),
            release(A, 60),
            release(LeftTrigger, 100),
        ],
        500,
    );
    let triggers: Vec<_> = fired.iter().map(|f| f.trigger).collect();
    assert_eq!(triggers, vec![Trigger::HoldStart, Trigger::Tap, Trigger::HoldEnd]);
}

#[test]
fn test_hold_modifier_ignores_double_tap() {
    let binding = Binding::new(Action::modifiers(Modifiers::SHIFT))
        .with_hold_modifier()
        .with_double_tap(DoubleTapMapping::new(key(KeyCode::TAB), 0.3).unwrap());
    assert!(binding.double_tap().is_none());

    let mut profile = Profile::new("Test");
    profile.set_mapping(LeftTrigger, binding).unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(LeftTrigger, 0),
            release(LeftTrigger, 50),
            press(LeftTrigger, 150),
            release(LeftTrigger, 200),
        ],
        1000,
    );
    let triggers: Vec<_> = fired.iter().map(|f| f.trigger).collect();
    assert_eq!(
        triggers,
        vec![Trigger::HoldStart, Trigger::HoldEnd, Trigger::HoldStart, Trigger::HoldEnd]
    );
}

#[test]
fn test_tap_waiting_on_chord_member_fires_before_chord() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            A,
            Binding::new(key(KeyCode::SPACE))
                .with_double_tap(DoubleTapMapping::new(key(KeyCode::TAB), 0.3).unwrap()),
        )
        .unwrap();
    profile
        .add_chord(ChordMapping::new([A, B], key(KeyCode::F)).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(A, 0),
            release(A, 50),
            press(B, 100),
            press(A, 120),
            release(A, 200),
            release(B, 210),
        ],
        2000,
    );
    assert_eq!(actions(&fired), vec![key(KeyCode::SPACE), key(KeyCode::F)]);
    assert_eq!(fired[0].trigger, Trigger::Tap);
    assert_eq!(fired[1].trigger, Trigger::Press);
}

// ========================================================================
// Chord members with press-time actions
// ========================================================================

#[test]
fn test_hold_modifier_chord_member_still_releases() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            LeftTrigger,
            Binding::new(Action::modifiers(Modifiers::COMMAND)).with_hold_modifier(),
        )
        .unwrap();
    profile
        .add_chord(ChordMapping::new([LeftTrigger, A], key(KeyCode::F)).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(LeftTrigger, 0),
            press(A, 50),
            release(A, 100),
            release(LeftTrigger, 200),
        ],
        1000,
    );
    let triggers: Vec<_> = fired.iter().map(|f| f.trigger).collect();
    assert_eq!(triggers, vec![Trigger::HoldStart, Trigger::Press, Trigger::HoldEnd]);
    assert_eq!(fired[1].action, key(KeyCode::F));
}

#[test]
fn test_repeat_chord_member_stops_repeating() {
    let mut profile = Profile::new("Test");
    profile
        .set_mapping(
            DpadDown,
            Binding::new(key(KeyCode::DOWN_ARROW)).with_repeat(RepeatMapping::new(0.1).unwrap()),
        )
        .unwrap();
    profile
        .add_chord(ChordMapping::new([DpadDown, A], key(KeyCode::F)).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let mut fired = Vec::new();
    fired.extend(r.handle_event(press(DpadDown, 0)));
    fired.extend(r.handle_event(press(A, 50)));
    for t in (100..600).step_by(50) {
        fired.extend(r.tick(ms(t)));
    }
    fired.extend(r.handle_event(release(A, 600)));
    fired.extend(r.handle_event(release(DpadDown, 610)));
    fired.extend(r.tick(ms(2000)));

    assert_eq!(actions(&fired), vec![key(KeyCode::DOWN_ARROW), key(KeyCode::F)]);
    assert_eq!(fired[0].trigger, Trigger::Repeat);
    assert_eq!(fired[1].trigger, Trigger::Press);
}

// ========================================================================
// Sequences and gestures
// ========================================================================

#[test]
fn test_sequence_then_plain_binding() {
    let mut profile = profile_with(&[(A, key(KeyCode::SPACE))]);
    profile
        .add_sequence(SequenceMapping::new(vec![DpadDown, DpadRight, A], key(KeyCode::F)).unwrap())
        .unwrap();
    let mut r = resolver(profile);

    let fired = run(
        &mut r,
        &[
            press(DpadDown, 0),
            release(DpadDown, 50),
            press(DpadRight, 200),
            release(DpadRight, 250),
            press(A, 400),
            release(A, 450),
            // History was cleared by the match
            press(A, 600),
            release(A, 650),
        ],
        2000,
    );
    assert_eq!(actions(&fired), vec![key(KeyCode::F), key(KeyCode::SPACE)]);
}

#[test]
fn test_gesture_actions() {
    let mut profile = Profile::new("Test");
    profile.set_gesture(GestureMapping::new(MotionGestureType::SteerLeft, key(KeyCode::LEFT_ARROW)));
    let mut r = resolver(profile);

    let fired = r
        .handle_gesture(GestureEvent::new(MotionGestureType::SteerLeft, ms(10)))
        .unwrap();
    assert_eq!(fired.action, key(KeyCode::LEFT_ARROW));
    assert_eq!(
        r.handle_gesture(GestureEvent::new(MotionGestureType::Shake, ms(20))),
        None
    );
}
