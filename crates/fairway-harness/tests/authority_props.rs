//! Property tests for the scripted authority and the replay script parser.

use fairway_core::snapshot::{HAND_SIZE, Phase, RuleFlags};
use fairway_harness::authority::score_hand;
use fairway_harness::{ScriptedAuthority, parse_script};
use proptest::prelude::*;

const NAMES: [&str; 4] = ["b1", "b2", "b3", "b4"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn computer_tables_always_finish_a_round(
        seed in any::<u64>(),
        seats in 2usize..=4,
        rules in 0u8..16,
    ) {
        let players: Vec<(&str, bool)> = NAMES[..seats].iter().map(|n| (*n, true)).collect();
        let mut authority =
            ScriptedAuthority::new(&players, RuleFlags::from_bits_truncate(u16::from(rules)), seed);
        for _ in 0..2_000 {
            let Some((player, action)) = authority.autoplay() else {
                break;
            };
            prop_assert!(authority.apply(&player, &action).is_ok(), "{action:?} by {player:?} rejected");
        }

        let snapshot = authority.snapshot();
        prop_assert_eq!(&snapshot.phase, &Phase::RoundOver);
        prop_assert!(snapshot.current_player_id.is_none());
        for player in &snapshot.players {
            prop_assert!(player.hand.all_face_up());
            prop_assert_eq!(player.hand.slots().count(), HAND_SIZE);
            prop_assert_eq!(player.round_score, score_hand(&player.hand));
            prop_assert_eq!(player.total_score, player.round_score);
        }
        prop_assert!(snapshot.players.iter().any(|p| p.rounds_won == 1));
    }

    #[test]
    fn deals_depend_only_on_the_seed(seed in any::<u64>()) {
        let players = [("b1", true), ("b2", true)];
        let a = ScriptedAuthority::new(&players, RuleFlags::empty(), seed);
        let b = ScriptedAuthority::new(&players, RuleFlags::empty(), seed);
        prop_assert_eq!(a.frame(), b.frame());
    }

    #[test]
    fn script_parsing_never_panics(text in "(\\PC|\n){0,400}") {
        let _ = parse_script(&text);
    }

    #[test]
    fn parsed_steps_are_time_ordered(times in proptest::collection::vec(0u64..5_000, 0..20)) {
        let script: String = times
            .iter()
            .map(|t| format!("{{\"at_ms\":{t},\"channel\":\"lost\"}}\n"))
            .collect();
        let steps = parse_script(&script).unwrap();
        prop_assert_eq!(steps.len(), times.len());
        prop_assert!(steps.windows(2).all(|w| w[0].at <= w[1].at));
    }
}
