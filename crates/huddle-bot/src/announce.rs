//! Announcement texts.

use huddle_types::Participant;
use rand::seq::SliceRandom;
use rand::Rng;

/// Nudges spoken into a call that has gone quiet.
pub const SILENCE_NUDGES: [&str; 4] = [
    "Somebody speak up",
    "We don't have all day",
    "Don't be shy, say something",
    "It's getting late",
];

pub fn welcome_text(participant: &Participant) -> String {
    format!(
        "Hello {}, glad you could make the call.",
        participant.spoken_name()
    )
}

/// Picks one of [`SILENCE_NUDGES`] uniformly at random.
pub fn silence_nudge_text<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SILENCE_NUDGES
        .choose(rng)
        .copied()
        .unwrap_or(SILENCE_NUDGES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_mentions_first_name() {
        let alice = Participant {
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            ..Default::default()
        };
        assert_eq!(
            welcome_text(&alice),
            "Hello Alice, glad you could make the call."
        );
    }

    #[test]
    fn nudge_is_one_of_the_known_texts() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            assert!(SILENCE_NUDGES.contains(&silence_nudge_text(&mut rng)));
        }
    }
}
