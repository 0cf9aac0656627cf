//! Voice stealing.
//!
//! Every policy reduces to a score where higher means "steal me first". Ties
//! go to the voice whose envelope is further along towards silence, and after
//! that to the lowest pool index.

use std::cmp::Ordering;

use crate::synth::config::VoicePolicy;
use crate::synth::voice::{Voice, VoiceId};

/// Steal score of `voice` under `policy`, or `None` if the policy never steals.
pub fn steal_score(policy: VoicePolicy, voice: &Voice) -> Option<f64> {
    let score = match policy {
        VoicePolicy::Forget => return None,
        VoicePolicy::Lowest => -voice.frequency(),
        VoicePolicy::Highest => voice.frequency(),
        VoicePolicy::Oldest => voice.lifetime() as f64,
        VoicePolicy::Newest => -(voice.lifetime() as f64),
        VoicePolicy::Quietest => -voice.loudness(),
        VoicePolicy::Loudest => voice.loudness(),
    };
    Some(score)
}

fn compare(policy: VoicePolicy, a: &Voice, b: &Voice) -> Ordering {
    // Both scores exist whenever this is reached
    let score_a = steal_score(policy, a).unwrap_or(f64::NEG_INFINITY);
    let score_b = steal_score(policy, b).unwrap_or(f64::NEG_INFINITY);
    score_a
        .total_cmp(&score_b)
        .then_with(|| a.envelope().state().cmp(&b.envelope().state()))
}

/// Pick the voice to reclaim among those accepted by `eligible`.
pub fn select_victim<F>(policy: VoicePolicy, voices: &[Voice], eligible: F) -> Option<VoiceId>
where
    F: Fn(&Voice) -> bool,
{
    if policy == VoicePolicy::Forget {
        return None;
    }

    let mut best: Option<&Voice> = None;
    for voice in voices.iter().filter(|v| eligible(v)) {
        best = match best {
            Some(current) if compare(policy, voice, current) != Ordering::Greater => Some(current),
            _ => Some(voice),
        };
    }
    best.map(Voice::index)
}
